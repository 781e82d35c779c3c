#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use plazi_harvester::catalog::{Catalog, CatalogContext, WorkItemStore};
use plazi_harvester::client::{ArchiveSource, FeedSource, parse_feed};
use plazi_harvester::domain::{
    DestinationRecord, FeedEntry, Group, HarvestJob, HarvestSource, NewGroup, NewWorkItem,
    SourceRecord, WorkItem, WorkItemId,
};
use plazi_harvester::error::HarvestError;

pub const SOURCE_ID: &str = "plazi";
pub const OWNER_ORG: &str = "plazi-org";

pub fn zip_with(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = ZipWriter::new(&mut cursor);
        for (name, data) in files {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap();
    }
    cursor.into_inner()
}

pub fn taxa_archive(rows: &[(&str, &str)]) -> Vec<u8> {
    let mut taxa = String::from("taxonID\tscientificName\treferences\n");
    for (i, (name, reference)) in rows.iter().enumerate() {
        taxa.push_str(&format!("t{i}\t{name}\t{reference}\n"));
    }
    zip_with(&[("taxa.txt", taxa.as_bytes())])
}

pub fn job(url: &str, config: Option<&str>) -> HarvestJob {
    HarvestJob::new(HarvestSource {
        id: SOURCE_ID.to_string(),
        url: url.to_string(),
        config: config.map(str::to_string),
    })
}

/// Serves a fixed feed body and archives keyed by URL. Unknown archive URLs
/// answer 404.
#[derive(Default)]
pub struct MockClient {
    pub feed: Option<String>,
    pub archives: HashMap<String, Vec<u8>>,
    pub feed_requests: Mutex<Vec<String>>,
    pub downloads: Mutex<Vec<PathBuf>>,
}

impl MockClient {
    pub fn with_feed(feed: &str) -> Self {
        Self {
            feed: Some(feed.to_string()),
            ..Self::default()
        }
    }

    pub fn archive(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.archives.insert(url.to_string(), bytes);
        self
    }
}

impl FeedSource for MockClient {
    fn fetch_feed(&self, url: &str) -> Result<Vec<FeedEntry>, HarvestError> {
        self.feed_requests.lock().unwrap().push(url.to_string());
        match &self.feed {
            Some(body) => parse_feed(body),
            None => Err(HarvestError::FeedHttp("connection refused".to_string())),
        }
    }
}

impl ArchiveSource for MockClient {
    fn download(&self, url: &str, destination: &Path) -> Result<(), HarvestError> {
        self.downloads
            .lock()
            .unwrap()
            .push(destination.to_path_buf());
        match self.archives.get(url) {
            Some(bytes) => {
                std::fs::write(destination, bytes)
                    .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
                Ok(())
            }
            None => Err(HarvestError::ArchiveStatus {
                status: 404,
                message: "not found".to_string(),
            }),
        }
    }
}

#[derive(Default)]
pub struct CatalogState {
    pub groups: BTreeMap<String, Group>,
    pub records: BTreeMap<String, (DestinationRecord, WorkItemId)>,
}

/// In-memory catalog with staged writes.
pub struct MemoryCatalog {
    pub source: SourceRecord,
    pub committed: Mutex<CatalogState>,
    pub staged: Mutex<CatalogState>,
    pub fail_upsert_for: Option<String>,
    pub fail_find_group: bool,
    pub fail_create_group: bool,
    pub group_creations: Mutex<usize>,
    pub rollbacks: Mutex<usize>,
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self {
            source: SourceRecord {
                id: SOURCE_ID.to_string(),
                url: "http://x/feed".to_string(),
                config: None,
                owner_org: Some(OWNER_ORG.to_string()),
            },
            committed: Mutex::new(CatalogState::default()),
            staged: Mutex::new(CatalogState::default()),
            fail_upsert_for: None,
            fail_find_group: false,
            fail_create_group: false,
            group_creations: Mutex::new(0),
            rollbacks: Mutex::new(0),
        }
    }
}

impl MemoryCatalog {
    pub fn record(&self, id: &str) -> Option<DestinationRecord> {
        self.committed
            .lock()
            .unwrap()
            .records
            .get(id)
            .map(|(record, _)| record.clone())
    }

    pub fn record_count(&self) -> usize {
        self.committed.lock().unwrap().records.len()
    }

    pub fn group(&self, id: &str) -> Option<Group> {
        self.committed.lock().unwrap().groups.get(id).cloned()
    }
}

impl Catalog for MemoryCatalog {
    fn show_source(
        &self,
        _ctx: &CatalogContext,
        source_id: &str,
    ) -> Result<SourceRecord, HarvestError> {
        if source_id == self.source.id {
            Ok(self.source.clone())
        } else {
            Err(HarvestError::SourceNotFound(source_id.to_string()))
        }
    }

    fn find_group(&self, _ctx: &CatalogContext, id: &str) -> Result<Option<Group>, HarvestError> {
        if self.fail_find_group {
            return Err(HarvestError::Catalog("group lookup unavailable".to_string()));
        }
        if let Some(group) = self.staged.lock().unwrap().groups.get(id) {
            return Ok(Some(group.clone()));
        }
        Ok(self.committed.lock().unwrap().groups.get(id).cloned())
    }

    fn create_group(&self, _ctx: &CatalogContext, group: NewGroup) -> Result<Group, HarvestError> {
        if self.fail_create_group {
            return Err(HarvestError::Catalog("group creation rejected".to_string()));
        }
        *self.group_creations.lock().unwrap() += 1;
        let group = Group {
            id: group.id,
            name: group.name,
            title: group.title,
        };
        self.staged
            .lock()
            .unwrap()
            .groups
            .insert(group.id.clone(), group.clone());
        Ok(group)
    }

    fn upsert_record(
        &self,
        _ctx: &CatalogContext,
        record: &DestinationRecord,
        item: &WorkItem,
    ) -> Result<String, HarvestError> {
        if self.fail_upsert_for.as_deref() == Some(record.id.as_str()) {
            return Err(HarvestError::Catalog("validation failed".to_string()));
        }
        self.staged
            .lock()
            .unwrap()
            .records
            .insert(record.id.clone(), (record.clone(), item.id.clone()));
        Ok(record.id.clone())
    }

    fn commit(&self) -> Result<(), HarvestError> {
        let staged = std::mem::take(&mut *self.staged.lock().unwrap());
        let mut committed = self.committed.lock().unwrap();
        committed.groups.extend(staged.groups);
        committed.records.extend(staged.records);
        Ok(())
    }

    fn rollback(&self) {
        *self.rollbacks.lock().unwrap() += 1;
        *self.staged.lock().unwrap() = CatalogState::default();
    }
}

#[derive(Default)]
pub struct MemoryStore {
    pub items: Mutex<BTreeMap<WorkItemId, WorkItem>>,
    pub order: Mutex<Vec<WorkItemId>>,
    pub gather_errors: Mutex<Vec<(String, String)>>,
    pub object_errors: Mutex<Vec<(String, Option<WorkItemId>)>>,
}

impl MemoryStore {
    pub fn insert(&self, job: &HarvestJob, guid: &str, content: &str) -> WorkItem {
        let item = WorkItem {
            id: WorkItemId::generate(),
            guid: guid.to_string(),
            job_id: job.id.clone(),
            content: content.to_string(),
            record_id: None,
            errors: Vec::new(),
        };
        self.items
            .lock()
            .unwrap()
            .insert(item.id.clone(), item.clone());
        self.order.lock().unwrap().push(item.id.clone());
        item
    }

    pub fn item_count(&self) -> usize {
        self.items.lock().unwrap().len()
    }
}

impl WorkItemStore for MemoryStore {
    fn create_work_items(
        &self,
        job: &HarvestJob,
        items: Vec<NewWorkItem>,
    ) -> Result<Vec<WorkItemId>, HarvestError> {
        Ok(items
            .into_iter()
            .map(|item| self.insert(job, &item.guid, &item.content).id)
            .collect())
    }

    fn work_item(&self, id: &WorkItemId) -> Result<Option<WorkItem>, HarvestError> {
        Ok(self.items.lock().unwrap().get(id).cloned())
    }

    fn record_gather_error(&self, message: &str, job: &HarvestJob) -> Result<(), HarvestError> {
        self.gather_errors
            .lock()
            .unwrap()
            .push((message.to_string(), job.id.clone()));
        Ok(())
    }

    fn record_object_error(
        &self,
        message: &str,
        item: Option<&WorkItemId>,
    ) -> Result<(), HarvestError> {
        self.object_errors
            .lock()
            .unwrap()
            .push((message.to_string(), item.cloned()));
        Ok(())
    }
}
