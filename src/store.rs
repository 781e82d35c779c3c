use std::fs;
use std::io::Write;
use std::sync::{Mutex, MutexGuard, PoisonError};

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::catalog::{Catalog, CatalogContext, WorkItemStore};
use crate::domain::{
    DestinationRecord, Group, HarvestJob, NewGroup, NewWorkItem, SourceRecord, WorkItem,
    WorkItemId,
};
use crate::error::HarvestError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Gather,
    Object,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub id: String,
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub item_id: Option<WorkItemId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Pending {
    groups: Vec<Group>,
    records: Vec<(DestinationRecord, WorkItemId)>,
}

/// JSON-document store backing both the catalog and the work items.
///
/// Catalog writes are staged in memory and reach disk on commit.
#[derive(Debug)]
pub struct FileStore {
    root: Utf8PathBuf,
    pending: Mutex<Pending>,
}

impl FileStore {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self {
            root,
            pending: Mutex::new(Pending::default()),
        }
    }

    pub fn default_root() -> Result<Utf8PathBuf, HarvestError> {
        ProjectDirs::from("org", "plazi", "plazi-harvester")
            .and_then(|dirs| Utf8PathBuf::from_path_buf(dirs.data_dir().to_path_buf()).ok())
            .ok_or_else(|| {
                HarvestError::Filesystem("unable to resolve data directory".to_string())
            })
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn source_path(&self, id: &str) -> Utf8PathBuf {
        self.root.join("sources").join(document_name(id))
    }

    pub fn group_path(&self, id: &str) -> Utf8PathBuf {
        self.root.join("groups").join(document_name(id))
    }

    pub fn record_path(&self, id: &str) -> Utf8PathBuf {
        self.root.join("records").join(document_name(id))
    }

    pub fn object_path(&self, id: &WorkItemId) -> Utf8PathBuf {
        self.root.join("objects").join(document_name(id.as_str()))
    }

    pub fn error_path(&self, id: &str) -> Utf8PathBuf {
        self.root.join("errors").join(document_name(id))
    }

    pub fn register_source(&self, source: &SourceRecord) -> Result<(), HarvestError> {
        write_json_atomic(&self.source_path(&source.id), source)
    }

    pub fn list_sources(&self) -> Result<Vec<SourceRecord>, HarvestError> {
        list_json(&self.root.join("sources"))
    }

    pub fn record(&self, id: &str) -> Result<Option<DestinationRecord>, HarvestError> {
        read_json(&self.record_path(id))
    }

    pub fn list_records(&self) -> Result<Vec<DestinationRecord>, HarvestError> {
        list_json(&self.root.join("records"))
    }

    pub fn list_errors(&self) -> Result<Vec<ErrorRecord>, HarvestError> {
        let mut errors: Vec<ErrorRecord> = list_json(&self.root.join("errors"))?;
        errors.sort_by_key(|error| error.created_at);
        Ok(errors)
    }

    fn pending(&self) -> MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn save_error(&self, record: &ErrorRecord) -> Result<(), HarvestError> {
        write_json_atomic(&self.error_path(&record.id), record)
    }

    /// Writes every item or none: documents already written are removed when
    /// a later write fails.
    fn persist_work_items(
        &self,
        job: &HarvestJob,
        items: Vec<NewWorkItem>,
        mut next_id: impl FnMut() -> WorkItemId,
    ) -> Result<Vec<WorkItemId>, HarvestError> {
        let mut ids = Vec::with_capacity(items.len());
        for item in items {
            let item = WorkItem {
                id: next_id(),
                guid: item.guid,
                job_id: job.id.clone(),
                content: item.content,
                record_id: None,
                errors: Vec::new(),
            };
            if let Err(err) = write_json_atomic(&self.object_path(&item.id), &item) {
                for id in &ids {
                    let path = self.object_path(id);
                    if let Err(cleanup) = fs::remove_file(path.as_std_path()) {
                        warn!(path = %path, error = %cleanup, "failed to remove work item");
                    }
                }
                return Err(err);
            }
            ids.push(item.id);
        }
        Ok(ids)
    }
}

impl Catalog for FileStore {
    fn show_source(
        &self,
        _ctx: &CatalogContext,
        source_id: &str,
    ) -> Result<SourceRecord, HarvestError> {
        read_json(&self.source_path(source_id))?
            .ok_or_else(|| HarvestError::SourceNotFound(source_id.to_string()))
    }

    fn find_group(&self, _ctx: &CatalogContext, id: &str) -> Result<Option<Group>, HarvestError> {
        if let Some(group) = self.pending().groups.iter().find(|group| group.id == id) {
            return Ok(Some(group.clone()));
        }
        read_json(&self.group_path(id))
    }

    fn create_group(&self, ctx: &CatalogContext, group: NewGroup) -> Result<Group, HarvestError> {
        debug!(group = %group.id, user = %ctx.user, "staging group");
        let group = Group {
            id: group.id,
            name: group.name,
            title: group.title,
        };
        self.pending().groups.push(group.clone());
        Ok(group)
    }

    fn upsert_record(
        &self,
        ctx: &CatalogContext,
        record: &DestinationRecord,
        item: &WorkItem,
    ) -> Result<String, HarvestError> {
        debug!(record = %record.id, user = %ctx.user, "staging record");
        let mut pending = self.pending();
        pending.records.retain(|(staged, _)| staged.id != record.id);
        pending.records.push((record.clone(), item.id.clone()));
        Ok(record.id.clone())
    }

    fn commit(&self) -> Result<(), HarvestError> {
        let mut pending = self.pending();

        let mut documents = Vec::new();
        for group in &pending.groups {
            documents.push((self.group_path(&group.id), to_json(group)?));
        }
        for (record, item_id) in &pending.records {
            documents.push((self.record_path(&record.id), to_json(record)?));
            if let Some(mut item) = self.work_item(item_id)? {
                item.record_id = Some(record.id.clone());
                documents.push((self.object_path(item_id), to_json(&item)?));
            }
        }

        // every target must be writable before the first document lands
        let mut previous = Vec::with_capacity(documents.len());
        for (path, _) in &documents {
            ensure_parent(path)?;
            previous.push(read_bytes(path)?);
        }

        let mut written = Vec::with_capacity(documents.len());
        for ((path, content), before) in documents.iter().zip(previous) {
            if let Err(err) = write_bytes_atomic(path, content) {
                restore(written);
                return Err(err);
            }
            written.push((path.clone(), before));
        }

        debug!(
            groups = pending.groups.len(),
            records = pending.records.len(),
            "committed"
        );
        *pending = Pending::default();
        Ok(())
    }

    fn rollback(&self) {
        *self.pending() = Pending::default();
    }
}

impl WorkItemStore for FileStore {
    fn create_work_items(
        &self,
        job: &HarvestJob,
        items: Vec<NewWorkItem>,
    ) -> Result<Vec<WorkItemId>, HarvestError> {
        self.persist_work_items(job, items, WorkItemId::generate)
    }

    fn work_item(&self, id: &WorkItemId) -> Result<Option<WorkItem>, HarvestError> {
        read_json(&self.object_path(id))
    }

    fn record_gather_error(&self, message: &str, job: &HarvestJob) -> Result<(), HarvestError> {
        self.save_error(&ErrorRecord {
            id: uuid::Uuid::new_v4().to_string(),
            kind: ErrorKind::Gather,
            message: message.to_string(),
            job_id: Some(job.id.clone()),
            item_id: None,
            created_at: Utc::now(),
        })
    }

    fn record_object_error(
        &self,
        message: &str,
        item: Option<&WorkItemId>,
    ) -> Result<(), HarvestError> {
        let mut job_id = None;
        if let Some(id) = item {
            if let Some(mut stored) = self.work_item(id)? {
                stored.errors.push(message.to_string());
                job_id = Some(stored.job_id.clone());
                write_json_atomic(&self.object_path(id), &stored)?;
            }
        }
        self.save_error(&ErrorRecord {
            id: uuid::Uuid::new_v4().to_string(),
            kind: ErrorKind::Object,
            message: message.to_string(),
            job_id,
            item_id: item.cloned(),
            created_at: Utc::now(),
        })
    }
}

/// File name for a document id. Bytes outside `[A-Za-z0-9_-]` are hex-escaped.
fn document_name(id: &str) -> String {
    let mut name = String::with_capacity(id.len() + 5);
    for byte in id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            name.push(byte as char);
        } else {
            name.push_str(&format!("%{byte:02X}"));
        }
    }
    name.push_str(".json");
    name
}

fn to_json<T: Serialize>(value: &T) -> Result<Vec<u8>, HarvestError> {
    serde_json::to_vec_pretty(value).map_err(|err| HarvestError::Filesystem(err.to_string()))
}

fn ensure_parent(path: &Utf8Path) -> Result<&Utf8Path, HarvestError> {
    let parent = path
        .parent()
        .ok_or_else(|| HarvestError::Filesystem("invalid destination path".to_string()))?;
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| HarvestError::Filesystem(format!("create {parent}: {err}")))?;
    Ok(parent)
}

fn write_json_atomic<T: Serialize>(path: &Utf8Path, value: &T) -> Result<(), HarvestError> {
    write_bytes_atomic(path, &to_json(value)?)
}

fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), HarvestError> {
    let parent = ensure_parent(path)?;
    let mut temp = tempfile::Builder::new()
        .prefix(".plazi-doc")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
    temp.write_all(content)
        .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
    Ok(())
}

fn read_bytes(path: &Utf8Path) -> Result<Option<Vec<u8>>, HarvestError> {
    if !path.as_std_path().exists() {
        return Ok(None);
    }
    fs::read(path.as_std_path())
        .map(Some)
        .map_err(|err| HarvestError::Filesystem(format!("read {path}: {err}")))
}

/// Puts documents back the way they were before a failed commit, newest first.
fn restore(written: Vec<(Utf8PathBuf, Option<Vec<u8>>)>) {
    for (path, before) in written.into_iter().rev() {
        let result = match before {
            Some(content) => write_bytes_atomic(&path, &content),
            None => fs::remove_file(path.as_std_path())
                .map_err(|err| HarvestError::Filesystem(err.to_string())),
        };
        if let Err(err) = result {
            warn!(path = %path, error = %err, "failed to restore document");
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Utf8Path) -> Result<Option<T>, HarvestError> {
    if !path.as_std_path().exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path.as_std_path())
        .map_err(|err| HarvestError::Filesystem(format!("read {path}: {err}")))?;
    let value = serde_json::from_str(&content)
        .map_err(|err| HarvestError::Filesystem(format!("parse {path}: {err}")))?;
    Ok(Some(value))
}

fn list_json<T: DeserializeOwned>(dir: &Utf8Path) -> Result<Vec<T>, HarvestError> {
    if !dir.as_std_path().exists() {
        return Ok(Vec::new());
    }
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir.as_std_path())
        .map_err(|err| HarvestError::Filesystem(err.to_string()))?
    {
        let entry = entry.map_err(|err| HarvestError::Filesystem(err.to_string()))?;
        let path = entry.path();
        let is_document = path.is_file()
            && path.extension().map(|ext| ext == "json").unwrap_or(false)
            && !entry.file_name().to_string_lossy().starts_with('.');
        if is_document {
            paths.push(path);
        }
    }
    paths.sort();

    let mut items = Vec::with_capacity(paths.len());
    for path in paths {
        let content =
            fs::read_to_string(&path).map_err(|err| HarvestError::Filesystem(err.to_string()))?;
        let item = serde_json::from_str(&content)
            .map_err(|err| HarvestError::Filesystem(format!("parse {}: {err}", path.display())))?;
        items.push(item);
    }
    Ok(items)
}
