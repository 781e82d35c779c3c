//! Gather, fetch and import stages of a harvest.
//!
//! Stage entry points never return errors. Failures are logged, recorded
//! against the job or work item, and reported as `None` / `false`.

use serde::Serialize;
use tracing::{debug, error, info};

use crate::catalog::{Catalog, CatalogContext, WorkItemStore};
use crate::client::{ArchiveSource, FeedSource};
use crate::config::ConfigLoader;
use crate::domain::{FeedEntry, HarvestJob, NewWorkItem, WorkItem, WorkItemId};
use crate::error::HarvestError;
use crate::transform::{PassThrough, RecordContext, RecordExtension, build_record};

#[derive(Debug, Clone, Default, Serialize)]
pub struct HarvestReport {
    pub job_id: String,
    pub source_url: String,
    pub gather_failed: bool,
    pub gathered: usize,
    pub fetched: usize,
    pub imported: usize,
    pub failed: Vec<String>,
}

pub struct Harvester<S, C, W>
where
    S: FeedSource + ArchiveSource,
    C: Catalog,
    W: WorkItemStore,
{
    client: S,
    catalog: C,
    store: W,
    extension: Box<dyn RecordExtension>,
}

impl<S, C, W> Harvester<S, C, W>
where
    S: FeedSource + ArchiveSource,
    C: Catalog,
    W: WorkItemStore,
{
    pub fn new(client: S, catalog: C, store: W) -> Self {
        Self {
            client,
            catalog,
            store,
            extension: Box::new(PassThrough),
        }
    }

    pub fn with_extension(mut self, extension: Box<dyn RecordExtension>) -> Self {
        self.extension = extension;
        self
    }

    pub fn client(&self) -> &S {
        &self.client
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn store(&self) -> &W {
        &self.store
    }

    /// Pulls the feed and creates one work item per entry. `None` means
    /// nothing was gathered and a gather error was recorded.
    pub fn gather(&self, job: &HarvestJob) -> Option<Vec<WorkItemId>> {
        let url = job.source.feed_url();
        debug!(url, "in gather stage");
        match self.try_gather(job) {
            Ok(ids) => {
                info!(url, items = ids.len(), "gathered work items");
                Some(ids)
            }
            Err(err) => {
                error!(url, error = %err, "gather stage failed");
                let message = format!("Could not gather anything from {url}!");
                if let Err(record_err) = self.store.record_gather_error(&message, job) {
                    error!(error = %record_err, "failed to record gather error");
                }
                None
            }
        }
    }

    fn try_gather(&self, job: &HarvestJob) -> Result<Vec<WorkItemId>, HarvestError> {
        ConfigLoader::resolve(job.source.config.as_deref())?;
        let entries = self.client.fetch_feed(job.source.feed_url())?;
        let items = entries
            .iter()
            .map(|entry| {
                debug!(guid = entry.uuid(), "gathered entry");
                Ok(NewWorkItem {
                    guid: entry.uuid().to_string(),
                    content: entry.to_content()?,
                })
            })
            .collect::<Result<Vec<_>, HarvestError>>()?;
        self.store.create_work_items(job, items)
    }

    /// Content was captured during gather, so there is nothing to download.
    pub fn fetch(&self, job: &HarvestJob, item: &WorkItem) -> bool {
        debug!(guid = %item.guid, "in fetch stage");
        match ConfigLoader::resolve(job.source.config.as_deref()) {
            Ok(_) => true,
            Err(err) => {
                error!(guid = %item.guid, error = %err, "fetch stage failed");
                self.save_object_error(&format!("Exception in fetch stage: {err}"), Some(item));
                false
            }
        }
    }

    pub fn import(&self, job: &HarvestJob, item: Option<&WorkItem>) -> bool {
        let Some(item) = item else {
            error!("no work item received");
            self.save_object_error("No harvest object received", None);
            return false;
        };
        debug!(guid = %item.guid, "in import stage");

        match self.try_import(job, item) {
            Ok(record_id) => {
                debug!(guid = %item.guid, record = %record_id, "finished record");
                true
            }
            Err(err) => {
                self.catalog.rollback();
                error!(guid = %item.guid, error = %err, "import stage failed");
                self.save_object_error(&format!("Exception in import stage: {err}"), Some(item));
                false
            }
        }
    }

    fn try_import(&self, job: &HarvestJob, item: &WorkItem) -> Result<String, HarvestError> {
        let config = ConfigLoader::resolve(job.source.config.as_deref())?;
        let catalog_ctx = CatalogContext {
            user: config.user.clone(),
        };

        let entry = FeedEntry::from_content(&item.content)?;
        let ctx = RecordContext {
            source_id: &job.source.id,
            catalog: &self.catalog,
            catalog_ctx: &catalog_ctx,
            archives: &self.client,
            extension: self.extension.as_ref(),
        };
        let record = build_record(&entry, &config, &ctx)?;

        debug!(id = %record.id, "create/update record");
        let record_id = self.catalog.upsert_record(&catalog_ctx, &record, item)?;
        self.catalog.commit()?;
        Ok(record_id)
    }

    /// Runs all three stages for a job, continuing past failed items.
    pub fn run_job(&self, job: &HarvestJob) -> HarvestReport {
        let mut report = HarvestReport {
            job_id: job.id.clone(),
            source_url: job.source.feed_url().to_string(),
            ..HarvestReport::default()
        };

        let Some(ids) = self.gather(job) else {
            report.gather_failed = true;
            return report;
        };
        report.gathered = ids.len();

        for id in ids {
            let item = match self.store.work_item(&id) {
                Ok(item) => item,
                Err(err) => {
                    error!(item = %id, error = %err, "failed to load work item");
                    None
                }
            };
            let Some(item) = item else {
                self.import(job, None);
                report.failed.push(id.to_string());
                continue;
            };

            if !self.fetch(job, &item) {
                report.failed.push(item.guid.clone());
                continue;
            }
            report.fetched += 1;

            if self.import(job, Some(&item)) {
                report.imported += 1;
            } else {
                report.failed.push(item.guid.clone());
            }
        }

        info!(
            job = %report.job_id,
            gathered = report.gathered,
            imported = report.imported,
            failed = report.failed.len(),
            "harvest finished"
        );
        report
    }

    fn save_object_error(&self, message: &str, item: Option<&WorkItem>) {
        if let Err(err) = self
            .store
            .record_object_error(message, item.map(|item| &item.id))
        {
            error!(error = %err, "failed to record object error");
        }
    }
}
