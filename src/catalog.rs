use std::sync::Arc;

use crate::domain::{
    DestinationRecord, Group, HarvestJob, NewGroup, NewWorkItem, SourceRecord, WorkItem,
    WorkItemId,
};
use crate::error::HarvestError;

/// Identity the catalog actions run as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogContext {
    pub user: String,
}

/// Dataset catalog. Writes become durable only on [`Catalog::commit`].
pub trait Catalog: Send + Sync {
    fn show_source(
        &self,
        ctx: &CatalogContext,
        source_id: &str,
    ) -> Result<SourceRecord, HarvestError>;
    fn find_group(&self, ctx: &CatalogContext, id: &str) -> Result<Option<Group>, HarvestError>;
    fn create_group(&self, ctx: &CatalogContext, group: NewGroup) -> Result<Group, HarvestError>;
    /// Creates or replaces the record with `record.id` and links it to `item`.
    fn upsert_record(
        &self,
        ctx: &CatalogContext,
        record: &DestinationRecord,
        item: &WorkItem,
    ) -> Result<String, HarvestError>;
    fn commit(&self) -> Result<(), HarvestError>;
    fn rollback(&self);
}

pub trait WorkItemStore: Send + Sync {
    /// Persists all items or none of them.
    fn create_work_items(
        &self,
        job: &HarvestJob,
        items: Vec<NewWorkItem>,
    ) -> Result<Vec<WorkItemId>, HarvestError>;
    fn work_item(&self, id: &WorkItemId) -> Result<Option<WorkItem>, HarvestError>;
    fn record_gather_error(&self, message: &str, job: &HarvestJob) -> Result<(), HarvestError>;
    fn record_object_error(
        &self,
        message: &str,
        item: Option<&WorkItemId>,
    ) -> Result<(), HarvestError>;
}

impl<T: Catalog + ?Sized> Catalog for Arc<T> {
    fn show_source(
        &self,
        ctx: &CatalogContext,
        source_id: &str,
    ) -> Result<SourceRecord, HarvestError> {
        (**self).show_source(ctx, source_id)
    }

    fn find_group(&self, ctx: &CatalogContext, id: &str) -> Result<Option<Group>, HarvestError> {
        (**self).find_group(ctx, id)
    }

    fn create_group(&self, ctx: &CatalogContext, group: NewGroup) -> Result<Group, HarvestError> {
        (**self).create_group(ctx, group)
    }

    fn upsert_record(
        &self,
        ctx: &CatalogContext,
        record: &DestinationRecord,
        item: &WorkItem,
    ) -> Result<String, HarvestError> {
        (**self).upsert_record(ctx, record, item)
    }

    fn commit(&self) -> Result<(), HarvestError> {
        (**self).commit()
    }

    fn rollback(&self) {
        (**self).rollback()
    }
}

impl<T: WorkItemStore + ?Sized> WorkItemStore for Arc<T> {
    fn create_work_items(
        &self,
        job: &HarvestJob,
        items: Vec<NewWorkItem>,
    ) -> Result<Vec<WorkItemId>, HarvestError> {
        (**self).create_work_items(job, items)
    }

    fn work_item(&self, id: &WorkItemId) -> Result<Option<WorkItem>, HarvestError> {
        (**self).work_item(id)
    }

    fn record_gather_error(&self, message: &str, job: &HarvestJob) -> Result<(), HarvestError> {
        (**self).record_gather_error(message, job)
    }

    fn record_object_error(
        &self,
        message: &str,
        item: Option<&WorkItemId>,
    ) -> Result<(), HarvestError> {
        (**self).record_object_error(message, item)
    }
}
