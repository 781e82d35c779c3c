use tracing::debug;

use crate::archive::extract_treatments;
use crate::catalog::{Catalog, CatalogContext};
use crate::client::ArchiveSource;
use crate::config::HarvestConfig;
use crate::domain::{DestinationRecord, FeedEntry, Resource, TreatmentRow};
use crate::error::HarvestError;
use crate::groups::resolve_or_create_groups;
use crate::mapping::{apply_mapping, extract_extras};
use crate::munge::title_to_name;

pub const RESOURCE_TYPE: &str = "HTML";

/// Deployment-specific changes applied to a record after it is assembled.
pub trait RecordExtension: Send + Sync {
    fn extend(
        &self,
        entry: &FeedEntry,
        record: DestinationRecord,
    ) -> Result<DestinationRecord, HarvestError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl RecordExtension for PassThrough {
    fn extend(
        &self,
        _entry: &FeedEntry,
        record: DestinationRecord,
    ) -> Result<DestinationRecord, HarvestError> {
        Ok(record)
    }
}

pub struct RecordContext<'a> {
    pub source_id: &'a str,
    pub catalog: &'a dyn Catalog,
    pub catalog_ctx: &'a CatalogContext,
    pub archives: &'a dyn ArchiveSource,
    pub extension: &'a dyn RecordExtension,
}

pub fn build_record(
    entry: &FeedEntry,
    config: &HarvestConfig,
    ctx: &RecordContext<'_>,
) -> Result<DestinationRecord, HarvestError> {
    let mut record = DestinationRecord {
        id: entry.uuid().to_string(),
        name: title_to_name(entry.title()?),
        ..DestinationRecord::default()
    };

    apply_mapping(entry, &mut record);

    record.maintainer = config.maintainer.clone();
    record.maintainer_email = config.maintainer_email.clone();

    let source = ctx.catalog.show_source(ctx.catalog_ctx, ctx.source_id)?;
    record.owner_org = source.owner_org;

    let treatments = extract_treatments(ctx.archives, entry.darwin_core_archive()?)?;
    record.resources = extract_resources(&treatments)?;

    record.extras = extract_extras(entry);

    record.groups = resolve_or_create_groups(ctx.catalog, ctx.catalog_ctx, &config.groups)?;

    let record = ctx.extension.extend(entry, record)?;
    debug!(id = %record.id, resources = record.resources.len(), "assembled record");
    Ok(record)
}

pub fn extract_resources(treatments: &[TreatmentRow]) -> Result<Vec<Resource>, HarvestError> {
    treatments
        .iter()
        .map(|row| {
            let name = row
                .scientific_name()
                .ok_or_else(|| HarvestError::MissingColumn("scientificName".to_string()))?;
            let url = row
                .references()
                .ok_or_else(|| HarvestError::MissingColumn("references".to_string()))?;
            Ok(Resource {
                name: name.to_string(),
                resource_type: RESOURCE_TYPE.to_string(),
                format: RESOURCE_TYPE.to_string(),
                url: url.to_string(),
            })
        })
        .collect()
}
