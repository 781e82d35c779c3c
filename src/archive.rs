//! Darwin Core Archive extraction.
//!
//! Each call works in its own scratch directory which is removed before the
//! call returns, whatever the outcome.

use std::path::Path;

use csv::ReaderBuilder;
use tempfile::Builder;
use tracing::{debug, warn};

use crate::client::ArchiveSource;
use crate::domain::TreatmentRow;
use crate::error::HarvestError;
use crate::fs_util::{extract_member, url_basename};

pub const TAXA_FILE: &str = "taxa.txt";

const SCRATCH_PREFIX: &str = "plazi-dwca";

pub fn extract_treatments(
    source: &dyn ArchiveSource,
    archive_url: &str,
) -> Result<Vec<TreatmentRow>, HarvestError> {
    extract_treatments_in(source, archive_url, &std::env::temp_dir())
}

/// Like [`extract_treatments`] but creates the scratch directory under `scratch_root`.
pub fn extract_treatments_in(
    source: &dyn ArchiveSource,
    archive_url: &str,
    scratch_root: &Path,
) -> Result<Vec<TreatmentRow>, HarvestError> {
    let scratch = Builder::new()
        .prefix(SCRATCH_PREFIX)
        .tempdir_in(scratch_root)
        .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
    let scratch_path = scratch.path().to_path_buf();

    let result = download_and_read(source, archive_url, &scratch_path);

    match (result, scratch.close()) {
        (Ok(rows), Ok(())) => Ok(rows),
        (Ok(_), Err(err)) => Err(HarvestError::Filesystem(format!(
            "remove scratch dir {}: {err}",
            scratch_path.display()
        ))),
        (Err(err), cleanup) => {
            if let Err(cleanup_err) = cleanup {
                warn!(
                    path = %scratch_path.display(),
                    error = %cleanup_err,
                    "failed to remove scratch dir"
                );
            }
            Err(err)
        }
    }
}

fn download_and_read(
    source: &dyn ArchiveSource,
    archive_url: &str,
    scratch: &Path,
) -> Result<Vec<TreatmentRow>, HarvestError> {
    let file_name = match url_basename(archive_url) {
        "" | "." | ".." => "archive.zip",
        name => name,
    };
    let archive_path = scratch.join(file_name);
    source.download(archive_url, &archive_path)?;

    let taxa_path = extract_member(&archive_path, TAXA_FILE, scratch)?;
    let rows = read_treatments(&taxa_path)?;
    debug!(url = archive_url, rows = rows.len(), "read taxa table");
    Ok(rows)
}

/// Reads a tab-separated table with a header row. Cells are decoded as UTF-8.
pub fn read_treatments(path: &Path) -> Result<Vec<TreatmentRow>, HarvestError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|err| HarvestError::TaxaParse(err.to_string()))?;

    let headers = reader
        .byte_headers()
        .map_err(|err| HarvestError::TaxaParse(err.to_string()))?
        .iter()
        .map(|cell| decode_cell(cell, 1))
        .collect::<Result<Vec<_>, _>>()?;

    let mut rows = Vec::new();
    for record in reader.byte_records() {
        let record = record.map_err(|err| HarvestError::TaxaParse(err.to_string()))?;
        let line = record.position().map(|pos| pos.line()).unwrap_or_default();
        let row = headers
            .iter()
            .zip(record.iter())
            .map(|(header, cell)| Ok((header.clone(), decode_cell(cell, line)?)))
            .collect::<Result<TreatmentRow, HarvestError>>()?;
        rows.push(row);
    }
    Ok(rows)
}

fn decode_cell(cell: &[u8], line: u64) -> Result<String, HarvestError> {
    String::from_utf8(cell.to_vec()).map_err(|_| HarvestError::TaxaDecode { line })
}
