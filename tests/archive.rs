mod common;

use std::path::Path;

use assert_matches::assert_matches;

use common::{MockClient, taxa_archive, zip_with};
use plazi_harvester::archive::extract_treatments_in;
use plazi_harvester::error::HarvestError;

const ARCHIVE_URL: &str = "http://x/dwca/a.zip";

fn assert_empty(dir: &Path) {
    let leftovers = std::fs::read_dir(dir).unwrap().count();
    assert_eq!(leftovers, 0, "scratch directory left behind in {}", dir.display());
}

#[test]
fn reads_taxa_rows() {
    let scratch = tempfile::tempdir().unwrap();
    let client = MockClient::default().archive(
        ARCHIVE_URL,
        taxa_archive(&[
            ("Foo bar", "http://x/ref"),
            ("Pheidole müllerae", "http://x/ref2"),
        ]),
    );

    let rows = extract_treatments_in(&client, ARCHIVE_URL, scratch.path()).unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].scientific_name(), Some("Foo bar"));
    assert_eq!(rows[0].references(), Some("http://x/ref"));
    assert_eq!(rows[1].scientific_name(), Some("Pheidole müllerae"));
    assert_eq!(rows[1].get("taxonID"), Some("t1"));
    assert_empty(scratch.path());
}

#[test]
fn downloads_under_archive_basename() {
    let scratch = tempfile::tempdir().unwrap();
    let client = MockClient::default().archive(ARCHIVE_URL, taxa_archive(&[]));

    let rows = extract_treatments_in(&client, ARCHIVE_URL, scratch.path()).unwrap();

    assert!(rows.is_empty());
    let downloads = client.downloads.lock().unwrap();
    assert_eq!(downloads.len(), 1);
    assert!(downloads[0].ends_with("a.zip"));
    assert!(downloads[0].starts_with(scratch.path()));
    assert!(!downloads[0].parent().unwrap().exists());
}

#[test]
fn download_failure_is_transport_error() {
    let scratch = tempfile::tempdir().unwrap();
    let client = MockClient::default();

    let err = extract_treatments_in(&client, ARCHIVE_URL, scratch.path()).unwrap_err();

    assert_matches!(err, HarvestError::ArchiveStatus { status: 404, .. });
    assert_empty(scratch.path());
}

#[test]
fn missing_taxa_member_is_extraction_error() {
    let scratch = tempfile::tempdir().unwrap();
    let archive = zip_with(&[("occurrences.txt", b"id\n1\n".as_slice())]);
    let client = MockClient::default().archive(ARCHIVE_URL, archive);

    let err = extract_treatments_in(&client, ARCHIVE_URL, scratch.path()).unwrap_err();

    assert_matches!(err, HarvestError::MissingTaxaFile(_));
    assert_empty(scratch.path());
}

#[test]
fn corrupt_archive_is_rejected() {
    let scratch = tempfile::tempdir().unwrap();
    let client = MockClient::default().archive(ARCHIVE_URL, b"not a zip".to_vec());

    let err = extract_treatments_in(&client, ARCHIVE_URL, scratch.path()).unwrap_err();

    assert_matches!(err, HarvestError::InvalidArchive(_));
    assert_empty(scratch.path());
}

#[test]
fn invalid_utf8_cell_is_decode_error() {
    let scratch = tempfile::tempdir().unwrap();
    let taxa = b"scientificName\treferences\nFoo \xff bar\thttp://x/ref\n";
    let client =
        MockClient::default().archive(ARCHIVE_URL, zip_with(&[("taxa.txt", taxa.as_slice())]));

    let err = extract_treatments_in(&client, ARCHIVE_URL, scratch.path()).unwrap_err();

    assert_matches!(err, HarvestError::TaxaDecode { line: 2 });
    assert_empty(scratch.path());
}

#[test]
fn short_rows_leave_columns_absent() {
    let scratch = tempfile::tempdir().unwrap();
    let taxa = b"scientificName\treferences\nFoo bar\n";
    let client =
        MockClient::default().archive(ARCHIVE_URL, zip_with(&[("taxa.txt", taxa.as_slice())]));

    let rows = extract_treatments_in(&client, ARCHIVE_URL, scratch.path()).unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].scientific_name(), Some("Foo bar"));
    assert_eq!(rows[0].references(), None);
}
