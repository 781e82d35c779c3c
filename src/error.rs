use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum HarvestError {
    #[error("feed request failed: {0}")]
    FeedHttp(String),

    #[error("feed returned status {status}: {message}")]
    FeedStatus { status: u16, message: String },

    #[error("failed to parse feed: {0}")]
    FeedParse(String),

    #[error("archive request failed: {0}")]
    ArchiveHttp(String),

    #[error("archive returned status {status}: {message}")]
    ArchiveStatus { status: u16, message: String },

    #[error("archive {0} has no taxa.txt member")]
    MissingTaxaFile(String),

    #[error("invalid zip archive: {0}")]
    InvalidArchive(String),

    #[error("failed to parse taxa table: {0}")]
    TaxaParse(String),

    #[error("taxa table line {line} is not valid UTF-8")]
    TaxaDecode { line: u64 },

    #[error("taxa row is missing column {0}")]
    MissingColumn(String),

    #[error("feed entry is missing field {0}")]
    MissingField(String),

    #[error("malformed work item content: {0}")]
    InvalidContent(String),

    #[error("harvest source not found: {0}")]
    SourceNotFound(String),

    #[error("catalog operation failed: {0}")]
    Catalog(String),

    #[error("failed to parse source config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
