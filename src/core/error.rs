use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors. These propagate to the process boundary and terminate
/// the run with a non-zero exit; none of them is raised after a commit
/// has partially applied (batches are atomic in the store).
#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("credential file '{0}' is missing or unreadable")]
    MissingCredentials(PathBuf),

    #[error("setup error: {0}")]
    Setup(String),

    #[error("collection '{0}' is corrupt: {1}")]
    CorruptCollection(String, String),

    #[error("batch commit failed: {0}")]
    CommitFailed(String),

    #[error("write batch exceeds the atomic limit of {0} operations")]
    BatchOverflow(usize),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MigrateError>;

/// Per-field conversion failures. Folded into the run report at the
/// normalizer boundary, never thrown upward; the rest of the document
/// (and the run) keeps going.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("'{0}' does not parse as a number")]
    NotANumber(String),

    #[error("timestamp map carries no seconds component under either spelling")]
    MissingTimestampParts,

    #[error("seconds value {0} is outside the representable timestamp range")]
    TimestampOutOfRange(i64),

    #[error("unsupported value shape: {0}")]
    UnsupportedShape(String),

    #[error("both '{deprecated}' and '{canonical}' are present with different values")]
    ConflictingRename {
        deprecated: String,
        canonical: String,
    },
}

pub type ConversionResult<T> = std::result::Result<T, ConversionError>;
