//! Error types for the aggregator core and the HTTP collaborator around it.

use thiserror::Error;
use warp::http::StatusCode;

/// Errors raised by the column aggregator itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregateError {
    /// No tables were handed to the aggregator
    #[error("no csv file in zip file")]
    EmptyInput,

    /// The requested column lies past the first table's header row
    #[error(
        "requested column number {column} is bigger than the csv's maximum column number {width}"
    )]
    ColumnOutOfRange { column: usize, width: usize },

    /// A data row is narrower than the requested column
    #[error("row {row} of '{name}' has {width} columns, column {column} requested")]
    RowTooShort {
        name: String,
        row: usize,
        width: usize,
        column: usize,
    },

    /// Gathered columns disagree in length and cannot be transposed
    #[error("'{name}' has {found} numeric values in the column, expected {expected}")]
    ColumnLengthMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
}

/// Everything that can end a request.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("column number must be a positive integer, got '{0}'")]
    InvalidColumn(String),

    #[error("missing upload field '{0}'")]
    MissingUpload(String),

    #[error("should be a .zip file")]
    NotZip,

    #[error("no csv file in zip file")]
    EmptyArchive,

    #[error("unsupported file type: {name}")]
    UnsupportedFileType { name: String },

    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    #[error("invalid zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("failed to parse '{name}': {source}")]
    Csv { name: String, source: csv::Error },

    #[error("failed to read upload: {0}")]
    Upload(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to write csv output: {0}")]
    Serialization(String),

    #[error("processing timed out after {0} seconds")]
    Timeout(u64),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// HTTP status reported to the client for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::InvalidColumn(_)
            | ServiceError::MissingUpload(_)
            | ServiceError::NotZip
            | ServiceError::EmptyArchive
            | ServiceError::UnsupportedFileType { .. }
            | ServiceError::Aggregate(_)
            | ServiceError::Zip(_)
            | ServiceError::Csv { .. }
            | ServiceError::Upload(_) => StatusCode::BAD_REQUEST,
            ServiceError::Io(_)
            | ServiceError::Serialization(_)
            | ServiceError::Timeout(_)
            | ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
