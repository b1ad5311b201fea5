//! Aggregate one column across the CSV files of a zip archive.
//!
//! [`aggregate`] holds the pure column-extraction and transpose step. The
//! [`archive`], [`output`] and [`server`] modules wrap it with zip loading,
//! CSV serialisation and the HTTP endpoint.

pub mod aggregate;
pub mod archive;
pub mod config;
pub mod error;
pub mod output;
pub mod server;

pub use aggregate::{aggregate, AggregatedTable, ColumnNumber, NamedTable, Table};
pub use error::{AggregateError, ServiceError};
