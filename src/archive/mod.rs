// src/archive/mod.rs
//! Staging of uploaded archives and loading of their CSV members.

use csv::ReaderBuilder;
use std::{
    fs::File,
    io::{BufReader, Read, Seek, Write},
    path::Path,
};
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument, warn};
use zip::ZipArchive;

use crate::{
    aggregate::{aggregate, AggregatedTable, ColumnNumber, NamedTable, Table},
    error::ServiceError,
};

/// An uploaded archive written to a per-request temp file.
///
/// The file is removed when this value is dropped, whichever way the request
/// ends.
#[derive(Debug)]
pub struct StagedUpload {
    file: NamedTempFile,
    original_name: String,
}

impl StagedUpload {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Filename the client uploaded the archive as.
    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    /// Load and aggregate the staged archive.
    pub fn aggregate(&self, column: ColumnNumber) -> Result<AggregatedTable, ServiceError> {
        aggregate_zip_file(self.path(), column)
    }
}

/// Write `bytes` into a fresh temp file under `dir`.
#[instrument(level = "debug", skip_all, fields(dir = %dir.display(), upload = %original_name, bytes = bytes.len()))]
pub fn stage_upload(
    dir: &Path,
    original_name: &str,
    bytes: &[u8],
) -> Result<StagedUpload, ServiceError> {
    let mut file = tempfile::Builder::new()
        .prefix("upload-")
        .suffix(".zip")
        .tempfile_in(dir)?;
    file.write_all(bytes)?;
    file.flush()?;
    debug!(path = %file.path().display(), "staged upload");

    Ok(StagedUpload {
        file,
        original_name: original_name.to_string(),
    })
}

/// Whether a member name carries the `.csv` suffix.
pub fn is_csv_name(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".csv")
}

/// Parse one CSV member into rows. Quoting follows RFC 4180 and rows may be
/// ragged.
///
/// Fields are decoded lossily, so a header in a legacy encoding still loads;
/// invalid bytes become U+FFFD.
pub fn parse_csv<R: Read>(name: &str, reader: R) -> Result<Table, ServiceError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for result in rdr.byte_records() {
        let record = result.map_err(|source| ServiceError::Csv {
            name: name.to_string(),
            source,
        })?;
        rows.push(
            record
                .iter()
                .map(|field| String::from_utf8_lossy(field).into_owned())
                .collect(),
        );
    }
    Ok(rows)
}

/// Read every CSV member of a zip archive, in archive order.
///
/// Directory entries are skipped. Any other non-CSV member rejects the whole
/// archive before a single CSV is parsed.
pub fn load_csv_tables<R: Read + Seek>(reader: R) -> Result<Vec<NamedTable>, ServiceError> {
    let mut archive = ZipArchive::new(reader)?;

    let mut members = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        if !is_csv_name(&name) {
            warn!(name = %name, "rejecting archive with non-csv member");
            return Err(ServiceError::UnsupportedFileType { name });
        }
        members.push((i, name));
    }

    if members.is_empty() {
        return Err(ServiceError::EmptyArchive);
    }

    let mut tables = Vec::with_capacity(members.len());
    for (i, name) in members {
        let entry = archive.by_index(i)?;
        let rows = parse_csv(&name, BufReader::new(entry))?;
        debug!(name = %name, rows = rows.len(), "parsed csv member");
        tables.push(NamedTable::new(name, rows));
    }
    Ok(tables)
}

/// Open the zip at `path`, load its CSV members and aggregate `column`.
#[instrument(level = "info", skip_all, fields(path = %path.as_ref().display(), column = %column))]
pub fn aggregate_zip_file<P: AsRef<Path>>(
    path: P,
    column: ColumnNumber,
) -> Result<AggregatedTable, ServiceError> {
    let file = File::open(path.as_ref())?;
    let tables = load_csv_tables(BufReader::new(file))?;
    let result = aggregate(&tables, column)?;
    info!(
        files = result.names.len(),
        rows = result.body.len(),
        "aggregated archive"
    );
    Ok(result)
}
