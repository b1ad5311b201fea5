use csv::WriterBuilder;

use crate::error::ServiceError;

/// Serialise `rows` as comma-separated values.
///
/// Rows may differ in width; the caption row of an aggregation has one cell.
pub fn to_csv_bytes(rows: &[Vec<String>]) -> Result<Vec<u8>, ServiceError> {
    let mut wtr = WriterBuilder::new().flexible(true).from_writer(Vec::new());
    for row in rows {
        wtr.write_record(row)
            .map_err(|e| ServiceError::Serialization(e.to_string()))?;
    }
    wtr.into_inner()
        .map_err(|e| ServiceError::Serialization(e.to_string()))
}
