use crate::error::AggregateError;

/// Turn one column per source into one row per value position.
///
/// `out[i][j] == columns[j].1[i]`. Every column must be as long as the first;
/// the first column that differs is reported by name.
pub fn transpose<S: AsRef<str>>(
    columns: &[(S, Vec<String>)],
) -> Result<Vec<Vec<String>>, AggregateError> {
    let Some((_, first)) = columns.first() else {
        return Ok(Vec::new());
    };
    let expected = first.len();

    if let Some((name, col)) = columns.iter().find(|(_, col)| col.len() != expected) {
        return Err(AggregateError::ColumnLengthMismatch {
            name: name.as_ref().to_string(),
            expected,
            found: col.len(),
        });
    }

    let rows = (0..expected)
        .map(|i| columns.iter().map(|(_, col)| col[i].clone()).collect())
        .collect();
    Ok(rows)
}
