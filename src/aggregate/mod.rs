// src/aggregate/mod.rs
//! Column extraction and transpose over a set of named text tables.

use std::{fmt, num::NonZeroUsize, str::FromStr};
use tracing::{debug, instrument};

use crate::error::AggregateError;

pub mod numeric;
pub mod transpose;

pub use numeric::is_numeric;
pub use transpose::transpose;

/// Rows of string cells. Rows may differ in width.
pub type Table = Vec<Vec<String>>;

/// One parsed CSV file and the name it came in under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedTable {
    pub name: String,
    pub rows: Table,
}

impl NamedTable {
    pub fn new(name: impl Into<String>, rows: Table) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }
}

/// A 1-based column number. Zero is not representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ColumnNumber(NonZeroUsize);

impl ColumnNumber {
    pub fn new(n: usize) -> Option<Self> {
        NonZeroUsize::new(n).map(Self)
    }

    /// The 1-based number as given.
    pub fn get(self) -> usize {
        self.0.get()
    }

    /// 0-based position into a row.
    pub fn index(self) -> usize {
        self.0.get() - 1
    }
}

impl FromStr for ColumnNumber {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<NonZeroUsize>().map(Self)
    }
}

impl fmt::Display for ColumnNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of an aggregation, before it is flattened into rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedTable {
    /// Header cell of the selected column in the first table.
    pub title: String,
    /// Source names, one per output column.
    pub names: Vec<String>,
    /// Transposed numeric values; every row has `names.len()` cells.
    pub body: Vec<Vec<String>>,
}

impl AggregatedTable {
    /// `Aggregated results for column "<title>":`
    pub fn caption(&self) -> String {
        format!("Aggregated results for column {}:", quote(&self.title))
    }

    /// Caption row, name row, then the body.
    pub fn into_rows(self) -> Table {
        let mut rows = Vec::with_capacity(self.body.len() + 2);
        rows.push(vec![self.caption()]);
        rows.push(self.names);
        rows.extend(self.body);
        rows
    }
}

/// Double-quote `s` the way Go's `%q` verb does.
///
/// Printable characters pass through. Quotes and backslashes get a backslash,
/// the usual C escapes are used where they exist, ASCII controls become
/// `\xNN` and other non-printable characters `\uNNNN` or `\UNNNNNNNN`.
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{07}' => out.push_str("\\a"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0b}' => out.push_str("\\v"),
            c if is_printable(c) => out.push(c),
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                out.push_str(&format!("\\x{:02x}", c as u32))
            }
            c if (c as u32) < 0x10000 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push_str(&format!("\\U{:08x}", c as u32)),
        }
    }
    out.push('"');
    out
}

/// Letters, marks, digits, punctuation, symbols and the ASCII space.
///
/// Control characters, separators other than U+0020, the common format
/// characters (soft hyphen, zero-width and bidi marks, BOM), private use code
/// points and noncharacters are not printable.
fn is_printable(c: char) -> bool {
    if c == ' ' {
        return true;
    }
    if c.is_control() || c.is_whitespace() {
        return false;
    }
    let cp = c as u32;
    let format_or_private = matches!(
        cp,
        0x00AD
            | 0x0600..=0x0605
            | 0x061C
            | 0x06DD
            | 0x070F
            | 0x08E2
            | 0x180E
            | 0x200B..=0x200F
            | 0x2028..=0x202E
            | 0x2060..=0x2064
            | 0x2066..=0x206F
            | 0xE000..=0xF8FF
            | 0xFDD0..=0xFDEF
            | 0xFEFF
            | 0xFFF9..=0xFFFB
            | 0x110BD
            | 0x110CD
            | 0x1BCA0..=0x1BCA3
            | 0x1D173..=0x1D17A
            | 0xE0001
            | 0xE0020..=0xE007F
            | 0xF0000..=0x10FFFF
    );
    let noncharacter = cp & 0xFFFE == 0xFFFE;
    !(format_or_private || noncharacter)
}

/// Pull the numeric cells of `column` out of `table`, in row order.
///
/// The header row goes through the same filter, so a text header drops out.
pub fn gather_column(
    table: &NamedTable,
    column: ColumnNumber,
) -> Result<Vec<String>, AggregateError> {
    let idx = column.index();
    let mut gathered = Vec::new();
    for (row_no, row) in table.rows.iter().enumerate() {
        let cell = row.get(idx).ok_or_else(|| AggregateError::RowTooShort {
            name: table.name.clone(),
            row: row_no + 1,
            width: row.len(),
            column: column.get(),
        })?;
        if is_numeric(cell) {
            gathered.push(cell.clone());
        }
    }
    Ok(gathered)
}

/// Build the aggregated table for `column` across `tables`.
///
/// The title comes from the first table's first row; a first table with no
/// rows at all gives an empty title.
#[instrument(level = "debug", skip_all, fields(tables = tables.len(), column = %column))]
pub fn aggregate(
    tables: &[NamedTable],
    column: ColumnNumber,
) -> Result<AggregatedTable, AggregateError> {
    let first = tables.first().ok_or(AggregateError::EmptyInput)?;

    let title = match first.rows.first() {
        Some(header) => header
            .get(column.index())
            .cloned()
            .ok_or(AggregateError::ColumnOutOfRange {
                column: column.get(),
                width: header.len(),
            })?,
        None => String::new(),
    };

    let mut gathered: Vec<(&str, Vec<String>)> = Vec::with_capacity(tables.len());
    for table in tables {
        let values = gather_column(table, column)?;
        debug!(name = %table.name, kept = values.len(), rows = table.rows.len(), "gathered column");
        gathered.push((table.name.as_str(), values));
    }

    let body = transpose(&gathered)?;
    let names = gathered.into_iter().map(|(name, _)| name.to_string()).collect();

    Ok(AggregatedTable { title, names, body })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name: &str, rows: &[&[&str]]) -> NamedTable {
        NamedTable::new(
            name,
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    fn col(n: usize) -> ColumnNumber {
        ColumnNumber::new(n).unwrap()
    }

    fn two_files() -> Vec<NamedTable> {
        vec![
            table("a.csv", &[&["id", "val"], &["1", "10"], &["2", "20"]]),
            table("b.csv", &[&["id", "val"], &["1", "30"], &["2", "40"]]),
        ]
    }

    #[test]
    fn test_two_files_second_column() {
        let rows = aggregate(&two_files(), col(2)).unwrap().into_rows();
        assert_eq!(
            rows,
            vec![
                vec!["Aggregated results for column \"val\":".to_string()],
                vec!["a.csv".to_string(), "b.csv".to_string()],
                vec!["10".to_string(), "30".to_string()],
                vec!["20".to_string(), "40".to_string()],
            ]
        );
    }

    #[test]
    fn test_title_is_first_header_cell() {
        let tables = two_files();
        for n in 1..=2 {
            let out = aggregate(&tables, col(n)).unwrap();
            assert_eq!(out.title, tables[0].rows[0][n - 1]);
        }
    }

    #[test]
    fn test_column_past_header_width() {
        let err = aggregate(&two_files(), col(3)).unwrap_err();
        assert_eq!(err, AggregateError::ColumnOutOfRange { column: 3, width: 2 });
    }

    #[test]
    fn test_no_tables() {
        assert_eq!(aggregate(&[], col(1)).unwrap_err(), AggregateError::EmptyInput);
    }

    #[test]
    fn test_numeric_filter_keeps_order_and_text() {
        let t = table(
            "c.csv",
            &[
                &["x", "reading"],
                &["1", "3.14"],
                &["2", "3.14abc"],
                &["3", ""],
                &["4", "-7"],
                &["5", "n/a"],
                &["6", "+5"],
            ],
        );
        assert_eq!(gather_column(&t, col(2)).unwrap(), vec!["3.14", "-7", "+5"]);
    }

    #[test]
    fn test_numeric_header_is_kept() {
        let t = table("d.csv", &[&["2024"], &["1"]]);
        assert_eq!(gather_column(&t, col(1)).unwrap(), vec!["2024", "1"]);
    }

    #[test]
    fn test_short_row_is_an_error() {
        let t = table("e.csv", &[&["a", "b"], &["1"]]);
        assert_eq!(
            gather_column(&t, col(2)).unwrap_err(),
            AggregateError::RowTooShort {
                name: "e.csv".into(),
                row: 2,
                width: 1,
                column: 2
            }
        );
    }

    #[test]
    fn test_mismatched_lengths_are_rejected() {
        let tables = vec![
            table("a.csv", &[&["v"], &["1"], &["2"]]),
            table("b.csv", &[&["v"], &["3"]]),
        ];
        assert!(matches!(
            aggregate(&tables, col(1)),
            Err(AggregateError::ColumnLengthMismatch { ref name, expected: 2, found: 1 }) if name == "b.csv"
        ));
    }

    #[test]
    fn test_empty_first_table_gives_empty_title() {
        let tables = vec![table("a.csv", &[]), table("b.csv", &[&["v"]])];
        let out = aggregate(&tables, col(1)).unwrap();
        assert_eq!(out.title, "");
        assert_eq!(out.caption(), "Aggregated results for column \"\":");
        assert!(out.body.is_empty());
    }

    #[test]
    fn test_caption_escapes_quotes() {
        let tables = vec![table("a.csv", &[&["say \"hi\"\\now"], &["1"]])];
        let out = aggregate(&tables, col(1)).unwrap();
        assert_eq!(
            out.caption(),
            r#"Aggregated results for column "say \"hi\"\\now":"#
        );
    }

    #[test]
    fn test_caption_escapes_like_go() {
        assert_eq!(quote("a\u{01}b\u{7f}"), r#""a\x01b\x7f""#);
        assert_eq!(quote("tab\there\u{0b}"), r#""tab\there\v""#);
        assert_eq!(quote("zero\u{200b}width"), r#""zero\u200bwidth""#);
        assert_eq!(quote("nb\u{a0}sp\u{85}"), r#""nb\u00a0sp\u0085""#);
        assert_eq!(quote("\u{feff}bom"), r#""\ufeffbom""#);
        assert_eq!(quote("\u{f0000}"), r#""\U000f0000""#);
        assert_eq!(quote("Température 温度 🌡"), "\"Température 温度 🌡\"");
    }

    #[test]
    fn test_same_input_same_output() {
        let tables = two_files();
        assert_eq!(aggregate(&tables, col(2)), aggregate(&tables, col(2)));
    }

    #[test]
    fn test_column_number_parsing() {
        assert_eq!("3".parse::<ColumnNumber>().unwrap().index(), 2);
        assert!("0".parse::<ColumnNumber>().is_err());
        assert!("-1".parse::<ColumnNumber>().is_err());
        assert!("two".parse::<ColumnNumber>().is_err());
    }
}
