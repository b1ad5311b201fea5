/// True when `cell` reads as a base-10 integer or a finite decimal float.
///
/// The original text is what gets kept downstream, so this only answers
/// yes/no. `NaN`, infinities and values that overflow `f64` are rejected.
pub fn is_numeric(cell: &str) -> bool {
    if cell.parse::<i64>().is_ok() {
        return true;
    }
    cell.parse::<f64>().map(f64::is_finite).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_numbers() {
        for s in ["0", "-7", "+5", "3.14", ".5", "5.", "1e5", "-2.5E-3", "99999999999999999999"] {
            assert!(is_numeric(s), "{s} should be numeric");
        }
    }

    #[test]
    fn test_rejects_text_and_specials() {
        for s in [
            "", " ", "val", "3.14abc", "$5", "1,000", " 42", "42 ", "NaN", "nan", "inf",
            "-infinity", "1e400", "0x1F",
        ] {
            assert!(!is_numeric(s), "{s:?} should not be numeric");
        }
    }
}
