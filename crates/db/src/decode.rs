//! Cell conversions shared by the database executors.

use castormon_core::row::Cell;
use chrono::NaiveDateTime;

/// Exact numerics travel as text. Integers stay exact; anything else that
/// parses becomes a float.
pub(crate) fn decimal_cell(text: String) -> Cell {
    let trimmed = text.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return Cell::Int(v);
    }
    match trimmed.parse::<f64>() {
        Ok(v) => Cell::Float(v),
        Err(_) => Cell::Text(text),
    }
}

/// `YYYY-MM-DD HH:MM:SS`, the format the dialects render bucket labels in.
pub(crate) fn timestamp_cell(value: NaiveDateTime) -> Cell {
    Cell::Text(value.format("%Y-%m-%d %H:%M:%S").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn decimals_keep_integers_exact() {
        assert_eq!(decimal_cell("42".into()), Cell::Int(42));
        assert_eq!(decimal_cell(" -7 ".into()), Cell::Int(-7));
        assert_eq!(decimal_cell("1.5000".into()), Cell::Float(1.5));
        assert_eq!(decimal_cell("n/a".into()), Cell::from("n/a"));
    }

    #[test]
    fn timestamps_drop_fractional_seconds() {
        let ts = NaiveDate::from_ymd_opt(2009, 2, 1)
            .unwrap()
            .and_hms_micro_opt(10, 30, 0, 123_456)
            .unwrap();
        assert_eq!(timestamp_cell(ts), Cell::from("2009-02-01 10:30:00"));
    }
}
