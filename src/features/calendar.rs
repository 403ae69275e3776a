use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use serde::Serialize;

use crate::config::{
    DAY_COLUMN, HOUR_COLUMN, MINUTE_COLUMN, MONTH_COLUMN, WEEKDAY_COLUMN, YEAR_COLUMN,
};
use crate::table::{Cell, Table, Value};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y"];

/// Parses a timestamp in any of the accepted layouts.
///
/// RFC 3339 offsets are dropped and the wall-clock time kept. Bare dates
/// resolve to midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(raw, f).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

/// Calendar fields of one timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarParts {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub weekday: &'static str,
}

impl From<NaiveDateTime> for CalendarParts {
    fn from(ts: NaiveDateTime) -> Self {
        Self {
            year: ts.year(),
            month: ts.month(),
            day: ts.day(),
            hour: ts.hour(),
            minute: ts.minute(),
            weekday: weekday_name(ts.weekday()),
        }
    }
}

fn cell_timestamp(cell: &Cell) -> Option<NaiveDateTime> {
    match cell {
        Some(Value::Timestamp(ts)) => Some(*ts),
        Some(Value::Text(s)) => parse_timestamp(s),
        _ => None,
    }
}

/// Parses `source` into timestamps and appends `an`, `luna`, `zi`, `ora`,
/// `minut` and `zi_saptamana`.
///
/// Unparseable entries become missing, as does every calendar field of their
/// row. When `source` is absent the calendar columns are added all-missing.
pub fn decompose_timestamp(mut table: Table, source: &str) -> Table {
    let parsed: Vec<Option<NaiveDateTime>> = match table.column_index(source) {
        Some(idx) => table.column_cells(idx).map(cell_timestamp).collect(),
        None => vec![None; table.n_rows()],
    };

    if table.has_column(source) {
        table.set_column(
            source,
            parsed.iter().map(|ts| ts.map(Value::Timestamp)).collect(),
        );
    }

    let parts: Vec<Option<CalendarParts>> =
        parsed.into_iter().map(|ts| ts.map(CalendarParts::from)).collect();
    let int_column = |f: fn(&CalendarParts) -> i64| -> Vec<Cell> {
        parts
            .iter()
            .map(|p| p.as_ref().map(|p| Value::Integer(f(p))))
            .collect()
    };

    table.set_column(YEAR_COLUMN, int_column(|p| p.year as i64));
    table.set_column(MONTH_COLUMN, int_column(|p| p.month as i64));
    table.set_column(DAY_COLUMN, int_column(|p| p.day as i64));
    table.set_column(HOUR_COLUMN, int_column(|p| p.hour as i64));
    table.set_column(MINUTE_COLUMN, int_column(|p| p.minute as i64));
    table.set_column(
        WEEKDAY_COLUMN,
        parts
            .iter()
            .map(|p| p.as_ref().map(|p| Value::text(p.weekday)))
            .collect(),
    );
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decomposes_iso_timestamp() {
        let table = decompose_timestamp(single("2024-03-15T14:30:00"), "date");

        assert_eq!(table.get(0, "an"), Some(&Value::Integer(2024)));
        assert_eq!(table.get(0, "luna"), Some(&Value::Integer(3)));
        assert_eq!(table.get(0, "zi"), Some(&Value::Integer(15)));
        assert_eq!(table.get(0, "ora"), Some(&Value::Integer(14)));
        assert_eq!(table.get(0, "minut"), Some(&Value::Integer(30)));
        assert_eq!(table.get(0, "zi_saptamana"), Some(&Value::text("friday")));
        assert_eq!(
            table.get(0, "date").map(|v| v.to_string()),
            Some("2024-03-15 14:30:00".to_string())
        );
    }

    #[test]
    fn test_unparseable_timestamp_yields_missing_fields() {
        let table = decompose_timestamp(single("not a date"), "date");

        assert_eq!(table.get(0, "date"), None);
        for column in ["an", "luna", "zi", "ora", "minut", "zi_saptamana"] {
            assert!(table.has_column(column));
            assert_eq!(table.get(0, column), None, "{column} should be missing");
        }
    }

    #[test]
    fn test_out_of_range_values_do_not_parse() {
        assert_eq!(parse_timestamp("2024-13-01 00:00:00"), None);
        assert_eq!(parse_timestamp("2024-02-30"), None);
        assert_eq!(parse_timestamp("2024-01-01 24:00:00"), None);
    }

    #[test]
    fn test_accepted_layouts() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 7)
            .unwrap()
            .and_hms_opt(23, 0, 0)
            .unwrap();
        for raw in [
            "2024-01-07 23:00:00",
            "2024-01-07T23:00",
            "2024-01-07T23:00:00+02:00",
            "07.01.2024 23:00",
            "2024/01/07 23:00:00",
        ] {
            assert_eq!(parse_timestamp(raw), Some(expected), "{raw}");
        }
        assert_eq!(
            parse_timestamp("2024-01-07").map(|t| t.hour()),
            Some(0)
        );
    }

    #[test]
    fn test_identical_inputs_decompose_identically() {
        let table = Table::from_rows(
            vec!["date".into()],
            vec![
                vec![Some(Value::text("2025-06-01 08:15:00"))],
                vec![Some(Value::text("2025-06-01 08:15:00"))],
            ],
        );
        let table = decompose_timestamp(table, "date");
        assert_eq!(table.rows()[0], table.rows()[1]);
        assert_eq!(table.get(1, "zi_saptamana"), Some(&Value::text("sunday")));
    }

    #[test]
    fn test_missing_source_column_adds_empty_fields() {
        let table = Table::from_rows(vec!["x".into()], vec![vec![None]]);
        let table = decompose_timestamp(table, "date");

        assert!(!table.has_column("date"));
        assert_eq!(table.n_cols(), 7);
        assert_eq!(table.get(0, "an"), None);
    }

    fn single(raw: &str) -> Table {
        Table::from_rows(vec!["date".into()], vec![vec![Some(Value::text(raw))]])
    }
}
