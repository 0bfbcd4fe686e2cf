//! Business-day arithmetic.
//!
//! The aging policy counts Monday–Friday only; there is no holiday
//! calendar. Timestamps are reduced to calendar dates before counting,
//! so a gap of "2 business days" means two working dates strictly after
//! the start date.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde_json::Value;

/// Number of business days between two dates.
///
/// Returns 0 when `end <= start`; otherwise counts the weekdays
/// strictly after `start`, up to and including `end`.
#[must_use]
pub fn business_days_between(start: NaiveDate, end: NaiveDate) -> i64 {
    if end <= start {
        return 0;
    }

    let mut count = 0;
    let mut current = start;
    while current < end {
        current = current + Days::new(1);
        if !matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            count += 1;
        }
    }

    count
}

/// Reduce a heterogeneous remote date value to a calendar date.
///
/// Accepts a plain `YYYY-MM-DD` string or an ISO timestamp (only the
/// date portion is used). Anything else - null, empty, wrong type,
/// garbage text - yields `None`; a corrupt date field must never abort
/// processing.
#[must_use]
pub fn parse_date(value: &Value) -> Option<NaiveDate> {
    let text = value.as_str()?.trim();
    if text.is_empty() {
        return None;
    }

    let date_part = text.split('T').next().unwrap_or(text);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Parse a date field off a record, treating anything unparseable as
/// absent.
#[must_use]
pub fn date_field(record: &wallog_store::RecordData, name: &str) -> Option<NaiveDate> {
    record.get(name).and_then(parse_date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_end_not_after_start_is_zero() {
        let monday = date(2025, 6, 2);
        assert_eq!(business_days_between(monday, monday), 0);
        assert_eq!(business_days_between(monday, date(2025, 5, 30)), 0);
    }

    #[test]
    fn test_friday_to_monday_is_one() {
        // 2025-06-06 is a Friday, 2025-06-09 the following Monday.
        assert_eq!(business_days_between(date(2025, 6, 6), date(2025, 6, 9)), 1);
    }

    #[test]
    fn test_monday_to_friday_is_four() {
        assert_eq!(business_days_between(date(2025, 6, 2), date(2025, 6, 6)), 4);
    }

    #[test]
    fn test_full_week_is_five() {
        assert_eq!(business_days_between(date(2025, 6, 2), date(2025, 6, 9)), 5);
    }

    #[test]
    fn test_weekend_span_counts_no_weekend_days() {
        // Saturday to Sunday crosses no weekdays.
        assert_eq!(business_days_between(date(2025, 6, 7), date(2025, 6, 8)), 0);
        // Saturday to Monday is one weekday.
        assert_eq!(business_days_between(date(2025, 6, 7), date(2025, 6, 9)), 1);
    }

    #[test]
    fn test_parse_plain_date() {
        assert_eq!(parse_date(&json!("2025-06-02")), Some(date(2025, 6, 2)));
    }

    #[test]
    fn test_parse_iso_timestamp_keeps_date_portion() {
        assert_eq!(
            parse_date(&json!("2025-06-02T15:43:10Z")),
            Some(date(2025, 6, 2))
        );
        assert_eq!(
            parse_date(&json!("2025-06-02T23:59:59.999+09:00")),
            Some(date(2025, 6, 2))
        );
    }

    #[test]
    fn test_parse_garbage_is_none() {
        assert_eq!(parse_date(&json!(null)), None);
        assert_eq!(parse_date(&json!("")), None);
        assert_eq!(parse_date(&json!("not a date")), None);
        assert_eq!(parse_date(&json!(20250602)), None);
        assert_eq!(parse_date(&json!("2025-13-40")), None);
    }
}
