//! Status and date-range filtering of matched permit records.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use siting_analysis_models::{Record, RecordFieldConfig, RecordFilters};

/// Parses a record date in any of the forms permit exports use:
/// `2024-01-15`, `2024-01-15T14:30:00`, RFC 3339, `1/15/2024` or
/// `15-Jan-2024`.
#[must_use]
pub fn parse_record_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.date());
        }
    }
    for format in ["%m/%d/%Y", "%d-%b-%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Some(date);
        }
    }
    None
}

fn text_field<'a>(record: &'a Record, field: &str) -> Option<&'a str> {
    record.get(field)?.as_str()
}

/// Returns `true` if `record` passes every filter that is set.
///
/// Status compares trimmed and case-insensitively. When either date bound
/// is set, records with a missing or unparseable date are rejected.
#[must_use]
pub fn record_matches(record: &Record, filters: &RecordFilters, fields: &RecordFieldConfig) -> bool {
    if let Some(wanted) = filters.status.as_deref().map(str::trim)
        && !wanted.is_empty()
    {
        let status = text_field(record, &fields.status).unwrap_or_default().trim();
        if !status.eq_ignore_ascii_case(wanted) {
            return false;
        }
    }

    if filters.start_date.is_none() && filters.end_date.is_none() {
        return true;
    }

    let Some(date) = text_field(record, &fields.date).and_then(parse_record_date) else {
        return false;
    };
    filters.start_date.is_none_or(|start| date >= start)
        && filters.end_date.is_none_or(|end| date <= end)
}

/// Keeps the records that pass `filters`, preserving order.
#[must_use]
pub fn apply_filters<'a>(
    records: Vec<&'a Record>,
    filters: &RecordFilters,
    fields: &RecordFieldConfig,
) -> Vec<&'a Record> {
    if filters.is_empty() {
        return records;
    }

    let before = records.len();
    let kept: Vec<&Record> = records
        .into_iter()
        .filter(|r| record_matches(r, filters, fields))
        .collect();
    log::debug!("Record filters kept {} of {before} records", kept.len());
    kept
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(status: &str, date: &str) -> Record {
        json!({
            "Application Determination": status,
            "Determination Date": date,
        })
        .as_object()
        .unwrap()
        .clone()
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_supported_date_forms() {
        let expected = day(2024, 1, 15);
        assert_eq!(parse_record_date("2024-01-15"), Some(expected));
        assert_eq!(parse_record_date("2024-01-15T14:30:00"), Some(expected));
        assert_eq!(parse_record_date("2024-01-15T14:30:00.000Z"), Some(expected));
        assert_eq!(parse_record_date("1/15/2024"), Some(expected));
        assert_eq!(parse_record_date("15-Jan-2024"), Some(expected));
        assert_eq!(parse_record_date(" 2024-01-15 "), Some(expected));
    }

    #[test]
    fn rejects_unparseable_dates() {
        assert_eq!(parse_record_date(""), None);
        assert_eq!(parse_record_date("pending"), None);
        assert_eq!(parse_record_date("2024-13-40"), None);
    }

    #[test]
    fn status_is_trimmed_and_case_insensitive() {
        let filters = RecordFilters {
            status: Some("granted".to_string()),
            ..RecordFilters::default()
        };
        let fields = RecordFieldConfig::default();

        assert!(record_matches(&record(" Granted ", ""), &filters, &fields));
        assert!(!record_matches(&record("Refused", ""), &filters, &fields));
    }

    #[test]
    fn date_range_is_inclusive() {
        let filters = RecordFilters {
            start_date: Some(day(2023, 1, 1)),
            end_date: Some(day(2023, 12, 31)),
            ..RecordFilters::default()
        };
        let fields = RecordFieldConfig::default();

        assert!(record_matches(&record("", "2023-01-01"), &filters, &fields));
        assert!(record_matches(&record("", "12/31/2023"), &filters, &fields));
        assert!(!record_matches(&record("", "2024-01-01"), &filters, &fields));
        assert!(!record_matches(&record("", "unknown"), &filters, &fields));
    }

    #[test]
    fn missing_date_field_fails_date_filter() {
        let filters = RecordFilters {
            end_date: Some(day(2023, 12, 31)),
            ..RecordFilters::default()
        };
        let mut r = record("Granted", "");
        r.remove("Determination Date");
        assert!(!record_matches(&r, &filters, &RecordFieldConfig::default()));
    }

    #[test]
    fn apply_filters_preserves_order() {
        let records = [
            record("Granted", "2023-03-01"),
            record("Refused", "2023-04-01"),
            record("granted", "2023-05-01"),
        ];
        let filters = RecordFilters {
            status: Some("Granted".to_string()),
            ..RecordFilters::default()
        };
        let kept = apply_filters(
            records.iter().collect(),
            &filters,
            &RecordFieldConfig::default(),
        );
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0]["Determination Date"], "2023-03-01");
        assert_eq!(kept[1]["Determination Date"], "2023-05-01");
    }
}
