use chrono::NaiveDate;

/// This is the standard way of converting a date to a string in workwatch.
/// It names both the per-day record files and the `date` field of a session.
pub fn date_to_record_name(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parses a record file name back into the date it covers.
pub fn record_name_to_date(name: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(name, "%Y-%m-%d").ok()
}
