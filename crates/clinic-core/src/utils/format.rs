use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime};

/// Parse the datetime formats the backend emits: RFC 3339, or naive
/// `YYYY-MM-DDTHH:MM[:SS]` without an offset.
///
/// Values with an offset are shown in the viewer's local time zone, so an
/// appointment at `2025-03-31T23:30:00Z` falls in April east of UTC. Naive
/// values are taken as already local.
fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::<FixedOffset>::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Local).naive_local());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Sort key for a backend datetime; unparseable values sort first
pub fn datetime_sort_key(value: &str) -> Option<NaiveDateTime> {
    parse_datetime(value)
}

/// Format a datetime for display, e.g. `Mar 05, 2025 2:30 PM`
pub fn format_datetime(value: &str) -> String {
    match parse_datetime(value) {
        Some(dt) => dt.format("%b %d, %Y %-I:%M %p").to_string(),
        None => value.to_string(),
    }
}

/// Format a date string to a more readable format
pub fn format_date(value: &str) -> String {
    if let Some(dt) = parse_datetime(value) {
        dt.format("%b %d, %Y").to_string()
    } else if value.len() >= 10 {
        value.chars().take(10).collect()
    } else {
        value.to_string()
    }
}

/// `YYYY-MM` month of a backend datetime
pub fn month_key(value: &str) -> Option<String> {
    parse_datetime(value).map(|dt| dt.format("%Y-%m").to_string())
}

/// Case-insensitive substring match; an empty needle matches everything
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format an optional string, returning a default if None
pub fn format_optional(value: &Option<String>, default: &str) -> String {
    value.as_deref().unwrap_or(default).to_string()
}
