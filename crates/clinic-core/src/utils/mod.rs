//! Utility functions for date and string formatting.

pub mod format;

// Re-export commonly used functions at module level
pub use format::{
    contains_ignore_case, datetime_sort_key, format_date, format_datetime, format_optional,
    month_key, truncate_string,
};
