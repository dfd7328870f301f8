//! Date/time formatting for feeder's report output.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;

/// Human-readable age such as "just now", "2 min ago" or "1 hour ago".
///
/// Negative durations (clock skew) read as "just now". Ages of a day or
/// more are still expressed in hours.
pub fn format_relative(elapsed: Duration) -> String {
    if elapsed < Duration::minutes(1) {
        return "just now".to_string();
    }
    if elapsed < Duration::hours(1) {
        return match elapsed.num_minutes() {
            1 => "1 min ago".to_string(),
            mins => format!("{} min ago", mins),
        };
    }
    match elapsed.num_hours() {
        1 => "1 hour ago".to_string(),
        hours => format!("{} hours ago", hours),
    }
}

/// [`format_relative`] for the time elapsed between `then` and `now`.
pub fn format_since(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    format_relative(now - then)
}

/// Format a DateTime<Utc> to the specified timezone.
///
/// # Arguments
///
/// * `dt` - DateTime in UTC
/// * `timezone` - Timezone name (e.g., "Asia/Tokyo", "UTC")
/// * `format` - Output format string (e.g., "%Y/%m/%d %H:%M")
///
/// # Returns
///
/// Formatted datetime string. Unknown timezones fall back to UTC.
pub fn format_utc_datetime(dt: &DateTime<Utc>, timezone: &str, format: &str) -> String {
    let tz: Tz = match timezone.parse() {
        Ok(tz) => tz,
        Err(_) => return dt.format(format).to_string(),
    };
    dt.with_timezone(&tz).format(format).to_string()
}
