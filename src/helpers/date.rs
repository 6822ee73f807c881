//! Date helper functions

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Default byline format, close to an en-US locale string
/// (`1/15/2024, 10:30:00 AM`)
pub const DEFAULT_DATE_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

/// Format a timestamp in the given zone using a strftime format string
///
/// # Examples
/// ```ignore
/// format_date(&date, chrono_tz::UTC, "%Y-%m-%d") // -> "2024-01-15"
/// ```
pub fn format_date(date: &DateTime<Utc>, tz: Tz, format: &str) -> String {
    date.with_timezone(&tz).format(format).to_string()
}

/// Format a date in ISO 8601 / XML format
pub fn date_xml<Tz2: TimeZone>(date: &DateTime<Tz2>) -> String
where
    Tz2::Offset: std::fmt::Display,
{
    date.format("%Y-%m-%dT%H:%M:%S%.3f%:z").to_string()
}

/// Generate a <time> HTML element
pub fn time_tag(date: &DateTime<Utc>, tz: Tz, format: &str) -> String {
    let display = format_date(date, tz, format);
    format!(r#"<time datetime="{}">{}</time>"#, date_xml(date), display)
}
