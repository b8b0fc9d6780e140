use chrono::{DateTime, Local, Utc};

/// This is the standard way of displaying an entry timestamp in mindtrack.
pub fn display_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%b %-d, %Y %-I:%M %p")
        .to_string()
}

/// Seconds with a single decimal, the precision used when presenting test results.
pub fn display_seconds(seconds: f64) -> String {
    format!("{seconds:.1}s")
}
