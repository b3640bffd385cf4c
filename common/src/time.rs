// A simple module to define the time types used in the project
//
// Every timestamp here comes from the local clock. They are used to stamp
// events when they are observed by the client, never as chain time.

use std::time::Duration;

use chrono::{Local, TimeZone};

// Millis timestamps used to determine it using its type
pub type TimestampMillis = u64;

// Seconds timestamps used to determine it using its type
pub type TimestampSeconds = u64;

#[cfg(not(target_arch = "wasm32"))]
#[inline]
pub fn get_current_time() -> Duration {
    use std::time::{SystemTime, UNIX_EPOCH};

    // A clock set before the epoch is reported as the epoch itself
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
}

// SystemTime is not available in the browser, chrono reads Date.now()
#[cfg(target_arch = "wasm32")]
#[inline]
pub fn get_current_time() -> Duration {
    let millis = chrono::Utc::now().timestamp_millis();
    Duration::from_millis(millis.max(0) as u64)
}

// Return timestamp in seconds
pub fn get_current_time_in_seconds() -> TimestampSeconds {
    get_current_time().as_secs()
}

// Return timestamp in milliseconds
// We cast it to u64 as we have plenty of time before it overflows (year 584,942,417 AD)
pub fn get_current_time_in_millis() -> TimestampMillis {
    get_current_time().as_millis() as TimestampMillis
}

// Format a millis timestamp as a local wall clock time (HH:MM:SS)
pub fn format_local_time(timestamp: TimestampMillis) -> String {
    match Local.timestamp_millis_opt(timestamp as i64).single() {
        Some(datetime) => datetime.format("%H:%M:%S").to_string(),
        None => String::from("--:--:--"),
    }
}
