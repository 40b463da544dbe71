use chrono::format::StrftimeItems;
use chrono::{DateTime, NaiveDateTime};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// current timestamp
pub fn now() -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
}

/// current timestamp in milliseconds since the unix epoch
pub fn now_millis() -> i64 {
    now().as_millis() as i64
}

pub fn unix_millis_to_time(unix_millis: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(unix_millis).map(|dt| dt.naive_utc())
}

pub fn time_format(dt: NaiveDateTime) -> String {
    let fmt = StrftimeItems::new("%Y-%m-%d %H:%M:%S%.3f");
    format!("{}", dt.format_with_items(fmt))
}

/// millis_format renders a millisecond timestamp, falling back to the raw
/// number when it is outside chrono's range.
pub fn millis_format(unix_millis: i64) -> String {
    match unix_millis_to_time(unix_millis) {
        Some(dt) => time_format(dt),
        None => unix_millis.to_string(),
    }
}
