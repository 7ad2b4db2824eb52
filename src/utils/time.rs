use chrono::{DateTime, Utc};

/// Milliseconds since the Unix epoch / 自Unix纪元以来的毫秒数
pub fn time_to_millis(t: DateTime<Utc>) -> i64 {
    t.timestamp_millis()
}
