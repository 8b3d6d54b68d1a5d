use chrono::Utc;

/// Current wall-clock time in milliseconds since the Unix epoch
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Index of the fixed window containing `now_ms`
pub fn window_index(now_ms: i64, window_seconds: u64) -> i64 {
    (now_ms / 1000) / window_seconds as i64
}

/// Store key for an identity's counter in one window
pub fn counter_key(identity: &str, window_index: i64) -> String {
    format!("rate:{}:{}", identity, window_index)
}

/// Store key for an identity's ban record
pub fn ban_key(identity: &str) -> String {
    format!("ban:{}", identity)
}

/// Seconds until the current window rolls over
pub fn seconds_until_next_window(now_ms: i64, window_seconds: u64) -> u64 {
    let window = window_seconds as i64;
    let elapsed = (now_ms / 1000) % window;
    (window - elapsed) as u64
}
