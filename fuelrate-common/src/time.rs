//! Timestamp utilities
//!
//! All persisted timestamps are i64 Unix epoch milliseconds. Cooldown and
//! reward decisions order strictly by these values.

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Get current Unix epoch time in milliseconds
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_ms_is_recent() {
        let ts = now_ms();
        // After 2020-01-01 and before 2100-01-01
        assert!(ts > 1_577_836_800_000);
        assert!(ts < 4_102_444_800_000);
    }

    #[test]
    fn test_now_ms_matches_now() {
        let a = now().timestamp_millis();
        let b = now_ms();
        assert!((b - a) < 1_000);
    }
}
