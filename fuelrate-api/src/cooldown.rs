//! Cooldown gate
//!
//! A contact may submit at most one review per 18-hour trailing window,
//! globally across all stations. Earlier iterations of this policy scoped the
//! window per station and per device/IP; the final policy keys on the contact
//! string alone. Device id and IP remain stored audit fields only.

use fuelrate_common::Result;
use sqlx::SqlitePool;

use crate::db::reviews;

/// Fixed policy constant: 18 hours, not configuration surface
pub const COOLDOWN_WINDOW_MS: i64 = 18 * 60 * 60 * 1000;

/// Gate decision for a submission attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// Denied; retry hint in whole seconds, never negative
    Deny { retry_after_secs: i64 },
}

/// Decide whether a new submission from this contact is permitted at now_ms
///
/// Denies when any review with the same contact exists within the trailing
/// window, regardless of station. An empty contact allows defensively; the
/// external contract never reaches this case because contact is a required
/// field.
pub async fn check(pool: &SqlitePool, contact: &str, now_ms: i64) -> Result<Decision> {
    if contact.is_empty() {
        return Ok(Decision::Allow);
    }

    let since_ms = now_ms - COOLDOWN_WINDOW_MS;
    match reviews::find_recent_by_contact(pool, contact, since_ms).await? {
        Some(recent) => Ok(Decision::Deny {
            retry_after_secs: retry_after_secs(now_ms, recent.created_at_ms),
        }),
        None => Ok(Decision::Allow),
    }
}

/// Remaining wait until the window opens again: `window - (now - last)`,
/// clamped to zero, rounded up to whole seconds
pub fn retry_after_secs(now_ms: i64, last_created_at_ms: i64) -> i64 {
    let elapsed_ms = now_ms - last_created_at_ms;
    let remaining_ms = COOLDOWN_WINDOW_MS - elapsed_ms;
    if remaining_ms > 0 {
        (remaining_ms + 999) / 1000
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    #[test]
    fn test_retry_after_full_window() {
        // Submission one millisecond after the last one
        assert_eq!(retry_after_secs(1_000_001, 1_000_000), 64_800);
    }

    #[test]
    fn test_retry_after_partway() {
        // 10 hours elapsed of an 18 hour window leaves 8 hours
        let ten_hours = 10 * 60 * 60 * 1000;
        assert_eq!(retry_after_secs(ten_hours, 0), 8 * 60 * 60);
    }

    #[test]
    fn test_retry_after_rounds_up() {
        // 100ms remaining still reports one whole second
        assert_eq!(retry_after_secs(COOLDOWN_WINDOW_MS - 100, 0), 1);
    }

    #[test]
    fn test_retry_after_clamps_to_zero() {
        assert_eq!(retry_after_secs(COOLDOWN_WINDOW_MS, 0), 0);
        assert_eq!(retry_after_secs(COOLDOWN_WINDOW_MS + 5000, 0), 0);
    }

    async fn setup_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        fuelrate_common::db::create_schema(&pool).await.unwrap();
        sqlx::query("INSERT INTO stations (guid, station_code, name) VALUES ('s1', 'A-100', 'A')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO stations (guid, station_code, name) VALUES ('s2', 'B-200', 'B')")
            .execute(&pool)
            .await
            .unwrap();
        pool
    }

    async fn insert_review(pool: &SqlitePool, station: &str, contact: &str, created_at_ms: i64) {
        sqlx::query(
            "INSERT INTO reviews (guid, station_id, rating, name, contact, created_at_ms)
             VALUES (?, ?, 5, 'T', ?, ?)",
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(station)
        .bind(contact)
        .bind(created_at_ms)
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_allow_when_no_prior_review() {
        let pool = setup_pool().await;
        let decision = check(&pool, "555", 1_000_000).await.unwrap();
        assert_eq!(decision, Decision::Allow);
    }

    #[tokio::test]
    async fn test_deny_within_window() {
        let pool = setup_pool().await;
        let now = COOLDOWN_WINDOW_MS * 2;
        insert_review(&pool, "s1", "555", now - 1000).await;

        match check(&pool, "555", now).await.unwrap() {
            Decision::Deny { retry_after_secs } => assert_eq!(retry_after_secs, 64_799),
            other => panic!("expected deny, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_window_is_global_across_stations() {
        let pool = setup_pool().await;
        let now = COOLDOWN_WINDOW_MS * 2;
        insert_review(&pool, "s1", "555", now - 1000).await;

        // Same contact, different station: still denied
        let decision = check(&pool, "555", now).await.unwrap();
        assert!(matches!(decision, Decision::Deny { .. }));
    }

    #[tokio::test]
    async fn test_allow_after_window_expires() {
        let pool = setup_pool().await;
        let now = COOLDOWN_WINDOW_MS * 2;
        insert_review(&pool, "s1", "555", now - COOLDOWN_WINDOW_MS - 1).await;

        let decision = check(&pool, "555", now).await.unwrap();
        assert_eq!(decision, Decision::Allow);
    }

    #[tokio::test]
    async fn test_empty_contact_allows_defensively() {
        let pool = setup_pool().await;
        let decision = check(&pool, "", 1_000_000).await.unwrap();
        assert_eq!(decision, Decision::Allow);
    }
}
