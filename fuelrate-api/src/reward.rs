//! Reward issuer
//!
//! Every fifth visit earns a redeemable coupon. Eligibility is recomputed
//! from ledger state on each submission rather than tracked by a stored
//! milestone pointer; that keeps the logic self-healing after manual data
//! edits.

use fuelrate_common::db::models::{Coupon, Review};
use fuelrate_common::Result;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

/// Fixed policy constant: a coupon on every fifth visit
pub const REWARD_INTERVAL: i64 = 5;

/// True exactly when the visit count sits on a reward milestone
pub fn should_issue(visit_count: i64) -> bool {
    visit_count > 0 && visit_count % REWARD_INTERVAL == 0
}

/// Visits remaining until the next milestone
///
/// On a milestone the next reward is a full interval away.
pub fn visits_until_next(visit_count: i64) -> i64 {
    let remainder = visit_count % REWARD_INTERVAL;
    if remainder == 0 {
        REWARD_INTERVAL
    } else {
        REWARD_INTERVAL - remainder
    }
}

/// Mint a coupon for a reward-eligible review and mark its reward flag
///
/// Both writes run in one transaction so a single request cannot leave a
/// coupon without the flag or vice versa. Redemption codes are freshly
/// generated UUIDs; collision probability is treated as negligible.
pub async fn issue(
    pool: &SqlitePool,
    review: &Review,
    account_id: Option<&str>,
    now_ms: i64,
) -> Result<Coupon> {
    let guid = Uuid::new_v4().to_string();
    let code = Uuid::new_v4().to_string();

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO coupons (guid, code, account_id, review_id, station_id, used, created_at_ms)
        VALUES (?, ?, ?, ?, ?, 0, ?)
        "#,
    )
    .bind(&guid)
    .bind(&code)
    .bind(account_id)
    .bind(&review.guid)
    .bind(&review.station_id)
    .bind(now_ms)
    .execute(&mut *tx)
    .await?;

    sqlx::query("UPDATE reviews SET reward_given = 1 WHERE guid = ?")
        .bind(&review.guid)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    info!(
        "Issued coupon {} for review {} (station {})",
        code, review.guid, review.station_id
    );

    Ok(Coupon {
        guid,
        code,
        account_id: account_id.map(String::from),
        review_id: Some(review.guid.clone()),
        station_id: review.station_id.clone(),
        used: false,
        used_at_ms: None,
        claimed_by: None,
        created_at_ms: now_ms,
    })
}
