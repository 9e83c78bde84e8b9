//! Coupon queries
//!
//! Coupons are minted once (reward issuance or manual administrative grant)
//! and never deleted; the claim workflow is the only mutation.

use fuelrate_common::db::models::Coupon;
use fuelrate_common::Result;
use sqlx::SqlitePool;
use uuid::Uuid;

pub async fn insert(
    pool: &SqlitePool,
    code: &str,
    account_id: Option<&str>,
    review_id: Option<&str>,
    station_id: &str,
    created_at_ms: i64,
) -> Result<Coupon> {
    let guid = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO coupons (guid, code, account_id, review_id, station_id, used, created_at_ms)
        VALUES (?, ?, ?, ?, ?, 0, ?)
        "#,
    )
    .bind(&guid)
    .bind(code)
    .bind(account_id)
    .bind(review_id)
    .bind(station_id)
    .bind(created_at_ms)
    .execute(pool)
    .await?;

    Ok(Coupon {
        guid,
        code: code.to_string(),
        account_id: account_id.map(String::from),
        review_id: review_id.map(String::from),
        station_id: station_id.to_string(),
        used: false,
        used_at_ms: None,
        claimed_by: None,
        created_at_ms,
    })
}

pub async fn find_by_code(pool: &SqlitePool, code: &str) -> Result<Option<Coupon>> {
    let coupon = sqlx::query_as::<_, Coupon>("SELECT * FROM coupons WHERE code = ?")
        .bind(code)
        .fetch_optional(pool)
        .await?;
    Ok(coupon)
}

pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Coupon>> {
    let coupons = sqlx::query_as::<_, Coupon>("SELECT * FROM coupons ORDER BY created_at_ms DESC")
        .fetch_all(pool)
        .await?;
    Ok(coupons)
}

/// Coupons linked to any of the accounts or any of the reviews, newest first
pub async fn find_for_identity(
    pool: &SqlitePool,
    account_ids: &[String],
    review_ids: &[String],
) -> Result<Vec<Coupon>> {
    if account_ids.is_empty() && review_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut clauses = Vec::new();
    if !account_ids.is_empty() {
        let placeholders = vec!["?"; account_ids.len()].join(", ");
        clauses.push(format!("account_id IN ({})", placeholders));
    }
    if !review_ids.is_empty() {
        let placeholders = vec!["?"; review_ids.len()].join(", ");
        clauses.push(format!("review_id IN ({})", placeholders));
    }

    let sql = format!(
        "SELECT * FROM coupons WHERE {} ORDER BY created_at_ms DESC",
        clauses.join(" OR ")
    );

    let mut query = sqlx::query_as::<_, Coupon>(&sql);
    for id in account_ids {
        query = query.bind(id);
    }
    for id in review_ids {
        query = query.bind(id);
    }
    let coupons = query.fetch_all(pool).await?;
    Ok(coupons)
}

/// Flip a coupon to used, recording when and by whom
pub async fn mark_used(
    pool: &SqlitePool,
    guid: &str,
    used_at_ms: i64,
    claimed_by: Option<&str>,
) -> Result<()> {
    sqlx::query("UPDATE coupons SET used = 1, used_at_ms = ?, claimed_by = ? WHERE guid = ?")
        .bind(used_at_ms)
        .bind(claimed_by)
        .bind(guid)
        .execute(pool)
        .await?;
    Ok(())
}
