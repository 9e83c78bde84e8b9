//! Review ledger queries
//!
//! The reviews table is append-only: rows are inserted once and only the
//! reward_given and flagged columns are ever updated. created_at_ms ordering
//! drives both cooldown enforcement and visit counting.

use fuelrate_common::db::models::Review;
use fuelrate_common::Result;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Fields of a review prior to insertion
#[derive(Debug, Clone)]
pub struct NewReview {
    pub station_id: String,
    pub rating: i64,
    pub cleanliness: Option<i64>,
    pub service_speed: Option<i64>,
    pub staff_friendliness: Option<i64>,
    pub comment: Option<String>,
    pub name: String,
    pub contact: String,
    pub ip: Option<String>,
    pub device_id: Option<String>,
    pub gps: Option<String>,
    pub account_id: Option<String>,
    pub created_at_ms: i64,
}

/// Insert a review, assigning its guid
///
/// No retries; storage failures surface verbatim.
pub async fn insert(pool: &SqlitePool, new: NewReview) -> Result<Review> {
    let guid = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO reviews (
            guid, station_id, rating, cleanliness, service_speed,
            staff_friendliness, comment, name, contact, ip, device_id, gps,
            account_id, reward_given, flagged, created_at_ms
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, 0, ?)
        "#,
    )
    .bind(&guid)
    .bind(&new.station_id)
    .bind(new.rating)
    .bind(new.cleanliness)
    .bind(new.service_speed)
    .bind(new.staff_friendliness)
    .bind(&new.comment)
    .bind(&new.name)
    .bind(&new.contact)
    .bind(&new.ip)
    .bind(&new.device_id)
    .bind(&new.gps)
    .bind(&new.account_id)
    .bind(new.created_at_ms)
    .execute(pool)
    .await?;

    Ok(Review {
        guid,
        station_id: new.station_id,
        rating: new.rating,
        cleanliness: new.cleanliness,
        service_speed: new.service_speed,
        staff_friendliness: new.staff_friendliness,
        comment: new.comment,
        name: new.name,
        contact: new.contact,
        ip: new.ip,
        device_id: new.device_id,
        gps: new.gps,
        account_id: new.account_id,
        reward_given: false,
        flagged: false,
        created_at_ms: new.created_at_ms,
    })
}

pub async fn find_by_id(pool: &SqlitePool, guid: &str) -> Result<Option<Review>> {
    let review = sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE guid = ?")
        .bind(guid)
        .fetch_optional(pool)
        .await?;
    Ok(review)
}

/// Most recent review with the given contact at or after since_ms, or None
pub async fn find_recent_by_contact(
    pool: &SqlitePool,
    contact: &str,
    since_ms: i64,
) -> Result<Option<Review>> {
    let review = sqlx::query_as::<_, Review>(
        r#"
        SELECT * FROM reviews
        WHERE contact = ? AND created_at_ms >= ?
        ORDER BY created_at_ms DESC
        LIMIT 1
        "#,
    )
    .bind(contact)
    .bind(since_ms)
    .fetch_optional(pool)
    .await?;
    Ok(review)
}

/// Set-union count: reviews matching the contact string OR any of the
/// account ids. A review matching on both dimensions counts once.
pub async fn count_by_identity(
    pool: &SqlitePool,
    contact: &str,
    account_ids: &[String],
) -> Result<i64> {
    let sql = identity_sql("SELECT COUNT(*) FROM reviews", account_ids.len());
    let mut query = sqlx::query_scalar::<_, i64>(&sql).bind(contact);
    for id in account_ids {
        query = query.bind(id);
    }
    let count = query.fetch_one(pool).await?;
    Ok(count)
}

/// All reviews attributable to the identity, newest first
pub async fn find_by_identity(
    pool: &SqlitePool,
    contact: &str,
    account_ids: &[String],
) -> Result<Vec<Review>> {
    let sql = format!(
        "{} ORDER BY created_at_ms DESC",
        identity_sql("SELECT * FROM reviews", account_ids.len())
    );
    let mut query = sqlx::query_as::<_, Review>(&sql).bind(contact);
    for id in account_ids {
        query = query.bind(id);
    }
    let reviews = query.fetch_all(pool).await?;
    Ok(reviews)
}

/// Build the identity-union WHERE clause with the right placeholder count
fn identity_sql(select: &str, id_count: usize) -> String {
    if id_count == 0 {
        format!("{} WHERE contact = ?", select)
    } else {
        let placeholders = vec!["?"; id_count].join(", ");
        format!(
            "{} WHERE contact = ? OR account_id IN ({})",
            select, placeholders
        )
    }
}

/// Administrative listing with optional station/flagged filters, newest first
pub async fn find_all(
    pool: &SqlitePool,
    station_id: Option<&str>,
    flagged: Option<bool>,
) -> Result<Vec<Review>> {
    let mut sql = String::from("SELECT * FROM reviews WHERE 1=1");
    if station_id.is_some() {
        sql.push_str(" AND station_id = ?");
    }
    if flagged.is_some() {
        sql.push_str(" AND flagged = ?");
    }
    sql.push_str(" ORDER BY created_at_ms DESC");

    let mut query = sqlx::query_as::<_, Review>(&sql);
    if let Some(station) = station_id {
        query = query.bind(station);
    }
    if let Some(flag) = flagged {
        query = query.bind(flag);
    }
    let reviews = query.fetch_all(pool).await?;
    Ok(reviews)
}

/// Set the moderation flag
pub async fn set_flagged(pool: &SqlitePool, guid: &str, flagged: bool) -> Result<()> {
    sqlx::query("UPDATE reviews SET flagged = ? WHERE guid = ?")
        .bind(flagged)
        .bind(guid)
        .execute(pool)
        .await?;
    Ok(())
}
