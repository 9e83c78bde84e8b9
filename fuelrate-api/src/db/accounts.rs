//! Account queries
//!
//! The submission core only reads accounts; writes are limited to the
//! best-effort review back-reference and administrative provisioning.

use fuelrate_common::db::models::Account;
use fuelrate_common::Result;
use sqlx::SqlitePool;
use uuid::Uuid;

pub async fn find_by_id(pool: &SqlitePool, guid: &str) -> Result<Option<Account>> {
    let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE guid = ?")
        .bind(guid)
        .fetch_optional(pool)
        .await?;
    Ok(account)
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<Account>> {
    let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(account)
}

/// All accounts sharing a contact phone, oldest first
///
/// A customer may own several accounts registered with one phone number;
/// visit counting unifies them.
pub async fn find_by_phone(pool: &SqlitePool, phone: &str) -> Result<Vec<Account>> {
    let accounts =
        sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE phone = ? ORDER BY created_at")
            .bind(phone)
            .fetch_all(pool)
            .await?;
    Ok(accounts)
}

/// Guids of all accounts whose stored phone equals the given contact string
pub async fn find_ids_by_phone(pool: &SqlitePool, phone: &str) -> Result<Vec<String>> {
    let ids: Vec<(String,)> = sqlx::query_as("SELECT guid FROM accounts WHERE phone = ?")
        .bind(phone)
        .fetch_all(pool)
        .await?;
    Ok(ids.into_iter().map(|(guid,)| guid).collect())
}

/// Append a review to the account's back-reference list
///
/// Callers treat failures as non-fatal; the review row itself is already
/// durable and carries the authoritative account_id.
pub async fn append_review(pool: &SqlitePool, account_id: &str, review_id: &str) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO account_reviews (account_id, review_id) VALUES (?, ?)")
        .bind(account_id)
        .bind(review_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Create an account (administrative provisioning)
pub async fn insert(
    pool: &SqlitePool,
    email: Option<&str>,
    password_hash: &str,
    password_salt: &str,
    phone: Option<&str>,
    is_admin: bool,
) -> Result<Account> {
    let guid = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO accounts (guid, email, password_hash, password_salt, phone, is_admin)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&guid)
    .bind(email)
    .bind(password_hash)
    .bind(password_salt)
    .bind(phone)
    .bind(is_admin)
    .execute(pool)
    .await?;

    Ok(Account {
        guid,
        email: email.map(String::from),
        password_hash: password_hash.to_string(),
        password_salt: password_salt.to_string(),
        phone: phone.map(String::from),
        is_admin,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        fuelrate_common::db::create_schema(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_find_ids_by_phone() {
        let pool = setup_pool().await;
        let a = insert(&pool, Some("a@example.com"), "h", "s", Some("555"), false)
            .await
            .unwrap();
        let b = insert(&pool, Some("b@example.com"), "h", "s", Some("555"), false)
            .await
            .unwrap();
        insert(&pool, Some("c@example.com"), "h", "s", Some("999"), false)
            .await
            .unwrap();

        let ids = find_ids_by_phone(&pool, "555").await.unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&a.guid));
        assert!(ids.contains(&b.guid));
    }

    #[tokio::test]
    async fn test_append_review_is_idempotent() {
        let pool = setup_pool().await;
        let account = insert(&pool, None, "h", "s", Some("555"), false).await.unwrap();

        sqlx::query("INSERT INTO stations (guid, station_code, name) VALUES ('s1', 'A-100', 'A')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO reviews (guid, station_id, rating, name, contact, created_at_ms)
             VALUES ('r1', 's1', 5, 'T', '555', 1000)",
        )
        .execute(&pool)
        .await
        .unwrap();

        append_review(&pool, &account.guid, "r1").await.unwrap();
        append_review(&pool, &account.guid, "r1").await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM account_reviews")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
