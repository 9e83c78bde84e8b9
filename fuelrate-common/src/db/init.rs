//! Database initialization
//!
//! Creates the database file on first run and brings the schema up
//! idempotently. Safe to call on every startup.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection pool and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL mode allows concurrent readers with one writer
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    // Bounded wait on lock contention instead of immediate SQLITE_BUSY
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes (idempotent - safe to call multiple times)
///
/// Exposed separately from [`init_database`] so tests can apply the schema to
/// an in-memory pool.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_settings_table(pool).await?;
    create_stations_table(pool).await?;
    create_accounts_table(pool).await?;
    create_reviews_table(pool).await?;
    create_coupons_table(pool).await?;
    create_account_reviews_table(pool).await?;
    Ok(())
}

/// Create the settings table
///
/// Stores application configuration key-value pairs (token signing secret).
async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the stations table
///
/// Physical retail locations, keyed internally by guid and externally by the
/// human-assigned station code.
async fn create_stations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS stations (
            guid TEXT PRIMARY KEY,
            station_code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            lat REAL,
            lon REAL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (length(station_code) > 0),
            CHECK (length(name) > 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_stations_code ON stations(station_code)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the accounts table
///
/// Registered users. The phone column cross-references review contact strings
/// for unified visit counting.
async fn create_accounts_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS accounts (
            guid TEXT PRIMARY KEY,
            email TEXT UNIQUE,
            password_hash TEXT NOT NULL,
            password_salt TEXT NOT NULL,
            phone TEXT,
            is_admin INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_accounts_phone ON accounts(phone)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the reviews table
///
/// Append-only ledger of submissions. created_at_ms is immutable and is the
/// sole ordering key for cooldown and visit-count computations. Only
/// reward_given and flagged are ever updated after insert.
async fn create_reviews_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reviews (
            guid TEXT PRIMARY KEY,
            station_id TEXT NOT NULL REFERENCES stations(guid),
            rating INTEGER NOT NULL CHECK (rating >= 1 AND rating <= 5),
            cleanliness INTEGER CHECK (cleanliness IS NULL OR (cleanliness >= 0 AND cleanliness <= 5)),
            service_speed INTEGER CHECK (service_speed IS NULL OR (service_speed >= 0 AND service_speed <= 5)),
            staff_friendliness INTEGER CHECK (staff_friendliness IS NULL OR (staff_friendliness >= 0 AND staff_friendliness <= 5)),
            comment TEXT,
            name TEXT NOT NULL CHECK (length(name) > 0),
            contact TEXT NOT NULL CHECK (length(contact) > 0),
            ip TEXT,
            device_id TEXT,
            gps TEXT,
            account_id TEXT REFERENCES accounts(guid),
            reward_given INTEGER NOT NULL DEFAULT 0,
            flagged INTEGER NOT NULL DEFAULT 0,
            created_at_ms INTEGER NOT NULL,
            CHECK (created_at_ms > 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Cooldown lookup and visit counting both key on contact + recency
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_reviews_contact_created ON reviews(contact, created_at_ms)",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_reviews_station ON reviews(station_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_reviews_account ON reviews(account_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the coupons table
///
/// One coupon per reward-eligible submission; the triggering review reference
/// is set at creation and never changes (NULL for manual administrative
/// grants). Claim workflow flips `used` and records the claimant.
async fn create_coupons_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS coupons (
            guid TEXT PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            account_id TEXT REFERENCES accounts(guid),
            review_id TEXT REFERENCES reviews(guid),
            station_id TEXT NOT NULL REFERENCES stations(guid),
            used INTEGER NOT NULL DEFAULT 0,
            used_at_ms INTEGER,
            claimed_by TEXT,
            created_at_ms INTEGER NOT NULL,
            CHECK (length(code) > 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_coupons_code ON coupons(code)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_coupons_account ON coupons(account_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_coupons_review ON coupons(review_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the account_reviews link table
///
/// Back-reference list of reviews submitted by an account. Written
/// best-effort after review insertion; the reviews.account_id column remains
/// the authoritative association.
async fn create_account_reviews_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS account_reviews (
            account_id TEXT NOT NULL REFERENCES accounts(guid) ON DELETE CASCADE,
            review_id TEXT NOT NULL REFERENCES reviews(guid) ON DELETE CASCADE,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (account_id, review_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Should open in-memory database")
    }

    #[tokio::test]
    async fn test_schema_creation_is_idempotent() {
        let pool = memory_pool().await;
        create_schema(&pool).await.expect("first pass");
        create_schema(&pool).await.expect("second pass");
    }

    #[tokio::test]
    async fn test_rating_check_constraint() {
        let pool = memory_pool().await;
        create_schema(&pool).await.unwrap();

        sqlx::query("INSERT INTO stations (guid, station_code, name) VALUES ('s1', 'A-100', 'Station A')")
            .execute(&pool)
            .await
            .unwrap();

        let result = sqlx::query(
            "INSERT INTO reviews (guid, station_id, rating, name, contact, created_at_ms)
             VALUES ('r1', 's1', 6, 'Tester', '0300', 1000)",
        )
        .execute(&pool)
        .await;

        assert!(result.is_err(), "rating 6 must violate the CHECK constraint");
    }

    #[tokio::test]
    async fn test_init_database_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("fuelrate.db");

        let pool = init_database(&db_path).await.expect("Should initialize");
        assert!(db_path.exists());

        // Schema usable after a second init on the existing file
        drop(pool);
        init_database(&db_path).await.expect("Should reopen");
    }
}
