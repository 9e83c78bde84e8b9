//! Station queries

use fuelrate_common::db::models::Station;
use fuelrate_common::Result;
use sqlx::SqlitePool;
use uuid::Uuid;

pub async fn find_by_code(pool: &SqlitePool, station_code: &str) -> Result<Option<Station>> {
    let station = sqlx::query_as::<_, Station>(
        "SELECT guid, station_code, name, lat, lon FROM stations WHERE station_code = ?",
    )
    .bind(station_code)
    .fetch_optional(pool)
    .await?;
    Ok(station)
}

pub async fn find_by_id(pool: &SqlitePool, guid: &str) -> Result<Option<Station>> {
    let station = sqlx::query_as::<_, Station>(
        "SELECT guid, station_code, name, lat, lon FROM stations WHERE guid = ?",
    )
    .bind(guid)
    .fetch_optional(pool)
    .await?;
    Ok(station)
}

pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Station>> {
    let stations = sqlx::query_as::<_, Station>(
        "SELECT guid, station_code, name, lat, lon FROM stations ORDER BY station_code",
    )
    .fetch_all(pool)
    .await?;
    Ok(stations)
}

/// Create or update a station by its human-assigned code
pub async fn upsert(
    pool: &SqlitePool,
    station_code: &str,
    name: &str,
    lat: Option<f64>,
    lon: Option<f64>,
) -> Result<Station> {
    sqlx::query(
        r#"
        INSERT INTO stations (guid, station_code, name, lat, lon)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(station_code) DO UPDATE SET name = excluded.name, lat = excluded.lat, lon = excluded.lon
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(station_code)
    .bind(name)
    .bind(lat)
    .bind(lon)
    .execute(pool)
    .await?;

    // Re-read so upserts over an existing row return the original guid
    let station = find_by_code(pool, station_code)
        .await?
        .ok_or_else(|| fuelrate_common::Error::Internal("upserted station missing".to_string()))?;
    Ok(station)
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
    async fn test_upsert_preserves_guid() {
        let pool = setup_pool().await;
        let first = upsert(&pool, "A-100", "Station A", None, None).await.unwrap();
        let second = upsert(&pool, "A-100", "Station A (renamed)", Some(24.7), Some(46.6))
            .await
            .unwrap();

        assert_eq!(first.guid, second.guid);
        assert_eq!(second.name, "Station A (renamed)");

        let all = list_all(&pool).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_find_by_code_missing() {
        let pool = setup_pool().await;
        assert!(find_by_code(&pool, "NOPE").await.unwrap().is_none());
    }
}
