//! Administrative endpoints
//!
//! All routes here sit behind the admin middleware (see api::auth). Station
//! writes, moderation flagging, and manual coupon grants are deliberate
//! administrative actions; the submission core never calls into this module.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use fuelrate_common::auth::{generate_salt, hash_password};
use fuelrate_common::time;

use crate::db::{accounts, coupons, reviews, stations};
use crate::AppState;

/// GET /admin/stats
///
/// Dashboard aggregates: totals, overall average rating, and the five best
/// and worst stations by average rating.
pub async fn stats(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AdminError> {
    let total_reviews: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews")
        .fetch_one(&state.db)
        .await
        .map_err(|e| AdminError::Database(e.to_string()))?;
    let total_stations: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stations")
        .fetch_one(&state.db)
        .await
        .map_err(|e| AdminError::Database(e.to_string()))?;
    let total_coupons: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM coupons")
        .fetch_one(&state.db)
        .await
        .map_err(|e| AdminError::Database(e.to_string()))?;
    let avg_rating: Option<f64> = sqlx::query_scalar("SELECT AVG(rating) FROM reviews")
        .fetch_one(&state.db)
        .await
        .map_err(|e| AdminError::Database(e.to_string()))?;

    let top_stations = station_ranking(&state, "DESC").await?;
    let low_stations = station_ranking(&state, "ASC").await?;

    Ok(Json(json!({
        "totalReviews": total_reviews,
        "totalStations": total_stations,
        "totalCoupons": total_coupons,
        "avgRating": avg_rating.unwrap_or(0.0),
        "topStations": top_stations,
        "lowStations": low_stations,
    })))
}

/// Five stations ranked by average rating; unreviewed stations sort last
async fn station_ranking(
    state: &AppState,
    direction: &str,
) -> Result<Vec<serde_json::Value>, AdminError> {
    let sql = format!(
        r#"
        SELECT s.guid, s.station_code, s.name, AVG(r.rating) AS avg_rating, COUNT(r.guid) AS review_count
        FROM stations s
        LEFT JOIN reviews r ON r.station_id = s.guid
        GROUP BY s.guid
        ORDER BY (avg_rating IS NULL), avg_rating {}, review_count DESC
        LIMIT 5
        "#,
        direction
    );

    let rows: Vec<(String, String, String, Option<f64>, i64)> = sqlx::query_as(&sql)
        .fetch_all(&state.db)
        .await
        .map_err(|e| AdminError::Database(e.to_string()))?;

    Ok(rows
        .into_iter()
        .map(|(guid, station_code, name, avg_rating, review_count)| {
            json!({
                "id": guid,
                "stationCode": station_code,
                "name": name,
                "avgRating": avg_rating,
                "reviewCount": review_count,
            })
        })
        .collect())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewListQuery {
    pub station_id: Option<String>,
    pub flagged: Option<bool>,
}

/// GET /admin/reviews?stationId=&flagged=
pub async fn list_reviews(
    State(state): State<AppState>,
    Query(query): Query<ReviewListQuery>,
) -> Result<Json<serde_json::Value>, AdminError> {
    let list = reviews::find_all(&state.db, query.station_id.as_deref(), query.flagged)
        .await
        .map_err(|e| AdminError::Database(e.to_string()))?;
    Ok(Json(json!(list)))
}

/// POST /admin/reviews/:id/flag
///
/// Toggles the moderation flag.
pub async fn flag_review(
    State(state): State<AppState>,
    Path(review_id): Path<String>,
) -> Result<Json<serde_json::Value>, AdminError> {
    let review = reviews::find_by_id(&state.db, &review_id)
        .await
        .map_err(|e| AdminError::Database(e.to_string()))?
        .ok_or_else(|| AdminError::NotFound("Review not found".to_string()))?;

    let flagged = !review.flagged;
    reviews::set_flagged(&state.db, &review.guid, flagged)
        .await
        .map_err(|e| AdminError::Database(e.to_string()))?;

    Ok(Json(json!({ "flagged": flagged })))
}

/// GET /admin/coupons
pub async fn list_coupons(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AdminError> {
    let list = coupons::list_all(&state.db)
        .await
        .map_err(|e| AdminError::Database(e.to_string()))?;
    Ok(Json(json!(list)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCouponRequest {
    pub account_id: Option<String>,
    pub review_id: Option<String>,
    pub station_id: Option<String>,
}

/// POST /admin/coupons
///
/// Manual coupon grant outside the reward workflow.
pub async fn create_coupon(
    State(state): State<AppState>,
    Json(body): Json<CreateCouponRequest>,
) -> Result<Json<serde_json::Value>, AdminError> {
    let account_id = body
        .account_id
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AdminError::BadRequest("accountId and stationId required".to_string()))?;
    let station_id = body
        .station_id
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AdminError::BadRequest("accountId and stationId required".to_string()))?;

    accounts::find_by_id(&state.db, account_id)
        .await
        .map_err(|e| AdminError::Database(e.to_string()))?
        .ok_or_else(|| AdminError::NotFound("Account not found".to_string()))?;
    stations::find_by_id(&state.db, station_id)
        .await
        .map_err(|e| AdminError::Database(e.to_string()))?
        .ok_or_else(|| AdminError::NotFound("Station not found".to_string()))?;
    if let Some(review_id) = body.review_id.as_deref().filter(|s| !s.is_empty()) {
        reviews::find_by_id(&state.db, review_id)
            .await
            .map_err(|e| AdminError::Database(e.to_string()))?
            .ok_or_else(|| AdminError::NotFound("Review not found".to_string()))?;
    }

    let code = Uuid::new_v4().to_string();
    let coupon = coupons::insert(
        &state.db,
        &code,
        Some(account_id),
        body.review_id.as_deref().filter(|s| !s.is_empty()),
        station_id,
        time::now_ms(),
    )
    .await
    .map_err(|e| AdminError::Database(e.to_string()))?;

    Ok(Json(json!({ "msg": "Coupon generated", "coupon": coupon })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertStationRequest {
    pub station_code: Option<String>,
    pub name: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// POST /admin/stations
///
/// Create or update a station by code. Replaces the original deployment's
/// out-of-band seeding script with a direct administrative write.
pub async fn upsert_station(
    State(state): State<AppState>,
    Json(body): Json<UpsertStationRequest>,
) -> Result<Json<serde_json::Value>, AdminError> {
    let station_code = body
        .station_code
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AdminError::BadRequest("stationCode required".to_string()))?;
    let name = body
        .name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AdminError::BadRequest("name required".to_string()))?;

    let station = stations::upsert(&state.db, station_code, name, body.lat, body.lon)
        .await
        .map_err(|e| AdminError::Database(e.to_string()))?;

    Ok(Json(json!({ "station": station })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub phone: Option<String>,
    pub is_admin: Option<bool>,
}

/// POST /admin/accounts
///
/// Administrative account provisioning. There is no self-registration; every
/// account enters the system through this endpoint.
pub async fn create_account(
    State(state): State<AppState>,
    Json(body): Json<CreateAccountRequest>,
) -> Result<Json<serde_json::Value>, AdminError> {
    let password = body
        .password
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AdminError::BadRequest("Password required".to_string()))?;
    let email = body.email.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let phone = body.phone.as_deref().map(str::trim).filter(|s| !s.is_empty());
    if email.is_none() && phone.is_none() {
        return Err(AdminError::BadRequest("Email or phone required".to_string()));
    }

    if let Some(email) = email {
        let existing = accounts::find_by_email(&state.db, email)
            .await
            .map_err(|e| AdminError::Database(e.to_string()))?;
        if existing.is_some() {
            return Err(AdminError::BadRequest("Email already registered".to_string()));
        }
    }

    let salt = generate_salt();
    let hash = hash_password(password, &salt);
    let account = accounts::insert(
        &state.db,
        email,
        &hash,
        &salt,
        phone,
        body.is_admin.unwrap_or(false),
    )
    .await
    .map_err(|e| AdminError::Database(e.to_string()))?;

    Ok(Json(json!({ "account": account })))
}

/// Administrative API errors
#[derive(Debug)]
pub enum AdminError {
    BadRequest(String),
    NotFound(String),
    Database(String),
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AdminError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AdminError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AdminError::Database(msg) => {
                warn!("Admin storage failure: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error".to_string())
            }
        };

        (status, Json(json!({ "msg": message }))).into_response()
    }
}
