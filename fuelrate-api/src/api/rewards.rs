//! Reward lookup and coupon claim endpoints
//!
//! Read paths unify visit history the same way the visit counter does:
//! reviews by contact string unioned with reviews by any account sharing the
//! phone number.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use tracing::warn;

use fuelrate_common::auth::{resolve_identity, Identity};
use fuelrate_common::time;

use crate::db::{accounts, coupons, reviews, stations};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub phone: Option<String>,
}

/// GET /rewards/search?phone=...
///
/// Unified visit history for a phone number: visit count, visit list with
/// station names, coupons linked to the identity, and a profile snapshot.
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<serde_json::Value>, RewardsError> {
    let phone = query
        .phone
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| RewardsError::BadRequest("Phone required".to_string()))?;

    let account_list = accounts::find_by_phone(&state.db, phone).await?;
    let account_ids: Vec<String> = account_list.iter().map(|a| a.guid.clone()).collect();

    let visit_reviews = reviews::find_by_identity(&state.db, phone, &account_ids).await?;
    let review_ids: Vec<String> = visit_reviews.iter().map(|r| r.guid.clone()).collect();

    let coupon_list = coupons::find_for_identity(&state.db, &account_ids, &review_ids).await?;

    // Resolve station display names once per distinct station
    let mut station_names: HashMap<String, String> = HashMap::new();
    for review in &visit_reviews {
        if !station_names.contains_key(&review.station_id) {
            if let Some(station) = stations::find_by_id(&state.db, &review.station_id).await? {
                station_names.insert(review.station_id.clone(), station.name);
            }
        }
    }

    let visits_list: Vec<serde_json::Value> = visit_reviews
        .iter()
        .map(|r| {
            json!({
                "id": r.guid,
                "createdAt": r.created_at_ms,
                "station": station_names.get(&r.station_id),
                "rating": r.rating,
                "cleanliness": r.cleanliness,
                "serviceSpeed": r.service_speed,
                "staffFriendliness": r.staff_friendliness,
                "comment": r.comment,
                "name": r.name,
                "contact": r.contact,
            })
        })
        .collect();

    // Profile snapshot: latest review supplies the display identity, the
    // oldest account supplies registration details
    let latest = visit_reviews.first();
    let first_account = account_list.first();

    Ok(Json(json!({
        "visits": visit_reviews.len(),
        "visitsList": visits_list,
        "coupons": coupon_list,
        "profile": {
            "name": latest.map(|r| r.name.clone()),
            "contact": latest.map(|r| r.contact.clone()),
            "email": first_account.and_then(|a| a.email.clone()),
            "phone": first_account.and_then(|a| a.phone.clone()),
        },
    })))
}

#[derive(Debug, Deserialize)]
pub struct ProfileQuery {
    pub code: Option<String>,
}

/// GET /rewards/profile?code=...
///
/// Claimant profile for a coupon: display identity from the triggering
/// review, registration details from the owning account.
pub async fn profile(
    State(state): State<AppState>,
    Query(query): Query<ProfileQuery>,
) -> Result<Json<serde_json::Value>, RewardsError> {
    let code = query
        .code
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| RewardsError::BadRequest("Coupon code required".to_string()))?;

    let coupon = coupons::find_by_code(&state.db, code)
        .await?
        .ok_or_else(|| RewardsError::NotFound("Coupon not found".to_string()))?;

    let review = match &coupon.review_id {
        Some(id) => reviews::find_by_id(&state.db, id).await?,
        None => None,
    };
    let account = match &coupon.account_id {
        Some(id) => accounts::find_by_id(&state.db, id).await?,
        None => None,
    };

    Ok(Json(json!({
        "name": review.as_ref().map(|r| r.name.clone()),
        "contact": review.as_ref().map(|r| r.contact.clone()),
        "email": account.as_ref().and_then(|a| a.email.clone()),
        "phone": account.as_ref().and_then(|a| a.phone.clone()),
    })))
}

#[derive(Debug, Deserialize)]
pub struct CodeRequest {
    pub code: Option<String>,
}

/// POST /rewards/claim
///
/// Marks a coupon used. Requires authentication; a coupon owned by an
/// account can only be claimed by that account (or the dev admin).
pub async fn claim(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    Json(body): Json<CodeRequest>,
) -> Result<Json<serde_json::Value>, RewardsError> {
    let code = body
        .code
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| RewardsError::BadRequest("Coupon code required".to_string()))?;

    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let identity = resolve_identity(
        auth_header,
        state.shared_secret,
        state.allow_dev_admin,
        time::now_ms(),
    );
    if !identity.is_authenticated() {
        return Err(RewardsError::Unauthorized);
    }

    let coupon = coupons::find_by_code(&state.db, code)
        .await?
        .ok_or_else(|| RewardsError::NotFound("Coupon not found".to_string()))?;

    if coupon.used {
        return Err(RewardsError::AlreadyUsed);
    }

    // Ownership check: an account-bound coupon is claimable only by its owner
    if let Some(owner) = &coupon.account_id {
        let caller_owns = identity.account_id() == Some(owner.as_str());
        if !caller_owns && identity != Identity::DevAdmin {
            return Err(RewardsError::Forbidden);
        }
    }

    // Claimant display name: prefer the caller's registration details, fall
    // back to the triggering review's submitted name
    let mut claimed_by: Option<String> = None;
    if let Some(account_id) = identity.account_id() {
        if let Some(account) = accounts::find_by_id(&state.db, account_id).await? {
            claimed_by = account.email.or(account.phone);
        }
    }
    if claimed_by.is_none() {
        if let Some(review_id) = &coupon.review_id {
            if let Some(review) = reviews::find_by_id(&state.db, review_id).await? {
                claimed_by = Some(review.name);
            }
        }
    }

    coupons::mark_used(&state.db, &coupon.guid, time::now_ms(), claimed_by.as_deref()).await?;

    let updated = coupons::find_by_code(&state.db, code)
        .await?
        .ok_or_else(|| RewardsError::NotFound("Coupon not found".to_string()))?;

    Ok(Json(json!({ "msg": "Coupon claimed", "coupon": updated })))
}

/// POST /rewards/scan
///
/// Coupon lookup by code for scanner clients; no authentication, returns
/// status plus a friendly station name.
pub async fn scan(
    State(state): State<AppState>,
    Json(body): Json<CodeRequest>,
) -> Result<Json<serde_json::Value>, RewardsError> {
    let code = body
        .code
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| RewardsError::BadRequest("Coupon code required".to_string()))?;

    let coupon = coupons::find_by_code(&state.db, code)
        .await?
        .ok_or_else(|| RewardsError::NotFound("Coupon not found".to_string()))?;

    let station_name = stations::find_by_id(&state.db, &coupon.station_id)
        .await?
        .map(|s| s.name);

    Ok(Json(json!({
        "code": coupon.code,
        "used": coupon.used,
        "station": station_name,
        "coupon": coupon,
    })))
}

/// Reward API errors
#[derive(Debug)]
pub enum RewardsError {
    BadRequest(String),
    NotFound(String),
    AlreadyUsed,
    Unauthorized,
    Forbidden,
    Database(String),
}

impl From<fuelrate_common::Error> for RewardsError {
    fn from(e: fuelrate_common::Error) -> Self {
        RewardsError::Database(e.to_string())
    }
}

impl IntoResponse for RewardsError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            RewardsError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            RewardsError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            RewardsError::AlreadyUsed => {
                (StatusCode::BAD_REQUEST, "Coupon already used".to_string())
            }
            RewardsError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "Authentication required".to_string())
            }
            RewardsError::Forbidden => (
                StatusCode::FORBIDDEN,
                "You are not authorized to claim this coupon".to_string(),
            ),
            RewardsError::Database(msg) => {
                warn!("Rewards storage failure: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error".to_string())
            }
        };

        (status, Json(json!({ "msg": message }))).into_response()
    }
}
