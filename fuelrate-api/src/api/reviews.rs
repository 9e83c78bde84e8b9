//! Review submission endpoint
//!
//! `POST /reviews` runs the full submission pipeline: validate payload,
//! resolve identity (leniently, never blocking), look up the target station,
//! enforce the cooldown gate, persist the review, best-effort append the
//! account back-reference, recompute the visit count, and conditionally mint
//! a reward coupon.

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use fuelrate_common::auth::{resolve_identity, Identity};
use fuelrate_common::db::models::{Coupon, Review};
use fuelrate_common::time;

use crate::db::{accounts, reviews, stations};
use crate::{cooldown, reward, visits, AppState};

/// One field-level validation failure
#[derive(Debug, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub msg: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReviewResponse {
    pub review: Review,
    pub coupon: Option<Coupon>,
    pub visits: i64,
    pub visits_left: i64,
}

/// POST /reviews
///
/// The body arrives as loose JSON so a wrong-typed field (a float rating, a
/// numeric name) reports through the per-field validation errors rather than
/// a deserializer rejection.
pub async fn submit_review(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<SubmitReviewResponse>, ReviewError> {
    // Step 1: payload validation - reject before any side effect
    let errors = validate(&body);
    if !errors.is_empty() {
        return Err(ReviewError::Validation(errors));
    }
    let station_code = str_field(&body, "stationId").unwrap_or_default();
    let name = str_field(&body, "name").unwrap_or_default();
    let contact = str_field(&body, "contact").unwrap_or_default();
    let device_id = str_field(&body, "deviceId").map(String::from);

    // Step 2: lenient identity resolution - a stale or invalid token means
    // anonymous, never a rejection. The dev admin sentinel is ignored for
    // review submission.
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let now_ms = time::now_ms();
    let identity = resolve_identity(
        auth_header,
        state.shared_secret,
        state.allow_dev_admin,
        now_ms,
    );
    let account_id = match &identity {
        Identity::Account(id) => {
            // A verified token for a since-deleted account degrades to
            // anonymous rather than tripping foreign keys downstream.
            match accounts::find_by_id(&state.db, id).await? {
                Some(account) => Some(account.guid),
                None => {
                    warn!("Token references unknown account {}; treating as anonymous", id);
                    None
                }
            }
        }
        _ => None,
    };

    // Step 3: locate target station by code
    let station = stations::find_by_code(&state.db, station_code)
        .await?
        .ok_or(ReviewError::StationNotFound)?;

    let ip = forwarded_ip(&headers);
    info!(
        "review submit attempt: station={}, contact={}, account={:?}, ip={:?}, device={:?}",
        station.station_code, contact, account_id, ip, device_id
    );

    // Step 4: cooldown gate - global across stations, keyed on contact only
    if let cooldown::Decision::Deny { retry_after_secs } =
        cooldown::check(&state.db, contact, now_ms).await?
    {
        return Err(ReviewError::RateLimited { retry_after_secs });
    }

    // Step 5: persist the review
    let review = reviews::insert(
        &state.db,
        reviews::NewReview {
            station_id: station.guid.clone(),
            rating: int_field(&body, "rating").unwrap_or_default(),
            cleanliness: int_field(&body, "cleanliness"),
            service_speed: int_field(&body, "serviceSpeed"),
            staff_friendliness: int_field(&body, "staffFriendliness"),
            comment: str_field(&body, "comment").map(String::from),
            name: name.to_string(),
            contact: contact.to_string(),
            ip,
            device_id,
            gps: body
                .get("gps")
                .filter(|v| !v.is_null())
                .map(|v| v.to_string()),
            account_id: account_id.clone(),
            created_at_ms: now_ms,
        },
    )
    .await?;

    // Step 6: best-effort back-reference append. The review is already
    // durable, so a failure here must never fail the submission.
    if let Some(account) = &account_id {
        if let Err(e) = accounts::append_review(&state.db, account, &review.guid).await {
            warn!("Failed to append review {} to account {}: {}", review.guid, account, e);
        }
    }

    // Step 7: visit count including the just-inserted review
    let visit_count = visits::count(&state.db, contact, account_id.as_deref()).await?;

    // Step 8: reward issuance. Silently dropping an earned coupon would be a
    // correctness defect, so failures surface as a server error; the review
    // itself stays persisted either way.
    let coupon = if reward::should_issue(visit_count) {
        match reward::issue(&state.db, &review, account_id.as_deref(), now_ms).await {
            Ok(coupon) => Some(coupon),
            Err(e) => {
                error!(
                    "Reward issuance failed: station={}, contact={}, account={:?}: {}",
                    station.station_code, contact, account_id, e
                );
                return Err(ReviewError::Database(e.to_string()));
            }
        }
    } else {
        None
    };

    // The reward flag was set by the mint; reflect it in the response body
    let mut review = review;
    if coupon.is_some() {
        review.reward_given = true;
    }

    Ok(Json(SubmitReviewResponse {
        review,
        coupon,
        visits: visit_count,
        visits_left: reward::visits_until_next(visit_count),
    }))
}

/// Non-empty trimmed string field; any other type reads as absent
fn str_field<'a>(body: &'a Value, key: &str) -> Option<&'a str> {
    body.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Integer field; floats, strings, and other types read as absent
fn int_field(body: &Value, key: &str) -> Option<i64> {
    body.get(key).and_then(Value::as_i64)
}

/// Validate payload shape; returns one entry per failing field
///
/// Distinguishes a missing field from a present-but-wrong-typed one so a
/// float rating reports as out of range, not as absent.
fn validate(body: &Value) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if str_field(body, "stationId").is_none() {
        errors.push(FieldError {
            field: "stationId",
            msg: "Station code is required".to_string(),
        });
    }

    match body.get("rating") {
        None | Some(Value::Null) => errors.push(FieldError {
            field: "rating",
            msg: "Rating is required".to_string(),
        }),
        Some(value) => match value.as_i64() {
            Some(rating) if (1..=5).contains(&rating) => {}
            _ => errors.push(FieldError {
                field: "rating",
                msg: "Rating must be an integer between 1 and 5".to_string(),
            }),
        },
    }

    for field in ["cleanliness", "serviceSpeed", "staffFriendliness"] {
        match body.get(field) {
            None | Some(Value::Null) => {}
            Some(value) => match value.as_i64() {
                Some(v) if (0..=5).contains(&v) => {}
                _ => errors.push(FieldError {
                    field,
                    msg: "Sub-rating must be an integer between 0 and 5".to_string(),
                }),
            },
        }
    }

    if str_field(body, "name").is_none() {
        errors.push(FieldError {
            field: "name",
            msg: "Name is required".to_string(),
        });
    }

    if str_field(body, "contact").is_none() {
        errors.push(FieldError {
            field: "contact",
            msg: "Contact is required".to_string(),
        });
    }

    errors
}

/// Originating address from the X-Forwarded-For header (first hop)
///
/// Stored as an audit field only; plays no part in the cooldown decision.
fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Review submission errors
#[derive(Debug)]
pub enum ReviewError {
    Validation(Vec<FieldError>),
    StationNotFound,
    RateLimited { retry_after_secs: i64 },
    Database(String),
}

impl From<fuelrate_common::Error> for ReviewError {
    fn from(e: fuelrate_common::Error) -> Self {
        ReviewError::Database(e.to_string())
    }
}

impl IntoResponse for ReviewError {
    fn into_response(self) -> Response {
        match self {
            ReviewError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "errors": errors })),
            )
                .into_response(),
            ReviewError::StationNotFound => (
                StatusCode::NOT_FOUND,
                Json(json!({ "msg": "Station not found" })),
            )
                .into_response(),
            ReviewError::RateLimited { retry_after_secs } => {
                let mut response = (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(json!({
                        "msg": "Please wait 18 hours before submitting another review",
                        "retryAfter": retry_after_secs,
                    })),
                )
                    .into_response();
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
                response
            }
            ReviewError::Database(msg) => {
                error!("Review submission storage failure: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "msg": "Server error" })),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_payload() -> Value {
        json!({
            "stationId": "A-100",
            "rating": 5,
            "name": "Tester",
            "contact": "0300-1111111",
        })
    }

    #[test]
    fn test_validate_accepts_complete_payload() {
        assert!(validate(&base_payload()).is_empty());
    }

    #[test]
    fn test_validate_rating_bounds() {
        let mut payload = base_payload();
        payload["rating"] = json!(0);
        assert_eq!(validate(&payload).len(), 1);
        payload["rating"] = json!(6);
        assert_eq!(validate(&payload).len(), 1);
        payload["rating"] = json!(1);
        assert!(validate(&payload).is_empty());
        payload["rating"] = json!(5);
        assert!(validate(&payload).is_empty());
    }

    #[test]
    fn test_validate_rejects_non_integer_rating() {
        let mut payload = base_payload();
        payload["rating"] = json!(4.5);
        let errors = validate(&payload);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "rating");
        assert!(errors[0].msg.contains("integer"));

        // A string rating is a type error too, not a missing field
        payload["rating"] = json!("5");
        let errors = validate(&payload);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].msg.contains("integer"));
    }

    #[test]
    fn test_validate_subrating_bounds() {
        let mut payload = base_payload();
        payload["cleanliness"] = json!(0);
        payload["serviceSpeed"] = json!(5);
        assert!(validate(&payload).is_empty());
        payload["staffFriendliness"] = json!(6);
        let errors = validate(&payload);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "staffFriendliness");

        payload["staffFriendliness"] = json!(2.5);
        let errors = validate(&payload);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "staffFriendliness");
    }

    #[test]
    fn test_validate_collects_all_missing_fields() {
        let payload = json!({ "name": "   " });
        let errors = validate(&payload);
        assert_eq!(errors.len(), 4); // stationId, rating, name, contact
    }

    #[test]
    fn test_validate_wrong_typed_strings_read_as_missing() {
        let mut payload = base_payload();
        payload["name"] = json!(123);
        let errors = validate(&payload);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "name");
    }

    #[test]
    fn test_forwarded_ip_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());
        assert_eq!(forwarded_ip(&headers).as_deref(), Some("203.0.113.9"));

        let empty = HeaderMap::new();
        assert_eq!(forwarded_ip(&empty), None);
    }
}
