//! Public station read endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::warn;

use crate::db::stations;
use crate::AppState;

/// GET /stations
pub async fn list(State(state): State<AppState>) -> Result<Json<serde_json::Value>, StationError> {
    let list = stations::list_all(&state.db)
        .await
        .map_err(|e| StationError::Database(e.to_string()))?;
    Ok(Json(json!(list)))
}

/// GET /stations/:code
///
/// Lookup by the human-assigned station code, the same key review
/// submissions carry.
pub async fn get_by_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<serde_json::Value>, StationError> {
    let station = stations::find_by_code(&state.db, &code)
        .await
        .map_err(|e| StationError::Database(e.to_string()))?
        .ok_or(StationError::NotFound)?;
    Ok(Json(json!(station)))
}

/// Station read errors
#[derive(Debug)]
pub enum StationError {
    NotFound,
    Database(String),
}

impl IntoResponse for StationError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            StationError::NotFound => (StatusCode::NOT_FOUND, "Station not found".to_string()),
            StationError::Database(msg) => {
                warn!("Station storage failure: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error".to_string())
            }
        };

        (status, Json(json!({ "msg": message }))).into_response()
    }
}
