//! Login endpoint and admin authentication middleware
//!
//! Administrative routes require a bearer token resolving to an admin
//! account, or the configuration-gated dev admin sentinel. Unlike review
//! submission, failures here are hard rejections.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use fuelrate_common::auth::{
    hash_password, issue_token, resolve_identity, Identity, TOKEN_LIFETIME_MS,
};
use fuelrate_common::time;

use crate::db::accounts;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// POST /auth/login
///
/// Issues a signed token for an existing account. Account provisioning is
/// administrative; there is no self-registration endpoint.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>, AuthApiError> {
    let email = body
        .email
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AuthApiError::BadRequest("Email required".to_string()))?;
    let password = body
        .password
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AuthApiError::BadRequest("Password required".to_string()))?;

    let account = accounts::find_by_email(&state.db, email)
        .await
        .map_err(|e| AuthApiError::Database(e.to_string()))?
        .ok_or(AuthApiError::InvalidCredentials)?;

    if hash_password(password, &account.password_salt) != account.password_hash {
        warn!("Failed login attempt for {}", email);
        return Err(AuthApiError::InvalidCredentials);
    }

    let expires_ms = time::now_ms() + TOKEN_LIFETIME_MS;
    let token = issue_token(&account.guid, expires_ms, state.shared_secret);

    Ok(Json(json!({ "token": token, "account": account })))
}

/// Admin authentication middleware
///
/// Applied to /admin routes only. Resolves the bearer identity, then
/// requires either the dev admin sentinel (when enabled) or an account with
/// the admin flag.
pub async fn admin_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AuthApiError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let identity = resolve_identity(
        auth_header,
        state.shared_secret,
        state.allow_dev_admin,
        time::now_ms(),
    );

    match identity {
        Identity::DevAdmin => Ok(next.run(request).await),
        Identity::Account(account_id) => {
            let account = accounts::find_by_id(&state.db, &account_id)
                .await
                .map_err(|e| AuthApiError::Database(e.to_string()))?
                .ok_or(AuthApiError::Unauthorized)?;
            if account.is_admin {
                Ok(next.run(request).await)
            } else {
                Err(AuthApiError::Forbidden)
            }
        }
        Identity::Anonymous => Err(AuthApiError::Unauthorized),
    }
}

/// Authentication API errors
#[derive(Debug)]
pub enum AuthApiError {
    BadRequest(String),
    InvalidCredentials,
    Unauthorized,
    Forbidden,
    Database(String),
}

impl IntoResponse for AuthApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AuthApiError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string())
            }
            AuthApiError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "Authentication required".to_string())
            }
            AuthApiError::Forbidden => (StatusCode::FORBIDDEN, "Admin access required".to_string()),
            AuthApiError::Database(msg) => {
                warn!("Auth database error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error".to_string())
            }
        };

        (status, Json(json!({ "msg": message }))).into_response()
    }
}
