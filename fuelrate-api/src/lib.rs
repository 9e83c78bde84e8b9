//! fuelrate-api library - review submission and loyalty reward service
//!
//! HTTP backend for the FuelRate station review program: anonymous-friendly
//! review submission with an 18-hour cooldown, visit counting across contact
//! and account identities, and a coupon on every fifth visit.

use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod cooldown;
pub mod db;
pub mod reward;
pub mod visits;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Token signing secret (0 disables token verification)
    pub shared_secret: i64,
    /// Honor the dev admin bearer sentinel
    pub allow_dev_admin: bool,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, shared_secret: i64, allow_dev_admin: bool) -> Self {
        Self {
            db,
            shared_secret,
            allow_dev_admin,
        }
    }
}

/// Build application router
///
/// Admin routes sit behind the admin middleware; everything else is public.
/// Review submission handles its own (lenient) identity resolution.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};

    let admin = Router::new()
        .route("/admin/stats", get(api::admin::stats))
        .route("/admin/reviews", get(api::admin::list_reviews))
        .route("/admin/reviews/:id/flag", post(api::admin::flag_review))
        .route("/admin/coupons", get(api::admin::list_coupons))
        .route("/admin/coupons", post(api::admin::create_coupon))
        .route("/admin/stations", post(api::admin::upsert_station))
        .route("/admin/accounts", post(api::admin::create_account))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::admin_middleware,
        ));

    let public = Router::new()
        .route("/reviews", post(api::submit_review))
        .route("/stations", get(api::stations::list))
        .route("/stations/:code", get(api::stations::get_by_code))
        .route("/auth/login", post(api::auth::login))
        .route("/rewards/search", get(api::rewards::search))
        .route("/rewards/profile", get(api::rewards::profile))
        .route("/rewards/claim", post(api::rewards::claim))
        .route("/rewards/scan", post(api::rewards::scan))
        .merge(api::health_routes());

    Router::new()
        .merge(admin)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
