//! HTTP API handlers for fuelrate-api

pub mod admin;
pub mod auth;
pub mod health;
pub mod reviews;
pub mod rewards;
pub mod stations;

pub use auth::admin_middleware;
pub use health::health_routes;
pub use reviews::submit_review;
