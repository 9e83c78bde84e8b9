//! Database access layer for fuelrate-api
//!
//! One module per entity. All queries go through the shared pool injected via
//! `AppState`; storage failures surface verbatim as `Error::Database`.

pub mod accounts;
pub mod coupons;
pub mod reviews;
pub mod stations;
