//! Row models shared across FuelRate crates
//!
//! Field names match the column names; wire names are camelCase to match the
//! client contract.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A physical retail location
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    #[serde(rename = "id")]
    pub guid: String,
    /// Human-assigned code clients submit reviews against (e.g. "A-100")
    pub station_code: String,
    pub name: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// A registered user account
///
/// The core only reads accounts; creation happens through administrative
/// provisioning. password fields never serialize.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[serde(rename = "id")]
    pub guid: String,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub password_salt: String,
    pub phone: Option<String>,
    pub is_admin: bool,
}

/// One customer submission
///
/// created_at_ms is immutable after insert and is the sole ordering key for
/// cooldown and visit-count computations. Only reward_given and flagged are
/// ever mutated.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(rename = "id")]
    pub guid: String,
    pub station_id: String,
    pub rating: i64,
    pub cleanliness: Option<i64>,
    pub service_speed: Option<i64>,
    pub staff_friendliness: Option<i64>,
    pub comment: Option<String>,
    pub name: String,
    pub contact: String,
    pub ip: Option<String>,
    pub device_id: Option<String>,
    /// Raw GPS payload as submitted (JSON text)
    pub gps: Option<String>,
    pub account_id: Option<String>,
    pub reward_given: bool,
    pub flagged: bool,
    pub created_at_ms: i64,
}

/// A reward grant with a redeemable code
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    #[serde(rename = "id")]
    pub guid: String,
    pub code: String,
    pub account_id: Option<String>,
    /// Triggering review; absent only for manual administrative grants
    pub review_id: Option<String>,
    pub station_id: String,
    pub used: bool,
    pub used_at_ms: Option<i64>,
    pub claimed_by: Option<String>,
    pub created_at_ms: i64,
}
