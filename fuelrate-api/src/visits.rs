//! Visit counter
//!
//! Counts real-world visits by a person, not database identities: a customer
//! may submit anonymously on one visit and authenticated on another, or own
//! multiple accounts registered with one phone number. The count unions the
//! contact string with every account sharing that phone, deduplicated at the
//! query level.

use fuelrate_common::Result;
use sqlx::SqlitePool;

use crate::db::{accounts, reviews};

/// Total visits attributable to the identity, including the just-inserted
/// review (callers invoke this after persistence, so the minimum is 1)
pub async fn count(pool: &SqlitePool, contact: &str, resolved_account_id: Option<&str>) -> Result<i64> {
    // Every account registered with this phone, not just the resolved one;
    // legacy and alternate accounts sharing a number belong to the same
    // visit history.
    let mut account_ids = accounts::find_ids_by_phone(pool, contact).await?;

    if let Some(account_id) = resolved_account_id {
        if !account_ids.iter().any(|id| id == account_id) {
            account_ids.push(account_id.to_string());
        }
    }

    reviews::count_by_identity(pool, contact, &account_ids).await
}
