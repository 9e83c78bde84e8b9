//! Token authentication primitives and identity resolution
//!
//! Tokens are `"{account_guid}.{expires_ms}.{sig}"` where `sig` is the hex
//! SHA-256 of `"{account_guid}.{expires_ms}.{secret}"`. The signing secret is
//! an i64 stored in the `settings` table and generated on first use; a secret
//! of 0 means no token can verify.
//!
//! Identity resolution is deliberately lenient: a missing, malformed, expired,
//! or wrongly-signed token degrades to [`Identity::Anonymous`] rather than
//! rejecting the request. Anonymous review submission must keep working even
//! when a client carries a stale stored token, so this must not be tightened
//! into a hard failure.

use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use tracing::warn;

use crate::{Error, Result};

/// Hardcoded development/administrative bearer value
///
/// Only honored when the service is configured with `allow_dev_admin`.
pub const DEV_ADMIN_TOKEN: &str = "dev-admin-token";

/// Default token lifetime: 7 days
pub const TOKEN_LIFETIME_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// Resolved request identity
///
/// Resolution never fails; every parse or verification problem collapses to
/// `Anonymous`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// No usable credential presented
    Anonymous,
    /// The development admin sentinel (configuration-gated)
    DevAdmin,
    /// A verified account, by guid
    Account(String),
}

impl Identity {
    /// Account guid, if this identity resolved to a stored account
    pub fn account_id(&self) -> Option<&str> {
        match self {
            Identity::Account(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Identity::Anonymous)
    }
}

/// Resolve an optional raw `Authorization` header value to an identity
///
/// Accepts the value with or without a `Bearer ` prefix. Empty strings,
/// whitespace, and the literal strings "null"/"undefined" are treated as no
/// token (clients with empty local storage send these).
pub fn resolve_identity(
    raw_header: Option<&str>,
    secret: i64,
    allow_dev_admin: bool,
    now_ms: i64,
) -> Identity {
    let raw = raw_header.unwrap_or("");
    let token = strip_bearer(raw);

    if token.is_empty()
        || token.eq_ignore_ascii_case("null")
        || token.eq_ignore_ascii_case("undefined")
    {
        return Identity::Anonymous;
    }

    if token == DEV_ADMIN_TOKEN {
        if allow_dev_admin {
            return Identity::DevAdmin;
        }
        warn!("dev-admin-token presented but not enabled; treating as anonymous");
        return Identity::Anonymous;
    }

    match verify_token(token, secret, now_ms) {
        Some(account_id) => Identity::Account(account_id),
        None => Identity::Anonymous,
    }
}

/// Strip a case-insensitive `Bearer ` prefix and surrounding whitespace
///
/// Uses a checked slice so a multi-byte character straddling the prefix
/// boundary cannot panic; resolution must never fail on any input.
fn strip_bearer(raw: &str) -> &str {
    let trimmed = raw.trim();
    match trimmed.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("bearer ") => trimmed[7..].trim(),
        _ => trimmed,
    }
}

/// Mint a signed token for an account
pub fn issue_token(account_id: &str, expires_ms: i64, secret: i64) -> String {
    let sig = token_signature(account_id, expires_ms, secret);
    format!("{}.{}.{}", account_id, expires_ms, sig)
}

/// Verify a token; returns the account guid on success
///
/// Fails (returns None) when the secret is 0, the token shape is wrong, the
/// signature does not match, or the expiry has passed.
pub fn verify_token(token: &str, secret: i64, now_ms: i64) -> Option<String> {
    if secret == 0 {
        return None;
    }

    // Token shape: account_guid.expires_ms.signature
    // The guid itself contains no '.', so rsplit twice is unambiguous.
    let mut parts = token.rsplitn(3, '.');
    let sig = parts.next()?;
    let expires_str = parts.next()?;
    let account_id = parts.next()?;

    if account_id.is_empty() {
        return None;
    }

    let expires_ms: i64 = expires_str.parse().ok()?;
    if expires_ms <= now_ms {
        return None;
    }

    let expected = token_signature(account_id, expires_ms, secret);
    if sig != expected {
        return None;
    }

    Some(account_id.to_string())
}

fn token_signature(account_id: &str, expires_ms: i64, secret: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}.{}.{}", account_id, expires_ms, secret));
    hex_encode(&hasher.finalize())
}

// ========================================
// Shared Secret Management
// ========================================

/// Load the token signing secret from the settings table
///
/// Generates and stores a random non-zero secret on first use.
pub async fn load_shared_secret(db: &SqlitePool) -> Result<i64> {
    let result: Option<(String,)> =
        sqlx::query_as("SELECT value FROM settings WHERE key = 'api_shared_secret'")
            .fetch_optional(db)
            .await?;

    match result {
        Some((value,)) => value
            .parse::<i64>()
            .map_err(|e| Error::Config(format!("Invalid api_shared_secret: {}", e))),
        None => initialize_shared_secret(db).await,
    }
}

/// Generate and persist a fresh non-zero secret
async fn initialize_shared_secret(db: &SqlitePool) -> Result<i64> {
    let mut rng = rand::thread_rng();
    let mut secret: i64 = 0;
    while secret == 0 {
        secret = rng.gen();
    }

    // INSERT OR IGNORE handles concurrent initialization; re-read afterwards
    // so every caller agrees on the stored value.
    sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES ('api_shared_secret', ?)")
        .bind(secret.to_string())
        .execute(db)
        .await?;

    let (value,): (String,) =
        sqlx::query_as("SELECT value FROM settings WHERE key = 'api_shared_secret'")
            .fetch_one(db)
            .await?;

    value
        .parse::<i64>()
        .map_err(|e| Error::Config(format!("Invalid api_shared_secret: {}", e)))
}

// ========================================
// Password Hashing
// ========================================

/// Hash a password with its salt (hex SHA-256)
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex_encode(&hasher.finalize())
}

/// Generate a random 16-byte hex salt
pub fn generate_salt() -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    hex_encode(&bytes)
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: i64 = 0x1234_5678_9abc_def0;
    const NOW: i64 = 1_700_000_000_000;

    #[test]
    fn test_token_round_trip() {
        let token = issue_token("acc-guid-1234", NOW + 1000, SECRET);
        assert_eq!(
            verify_token(&token, SECRET, NOW),
            Some("acc-guid-1234".to_string())
        );
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = issue_token("acc-guid-1234", NOW - 1, SECRET);
        assert_eq!(verify_token(&token, SECRET, NOW), None);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issue_token("acc-guid-1234", NOW + 1000, SECRET);
        assert_eq!(verify_token(&token, SECRET + 1, NOW), None);
    }

    #[test]
    fn test_zero_secret_never_verifies() {
        let token = issue_token("acc-guid-1234", NOW + 1000, 0);
        assert_eq!(verify_token(&token, 0, NOW), None);
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        assert_eq!(verify_token("", SECRET, NOW), None);
        assert_eq!(verify_token("just-a-string", SECRET, NOW), None);
        assert_eq!(verify_token("a.b.c", SECRET, NOW), None);
        assert_eq!(verify_token(".123.abc", SECRET, NOW), None);
    }

    #[test]
    fn test_resolve_no_header_is_anonymous() {
        assert_eq!(resolve_identity(None, SECRET, false, NOW), Identity::Anonymous);
        assert_eq!(
            resolve_identity(Some(""), SECRET, false, NOW),
            Identity::Anonymous
        );
        assert_eq!(
            resolve_identity(Some("   "), SECRET, false, NOW),
            Identity::Anonymous
        );
    }

    #[test]
    fn test_resolve_literal_null_is_anonymous() {
        // localStorage containing the literal string 'null' is a common
        // client bug; treat it as no token.
        assert_eq!(
            resolve_identity(Some("null"), SECRET, false, NOW),
            Identity::Anonymous
        );
        assert_eq!(
            resolve_identity(Some("Bearer undefined"), SECRET, false, NOW),
            Identity::Anonymous
        );
    }

    #[test]
    fn test_resolve_invalid_token_is_anonymous() {
        assert_eq!(
            resolve_identity(Some("Bearer garbage"), SECRET, false, NOW),
            Identity::Anonymous
        );
    }

    #[test]
    fn test_resolve_multibyte_header_does_not_panic() {
        // "abcdefé" puts a two-byte character across the 7-byte prefix
        // boundary; resolution must degrade to anonymous, not panic
        assert_eq!(
            resolve_identity(Some("abcdefé-token"), SECRET, false, NOW),
            Identity::Anonymous
        );
        assert_eq!(
            resolve_identity(Some("béarer x"), SECRET, false, NOW),
            Identity::Anonymous
        );
    }

    #[test]
    fn test_resolve_valid_token() {
        let token = issue_token("acc-guid-1234", NOW + 1000, SECRET);
        let header = format!("Bearer {}", token);
        assert_eq!(
            resolve_identity(Some(&header), SECRET, false, NOW),
            Identity::Account("acc-guid-1234".to_string())
        );
        // Also accepted without the Bearer prefix
        assert_eq!(
            resolve_identity(Some(&token), SECRET, false, NOW),
            Identity::Account("acc-guid-1234".to_string())
        );
    }

    #[test]
    fn test_dev_admin_token_gated() {
        assert_eq!(
            resolve_identity(Some("Bearer dev-admin-token"), SECRET, true, NOW),
            Identity::DevAdmin
        );
        // Disabled by default: sentinel degrades to anonymous
        assert_eq!(
            resolve_identity(Some("Bearer dev-admin-token"), SECRET, false, NOW),
            Identity::Anonymous
        );
    }

    #[test]
    fn test_password_hash_depends_on_salt() {
        let h1 = hash_password("secret", "salt-a");
        let h2 = hash_password("secret", "salt-b");
        assert_ne!(h1, h2);
        assert_eq!(h1, hash_password("secret", "salt-a"));
        assert_eq!(h1.len(), 64);
    }
}
