//! Shared-secret token verification for the inbound IdP redirect.
//!
//! The IdP and this service share a secret. When the IdP interrupts a
//! login it redirects the browser here with the user id, a nonce, a hex
//! unix timestamp, and `sha256(shared_key|user_id|nonce|ts_hex)` as the
//! token. The pipe-joined format and hash choice are part of the wire
//! contract with the IdP and must stay bit-compatible.

use std::time::{SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Tokens minted up to this many seconds in the past are accepted.
const MAX_AGE_SECS: i64 = 300;
/// Tokens minted up to this many seconds in the future are accepted,
/// absorbing clock skew between the IdP and this service.
const MAX_SKEW_SECS: i64 = 900;
/// Replay-resistance floor for the public nonce.
const MIN_NONCE_LEN: usize = 16;

/// Why a token was rejected. Logged for audit, never echoed to the
/// client — the caller only sees a boolean.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthTokenError {
    #[error("timestamp is not a hexadecimal integer")]
    MalformedTimestamp,
    #[error("timestamp outside the [now-300s, now+900s] window")]
    Expired,
    #[error("nonce shorter than {MIN_NONCE_LEN} characters")]
    NonceTooShort,
    #[error("token digest mismatch")]
    Mismatch,
}

/// Compute the digest the IdP mints for a login interruption.
pub fn compute_auth_token(shared_key: &str, user_id: &str, nonce: &str, ts_hex: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{shared_key}|{user_id}|{nonce}|{ts_hex}").as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Authenticate a user arriving from the IdP.
pub fn verify_auth_token(
    shared_key: &str,
    user_id: &str,
    token: &str,
    nonce: &str,
    ts_hex: &str,
) -> bool {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    verify_auth_token_at(now, shared_key, user_id, token, nonce, ts_hex)
}

/// Clock-injectable variant of [`verify_auth_token`].
pub fn verify_auth_token_at(
    now: i64,
    shared_key: &str,
    user_id: &str,
    token: &str,
    nonce: &str,
    ts_hex: &str,
) -> bool {
    tracing::debug!(user_id, "verifying auth token");
    match check_token(now, shared_key, user_id, token, nonce, ts_hex) {
        Ok(()) => true,
        Err(reason) => {
            tracing::debug!(user_id, %reason, "auth token rejected");
            false
        }
    }
}

fn check_token(
    now: i64,
    shared_key: &str,
    user_id: &str,
    token: &str,
    nonce: &str,
    ts_hex: &str,
) -> Result<(), AuthTokenError> {
    let ts = i64::from_str_radix(ts_hex, 16).map_err(|_| AuthTokenError::MalformedTimestamp)?;
    if ts < now - MAX_AGE_SECS || ts > now + MAX_SKEW_SECS {
        return Err(AuthTokenError::Expired);
    }
    if nonce.len() < MIN_NONCE_LEN {
        return Err(AuthTokenError::NonceTooShort);
    }
    let expected = compute_auth_token(shared_key, user_id, nonce, ts_hex);
    if !constant_time_eq(expected.as_bytes(), token.as_bytes()) {
        return Err(AuthTokenError::Mismatch);
    }
    Ok(())
}

/// Constant-time comparison over equal-length inputs. A length mismatch
/// fails immediately; the digest length is public anyway.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut acc = 0u8;
    for (x, y) in a.iter().zip(b) {
        acc |= x ^ y;
    }
    acc == 0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
