//! Opaque refresh tokens.
//!
//! Clients receive 32 random bytes encoded as base64url. Only the SHA-256
//! digest is stored, so a leaked table cannot be replayed.

use argon2::password_hash::rand_core::{OsRng, RngCore};
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::database::models::NewRefreshToken;

/// A freshly minted refresh token and the record to persist for it
#[derive(Debug, Clone)]
pub struct IssuedRefreshToken {
    pub token: String,
    pub record: NewRefreshToken,
}

pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Lowercase hex SHA-256 of the token, the only form that is stored
pub fn hash_refresh_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    format!("{:x}", digest)
}

pub fn issue_refresh_token(user_id: Uuid, ttl_days: i64) -> IssuedRefreshToken {
    issue_refresh_token_at(user_id, Utc::now() + Duration::days(ttl_days))
}

fn issue_refresh_token_at(user_id: Uuid, expires_at: DateTime<Utc>) -> IssuedRefreshToken {
    let token = generate_refresh_token();
    let record = NewRefreshToken {
        user_id,
        token_hash: hash_refresh_token(&token),
        expires_at,
    };
    IssuedRefreshToken { token, record }
}
