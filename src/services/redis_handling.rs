//! Bearer token storage.
//!
//! Access and refresh tokens are opaque random strings kept under
//! `auth:access:<token>` / `auth:refresh:<token>` with a TTL; the value is the
//! JSON encoded [`TokenClaims`]. Logging out deletes the refresh key.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use redis::aio::MultiplexedConnection;
use serde::{Deserialize, Serialize};

use crate::config::AuthSettings;
use crate::errors::{ServiceError, ServiceResult};
use crate::types::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub user_id: i64,
    pub is_staff: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn token_key(prefix: &str, token: &str) -> String {
    format!("{prefix}:{token}")
}

async fn connect(db: &redis::Client) -> ServiceResult<MultiplexedConnection> {
    Ok(db.get_multiplexed_async_connection().await?)
}

async fn store(
    conn: &mut MultiplexedConnection,
    prefix: &str,
    claims: &TokenClaims,
    ttl_secs: u64,
) -> ServiceResult<String> {
    let token = generate_token();
    let payload = serde_json::to_string(claims)
        .map_err(|err| ServiceError::Internal(format!("Failed to encode token claims: {err}")))?;

    redis::cmd("SET")
        .arg(token_key(prefix, &token))
        .arg(payload)
        .arg("EX")
        .arg(ttl_secs)
        .query_async::<_, ()>(conn)
        .await?;

    Ok(token)
}

fn decode(payload: Option<String>) -> Option<TokenClaims> {
    payload.and_then(|json| serde_json::from_str(&json).ok())
}

pub async fn issue_tokens(db: &redis::Client, settings: &AuthSettings, claims: TokenClaims) -> ServiceResult<TokenPair> {
    let mut conn = connect(db).await?;
    let access = store(&mut conn, ACCESS_TOKEN_KEY, &claims, settings.access_ttl_secs).await?;
    let refresh = store(&mut conn, REFRESH_TOKEN_KEY, &claims, settings.refresh_ttl_secs).await?;

    Ok(TokenPair { access, refresh })
}

pub async fn resolve_access_token(db: &redis::Client, token: &str) -> ServiceResult<Option<TokenClaims>> {
    let mut conn = connect(db).await?;
    let payload: Option<String> = redis::cmd("GET")
        .arg(token_key(ACCESS_TOKEN_KEY, token))
        .query_async(&mut conn)
        .await?;

    Ok(decode(payload))
}

/// Exchanges a live refresh token for a new access token.
pub async fn refresh_access_token(db: &redis::Client, settings: &AuthSettings, refresh: &str) -> ServiceResult<String> {
    let mut conn = connect(db).await?;
    let payload: Option<String> = redis::cmd("GET")
        .arg(token_key(REFRESH_TOKEN_KEY, refresh))
        .query_async(&mut conn)
        .await?;

    match decode(payload) {
        Some(claims) => store(&mut conn, ACCESS_TOKEN_KEY, &claims, settings.access_ttl_secs).await,
        None => Err(ServiceError::Unauthorized),
    }
}

/// Returns `false` when the refresh token was unknown or already revoked.
pub async fn revoke_refresh_token(db: &redis::Client, refresh: &str) -> ServiceResult<bool> {
    let mut conn = connect(db).await?;
    let removed: i64 = redis::cmd("DEL")
        .arg(token_key(REFRESH_TOKEN_KEY, refresh))
        .query_async(&mut conn)
        .await?;

    Ok(removed > 0)
}
