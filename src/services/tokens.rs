// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access/refresh token issuing and the session cache.
//!
//! Tokens carry only the user id. Identity and role are always resolved
//! through the session cache, and on a cache miss from the primary store,
//! never from the token body.

use crate::cache::{self, KvStore};
use crate::config::Config;
use crate::db::Database;
use crate::error::AppError;
use crate::models::SessionUser;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Why a token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("token invalid")]
    Invalid,
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AppError::TokenExpired,
            TokenError::Invalid => AppError::InvalidToken,
        }
    }
}

/// Freshly minted credentials.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

pub fn session_key(user_id: &str) -> String {
    format!("session:{}", user_id)
}

fn logout_key(user_id: &str) -> String {
    format!("logout:{}", user_id)
}

fn unix_now() -> Result<usize, AppError> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_secs() as usize)
}

/// Signs and verifies tokens and owns the session-cache entries.
#[derive(Clone)]
pub struct TokenService {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    kv: Arc<dyn KvStore>,
    db: Arc<dyn Database>,
}

impl TokenService {
    pub fn new(config: &Config, kv: Arc<dyn KvStore>, db: Arc<dyn Database>) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(&config.access_token_secret),
            access_decoding: DecodingKey::from_secret(&config.access_token_secret),
            refresh_encoding: EncodingKey::from_secret(&config.refresh_token_secret),
            refresh_decoding: DecodingKey::from_secret(&config.refresh_token_secret),
            access_ttl: config.access_token_ttl,
            refresh_ttl: config.refresh_token_ttl,
            kv,
            db,
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    // ─── Issuing ─────────────────────────────────────────────────

    /// Sign an access/refresh pair and write the session entry.
    pub async fn issue(&self, user: &SessionUser) -> Result<TokenPair, AppError> {
        let pair = self.sign_pair(&user.id)?;
        self.store_session(user).await?;
        tracing::info!(user_id = %user.id, "Session issued");
        Ok(pair)
    }

    fn sign_pair(&self, user_id: &str) -> Result<TokenPair, AppError> {
        let now = unix_now()?;
        Ok(TokenPair {
            access_token: sign(user_id, now, self.access_ttl, &self.access_encoding)?,
            refresh_token: sign(user_id, now, self.refresh_ttl, &self.refresh_encoding)?,
            access_ttl: self.access_ttl,
            refresh_ttl: self.refresh_ttl,
        })
    }

    // ─── Verification ────────────────────────────────────────────

    pub fn verify_access(&self, token: &str) -> Result<Claims, TokenError> {
        verify(token, &self.access_decoding)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        verify(token, &self.refresh_decoding)
    }

    // ─── Refresh ─────────────────────────────────────────────────

    /// Mint a new access token (and rotate the refresh token) from a
    /// refresh token, rewriting the session entry.
    ///
    /// A lapsed session entry is rebuilt from the primary store.
    pub async fn refresh(&self, refresh_token: &str) -> Result<(TokenPair, SessionUser), AppError> {
        let claims = self.verify_refresh(refresh_token)?;
        let user_id = claims.sub.as_str();

        let logged_out_at: Option<usize> =
            cache::get_json(self.kv.as_ref(), &logout_key(user_id)).await?;
        if let Some(logged_out_at) = logged_out_at {
            if claims.iat <= logged_out_at {
                tracing::info!(user_id, "Refresh token predates logout");
                return Err(AppError::InvalidToken);
            }
        }

        let user = match self.session(user_id).await? {
            Some(user) => user,
            None => {
                tracing::info!(user_id, "Session lapsed, reloading user from store");
                let user = self.db.get_user(user_id).await?.ok_or_else(|| {
                    tracing::warn!(user_id, "Refresh token for unknown user");
                    AppError::InvalidToken
                })?;
                SessionUser::from(&user)
            }
        };

        let pair = self.sign_pair(&user.id)?;
        self.store_session(&user).await?;
        tracing::debug!(user_id, "Access token refreshed");
        Ok((pair, user))
    }

    // ─── Session Cache ───────────────────────────────────────────

    pub async fn session(&self, user_id: &str) -> Result<Option<SessionUser>, AppError> {
        cache::get_json(self.kv.as_ref(), &session_key(user_id)).await
    }

    /// Write (or rewrite) the snapshot with a fresh access-token TTL.
    pub async fn store_session(&self, user: &SessionUser) -> Result<(), AppError> {
        cache::set_json(self.kv.as_ref(), &session_key(&user.id), user, self.access_ttl).await
    }

    /// Rewrite the snapshot only if the user currently has a session.
    pub async fn refresh_session_if_present(&self, user: &SessionUser) -> Result<(), AppError> {
        if self.session(&user.id).await?.is_some() {
            self.store_session(user).await?;
        }
        Ok(())
    }

    /// Drop the session and reject every refresh token issued so far.
    pub async fn revoke(&self, user_id: &str) -> Result<(), AppError> {
        self.kv.delete(&session_key(user_id)).await?;
        cache::set_json(self.kv.as_ref(), &logout_key(user_id), &unix_now()?, self.refresh_ttl)
            .await?;
        tracing::info!(user_id, "Session revoked");
        Ok(())
    }
}

fn sign(user_id: &str, now: usize, ttl: Duration, key: &EncodingKey) -> Result<String, AppError> {
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + ttl.as_secs() as usize,
    };
    encode(&Header::new(Algorithm::HS256), &claims, key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))
}

fn verify(token: &str, key: &DecodingKey) -> Result<Claims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    decode::<Claims>(token, key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid,
        })
}
