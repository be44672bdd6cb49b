// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google ID token verification for social sign-in.
//!
//! The browser completes the Google sign-in flow and posts the resulting ID
//! token. Only the claims of a token whose signature, issuer, audience and
//! expiry check out are trusted; the email must be marked verified.

use anyhow::Context;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::header::CACHE_CONTROL;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

use crate::config::Config;
use crate::error::AppError;

const DEFAULT_JWKS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";
const GOOGLE_ISSUERS: [&str; 2] = ["https://accounts.google.com", "accounts.google.com"];
const HTTP_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
const CLOCK_SKEW_SECS: u64 = 60;

/// Profile taken from a verified ID token.
#[derive(Debug, Clone)]
pub struct VerifiedIdentity {
    pub subject: String,
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

#[derive(Debug, Clone)]
pub enum IdentityError {
    /// The token is malformed, forged, expired or for another client.
    Rejected(String),
    /// Keys could not be fetched.
    Transient(String),
    /// No OAuth client id is configured.
    Disabled,
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Rejected(reason) => {
                tracing::info!(reason = %reason, "Social sign-in token rejected");
                AppError::InvalidToken
            }
            IdentityError::Transient(reason) => AppError::UpstreamFailure(reason),
            IdentityError::Disabled => {
                AppError::Forbidden("Social sign-in is not enabled".to_string())
            }
        }
    }
}

#[derive(Clone)]
enum VerifierMode {
    Disabled,
    Google,
    StaticKey {
        kid: String,
        decoding_key: Arc<DecodingKey>,
    },
}

struct JwksCacheEntry {
    keys_by_kid: HashMap<String, Arc<DecodingKey>>,
    expires_at: Instant,
}

/// Verifier for Google-issued ID tokens.
pub struct IdentityVerifier {
    http_client: reqwest::Client,
    client_id: String,
    mode: VerifierMode,
    jwks_cache: RwLock<Option<JwksCacheEntry>>,
    refresh_lock: Mutex<()>,
}

impl IdentityVerifier {
    /// Verifier backed by Google's published keys. Social sign-in is
    /// refused when `GOOGLE_CLIENT_ID` is unset.
    pub fn google(config: &Config) -> anyhow::Result<Self> {
        let mode = match config.google_client_id {
            Some(_) => VerifierMode::Google,
            None => VerifierMode::Disabled,
        };
        Self::with_mode(config, mode)
    }

    /// Verifier with a single fixed RSA key, for local and integration tests.
    pub fn new_with_static_key(
        config: &Config,
        kid: impl Into<String>,
        decoding_key: DecodingKey,
    ) -> anyhow::Result<Self> {
        let kid = kid.into();
        if kid.trim().is_empty() {
            anyhow::bail!("static key id must not be empty");
        }
        Self::with_mode(
            config,
            VerifierMode::StaticKey {
                kid,
                decoding_key: Arc::new(decoding_key),
            },
        )
    }

    fn with_mode(config: &Config, mode: VerifierMode) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("failed building identity HTTP client")?;

        Ok(Self {
            http_client,
            client_id: config.google_client_id.clone().unwrap_or_default(),
            mode,
            jwks_cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        })
    }

    pub async fn verify(&self, id_token: &str) -> Result<VerifiedIdentity, IdentityError> {
        if matches!(self.mode, VerifierMode::Disabled) || self.client_id.is_empty() {
            return Err(IdentityError::Disabled);
        }

        let header = decode_header(id_token)
            .map_err(|e| IdentityError::Rejected(format!("invalid JWT header: {e}")))?;
        if header.alg != Algorithm::RS256 {
            return Err(IdentityError::Rejected(format!(
                "unexpected JWT alg: {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| IdentityError::Rejected("missing JWT kid".to_string()))?;
        let decoding_key = self.decoding_key_for_kid(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.set_issuer(&GOOGLE_ISSUERS);
        validation.set_audience(&[self.client_id.as_str()]);
        validation.leeway = CLOCK_SKEW_SECS;

        let claims = decode::<IdTokenClaims>(id_token, decoding_key.as_ref(), &validation)
            .map_err(|e| IdentityError::Rejected(format!("JWT validation failed: {e}")))?
            .claims;

        let email = claims
            .email
            .ok_or_else(|| IdentityError::Rejected("missing email claim".to_string()))?;
        if claims.email_verified != Some(true) {
            return Err(IdentityError::Rejected(
                "email is not verified by the provider".to_string(),
            ));
        }

        Ok(VerifiedIdentity {
            subject: claims.sub,
            email: email.trim().to_lowercase(),
            name: claims.name,
            picture: claims.picture,
        })
    }

    async fn decoding_key_for_kid(&self, kid: &str) -> Result<Arc<DecodingKey>, IdentityError> {
        if let VerifierMode::StaticKey {
            kid: static_kid,
            decoding_key,
        } = &self.mode
        {
            if kid == static_kid {
                return Ok(decoding_key.clone());
            }
            return Err(IdentityError::Rejected(format!("unknown JWT kid: {kid}")));
        }

        if let Some(key) = self.lookup_cached_key(kid).await {
            return Ok(key);
        }

        // Google rotates keys; a new kid forces one refetch
        for force_refresh in [false, true] {
            self.refresh_jwks(force_refresh).await?;
            if let Some(key) = self.lookup_cached_key(kid).await {
                return Ok(key);
            }
        }

        Err(IdentityError::Rejected(format!(
            "JWT kid not found in JWKS after refresh: {kid}"
        )))
    }

    async fn lookup_cached_key(&self, kid: &str) -> Option<Arc<DecodingKey>> {
        let cache = self.jwks_cache.read().await;
        cache
            .as_ref()
            .filter(|entry| entry.expires_at > Instant::now())
            .and_then(|entry| entry.keys_by_kid.get(kid))
            .cloned()
    }

    async fn refresh_jwks(&self, force_refresh: bool) -> Result<(), IdentityError> {
        let _guard = self.refresh_lock.lock().await;

        if !force_refresh
            && self
                .jwks_cache
                .read()
                .await
                .as_ref()
                .is_some_and(|entry| entry.expires_at > Instant::now())
        {
            return Ok(());
        }

        let response = self
            .http_client
            .get(DEFAULT_JWKS_URL)
            .send()
            .await
            .map_err(|e| IdentityError::Transient(format!("JWKS request failed: {e}")))?;
        if !response.status().is_success() {
            return Err(IdentityError::Transient(format!(
                "JWKS request returned status {}",
                response.status()
            )));
        }

        let ttl = response
            .headers()
            .get(CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_cache_control_max_age)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_CACHE_TTL);

        let jwks: Jwks = response
            .json()
            .await
            .map_err(|e| IdentityError::Transient(format!("invalid JWKS JSON: {e}")))?;

        let keys_by_kid: HashMap<_, _> = jwks
            .keys
            .into_iter()
            .filter(|jwk| jwk.kty == "RSA" && !jwk.kid.trim().is_empty())
            .filter(|jwk| jwk.alg.as_deref().map_or(true, |alg| alg == "RS256"))
            .filter_map(|jwk| match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
                Ok(key) => Some((jwk.kid, Arc::new(key))),
                Err(e) => {
                    tracing::warn!(error = %e, kid = %jwk.kid, "Skipping invalid RSA JWKS key");
                    None
                }
            })
            .collect();

        if keys_by_kid.is_empty() {
            return Err(IdentityError::Transient(
                "JWKS response did not include any usable RSA keys".to_string(),
            ));
        }

        *self.jwks_cache.write().await = Some(JwksCacheEntry {
            keys_by_kid,
            expires_at: Instant::now() + ttl,
        });
        tracing::debug!(ttl_secs = ttl.as_secs(), "Google JWKS cache refreshed");
        Ok(())
    }
}

#[derive(Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    alg: Option<String>,
    n: String,
    e: String,
}

#[derive(Deserialize)]
struct IdTokenClaims {
    sub: String,
    email: Option<String>,
    email_verified: Option<bool>,
    name: Option<String>,
    picture: Option<String>,
}

fn parse_cache_control_max_age(value: &str) -> Option<u64> {
    value
        .split(',')
        .filter_map(|directive| directive.trim().strip_prefix("max-age="))
        .find_map(|raw| raw.trim_matches('"').parse().ok())
}
