// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Secrets are read once at startup and kept in memory for the lifetime
//! of the process.

use std::env;
use std::time::Duration;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// Deployment environment ("production" enables Secure cookies)
    pub app_env: String,
    /// GCP project ID for Firestore (in-memory store when unset)
    pub gcp_project_id: Option<String>,
    /// Redis URL for the shared key-value cache (in-memory when unset)
    pub redis_url: Option<String>,
    /// Google OAuth client id; ID tokens must carry it as audience.
    /// Social sign-in is off when unset.
    pub google_client_id: Option<String>,

    // --- Token lifetimes ---
    /// Access token lifetime; also the session-cache TTL.
    pub access_token_ttl: Duration,
    /// Refresh token lifetime.
    pub refresh_token_ttl: Duration,
    /// Activation token lifetime for pending registrations.
    pub activation_token_ttl: Duration,
    /// TTL for public course/catalog snapshots.
    pub content_cache_ttl: Duration,

    // --- Secrets ---
    /// Signing key for access tokens (raw bytes)
    pub access_token_secret: Vec<u8>,
    /// Signing key for refresh tokens (raw bytes)
    pub refresh_token_secret: Vec<u8>,
    /// Signing key for activation tokens and code digests (raw bytes)
    pub activation_secret: Vec<u8>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .unwrap_or(8000),
            app_env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            gcp_project_id: optional_var("GCP_PROJECT_ID"),
            redis_url: optional_var("REDIS_URL"),
            google_client_id: optional_var("GOOGLE_CLIENT_ID"),

            access_token_ttl: Duration::from_secs(
                parse_number("ACCESS_TOKEN_EXPIRE_MINUTES", 5)? * 60,
            ),
            refresh_token_ttl: Duration::from_secs(
                parse_number("REFRESH_TOKEN_EXPIRE_DAYS", 3)? * 24 * 60 * 60,
            ),
            activation_token_ttl: Duration::from_secs(5 * 60),
            content_cache_ttl: Duration::from_secs(parse_number("CONTENT_CACHE_TTL_SECS", 300)?),

            access_token_secret: required_secret("ACCESS_TOKEN_SECRET")?,
            refresh_token_secret: required_secret("REFRESH_TOKEN_SECRET")?,
            activation_secret: required_secret("ACTIVATION_SECRET")?,
        })
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:3000".to_string(),
            port: 8000,
            app_env: "test".to_string(),
            gcp_project_id: None,
            redis_url: None,
            google_client_id: None,
            access_token_ttl: Duration::from_secs(5 * 60),
            refresh_token_ttl: Duration::from_secs(3 * 24 * 60 * 60),
            activation_token_ttl: Duration::from_secs(5 * 60),
            content_cache_ttl: Duration::from_secs(300),
            access_token_secret: b"test_access_secret_32_bytes_min!".to_vec(),
            refresh_token_secret: b"test_refresh_secret_32_bytes_min".to_vec(),
            activation_secret: b"test_activation_secret_32_bytes!".to_vec(),
        }
    }

    /// Cookies get the `Secure` attribute only in production.
    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required_secret(name: &'static str) -> Result<Vec<u8>, ConfigError> {
    optional_var(name)
        .map(String::into_bytes)
        .ok_or(ConfigError::Missing(name))
}

fn parse_number(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match optional_var(name) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid(name)),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
