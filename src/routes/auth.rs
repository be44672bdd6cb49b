// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Registration, login and session lifecycle routes.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use validator::Validate;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::middleware::auth::{AuthUser, ACCESS_COOKIE, REFRESH_COOKIE};
use crate::models::{SessionUser, User};
use crate::routes::{api_path, MessageResponse, ValidJson};
use crate::services::password::{hash_password, verify_password};
use crate::services::{Mail, PendingRegistration, TokenPair};
use crate::time_utils::now_rfc3339;
use crate::AppState;

/// Routes reachable without a session.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(&api_path("/registration"), post(registration))
        .route(&api_path("/activate-user"), post(activate_user))
        .route(&api_path("/login"), post(login))
        .route(&api_path("/social-auth"), post(social_auth))
        .route(&api_path("/refresh"), post(refresh))
}

/// Routes that need an authenticated session.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(&api_path("/logout"), post(logout))
        .route(&api_path("/me"), get(me))
}

// ─── Cookies ─────────────────────────────────────────────────

fn token_cookie(config: &Config, name: &'static str, value: String, ttl: Duration) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.is_production())
        .path("/")
        .max_age(time::Duration::seconds(ttl.as_secs() as i64))
        .build()
}

fn expired_cookie(config: &Config, name: &'static str) -> Cookie<'static> {
    token_cookie(config, name, String::new(), Duration::ZERO)
}

/// Body returned whenever a new session is established.
#[derive(Serialize)]
pub struct SessionResponse {
    pub success: bool,
    pub user: SessionUser,
    pub access_token: String,
}

fn session_response(
    config: &Config,
    jar: CookieJar,
    pair: TokenPair,
    user: SessionUser,
) -> (CookieJar, Json<SessionResponse>) {
    let jar = jar
        .add(token_cookie(
            config,
            ACCESS_COOKIE,
            pair.access_token.clone(),
            pair.access_ttl,
        ))
        .add(token_cookie(
            config,
            REFRESH_COOKIE,
            pair.refresh_token,
            pair.refresh_ttl,
        ));

    (
        jar,
        Json(SessionResponse {
            success: true,
            user,
            access_token: pair.access_token,
        }),
    )
}

/// Argon2 is deliberately slow; keep it off the async workers.
async fn hash_blocking(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Hashing task failed: {}", e)))?
        .map_err(AppError::Internal)
}

async fn verify_blocking(password: String, hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Verify task failed: {}", e)))?
        .map_err(AppError::Internal)
}

// ─── Registration ────────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct RegistrationRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, max = 128))]
    pub password: String,
}

#[derive(Serialize)]
pub struct RegistrationResponse {
    pub success: bool,
    pub message: String,
    pub activation_token: String,
}

/// Start two-phase registration: no account or session exists until the
/// mailed code comes back through `/activate-user`.
async fn registration(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<RegistrationRequest>,
) -> Result<(StatusCode, Json<RegistrationResponse>)> {
    let email = req.email.trim().to_lowercase();
    if state.db.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::Validation("Email already exists".to_string()));
    }

    let pending = PendingRegistration {
        name: req.name.trim().to_string(),
        email: email.clone(),
        password_hash: hash_blocking(req.password).await?,
    };
    let activation = state.activation.issue(pending)?;

    state
        .notifier
        .mailer()
        .send(Mail {
            to: email.clone(),
            subject: "Activate your account".to_string(),
            body: format!(
                "Hi {}, your activation code is {}. It expires in {} minutes.",
                req.name.trim(),
                activation.code,
                state.config.activation_token_ttl.as_secs() / 60
            ),
        })
        .await?;

    tracing::info!(email = %email, "Registration pending activation");

    Ok((
        StatusCode::CREATED,
        Json(RegistrationResponse {
            success: true,
            message: format!("Please check your email: {} to activate your account!", email),
            activation_token: activation.token,
        }),
    ))
}

#[derive(Deserialize, Validate)]
pub struct ActivationRequest {
    #[validate(length(min = 1))]
    pub activation_token: String,
    #[validate(length(min = 4, max = 4))]
    pub activation_code: String,
}

async fn activate_user(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    ValidJson(req): ValidJson<ActivationRequest>,
) -> Result<(StatusCode, CookieJar, Json<SessionResponse>)> {
    let pending = state
        .activation
        .verify(&req.activation_token, &req.activation_code)
        .await?;

    let mut user = User::new(
        pending.name,
        pending.email,
        Some(pending.password_hash),
        &now_rfc3339(),
    );
    user.is_verified = true;
    state.db.insert_user(&user).await?;
    tracing::info!(user_id = %user.id, "User activated");

    let session = SessionUser::from(&user);
    let pair = state.tokens.issue(&session).await?;
    let (jar, body) = session_response(&state.config, jar, pair, session);
    Ok((StatusCode::CREATED, jar, body))
}

// ─── Login ───────────────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    ValidJson(req): ValidJson<LoginRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let invalid = || AppError::Validation("Invalid email or password".to_string());

    let email = req.email.trim().to_lowercase();
    let user = state
        .db
        .find_user_by_email(&email)
        .await?
        .ok_or_else(invalid)?;
    let hash = user.password_hash.clone().ok_or_else(invalid)?;

    if !verify_blocking(req.password, hash).await? {
        tracing::info!(user_id = %user.id, "Login with wrong password");
        return Err(invalid());
    }

    let session = SessionUser::from(&user);
    let pair = state.tokens.issue(&session).await?;
    Ok(session_response(&state.config, jar, pair, session))
}

#[derive(Deserialize, Validate)]
pub struct SocialAuthRequest {
    /// Google ID token from the browser sign-in flow
    #[validate(length(min = 1))]
    pub id_token: String,
}

/// Sign in with a Google ID token. The account is looked up by the token's
/// verified email; unknown emails get a password-less account.
async fn social_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    ValidJson(req): ValidJson<SocialAuthRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let identity = state.identity.verify(&req.id_token).await?;

    let user = match state.db.find_user_by_email(&identity.email).await? {
        Some(user) => user,
        None => {
            let name = identity
                .name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| {
                    identity
                        .email
                        .split('@')
                        .next()
                        .unwrap_or_default()
                        .to_string()
                });
            let mut user = User::new(name, identity.email, None, &now_rfc3339());
            user.avatar = identity.picture;
            user.is_verified = true;
            state.db.insert_user(&user).await?;
            tracing::info!(user_id = %user.id, "Account created from social sign-in");
            user
        }
    };
    tracing::info!(user_id = %user.id, subject = %identity.subject, "Social sign-in");

    let session = SessionUser::from(&user);
    let pair = state.tokens.issue(&session).await?;
    Ok(session_response(&state.config, jar, pair, session))
}

// ─── Session ─────────────────────────────────────────────────

/// Trade the refresh cookie for a new access token and a rotated refresh
/// token.
async fn refresh(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let token = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or(AppError::Unauthenticated)?;

    let (pair, session) = state.tokens.refresh(&token).await?;
    Ok(session_response(&state.config, jar, pair, session))
}

async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<MessageResponse>)> {
    state.tokens.revoke(&user.id).await?;

    let jar = jar
        .add(expired_cookie(&state.config, ACCESS_COOKIE))
        .add(expired_cookie(&state.config, REFRESH_COOKIE));
    Ok((jar, MessageResponse::ok("Logged out successfully")))
}

#[derive(Serialize)]
pub struct MeResponse {
    pub success: bool,
    pub user: SessionUser,
}

/// The session snapshot the request was authenticated with.
async fn me(Extension(user): Extension<AuthUser>) -> Json<MeResponse> {
    Json(MeResponse {
        success: true,
        user: user.user,
    })
}
