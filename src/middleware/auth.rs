// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT authentication middleware.
//!
//! The token only names the user. Identity and role come from the session
//! cache, so a role change or purchase takes effect on the next request.

use crate::error::AppError;
use crate::models::{Role, SessionUser};
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

/// Authenticated user attached to request extensions.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub role: Role,
    /// Session snapshot the request was authenticated with
    pub user: SessionUser,
}

impl From<SessionUser> for AuthUser {
    fn from(user: SessionUser) -> Self {
        Self {
            id: user.id.clone(),
            role: user.role,
            user,
        }
    }
}

/// Cookie first, then `Authorization: Bearer`.
fn extract_token(jar: &CookieJar, request: &Request) -> Option<String> {
    if let Some(cookie) = jar.get(ACCESS_COOKIE) {
        return Some(cookie.value().to_string());
    }

    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

async fn authenticate(state: &AppState, token: &str) -> Result<AuthUser, AppError> {
    let claims = state.tokens.verify_access(token).map_err(|e| {
        tracing::debug!(error = %e, "Access token rejected");
        AppError::from(e)
    })?;

    let user = state.tokens.session(&claims.sub).await?.ok_or_else(|| {
        tracing::debug!(user_id = %claims.sub, "No session for valid access token");
        AppError::SessionNotFound
    })?;

    Ok(AuthUser::from(user))
}

/// Middleware that requires valid JWT authentication.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token(&jar, &request).ok_or(AppError::Unauthenticated)?;
    let auth_user = authenticate(&state, &token).await?;

    request.extensions_mut().insert(auth_user);
    Ok(next.run(request).await)
}

/// Attach the user when a token is present; let anonymous requests through.
///
/// A token that is present but invalid or expired still fails, so clients
/// get the signal to refresh.
pub async fn optional_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(token) = extract_token(&jar, &request) {
        let auth_user = authenticate(&state, &token).await?;
        request.extensions_mut().insert(auth_user);
    }
    Ok(next.run(request).await)
}
