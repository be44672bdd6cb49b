// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Silent re-authentication around API calls.
//!
//! A call that fails with `token_expired` triggers one refresh and is sent
//! again. Concurrent expiries share a single refresh: each call remembers
//! the credential generation it was sent with, and after taking the refresh
//! lock only refreshes if nobody has moved the generation in the meantime.
//! A failed refresh ends the session; later calls fail fast until the next
//! login.

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{watch, Mutex};

use crate::client::transport::{ApiRequest, ApiResponse, Transport};
use crate::client::ClientError;

const TOKEN_EXPIRED: &str = "token_expired";
const SESSION_NOT_FOUND: &str = "session_not_found";

/// Client-visible session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    LoggedOut,
}

enum AuthSignal {
    Expired,
    Ended,
}

fn auth_signal(response: &ApiResponse) -> Option<AuthSignal> {
    if response.status != reqwest::StatusCode::UNAUTHORIZED {
        return None;
    }
    match response.error_code() {
        Some(TOKEN_EXPIRED) => Some(AuthSignal::Expired),
        Some(SESSION_NOT_FOUND) => Some(AuthSignal::Ended),
        _ => None,
    }
}

pub struct ReauthClient<T: Transport> {
    transport: T,
    /// Bumped on every successful login or refresh
    generation: AtomicU64,
    refresh_lock: Mutex<()>,
    state: watch::Sender<SessionState>,
}

impl<T: Transport> ReauthClient<T> {
    pub fn new(transport: T) -> Self {
        let (state, _) = watch::channel(SessionState::Active);
        Self {
            transport,
            generation: AtomicU64::new(0),
            refresh_lock: Mutex::new(()),
            state,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Observe session transitions (e.g. to show a login screen).
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Send a login-style request (login, activation, social sign-in).
    /// Success starts a fresh session.
    pub async fn login(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
        let response = self.transport.send(request).await?;
        if response.is_success() {
            self.generation.fetch_add(1, Ordering::SeqCst);
            self.state.send_replace(SessionState::Active);
            tracing::info!("Session started");
        }
        Ok(response)
    }

    /// Send a logout request and end the local session whatever the answer.
    pub async fn logout(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
        let response = self.transport.send(request).await;
        self.end_session("logout");
        response
    }

    /// Send a request, refreshing once if the access token expired.
    ///
    /// Non-auth errors come back as a normal [`ApiResponse`]. A session that
    /// cannot be recovered yields [`ClientError::SessionEnded`].
    pub async fn call(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
        if self.state() == SessionState::LoggedOut {
            return Err(ClientError::SessionEnded);
        }

        let observed = self.generation();
        let response = self.transport.send(request).await?;
        match auth_signal(&response) {
            None => return Ok(response),
            Some(AuthSignal::Ended) => {
                self.end_session(SESSION_NOT_FOUND);
                return Err(ClientError::SessionEnded);
            }
            Some(AuthSignal::Expired) => {}
        }

        self.reauthenticate(observed).await?;

        let retried = self.transport.send(request).await?;
        if auth_signal(&retried).is_some() {
            self.end_session("rejected after refresh");
            return Err(ClientError::SessionEnded);
        }
        Ok(retried)
    }

    async fn reauthenticate(&self, observed: u64) -> Result<(), ClientError> {
        let _guard = self.refresh_lock.lock().await;

        if self.state() == SessionState::LoggedOut {
            return Err(ClientError::SessionEnded);
        }
        // Double-check: another call refreshed while we waited
        if self.generation() != observed {
            return Ok(());
        }

        match self.transport.refresh().await {
            Ok(()) => {
                self.generation.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed");
                self.end_session("refresh failed");
                Err(ClientError::SessionEnded)
            }
        }
    }

    fn end_session(&self, reason: &str) {
        let previous = self.state.send_replace(SessionState::LoggedOut);
        if previous == SessionState::Active {
            tracing::info!(reason, "Session ended");
        }
    }
}
