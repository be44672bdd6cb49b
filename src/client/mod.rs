// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API client that keeps a session alive across access-token expiry.

pub mod reauth;
pub mod transport;

pub use reauth::{ReauthClient, SessionState};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Transport};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("could not decode response: {0}")]
    Decode(String),

    #[error("refresh rejected with status {0}")]
    RefreshRejected(u16),

    /// The session is over; the user has to log in again.
    #[error("session ended, please login again")]
    SessionEnded,
}
