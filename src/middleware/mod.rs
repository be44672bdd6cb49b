// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (authentication, authorization, security headers).

pub mod auth;
pub mod policy;
pub mod security;

pub use auth::{optional_auth, require_auth, AuthUser};
pub use policy::{authorize, enforce, Action};
