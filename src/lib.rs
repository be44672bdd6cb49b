// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! E-learning: session and content-access backend for a course marketplace
//!
//! This crate provides the HTTP API (registration, sessions, course catalog,
//! entitlement-gated content, threaded discussions) and a client that keeps
//! a browser-style session alive across access-token expiry.

pub mod cache;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use cache::KvStore;
use config::Config;
use db::Database;
use services::{
    ActivationService, ContentCache, CourseService, DiscussionService, EntitlementGate,
    IdentityVerifier, Mailer, Notifier, OrderService, TokenService, UserService,
};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Arc<dyn Database>,
    pub kv: Arc<dyn KvStore>,
    pub tokens: TokenService,
    pub users: UserService,
    pub activation: ActivationService,
    pub identity: IdentityVerifier,
    pub content_cache: Arc<ContentCache>,
    pub courses: CourseService,
    pub entitlements: EntitlementGate,
    pub discussion: DiscussionService,
    pub orders: OrderService,
    pub notifier: Notifier,
}

impl AppState {
    /// Wire every service on top of the given stores.
    pub fn new(
        config: Config,
        db: Arc<dyn Database>,
        kv: Arc<dyn KvStore>,
        mailer: Arc<dyn Mailer>,
        identity: IdentityVerifier,
    ) -> Self {
        let tokens = TokenService::new(&config, kv.clone(), db.clone());
        let users = UserService::new(db.clone());
        let activation = ActivationService::new(
            &config.activation_secret,
            config.activation_token_ttl,
            kv.clone(),
        );
        let content_cache = Arc::new(ContentCache::new(
            kv.clone(),
            db.clone(),
            config.content_cache_ttl,
        ));
        let courses = CourseService::new(db.clone(), content_cache.clone());
        let notifier = Notifier::new(db.clone(), mailer);
        let discussion = DiscussionService::new(courses.clone(), notifier.clone());
        let orders = OrderService::new(
            db.clone(),
            users.clone(),
            courses.clone(),
            tokens.clone(),
            notifier.clone(),
        );

        Self {
            entitlements: EntitlementGate::new(db.clone()),
            config,
            db,
            kv,
            tokens,
            users,
            activation,
            identity,
            content_cache,
            courses,
            discussion,
            orders,
            notifier,
        }
    }
}
