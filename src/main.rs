// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! E-learning API Server
//!
//! Serves the course marketplace API: sessions, catalog, entitled course
//! content and course discussions.

use elearning::{
    cache::{KvStore, MemoryKv, RedisKv},
    config::Config,
    db::{Database, FirestoreDb, MemoryDb},
    services::{notifier::READ_NOTIFICATION_RETENTION, IdentityVerifier, LogMailer},
    AppState,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const NOTIFICATION_PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);
const KV_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, env = %config.app_env, "Starting E-learning API");

    // Primary store
    let db: Arc<dyn Database> = match &config.gcp_project_id {
        Some(project_id) => {
            let db = FirestoreDb::new(project_id).await?;
            tracing::info!(project = %project_id, "Using Firestore");
            Arc::new(db)
        }
        None => {
            tracing::warn!("GCP_PROJECT_ID not set, using in-memory store (data is not persisted)");
            Arc::new(MemoryDb::new())
        }
    };

    // Session and content cache
    let kv: Arc<dyn KvStore> = match &config.redis_url {
        Some(url) => Arc::new(RedisKv::connect(url).await?),
        None => {
            tracing::warn!("REDIS_URL not set, using in-process cache (single instance only)");
            let kv = MemoryKv::new();
            spawn_kv_sweep(kv.clone());
            Arc::new(kv)
        }
    };

    // Social sign-in
    let identity = IdentityVerifier::google(&config)?;
    if config.google_client_id.is_none() {
        tracing::warn!("GOOGLE_CLIENT_ID not set, social sign-in disabled");
    }

    // Build shared state
    let state = Arc::new(AppState::new(
        config.clone(),
        db,
        kv,
        Arc::new(LogMailer),
        identity,
    ));

    spawn_notification_purge(state.clone());

    // Build router
    let app = elearning::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Periodically drop old read notifications.
fn spawn_notification_purge(state: Arc<AppState>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(NOTIFICATION_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            if let Err(e) = state.notifier.purge_read(READ_NOTIFICATION_RETENTION).await {
                tracing::warn!(error = %e, "Notification purge failed");
            }
        }
    });
}

/// Periodically drop expired in-process cache entries that were never read
/// again.
fn spawn_kv_sweep(kv: MemoryKv) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(KV_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = kv.purge_expired();
            if removed > 0 {
                tracing::debug!(removed, "Swept expired cache entries");
            }
        }
    });
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("elearning=debug,tower_http=info,info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .init();
}
