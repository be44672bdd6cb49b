// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared key-value store with per-key TTL.
//!
//! Holds session snapshots and public content snapshots. Writers follow one
//! rule: mutate the primary store first, then invalidate or refresh the key.

pub mod memory;
pub mod redis;

pub use self::memory::MemoryKv;
pub use self::redis::RedisKv;

use crate::error::AppError;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), AppError>;

    /// Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), AppError>;

    /// Atomically add one to a counter and return the new count. The TTL
    /// starts when the counter is created and is not extended by later calls.
    async fn incr(&self, key: &str, ttl: Duration) -> Result<u64, AppError>;
}

/// Read and decode a JSON value. Undecodable entries are dropped and
/// reported as a miss.
pub async fn get_json<T: DeserializeOwned>(
    kv: &dyn KvStore,
    key: &str,
) -> Result<Option<T>, AppError> {
    let Some(raw) = kv.get(key).await? else {
        return Ok(None);
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Dropping undecodable cache entry");
            kv.delete(key).await?;
            Ok(None)
        }
    }
}

pub async fn set_json<T: Serialize + ?Sized>(
    kv: &dyn KvStore,
    key: &str,
    value: &T,
    ttl: Duration,
) -> Result<(), AppError> {
    let raw = serde_json::to_string(value)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Cache encode failed: {}", e)))?;
    kv.set(key, &raw, ttl).await
}
