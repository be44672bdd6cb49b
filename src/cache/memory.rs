// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Single-instance key-value store on a DashMap.

use crate::cache::KvStore;
use crate::error::AppError;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-process store. Expired entries are dropped on read and by
/// `purge_expired`.
#[derive(Clone, Default)]
pub struct MemoryKv {
    entries: Arc<DashMap<String, Entry>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if a live (non-expired) entry exists.
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .map(|e| e.expires_at > Instant::now())
            .unwrap_or(false)
    }

    /// Drop every expired entry and return how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, e| e.expires_at > now);
        before.saturating_sub(self.entries.len())
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > now {
                return Ok(Some(entry.value.clone()));
            }
        }
        self.entries.remove_if(key, |_, e| e.expires_at <= now);
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), AppError> {
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn incr(&self, key: &str, ttl: Duration) -> Result<u64, AppError> {
        let now = Instant::now();
        let mut entry = self.entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: "0".to_string(),
            expires_at: now + ttl,
        });
        if entry.expires_at <= now {
            *entry = Entry {
                value: "0".to_string(),
                expires_at: now + ttl,
            };
        }

        let count = entry.value.parse::<u64>().map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Counter {} is not a number: {}", key, e))
        })? + 1;
        entry.value = count.to_string();
        Ok(count)
    }
}
