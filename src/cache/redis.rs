// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Redis-backed key-value store shared across instances.

use crate::cache::KvStore;
use crate::error::AppError;
use async_trait::async_trait;
use deadpool_redis::redis::AsyncCommands;
use deadpool_redis::{Config as PoolConfig, Connection, Pool, Runtime};
use std::time::Duration;

const POOL_TIMEOUT_MS: u64 = 2000;

#[derive(Clone)]
pub struct RedisKv {
    pool: Pool,
}

impl RedisKv {
    /// Create the pool and check that Redis answers.
    pub async fn connect(url: &str) -> Result<Self, AppError> {
        let mut config = PoolConfig::from_url(url);
        if let Some(ref mut pool_config) = config.pool {
            let timeout = Some(Duration::from_millis(POOL_TIMEOUT_MS));
            pool_config.timeouts.wait = timeout;
            pool_config.timeouts.create = timeout;
            pool_config.timeouts.recycle = timeout;
        }

        let pool = config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| AppError::UpstreamFailure(format!("Redis pool: {}", e)))?;

        let kv = Self { pool };
        kv.conn().await?;
        tracing::info!("Connected to Redis");
        Ok(kv)
    }

    async fn conn(&self) -> Result<Connection, AppError> {
        self.pool
            .get()
            .await
            .map_err(|e| AppError::UpstreamFailure(format!("Redis connection: {}", e)))
    }
}

#[async_trait]
impl KvStore for RedisKv {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let mut conn = self.conn().await?;
        conn.get::<_, Option<String>>(key)
            .await
            .map_err(|e| AppError::UpstreamFailure(format!("Redis GET {}: {}", key, e)))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), AppError> {
        let mut conn = self.conn().await?;
        // SETEX rejects a zero TTL
        let ttl_secs = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, ttl_secs)
            .await
            .map_err(|e| AppError::UpstreamFailure(format!("Redis SETEX {}: {}", key, e)))
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| AppError::UpstreamFailure(format!("Redis DEL {}: {}", key, e)))
    }

    async fn incr(&self, key: &str, ttl: Duration) -> Result<u64, AppError> {
        let mut conn = self.conn().await?;
        let count: u64 = conn
            .incr(key, 1)
            .await
            .map_err(|e| AppError::UpstreamFailure(format!("Redis INCR {}: {}", key, e)))?;
        if count == 1 {
            let ttl_secs = ttl.as_secs().max(1) as i64;
            conn.expire::<_, ()>(key, ttl_secs)
                .await
                .map_err(|e| AppError::UpstreamFailure(format!("Redis EXPIRE {}: {}", key, e)))?;
        }
        Ok(count)
    }
}
