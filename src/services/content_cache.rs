// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Read-through cache for public course teasers and the catalog.
//!
//! Only [`CoursePreview`] values are ever cached. Full course content is
//! read from the primary store on every request.
//!
//! Each key carries an in-process invalidation generation. A fill that
//! started before an invalidation is discarded so a slow loader cannot put
//! pre-mutation data back into the cache.

use crate::cache::{self, KvStore};
use crate::db::Database;
use crate::error::AppError;
use crate::models::CoursePreview;
use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub const CATALOG_KEY: &str = "courses:catalog";

pub fn course_key(course_id: &str) -> String {
    format!("course:{}", course_id)
}

pub struct ContentCache {
    kv: Arc<dyn KvStore>,
    db: Arc<dyn Database>,
    ttl: Duration,
    generations: DashMap<String, u64>,
}

impl ContentCache {
    pub fn new(kv: Arc<dyn KvStore>, db: Arc<dyn Database>, ttl: Duration) -> Self {
        Self {
            kv,
            db,
            ttl,
            generations: DashMap::new(),
        }
    }

    // ─── Reads ───────────────────────────────────────────────────

    /// Public teaser for one course.
    pub async fn course(&self, course_id: &str) -> Result<CoursePreview, AppError> {
        let key = course_key(course_id);
        if let Some(preview) = self.lookup(&key).await {
            return Ok(preview);
        }

        let generation = self.generation(&key);
        let course = self
            .db
            .get_course(course_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Course {} not found", course_id)))?;
        let preview = course.preview();

        self.fill(&key, generation, &preview).await;
        Ok(preview)
    }

    /// Public teasers for every course, newest first.
    pub async fn catalog(&self) -> Result<Vec<CoursePreview>, AppError> {
        if let Some(catalog) = self.lookup(CATALOG_KEY).await {
            return Ok(catalog);
        }

        let generation = self.generation(CATALOG_KEY);
        let mut courses = self.db.list_courses().await?;
        courses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let catalog: Vec<CoursePreview> = courses.iter().map(|c| c.preview()).collect();

        self.fill(CATALOG_KEY, generation, &catalog).await;
        Ok(catalog)
    }

    // ─── Invalidation ────────────────────────────────────────────

    /// Drop the given keys. Idempotent; deleting a missing key succeeds.
    pub async fn invalidate(&self, keys: &[&str]) -> Result<(), AppError> {
        for key in keys {
            *self.generations.entry(key.to_string()).or_insert(0) += 1;
            self.kv.delete(key).await?;
        }
        tracing::debug!(keys = ?keys, "Content cache invalidated");
        Ok(())
    }

    /// Drop a course teaser together with the catalog that lists it.
    pub async fn invalidate_course(&self, course_id: &str) -> Result<(), AppError> {
        let key = course_key(course_id);
        self.invalidate(&[&key, CATALOG_KEY]).await
    }

    pub async fn invalidate_catalog(&self) -> Result<(), AppError> {
        self.invalidate(&[CATALOG_KEY]).await
    }

    // ─── Internals ───────────────────────────────────────────────

    fn generation(&self, key: &str) -> u64 {
        self.generations.get(key).map(|g| *g).unwrap_or(0)
    }

    /// A broken cache degrades to direct store reads.
    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match cache::get_json(self.kv.as_ref(), key).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(key, error = %e, "Content cache read failed, using store");
                None
            }
        }
    }

    async fn fill<T: Serialize + ?Sized>(&self, key: &str, generation: u64, value: &T) {
        if self.generation(key) != generation {
            tracing::debug!(key, "Skipping fill after concurrent invalidation");
            return;
        }

        if let Err(e) = cache::set_json(self.kv.as_ref(), key, value, self.ttl).await {
            tracing::warn!(key, error = %e, "Content cache fill failed");
            return;
        }

        // An invalidation may have landed between the check and the write.
        if self.generation(key) != generation {
            if let Err(e) = self.kv.delete(key).await {
                tracing::warn!(key, error = %e, "Failed to drop raced cache fill");
            }
        }
    }
}
