// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Course writes.
//!
//! Every write goes to the primary store first and then invalidates the
//! affected content-cache keys. A write is only reported as successful once
//! the invalidation went through.

use crate::db::{version_conflict, Database};
use crate::error::AppError;
use crate::models::{Course, CourseDraft};
use crate::services::content_cache::ContentCache;
use crate::time_utils::now_rfc3339;
use std::sync::Arc;

/// Attempts before a contended update gives up with `Conflict`.
const MAX_UPDATE_ATTEMPTS: usize = 5;

#[derive(Clone)]
pub struct CourseService {
    db: Arc<dyn Database>,
    cache: Arc<ContentCache>,
}

impl CourseService {
    pub fn new(db: Arc<dyn Database>, cache: Arc<ContentCache>) -> Self {
        Self { db, cache }
    }

    pub async fn create(&self, draft: CourseDraft) -> Result<Course, AppError> {
        let course = Course::from_draft(draft, &now_rfc3339());
        self.db.insert_course(&course).await?;
        self.cache.invalidate_catalog().await?;

        tracing::info!(course_id = %course.id, name = %course.name, "Course created");
        Ok(course)
    }

    pub async fn edit(&self, course_id: &str, draft: CourseDraft) -> Result<Course, AppError> {
        let (course, ()) = self
            .update(course_id, |course| {
                course.apply_draft(draft.clone(), &now_rfc3339());
                Ok(())
            })
            .await?;

        tracing::info!(course_id, "Course edited");
        Ok(course)
    }

    pub async fn delete(&self, course_id: &str) -> Result<(), AppError> {
        if !self.db.delete_course(course_id).await? {
            return Err(AppError::NotFound(format!("Course {} not found", course_id)));
        }
        self.cache.invalidate_course(course_id).await?;

        tracing::info!(course_id, "Course deleted");
        Ok(())
    }

    /// Every course with full content, newest first.
    pub async fn list_all(&self) -> Result<Vec<Course>, AppError> {
        let mut courses = self.db.list_courses().await?;
        courses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(courses)
    }

    /// Load, modify and conditionally write a course, retrying when another
    /// writer bumped the version in between.
    ///
    /// `apply` may run several times and must only touch the course it is
    /// given. Its error aborts the update without writing.
    pub async fn update<F, R>(&self, course_id: &str, mut apply: F) -> Result<(Course, R), AppError>
    where
        F: FnMut(&mut Course) -> Result<R, AppError>,
    {
        for attempt in 1..=MAX_UPDATE_ATTEMPTS {
            let mut course = self
                .db
                .get_course(course_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Course {} not found", course_id)))?;

            let expected = course.version;
            let outcome = apply(&mut course)?;
            course.version = expected + 1;
            course.updated_at = now_rfc3339();

            match self.db.replace_course(&course, expected).await {
                Ok(()) => {
                    self.cache.invalidate_course(course_id).await?;
                    return Ok((course, outcome));
                }
                Err(AppError::Conflict(_)) => {
                    tracing::debug!(course_id, attempt, "Course version moved, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        tracing::warn!(course_id, "Giving up on contended course update");
        Err(version_conflict("Course", course_id))
    }
}
