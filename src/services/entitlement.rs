// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Purchase-based access to full course content.

use crate::db::Database;
use crate::error::AppError;
use crate::middleware::policy::{authorize, Action};
use crate::models::{Course, SessionUser};
use std::sync::Arc;

/// Outcome of an entitlement check.
///
/// Callers pick between a login prompt, a purchase prompt and rendering the
/// content, so the three cases stay distinct.
#[derive(Debug)]
pub enum Entitlement {
    /// No identity at all (401).
    Unauthenticated,
    /// Logged in, course exists, not purchased (403).
    Denied,
    /// Full content, read straight from the primary store.
    Granted(Box<Course>),
}

impl Entitlement {
    pub fn into_course(self) -> Result<Course, AppError> {
        match self {
            Entitlement::Granted(course) => Ok(*course),
            Entitlement::Denied => Err(AppError::Forbidden(
                "You are not eligible to access this course".to_string(),
            )),
            Entitlement::Unauthenticated => Err(AppError::Unauthenticated),
        }
    }
}

#[derive(Clone)]
pub struct EntitlementGate {
    db: Arc<dyn Database>,
}

impl EntitlementGate {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Decide whether `identity` may read the full content of `course_id`.
    ///
    /// Unknown courses are `NotFound` for logged-in callers. Nothing is
    /// written on any path.
    pub async fn check(
        &self,
        identity: Option<&SessionUser>,
        course_id: &str,
    ) -> Result<Entitlement, AppError> {
        let Some(user) = identity else {
            return Ok(Entitlement::Unauthenticated);
        };

        let course = self
            .db
            .get_course(course_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Course {} not found", course_id)))?;

        match authorize(user, Action::ReadCourseContent, Some(course_id)) {
            Ok(()) => {
                tracing::debug!(user_id = %user.id, course_id, "Entitlement granted");
                Ok(Entitlement::Granted(Box::new(course)))
            }
            Err(AppError::Forbidden(_)) => {
                tracing::debug!(user_id = %user.id, course_id, "Entitlement denied");
                Ok(Entitlement::Denied)
            }
            Err(e) => Err(e),
        }
    }
}
