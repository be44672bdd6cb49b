// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Primary database layer (credential and course store).
//!
//! [`FirestoreDb`] is the durable backend; [`MemoryDb`] backs local
//! development and tests.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::AppError;
use crate::models::{Course, Notification, User};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const COURSES: &str = "courses";
    pub const NOTIFICATIONS: &str = "notifications";
}

/// Operations the services need from the primary store.
#[async_trait]
pub trait Database: Send + Sync {
    // ─── Users ───────────────────────────────────────────────────

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Insert a new user. Fails with `Validation` if the email is taken.
    async fn insert_user(&self, user: &User) -> Result<(), AppError>;

    /// Replace a user only if the stored version still equals
    /// `expected_version`. Fails with `Conflict` otherwise and `NotFound`
    /// if the user is gone.
    async fn replace_user(&self, user: &User, expected_version: u64) -> Result<(), AppError>;

    async fn list_users(&self) -> Result<Vec<User>, AppError>;

    /// Returns `false` if the user did not exist.
    async fn delete_user(&self, user_id: &str) -> Result<bool, AppError>;

    // ─── Courses ─────────────────────────────────────────────────

    async fn get_course(&self, course_id: &str) -> Result<Option<Course>, AppError>;

    async fn list_courses(&self) -> Result<Vec<Course>, AppError>;

    async fn insert_course(&self, course: &Course) -> Result<(), AppError>;

    /// Replace a course only if the stored version still equals
    /// `expected_version`. Fails with `Conflict` otherwise and `NotFound`
    /// if the course is gone.
    async fn replace_course(&self, course: &Course, expected_version: u64)
        -> Result<(), AppError>;

    /// Returns `false` if the course did not exist.
    async fn delete_course(&self, course_id: &str) -> Result<bool, AppError>;

    // ─── Notifications ───────────────────────────────────────────

    async fn insert_notification(&self, notification: &Notification) -> Result<(), AppError>;

    /// All notifications, newest first.
    async fn list_notifications(&self) -> Result<Vec<Notification>, AppError>;

    async fn upsert_notification(&self, notification: &Notification) -> Result<(), AppError>;

    async fn get_notification(
        &self,
        notification_id: &str,
    ) -> Result<Option<Notification>, AppError>;

    /// Returns `false` if the notification did not exist.
    async fn delete_notification(&self, notification_id: &str) -> Result<bool, AppError>;
}

pub(crate) fn version_conflict(kind: &str, id: &str) -> AppError {
    AppError::Conflict(format!(
        "{} {} was modified concurrently, please retry",
        kind, id
    ))
}
