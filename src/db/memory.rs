// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory primary store for local development and tests.

use crate::db::{version_conflict, Database};
use crate::error::AppError;
use crate::models::{Course, Notification, User};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

/// DashMap-backed store with the same semantics as [`super::FirestoreDb`].
#[derive(Clone, Default)]
pub struct MemoryDb {
    users: Arc<DashMap<String, User>>,
    /// email -> user id
    emails: Arc<DashMap<String, String>>,
    courses: Arc<DashMap<String, Course>>,
    notifications: Arc<DashMap<String, Notification>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Database for MemoryDb {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.get(user_id).map(|u| u.clone()))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let Some(user_id) = self.emails.get(&email.to_lowercase()).map(|id| id.clone()) else {
            return Ok(None);
        };
        self.get_user(&user_id).await
    }

    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        // The email index entry is the uniqueness lock
        match self.emails.entry(user.email.to_lowercase()) {
            Entry::Occupied(_) => Err(AppError::Validation("Email already exists".to_string())),
            Entry::Vacant(slot) => {
                slot.insert(user.id.clone());
                self.users.insert(user.id.clone(), user.clone());
                Ok(())
            }
        }
    }

    async fn replace_user(&self, user: &User, expected_version: u64) -> Result<(), AppError> {
        let mut stored = self
            .users
            .get_mut(&user.id)
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.id)))?;

        if stored.version != expected_version {
            return Err(version_conflict("User", &user.id));
        }
        if stored.email != user.email {
            self.emails.remove(&stored.email);
            self.emails.insert(user.email.to_lowercase(), user.id.clone());
        }
        *stored = user.clone();
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let mut users: Vec<User> = self.users.iter().map(|u| u.clone()).collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn delete_user(&self, user_id: &str) -> Result<bool, AppError> {
        match self.users.remove(user_id) {
            Some((_, user)) => {
                self.emails.remove(&user.email);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_course(&self, course_id: &str) -> Result<Option<Course>, AppError> {
        Ok(self.courses.get(course_id).map(|c| c.clone()))
    }

    async fn list_courses(&self) -> Result<Vec<Course>, AppError> {
        let mut courses: Vec<Course> = self.courses.iter().map(|c| c.clone()).collect();
        courses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(courses)
    }

    async fn insert_course(&self, course: &Course) -> Result<(), AppError> {
        self.courses.insert(course.id.clone(), course.clone());
        Ok(())
    }

    async fn replace_course(
        &self,
        course: &Course,
        expected_version: u64,
    ) -> Result<(), AppError> {
        // get_mut holds the shard lock across compare and swap
        let mut stored = self
            .courses
            .get_mut(&course.id)
            .ok_or_else(|| AppError::NotFound(format!("Course {} not found", course.id)))?;

        if stored.version != expected_version {
            return Err(version_conflict("Course", &course.id));
        }
        *stored = course.clone();
        Ok(())
    }

    async fn delete_course(&self, course_id: &str) -> Result<bool, AppError> {
        Ok(self.courses.remove(course_id).is_some())
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<(), AppError> {
        self.notifications
            .insert(notification.id.clone(), notification.clone());
        Ok(())
    }

    async fn list_notifications(&self) -> Result<Vec<Notification>, AppError> {
        let mut all: Vec<Notification> = self.notifications.iter().map(|n| n.clone()).collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn upsert_notification(&self, notification: &Notification) -> Result<(), AppError> {
        self.insert_notification(notification).await
    }

    async fn get_notification(
        &self,
        notification_id: &str,
    ) -> Result<Option<Notification>, AppError> {
        Ok(self.notifications.get(notification_id).map(|n| n.clone()))
    }

    async fn delete_notification(&self, notification_id: &str) -> Result<bool, AppError> {
        Ok(self.notifications.remove(notification_id).is_some())
    }
}
