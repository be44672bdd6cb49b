// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin notification model.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    #[default]
    Unread,
    Read,
}

/// Notification shown on the admin dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    /// User whose action triggered the notification
    pub user_id: String,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub status: NotificationStatus,
    pub created_at: String,
}

impl Notification {
    pub fn new(user_id: &str, title: &str, message: String, now: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            message,
            status: NotificationStatus::Unread,
            created_at: now.to_string(),
        }
    }
}
