// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model for storage and API.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Account role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// User record stored in the primary database.
///
/// Only this type carries the password hash. Anything that leaves the
/// server (responses, session snapshots) is a [`SessionUser`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// UUID (also used as document ID)
    pub id: String,
    pub name: String,
    /// Lower-cased, unique
    pub email: String,
    /// Argon2 PHC string; `None` for social-auth accounts
    #[serde(default)]
    pub password_hash: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub is_verified: bool,
    /// Purchased course IDs
    #[serde(default)]
    pub courses: Vec<String>,
    /// Bumped on every write; guards read-modify-write updates
    #[serde(default)]
    pub version: u64,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    pub fn new(name: String, email: String, password_hash: Option<String>, now: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            email: email.to_lowercase(),
            password_hash,
            avatar: None,
            role: Role::User,
            is_verified: false,
            courses: Vec::new(),
            version: 0,
            created_at: now.to_string(),
            updated_at: now.to_string(),
        }
    }

    pub fn has_course(&self, course_id: &str) -> bool {
        self.courses.iter().any(|id| id == course_id)
    }
}

/// User snapshot held in the session cache and returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
    pub role: Role,
    pub is_verified: bool,
    pub courses: Vec<String>,
    pub created_at: String,
}

impl SessionUser {
    pub fn has_course(&self, course_id: &str) -> bool {
        self.courses.iter().any(|id| id == course_id)
    }
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            avatar: user.avatar.clone(),
            role: user.role,
            is_verified: user.is_verified,
            courses: user.courses.clone(),
            created_at: user.created_at.clone(),
        }
    }
}
