// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User record writes.

use crate::db::{version_conflict, Database};
use crate::error::AppError;
use crate::models::User;
use crate::time_utils::now_rfc3339;
use std::sync::Arc;

/// Attempts before a contended update gives up with `Conflict`.
const MAX_UPDATE_ATTEMPTS: usize = 5;

#[derive(Clone)]
pub struct UserService {
    db: Arc<dyn Database>,
}

impl UserService {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Load, modify and conditionally write a user, retrying when another
    /// writer (an order, a profile edit, a role change) got there first.
    ///
    /// `apply` may run several times. Its error aborts without writing.
    pub async fn update<F, R>(&self, user_id: &str, mut apply: F) -> Result<(User, R), AppError>
    where
        F: FnMut(&mut User) -> Result<R, AppError>,
    {
        for attempt in 1..=MAX_UPDATE_ATTEMPTS {
            let mut user = self
                .db
                .get_user(user_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

            let expected = user.version;
            let outcome = apply(&mut user)?;
            user.version = expected + 1;
            user.updated_at = now_rfc3339();

            match self.db.replace_user(&user, expected).await {
                Ok(()) => return Ok((user, outcome)),
                Err(AppError::Conflict(_)) => {
                    tracing::debug!(user_id, attempt, "User version moved, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        tracing::warn!(user_id, "Giving up on contended user update");
        Err(version_conflict("User", user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDb;

    #[tokio::test]
    async fn test_update_bumps_version_and_keeps_earlier_writes() {
        let db = Arc::new(MemoryDb::new());
        let user = User::new("Ada".to_string(), "ada@example.com".to_string(), None, "t");
        db.insert_user(&user).await.unwrap();
        let service = UserService::new(db.clone());

        for course in ["c1", "c2"] {
            service
                .update(&user.id, |u| {
                    u.courses.push(course.to_string());
                    Ok(())
                })
                .await
                .unwrap();
        }

        let stored = db.get_user(&user.id).await.unwrap().unwrap();
        assert_eq!(stored.courses, ["c1", "c2"]);
        assert_eq!(stored.version, 2);
    }

    #[tokio::test]
    async fn test_update_missing_user_not_found() {
        let service = UserService::new(Arc::new(MemoryDb::new()));
        let err = service
            .update("nobody", |_| Ok(()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
