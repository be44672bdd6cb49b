// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (credential records)
//! - Courses (content, embedded discussions and reviews)
//! - Notifications (admin dashboard feed)

use crate::db::{collections, version_conflict, Database};
use crate::error::AppError;
use crate::models::{Course, Notification, User};
use async_trait::async_trait;
use firestore::FirestoreConsistencySelector;
use serde::{de::DeserializeOwned, Serialize};

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create an offline client. Every operation returns a database error.
    pub fn new_offline() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    async fn put_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Conditional replace inside a transaction.
    ///
    /// The current document is read through the transaction, so Firestore
    /// tracks it: if another writer commits to it before we do, our commit
    /// is aborted and reported as a conflict for the caller to retry.
    async fn replace_versioned<T>(
        &self,
        collection: &str,
        kind: &str,
        id: &str,
        doc: &T,
        expected_version: u64,
        version_of: fn(&T) -> u64,
    ) -> Result<(), AppError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        let client = self.get_client()?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let transactional = client.clone_with_consistency_selector(
            FirestoreConsistencySelector::Transaction(transaction.transaction_id().clone()),
        );

        let current: Option<T> = transactional
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(id)
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to read {} in transaction: {}", kind, e))
            })?;

        let current = match current {
            Some(c) => c,
            None => {
                let _ = transaction.rollback().await;
                return Err(AppError::NotFound(format!("{} {} not found", kind, id)));
            }
        };

        if version_of(&current) != expected_version {
            let _ = transaction.rollback().await;
            return Err(version_conflict(kind, id));
        }

        client
            .fluent()
            .update()
            .in_col(collection)
            .document_id(id)
            .object(doc)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add {} to transaction: {}", kind, e))
            })?;

        transaction.commit().await.map_err(|e| {
            tracing::warn!(collection, id, error = %e, "Conditional commit aborted");
            version_conflict(kind, id)
        })?;

        Ok(())
    }
}

#[async_trait]
impl Database for FirestoreDb {
    // ─── User Operations ─────────────────────────────────────────

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = email.to_lowercase();
        let users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(|q| q.for_all([q.field("email").eq(email.clone())]))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(users.into_iter().next())
    }

    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        // Check-then-write: Firestore has no unique index on a field
        if self.find_user_by_email(&user.email).await?.is_some() {
            return Err(AppError::Validation("Email already exists".to_string()));
        }
        self.put_user(user).await?;
        tracing::info!(user_id = %user.id, "User created");
        Ok(())
    }

    async fn replace_user(&self, user: &User, expected_version: u64) -> Result<(), AppError> {
        self.replace_versioned(
            collections::USERS,
            "User",
            &user.id,
            user,
            expected_version,
            |u: &User| u.version,
        )
        .await
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .order_by([("created_at", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn delete_user(&self, user_id: &str) -> Result<bool, AppError> {
        if self.get_user(user_id).await?.is_none() {
            return Ok(false);
        }
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::USERS)
            .document_id(user_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(true)
    }

    // ─── Course Operations ───────────────────────────────────────

    async fn get_course(&self, course_id: &str) -> Result<Option<Course>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::COURSES)
            .obj()
            .one(course_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn list_courses(&self) -> Result<Vec<Course>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::COURSES)
            .order_by([("created_at", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn insert_course(&self, course: &Course) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::COURSES)
            .document_id(&course.id)
            .object(course)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn replace_course(
        &self,
        course: &Course,
        expected_version: u64,
    ) -> Result<(), AppError> {
        self.replace_versioned(
            collections::COURSES,
            "Course",
            &course.id,
            course,
            expected_version,
            |c: &Course| c.version,
        )
        .await
    }

    async fn delete_course(&self, course_id: &str) -> Result<bool, AppError> {
        if self.get_course(course_id).await?.is_none() {
            return Ok(false);
        }
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::COURSES)
            .document_id(course_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(true)
    }

    // ─── Notification Operations ─────────────────────────────────

    async fn insert_notification(&self, notification: &Notification) -> Result<(), AppError> {
        self.upsert_notification(notification).await
    }

    async fn list_notifications(&self) -> Result<Vec<Notification>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::NOTIFICATIONS)
            .order_by([("created_at", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn upsert_notification(&self, notification: &Notification) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::NOTIFICATIONS)
            .document_id(&notification.id)
            .object(notification)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn get_notification(
        &self,
        notification_id: &str,
    ) -> Result<Option<Notification>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::NOTIFICATIONS)
            .obj()
            .one(notification_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn delete_notification(&self, notification_id: &str) -> Result<bool, AppError> {
        if self.get_notification(notification_id).await?.is_none() {
            return Ok(false);
        }
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::NOTIFICATIONS)
            .document_id(notification_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(true)
    }
}
