// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fire-and-forget notifications and mail.
//!
//! Failures are logged and swallowed. Nothing here can fail or roll back the
//! write that triggered it.

use crate::db::Database;
use crate::error::AppError;
use crate::models::{Notification, NotificationStatus};
use crate::time_utils::format_utc_rfc3339;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Read notifications older than this are purged.
pub const READ_NOTIFICATION_RETENTION: Duration = Duration::from_secs(30 * 24 * 60 * 60);

#[derive(Debug, Clone, PartialEq)]
pub struct Mail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Outgoing mail transport.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: Mail) -> Result<(), AppError>;
}

/// Writes mail to the log instead of delivering it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: Mail) -> Result<(), AppError> {
        tracing::info!(to = %mail.to, subject = %mail.subject, "Mail dispatched");
        tracing::debug!(body = %mail.body, "Mail body");
        Ok(())
    }
}

#[derive(Clone)]
pub struct Notifier {
    db: Arc<dyn Database>,
    mailer: Arc<dyn Mailer>,
}

impl Notifier {
    pub fn new(db: Arc<dyn Database>, mailer: Arc<dyn Mailer>) -> Self {
        Self { db, mailer }
    }

    pub fn mailer(&self) -> &Arc<dyn Mailer> {
        &self.mailer
    }

    /// Store a notification in the background.
    pub fn notify(&self, notification: Notification) -> JoinHandle<()> {
        let db = self.db.clone();
        tokio::spawn(async move {
            if let Err(e) = db.insert_notification(&notification).await {
                tracing::warn!(
                    title = %notification.title,
                    error = %e,
                    "Failed to store notification"
                );
            }
        })
    }

    /// Delete read notifications created more than `retention` ago.
    /// Returns how many were removed.
    pub async fn purge_read(&self, retention: Duration) -> Result<usize, AppError> {
        let retention = chrono::Duration::from_std(retention)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Bad retention: {}", e)))?;
        let cutoff = format_utc_rfc3339(chrono::Utc::now() - retention);

        let mut purged = 0;
        for notification in self.db.list_notifications().await? {
            let expired =
                notification.status == NotificationStatus::Read && notification.created_at < cutoff;
            if expired && self.db.delete_notification(&notification.id).await? {
                purged += 1;
            }
        }

        if purged > 0 {
            tracing::info!(purged, "Purged read notifications");
        }
        Ok(purged)
    }

    /// Send mail in the background.
    pub fn email(&self, mail: Mail) -> JoinHandle<()> {
        let mailer = self.mailer.clone();
        tokio::spawn(async move {
            let to = mail.to.clone();
            if let Err(e) = mailer.send(mail).await {
                tracing::warn!(to = %to, error = %e, "Failed to send mail");
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDb;

    struct BrokenMailer;

    #[async_trait]
    impl Mailer for BrokenMailer {
        async fn send(&self, _mail: Mail) -> Result<(), AppError> {
            Err(AppError::UpstreamFailure("smtp down".to_string()))
        }
    }

    #[tokio::test]
    async fn test_notify_stores_record() {
        let db = Arc::new(MemoryDb::new());
        let notifier = Notifier::new(db.clone(), Arc::new(LogMailer));

        notifier
            .notify(Notification::new("u1", "New Order", "hello".to_string(), "t0"))
            .await
            .unwrap();

        assert_eq!(db.list_notifications().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_mail_failure_is_swallowed() {
        let notifier = Notifier::new(Arc::new(MemoryDb::new()), Arc::new(BrokenMailer));

        let handle = notifier.email(Mail {
            to: "a@example.com".to_string(),
            subject: "Hi".to_string(),
            body: "Body".to_string(),
        });

        assert!(handle.await.is_ok());
    }

    #[tokio::test]
    async fn test_purge_only_old_read_notifications() {
        let db = Arc::new(MemoryDb::new());
        let notifier = Notifier::new(db.clone(), Arc::new(LogMailer));

        let long_ago = "2020-01-01T00:00:00.000Z";
        let mut old_read = Notification::new("u1", "Old", "read".to_string(), long_ago);
        old_read.status = NotificationStatus::Read;
        let old_unread = Notification::new("u1", "Old", "unread".to_string(), long_ago);
        let now = crate::time_utils::now_rfc3339();
        let mut fresh_read = Notification::new("u1", "New", "read".to_string(), &now);
        fresh_read.status = NotificationStatus::Read;
        for n in [&old_read, &old_unread, &fresh_read] {
            db.insert_notification(n).await.unwrap();
        }

        let purged = notifier.purge_read(READ_NOTIFICATION_RETENTION).await.unwrap();
        assert_eq!(purged, 1);
        assert!(db.get_notification(&old_read.id).await.unwrap().is_none());
        assert_eq!(db.list_notifications().await.unwrap().len(), 2);
    }
}
