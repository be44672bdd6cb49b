// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running
//! (FIRESTORE_EMULATOR_HOST). They are skipped otherwise.

use elearning::db::Database;
use elearning::error::AppError;
use elearning::models::{Course, Notification, NotificationStatus, User};

mod common;
use common::test_db;

fn unique_id(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4())
}

fn test_course(id: &str) -> Course {
    Course {
        id: id.to_string(),
        name: "Emulator course".to_string(),
        description: "Stored in Firestore".to_string(),
        price: 10.0,
        created_at: "2026-01-01T00:00:00.000Z".to_string(),
        updated_at: "2026-01-01T00:00:00.000Z".to_string(),
        ..Default::default()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// USER TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_user_roundtrip_and_email_lookup() {
    require_emulator!();

    let db = test_db().await;
    let email = format!("{}@example.com", unique_id("user"));
    let user = User::new("Ada".to_string(), email.clone(), None, "2026-01-01T00:00:00.000Z");

    assert!(db.get_user(&user.id).await.unwrap().is_none());
    db.insert_user(&user).await.unwrap();

    let loaded = db.get_user(&user.id).await.unwrap().unwrap();
    assert_eq!(loaded.email, email);
    let found = db.find_user_by_email(&email.to_uppercase()).await.unwrap();
    assert_eq!(found.map(|u| u.id), Some(user.id.clone()));

    assert!(db.delete_user(&user.id).await.unwrap());
    assert!(!db.delete_user(&user.id).await.unwrap());
}

#[tokio::test]
async fn test_duplicate_email_rejected() {
    require_emulator!();

    let db = test_db().await;
    let email = format!("{}@example.com", unique_id("dup"));
    let first = User::new("A".to_string(), email.clone(), None, "2026-01-01T00:00:00.000Z");
    let second = User::new("B".to_string(), email, None, "2026-01-01T00:00:00.000Z");

    db.insert_user(&first).await.unwrap();
    let result = db.insert_user(&second).await;

    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_replace_user_checks_version() {
    require_emulator!();

    let db = test_db().await;
    let email = format!("{}@example.com", unique_id("ver"));
    let mut user = User::new("Ada".to_string(), email, None, "2026-01-01T00:00:00.000Z");
    db.insert_user(&user).await.unwrap();

    user.version = 1;
    user.courses.push("c1".to_string());
    db.replace_user(&user, 0).await.unwrap();

    let mut stale = user.clone();
    stale.courses = vec!["c2".to_string()];
    let result = db.replace_user(&stale, 0).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    let stored = db.get_user(&user.id).await.unwrap().unwrap();
    assert_eq!(stored.courses, ["c1"]);
}

// ═══════════════════════════════════════════════════════════════════════════
// COURSE TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_replace_course_checks_version() {
    require_emulator!();

    let db = test_db().await;
    let mut course = test_course(&unique_id("course"));
    db.insert_course(&course).await.unwrap();

    course.version = 1;
    course.rating = 4.0;
    db.replace_course(&course, 0).await.unwrap();

    // A writer that still thinks the version is 0 loses
    let mut stale = course.clone();
    stale.version = 1;
    let result = db.replace_course(&stale, 0).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    let stored = db.get_course(&course.id).await.unwrap().unwrap();
    assert_eq!(stored.version, 1);
    assert_eq!(stored.rating, 4.0);

    assert!(db.delete_course(&course.id).await.unwrap());
    assert!(db.get_course(&course.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_interleaved_course_writers_cannot_both_commit() {
    require_emulator!();

    let db = test_db().await;
    let course = test_course(&unique_id("race"));
    db.insert_course(&course).await.unwrap();

    // Both writers read version 0 and race to write version 1
    let mut first = course.clone();
    first.version = 1;
    first.rating = 1.0;
    let mut second = course.clone();
    second.version = 1;
    second.rating = 5.0;

    let (a, b) = tokio::join!(
        db.replace_course(&first, 0),
        db.replace_course(&second, 0)
    );
    assert_eq!(
        [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(),
        1,
        "exactly one writer must win: {a:?} {b:?}"
    );

    let stored = db.get_course(&course.id).await.unwrap().unwrap();
    assert_eq!(stored.version, 1);
    let winner = if a.is_ok() { &first } else { &second };
    assert_eq!(stored.rating, winner.rating);
}

#[tokio::test]
async fn test_replace_missing_course_not_found() {
    require_emulator!();

    let db = test_db().await;
    let course = test_course(&unique_id("missing"));

    let result = db.replace_course(&course, 0).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

// ═══════════════════════════════════════════════════════════════════════════
// NOTIFICATION TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_notification_status_update() {
    require_emulator!();

    let db = test_db().await;
    let mut notification = Notification::new(
        &unique_id("user"),
        "New Order",
        "You have a new order".to_string(),
        "2026-01-01T00:00:00.000Z",
    );
    db.insert_notification(&notification).await.unwrap();

    notification.status = NotificationStatus::Read;
    db.upsert_notification(&notification).await.unwrap();

    let stored = db.get_notification(&notification.id).await.unwrap().unwrap();
    assert_eq!(stored.status, NotificationStatus::Read);

    assert!(db.delete_notification(&notification.id).await.unwrap());
    assert!(db.get_notification(&notification.id).await.unwrap().is_none());
}
