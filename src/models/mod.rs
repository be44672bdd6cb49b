// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod course;
pub mod discussion;
pub mod notification;
pub mod user;

pub use course::{
    ContentSection, Course, CourseDraft, CoursePreview, Link, SectionDraft, SectionPreview,
};
pub use discussion::{
    AnswerStatus, Author, PublicAuthor, Question, Reply, ReplyPreview, Review, ReviewPreview,
};
pub use notification::{Notification, NotificationStatus};
pub use user::{Role, SessionUser, User};
