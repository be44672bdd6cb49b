// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Questions, answers, reviews and review replies.
//!
//! Threads live inside the course document, so every write is a versioned
//! course update. Notifications and mail are spawned after the write and
//! never affect its result.

use crate::error::AppError;
use crate::models::{Author, Course, Notification, Question, Reply, Review, SessionUser};
use crate::services::courses::CourseService;
use crate::services::notifier::{Mail, Notifier};
use crate::time_utils::now_rfc3339;

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

#[derive(Clone)]
pub struct DiscussionService {
    courses: CourseService,
    notifier: Notifier,
}

impl DiscussionService {
    pub fn new(courses: CourseService, notifier: Notifier) -> Self {
        Self { courses, notifier }
    }

    /// Ask a question about one content section.
    pub async fn add_question(
        &self,
        user: &SessionUser,
        course_id: &str,
        section_id: &str,
        body: &str,
    ) -> Result<Question, AppError> {
        let author = Author::from(user);
        let (_, (question, section_title)) = self
            .courses
            .update(course_id, |course| {
                let section = course
                    .section_mut(section_id)
                    .ok_or_else(|| AppError::Validation("Invalid content id".to_string()))?;
                let question = Question::new(author.clone(), body.to_string(), &now_rfc3339());
                section.questions.push(question.clone());
                Ok((question, section.title.clone()))
            })
            .await?;

        tracing::info!(course_id, section_id, question_id = %question.id, "Question added");
        self.notifier.notify(Notification::new(
            &user.id,
            "New Question Received",
            format!("You have a new question in {}", section_title),
            &now_rfc3339(),
        ));

        Ok(question)
    }

    /// Reply to a question. Returns the question with its replies in
    /// insertion order.
    pub async fn add_answer(
        &self,
        user: &SessionUser,
        course_id: &str,
        section_id: &str,
        question_id: &str,
        body: &str,
    ) -> Result<Question, AppError> {
        let author = Author::from(user);
        let (_, (question, section_title)) = self
            .courses
            .update(course_id, |course| {
                let section = course
                    .section_mut(section_id)
                    .ok_or_else(|| AppError::Validation("Invalid content id".to_string()))?;
                let question = section
                    .questions
                    .iter_mut()
                    .find(|q| q.id == question_id)
                    .ok_or_else(|| AppError::Validation("Invalid question id".to_string()))?;
                question.push_reply(Reply::new(author.clone(), body.to_string(), &now_rfc3339()));
                Ok((question.clone(), section.title.clone()))
            })
            .await?;

        tracing::info!(course_id, question_id, replies = question.replies.len(), "Answer added");
        self.notifier.notify(Notification::new(
            &user.id,
            "New Question Reply Received",
            format!("You have a new question reply in {}", section_title),
            &now_rfc3339(),
        ));
        if question.user.id != user.id {
            self.notifier.email(Mail {
                to: question.user.email.clone(),
                subject: "Question Reply".to_string(),
                body: format!(
                    "Hi {}, {} replied to your question in {}:\n\n{}",
                    question.user.name, user.name, section_title, body
                ),
            });
        }

        Ok(question)
    }

    /// Add a review and recompute the course rating from all reviews.
    ///
    /// The caller checks entitlement.
    pub async fn add_review(
        &self,
        user: &SessionUser,
        course_id: &str,
        rating: u8,
        comment: &str,
    ) -> Result<Course, AppError> {
        if !(MIN_RATING..=MAX_RATING).contains(&rating) {
            return Err(AppError::Validation(format!(
                "Rating must be between {} and {}",
                MIN_RATING, MAX_RATING
            )));
        }

        let author = Author::from(user);
        let (course, ()) = self
            .courses
            .update(course_id, |course| {
                course.reviews.push(Review::new(
                    author.clone(),
                    rating,
                    comment.to_string(),
                    &now_rfc3339(),
                ));
                course.recompute_rating();
                Ok(())
            })
            .await?;

        tracing::info!(course_id, rating, average = course.rating, "Review added");
        self.notifier.notify(Notification::new(
            &user.id,
            "New Review Received",
            format!("{} has given a review in {}", user.name, course.name),
            &now_rfc3339(),
        ));

        Ok(course)
    }

    /// Staff reply to a review.
    pub async fn add_review_reply(
        &self,
        user: &SessionUser,
        course_id: &str,
        review_id: &str,
        body: &str,
    ) -> Result<Review, AppError> {
        let author = Author::from(user);
        let (_, review) = self
            .courses
            .update(course_id, |course| {
                let review = course
                    .review_mut(review_id)
                    .ok_or_else(|| AppError::NotFound("Review not found".to_string()))?;
                review.push_reply(Reply::new(author.clone(), body.to_string(), &now_rfc3339()));
                Ok(review.clone())
            })
            .await?;

        tracing::info!(course_id, review_id, "Review reply added");
        Ok(review)
    }
}
