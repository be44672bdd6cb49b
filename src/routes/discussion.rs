// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Course Q&A and review routes.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::middleware::policy::{authorize, enforce, Action};
use crate::models::{AnswerStatus, Course, Question, Review};
use crate::routes::{api_path, ValidJson};
use crate::AppState;
use axum::{
    extract::{Path, State},
    middleware::from_fn_with_state,
    routing::put,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &api_path("/add-question"),
            put(add_question).route_layer(from_fn_with_state(Action::AddQuestion, enforce)),
        )
        .route(
            &api_path("/add-answer"),
            put(add_answer).route_layer(from_fn_with_state(Action::AddAnswer, enforce)),
        )
        .route(
            &api_path("/add-review/{id}"),
            put(add_review).route_layer(from_fn_with_state(Action::AddReview, enforce)),
        )
        .route(
            &api_path("/add-reply"),
            put(add_reply).route_layer(from_fn_with_state(Action::ReplyToReview, enforce)),
        )
}

/// A question plus its derived answered state.
#[derive(Serialize)]
pub struct QuestionResponse {
    pub success: bool,
    pub question: Question,
    pub status: AnswerStatus,
}

impl QuestionResponse {
    fn new(question: Question) -> Json<Self> {
        Json(Self {
            success: true,
            status: question.status(),
            question,
        })
    }
}

#[derive(Deserialize, Validate)]
pub struct AddQuestionRequest {
    #[validate(length(min = 1))]
    pub course_id: String,
    #[validate(length(min = 1))]
    pub content_id: String,
    #[validate(length(min = 1, max = 5000))]
    pub question: String,
}

async fn add_question(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ValidJson(req): ValidJson<AddQuestionRequest>,
) -> Result<Json<QuestionResponse>> {
    let question = state
        .discussion
        .add_question(&auth.user, &req.course_id, &req.content_id, &req.question)
        .await?;
    Ok(QuestionResponse::new(question))
}

#[derive(Deserialize, Validate)]
pub struct AddAnswerRequest {
    #[validate(length(min = 1))]
    pub course_id: String,
    #[validate(length(min = 1))]
    pub content_id: String,
    #[validate(length(min = 1))]
    pub question_id: String,
    #[validate(length(min = 1, max = 5000))]
    pub answer: String,
}

async fn add_answer(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ValidJson(req): ValidJson<AddAnswerRequest>,
) -> Result<Json<QuestionResponse>> {
    let question = state
        .discussion
        .add_answer(
            &auth.user,
            &req.course_id,
            &req.content_id,
            &req.question_id,
            &req.answer,
        )
        .await?;
    Ok(QuestionResponse::new(question))
}

#[derive(Deserialize, Validate)]
pub struct AddReviewRequest {
    #[validate(range(min = 1, max = 5))]
    pub rating: u8,
    #[validate(length(min = 1, max = 5000))]
    pub review: String,
}

#[derive(Serialize)]
pub struct ReviewedCourseResponse {
    pub success: bool,
    pub course: Course,
}

async fn add_review(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(course_id): Path<String>,
    ValidJson(req): ValidJson<AddReviewRequest>,
) -> Result<Json<ReviewedCourseResponse>> {
    authorize(&auth.user, Action::AddReview, Some(&course_id))?;

    let course = state
        .discussion
        .add_review(&auth.user, &course_id, req.rating, &req.review)
        .await?;
    Ok(Json(ReviewedCourseResponse {
        success: true,
        course,
    }))
}

#[derive(Deserialize, Validate)]
pub struct AddReplyRequest {
    #[validate(length(min = 1))]
    pub course_id: String,
    #[validate(length(min = 1))]
    pub review_id: String,
    #[validate(length(min = 1, max = 5000))]
    pub comment: String,
}

#[derive(Serialize)]
pub struct ReviewResponse {
    pub success: bool,
    pub review: Review,
}

async fn add_reply(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ValidJson(req): ValidJson<AddReplyRequest>,
) -> Result<Json<ReviewResponse>> {
    let review = state
        .discussion
        .add_review_reply(&auth.user, &req.course_id, &req.review_id, &req.comment)
        .await?;
    Ok(Json(ReviewResponse {
        success: true,
        review,
    }))
}
