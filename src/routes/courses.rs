// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Course catalog, teaser, content and admin course routes.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::middleware::policy::{enforce, Action};
use crate::models::{Course, CourseDraft, CoursePreview};
use crate::routes::{api_path, MessageResponse, ValidJson};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::{Extensions, StatusCode},
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

/// Cached public reads.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(&api_path("/get-course/{id}"), get(get_course))
        .route(&api_path("/get-courses"), get(get_courses))
}

/// Full content; served behind optional authentication.
pub fn content_routes() -> Router<Arc<AppState>> {
    Router::new().route(&api_path("/get-course-content/{id}"), get(get_course_content))
}

/// Admin course management.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &api_path("/create-course"),
            post(create_course).route_layer(from_fn_with_state(Action::CreateCourse, enforce)),
        )
        .route(
            &api_path("/edit-course/{id}"),
            put(edit_course).route_layer(from_fn_with_state(Action::EditCourse, enforce)),
        )
        .route(
            &api_path("/delete-course/{id}"),
            delete(delete_course).route_layer(from_fn_with_state(Action::DeleteCourse, enforce)),
        )
        .route(
            &api_path("/get-admin-courses"),
            get(get_admin_courses)
                .route_layer(from_fn_with_state(Action::ListAllCourses, enforce)),
        )
}

// ─── Public ──────────────────────────────────────────────────

#[derive(Serialize)]
pub struct CoursePreviewResponse {
    pub success: bool,
    pub course: CoursePreview,
}

async fn get_course(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<String>,
) -> Result<Json<CoursePreviewResponse>> {
    let course = state.content_cache.course(&course_id).await?;
    Ok(Json(CoursePreviewResponse {
        success: true,
        course,
    }))
}

#[derive(Serialize)]
pub struct CatalogResponse {
    pub success: bool,
    pub courses: Vec<CoursePreview>,
}

async fn get_courses(State(state): State<Arc<AppState>>) -> Result<Json<CatalogResponse>> {
    let courses = state.content_cache.catalog().await?;
    Ok(Json(CatalogResponse {
        success: true,
        courses,
    }))
}

// ─── Entitled Content ────────────────────────────────────────

#[derive(Serialize)]
pub struct CourseContentResponse {
    pub success: bool,
    pub content: Course,
}

/// Never cached: the answer depends on the caller's current purchases.
async fn get_course_content(
    State(state): State<Arc<AppState>>,
    extensions: Extensions,
    Path(course_id): Path<String>,
) -> Result<Json<CourseContentResponse>> {
    let identity = extensions.get::<AuthUser>().map(|auth| &auth.user);
    let content = state
        .entitlements
        .check(identity, &course_id)
        .await?
        .into_course()?;

    Ok(Json(CourseContentResponse {
        success: true,
        content,
    }))
}

// ─── Admin ───────────────────────────────────────────────────

#[derive(Serialize)]
pub struct CourseResponse {
    pub success: bool,
    pub course: Course,
}

async fn create_course(
    State(state): State<Arc<AppState>>,
    ValidJson(draft): ValidJson<CourseDraft>,
) -> Result<(StatusCode, Json<CourseResponse>)> {
    let course = state.courses.create(draft).await?;
    Ok((
        StatusCode::CREATED,
        Json(CourseResponse {
            success: true,
            course,
        }),
    ))
}

async fn edit_course(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<String>,
    ValidJson(draft): ValidJson<CourseDraft>,
) -> Result<Json<CourseResponse>> {
    let course = state.courses.edit(&course_id, draft).await?;
    Ok(Json(CourseResponse {
        success: true,
        course,
    }))
}

async fn delete_course(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<String>,
) -> Result<Json<MessageResponse>> {
    state.courses.delete(&course_id).await?;
    Ok(MessageResponse::ok("Course deleted successfully"))
}

#[derive(Serialize)]
pub struct AdminCoursesResponse {
    pub success: bool,
    pub courses: Vec<Course>,
}

async fn get_admin_courses(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AdminCoursesResponse>> {
    let courses = state.courses.list_all().await?;
    Ok(Json(AdminCoursesResponse {
        success: true,
        courses,
    }))
}
