// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Order placement.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::middleware::policy::{enforce, Action};
use crate::models::SessionUser;
use crate::routes::{api_path, ValidJson};
use crate::AppState;
use axum::{
    extract::State, http::StatusCode, middleware::from_fn_with_state, routing::post, Extension,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route(
        &api_path("/create-order"),
        post(create_order).route_layer(from_fn_with_state(Action::PlaceOrder, enforce)),
    )
}

#[derive(Deserialize, Validate)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1))]
    pub course_id: String,
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub success: bool,
    pub course_id: String,
    pub user: SessionUser,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ValidJson(req): ValidJson<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>)> {
    let (user, course) = state.orders.create_order(&auth.id, &req.course_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderResponse {
            success: true,
            course_id: course.id,
            user,
        }),
    ))
}
