// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin notification dashboard.

use crate::error::{AppError, Result};
use crate::middleware::policy::{enforce, Action};
use crate::models::{Notification, NotificationStatus};
use crate::routes::api_path;
use crate::AppState;
use axum::{
    extract::{Path, State},
    middleware::from_fn_with_state,
    routing::{get, put},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &api_path("/get-all-notifications"),
            get(get_notifications)
                .route_layer(from_fn_with_state(Action::ListNotifications, enforce)),
        )
        .route(
            &api_path("/update-notification/{id}"),
            put(update_notification)
                .route_layer(from_fn_with_state(Action::UpdateNotification, enforce)),
        )
}

#[derive(Serialize)]
pub struct NotificationsResponse {
    pub success: bool,
    pub notifications: Vec<Notification>,
}

async fn get_notifications(
    State(state): State<Arc<AppState>>,
) -> Result<Json<NotificationsResponse>> {
    Ok(Json(NotificationsResponse {
        success: true,
        notifications: state.db.list_notifications().await?,
    }))
}

/// Mark one notification read and return the refreshed list.
async fn update_notification(
    State(state): State<Arc<AppState>>,
    Path(notification_id): Path<String>,
) -> Result<Json<NotificationsResponse>> {
    let mut notification = state
        .db
        .get_notification(&notification_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))?;

    notification.status = NotificationStatus::Read;
    state.db.upsert_notification(&notification).await?;

    Ok(Json(NotificationsResponse {
        success: true,
        notifications: state.db.list_notifications().await?,
    }))
}
