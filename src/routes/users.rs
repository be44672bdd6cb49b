// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile routes for the signed-in user and admin user management.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::middleware::policy::{enforce, Action};
use crate::models::{Role, SessionUser, User};
use crate::routes::{api_path, MessageResponse, ValidJson};
use crate::services::password::{hash_password, verify_password};
use crate::AppState;
use axum::{
    extract::{Path, State},
    middleware::from_fn_with_state,
    routing::{delete, get, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &api_path("/update-user-info"),
            put(update_user_info)
                .route_layer(from_fn_with_state(Action::UpdateOwnProfile, enforce)),
        )
        .route(
            &api_path("/update-user-password"),
            put(update_user_password)
                .route_layer(from_fn_with_state(Action::UpdateOwnProfile, enforce)),
        )
        .route(
            &api_path("/update-user-avatar"),
            put(update_user_avatar)
                .route_layer(from_fn_with_state(Action::UpdateOwnProfile, enforce)),
        )
        .route(
            &api_path("/get-users"),
            get(get_users).route_layer(from_fn_with_state(Action::ListUsers, enforce)),
        )
        .route(
            &api_path("/update-user-role"),
            put(update_user_role).route_layer(from_fn_with_state(Action::UpdateUserRole, enforce)),
        )
        .route(
            &api_path("/delete-user/{id}"),
            delete(delete_user).route_layer(from_fn_with_state(Action::DeleteUser, enforce)),
        )
}

#[derive(Serialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: SessionUser,
}

async fn load_user(state: &AppState, user_id: &str) -> Result<User> {
    state
        .db
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
}

/// Apply a profile change and rewrite the session snapshot.
async fn save_own_profile<F>(state: &AppState, user_id: &str, apply: F) -> Result<Json<UserResponse>>
where
    F: FnMut(&mut User) -> Result<()>,
{
    let (user, ()) = state.users.update(user_id, apply).await?;

    let session = SessionUser::from(&user);
    state.tokens.store_session(&session).await?;
    Ok(Json(UserResponse {
        success: true,
        user: session,
    }))
}

// ─── Own Profile ─────────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct UpdateInfoRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

async fn update_user_info(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ValidJson(req): ValidJson<UpdateInfoRequest>,
) -> Result<Json<UserResponse>> {
    let name = req.name.trim().to_string();
    save_own_profile(&state, &auth.id, |user| {
        user.name = name.clone();
        Ok(())
    })
    .await
}

#[derive(Deserialize, Validate)]
pub struct UpdatePasswordRequest {
    #[validate(length(min = 1))]
    pub old_password: String,
    #[validate(length(min = 6, max = 128))]
    pub new_password: String,
}

async fn update_user_password(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ValidJson(req): ValidJson<UpdatePasswordRequest>,
) -> Result<Json<UserResponse>> {
    let user = load_user(&state, &auth.id).await?;
    let hash = user.password_hash.clone().ok_or_else(|| {
        AppError::Validation("This account signs in through a social provider".to_string())
    })?;

    let verified = hash.clone();
    let new_hash = tokio::task::spawn_blocking(move || {
        if !verify_password(&req.old_password, &verified)? {
            return Ok(None);
        }
        hash_password(&req.new_password).map(Some)
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Hashing task failed: {}", e)))?
    .map_err(AppError::Internal)?
    .ok_or_else(|| AppError::Validation("Invalid old password".to_string()))?;

    let response = save_own_profile(&state, &auth.id, |user| {
        // Another password change landed since the old password was checked
        if user.password_hash.as_deref() != Some(hash.as_str()) {
            return Err(AppError::Conflict(
                "Password was changed concurrently, please retry".to_string(),
            ));
        }
        user.password_hash = Some(new_hash.clone());
        Ok(())
    })
    .await?;
    tracing::info!(user_id = %auth.id, "Password changed");
    Ok(response)
}

#[derive(Deserialize, Validate)]
pub struct UpdateAvatarRequest {
    #[validate(url)]
    pub avatar: String,
}

async fn update_user_avatar(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ValidJson(req): ValidJson<UpdateAvatarRequest>,
) -> Result<Json<UserResponse>> {
    save_own_profile(&state, &auth.id, |user| {
        user.avatar = Some(req.avatar.clone());
        Ok(())
    })
    .await
}

// ─── Admin ───────────────────────────────────────────────────

#[derive(Serialize)]
pub struct UsersResponse {
    pub success: bool,
    pub users: Vec<SessionUser>,
}

async fn get_users(State(state): State<Arc<AppState>>) -> Result<Json<UsersResponse>> {
    let mut users = state.db.list_users().await?;
    users.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(Json(UsersResponse {
        success: true,
        users: users.iter().map(SessionUser::from).collect(),
    }))
}

#[derive(Deserialize, Validate)]
pub struct UpdateRoleRequest {
    #[validate(email)]
    pub email: String,
    pub role: Role,
}

async fn update_user_role(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    ValidJson(req): ValidJson<UpdateRoleRequest>,
) -> Result<Json<UserResponse>> {
    let target = state
        .db
        .find_user_by_email(&req.email.trim().to_lowercase())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let (user, ()) = state
        .users
        .update(&target.id, |user| {
            user.role = req.role;
            Ok(())
        })
        .await?;

    // The next request of a signed-in target sees the new role
    let session = SessionUser::from(&user);
    state.tokens.refresh_session_if_present(&session).await?;

    tracing::info!(
        admin_id = %admin.id,
        user_id = %user.id,
        role = %user.role,
        "User role updated"
    );
    Ok(Json(UserResponse {
        success: true,
        user: session,
    }))
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Path(user_id): Path<String>,
) -> Result<Json<MessageResponse>> {
    if !state.db.delete_user(&user_id).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }
    state.tokens.revoke(&user_id).await?;

    tracing::info!(admin_id = %admin.id, user_id = %user_id, "User deleted");
    Ok(MessageResponse::ok("User deleted successfully"))
}
