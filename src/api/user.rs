// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Self-service profile and password updates.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use super::{now_rfc3339, required};
use crate::{
    auth::Auth,
    backend::mirror_update,
    error::{ApiError, ErrorBody},
    models::{
        MessageResponse, ProfileUpdate, UpdatePasswordRequest, UpdateProfileRequest,
        UserAttributes, UserMetadata, UserResponse,
    },
    state::AppState,
};

/// Update the caller's profile metadata.
///
/// Fields left out of the request are not sent to the backend; merging
/// with the stored values is the backend's job.
#[utoipa::path(
    put,
    path = "/api/user/profile",
    request_body = UpdateProfileRequest,
    tag = "User",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 400, description = "Rejected by the identity backend", body = ErrorBody),
        (status = 401, description = "Missing or malformed bearer token", body = ErrorBody),
        (status = 403, description = "Invalid or expired token", body = ErrorBody),
        (status = 500, description = "Identity backend unavailable", body = ErrorBody)
    )
)]
pub async fn update_profile(
    Auth(auth): Auth,
    State(state): State<AppState>,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    let Json(request) = payload?;
    let updated_at = now_rfc3339();

    let attributes = UserAttributes {
        password: None,
        data: Some(UserMetadata {
            username: request.username.clone(),
            full_name: request.full_name.clone(),
            avatar_url: request.avatar_url.clone(),
            phone: request.phone.clone(),
            updated_at: Some(updated_at.clone()),
            ..Default::default()
        }),
    };

    let user = state
        .backend
        .update_user(&auth.access_token, attributes)
        .await
        .map_err(|e| ApiError::from_backend(e, StatusCode::BAD_REQUEST))?;
    state.forget_token(&auth.access_token).await;

    mirror_update(
        state.profiles.as_ref(),
        &auth.user.id,
        ProfileUpdate {
            username: request.username,
            full_name: request.full_name,
            avatar_url: request.avatar_url,
            phone: request.phone,
            updated_at: Some(updated_at),
        },
    )
    .await;

    info!(user_id = %auth.user.id, "profile updated");
    Ok(Json(UserResponse {
        message: "Profile updated successfully".to_string(),
        user,
    }))
}

#[utoipa::path(
    put,
    path = "/api/user/password",
    request_body = UpdatePasswordRequest,
    tag = "User",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Password missing or rejected by the identity backend", body = ErrorBody),
        (status = 401, description = "Missing or malformed bearer token", body = ErrorBody),
        (status = 403, description = "Invalid or expired token", body = ErrorBody),
        (status = 500, description = "Identity backend unavailable", body = ErrorBody)
    )
)]
pub async fn update_password(
    Auth(auth): Auth,
    State(state): State<AppState>,
    payload: Result<Json<UpdatePasswordRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(request) = payload?;
    let Some(password) = required(request.password) else {
        return Err(ApiError::bad_request("Password is required"));
    };

    state
        .backend
        .update_user(
            &auth.access_token,
            UserAttributes {
                password: Some(password),
                data: None,
            },
        )
        .await
        .map_err(|e| ApiError::from_backend(e, StatusCode::BAD_REQUEST))?;
    state.forget_token(&auth.access_token).await;

    info!(user_id = %auth.user.id, "password changed");
    Ok(Json(MessageResponse::new("Password updated successfully")))
}
