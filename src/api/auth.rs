// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login, registration and logout.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use super::{now_rfc3339, required};
use crate::{
    auth::Auth,
    backend::mirror_insert,
    error::{ApiError, ErrorBody},
    models::{
        LoginRequest, LoginResponse, MessageResponse, ProfileRecord, RegisterRequest,
        RegisterResponse, UserMetadata,
    },
    state::AppState,
};

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    tag = "Auth",
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 400, description = "Email or password missing", body = ErrorBody),
        (status = 401, description = "Credentials rejected by the identity backend", body = ErrorBody),
        (status = 500, description = "Identity backend unavailable", body = ErrorBody)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(request) = payload?;
    let (Some(email), Some(password)) = (required(request.email), required(request.password))
    else {
        return Err(ApiError::bad_request("Email and password are required"));
    };

    let (user, session) = state
        .backend
        .sign_in_with_password(&email, &password)
        .await
        .map_err(|e| ApiError::from_backend(e, StatusCode::UNAUTHORIZED))?;

    info!(user_id = %user.id, "user signed in");
    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        user,
        session,
    }))
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    tag = "Auth",
    responses(
        (status = 201, description = "Account created (user may be null pending confirmation)", body = RegisterResponse),
        (status = 400, description = "Missing fields or rejected by the identity backend", body = ErrorBody),
        (status = 500, description = "Identity backend unavailable", body = ErrorBody)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let Json(request) = payload?;
    let (Some(email), Some(password)) = (required(request.email), required(request.password))
    else {
        return Err(ApiError::bad_request("Email and password are required"));
    };

    let created_at = now_rfc3339();
    let metadata = UserMetadata {
        username: request.username.clone(),
        full_name: request.full_name.clone(),
        phone: request.phone.clone(),
        created_at: Some(created_at.clone()),
        ..Default::default()
    };

    let user = state
        .backend
        .sign_up(&email, &password, metadata)
        .await
        .map_err(|e| ApiError::from_backend(e, StatusCode::BAD_REQUEST))?;

    match user.as_ref().filter(|user| !user.id.is_empty()) {
        Some(user) => {
            info!(user_id = %user.id, "user registered");
            mirror_insert(
                state.profiles.as_ref(),
                ProfileRecord {
                    id: user.id.clone(),
                    username: request.username,
                    full_name: request.full_name,
                    email: Some(email),
                    phone: request.phone,
                    avatar_url: None,
                    created_at: Some(created_at),
                    updated_at: None,
                },
            )
            .await;
        }
        None => info!("sign-up accepted without a user; skipping profile mirror"),
    }

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".to_string(),
            user,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Session invalidated", body = MessageResponse),
        (status = 400, description = "Sign-out rejected by the identity backend", body = ErrorBody),
        (status = 401, description = "Missing or malformed bearer token", body = ErrorBody),
        (status = 403, description = "Invalid or expired token", body = ErrorBody),
        (status = 500, description = "Identity backend unavailable", body = ErrorBody)
    )
)]
pub async fn logout(
    Auth(auth): Auth,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, ApiError> {
    // A token being signed out is never served from the cache again,
    // whatever the backend answers.
    state.forget_token(&auth.access_token).await;
    state
        .backend
        .sign_out(&auth.access_token)
        .await
        .map_err(|e| ApiError::from_backend(e, StatusCode::BAD_REQUEST))?;

    info!(user_id = %auth.user.id, "user signed out");
    Ok(Json(MessageResponse::new("Logged out successfully")))
}
