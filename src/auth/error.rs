// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;

/// Why the auth gate refused a request.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No authorization header present
    #[error("Authorization header is required")]
    MissingAuthHeader,
    /// Header present but not `Bearer <token>`
    #[error("Invalid authorization header format (expected 'Bearer <token>')")]
    InvalidAuthHeader,
    /// The identity backend refused the token (expired, malformed, revoked)
    #[error("Invalid or expired token")]
    InvalidToken(String),
    /// The identity backend could not be asked
    #[error("Internal server error")]
    BackendUnavailable(String),
}

impl AuthError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingAuthHeader | AuthError::InvalidAuthHeader => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::InvalidToken(_) => StatusCode::FORBIDDEN,
            AuthError::BackendUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::BackendUnavailable(detail) => ApiError::internal(detail).into_response(),
            other => ApiError::new(other.status_code(), other.to_string()).into_response(),
        }
    }
}
