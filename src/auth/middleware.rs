// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication middleware for Axum.
//!
//! Applied with `route_layer` to the protected part of the router. A request
//! only reaches its handler after the identity backend has resolved its
//! bearer token; the resolved [`AuthenticatedUser`] is placed in the request
//! extensions for the [`Auth`](super::Auth) extractor.
//!
//! ## Outcomes
//!
//! | Situation | Result |
//! |-----------|--------|
//! | No / malformed `Authorization` header | 401, backend not called |
//! | Backend rejects the token | 403 |
//! | Backend unreachable or misbehaving | 500 |
//! | Token resolved | handler runs |

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use super::{AuthError, AuthenticatedUser};
use crate::backend::BackendError;
use crate::state::AppState;

/// Authentication middleware function.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match authenticate(request.headers(), &state).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::InvalidAuthHeader)
}

/// Resolve the request's bearer token through the identity backend.
pub async fn authenticate(
    headers: &HeaderMap,
    state: &AppState,
) -> Result<AuthenticatedUser, AuthError> {
    let token = bearer_token(headers)?;

    if let Some(cache) = &state.token_cache {
        if let Some(user) = cache.get(token).await {
            return Ok(AuthenticatedUser::new(user, token));
        }
    }

    match state.backend.get_user(token).await {
        Ok(user) => {
            if let Some(cache) = &state.token_cache {
                cache.insert(token, &user).await;
            }
            Ok(AuthenticatedUser::new(user, token))
        }
        Err(BackendError::Rejected { status, message }) => {
            debug!(status, reason = %message, "identity backend rejected bearer token");
            Err(AuthError::InvalidToken(message))
        }
        Err(other) => Err(AuthError::BackendUnavailable(other.to_string())),
    }
}
