// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Bearer-token gate for the protected endpoints.
//!
//! ## Auth Flow
//!
//! 1. Client signs in through `POST /api/auth/login` and keeps the session
//! 2. Client sends `Authorization: Bearer <access_token>`
//! 3. Gateway:
//!    - Extracts the token (401 if absent or malformed)
//!    - Asks the identity backend who owns it (403 if rejected)
//!    - Attaches the resolved user to the request
//!
//! ## Security
//!
//! - Tokens are never verified locally; the backend is the only authority
//! - The optional token cache only holds backend-validated tokens and never
//!   keeps one past its expiry

pub mod cache;
pub mod error;
pub mod extractor;
pub mod middleware;

use std::fmt;

use crate::models::User;

pub use cache::TokenCache;
pub use error::AuthError;
pub use extractor::Auth;
pub use middleware::{authenticate, require_auth};

/// Identity resolved by the auth gate for the current request.
#[derive(Clone)]
pub struct AuthenticatedUser {
    /// User record as returned by the identity backend.
    pub user: User,
    /// The bearer token the request was authenticated with.
    pub access_token: String,
}

impl AuthenticatedUser {
    pub fn new(user: User, access_token: impl Into<String>) -> Self {
        Self {
            user,
            access_token: access_token.into(),
        }
    }
}

// Keep bearer tokens out of logs.
impl fmt::Debug for AuthenticatedUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatedUser")
            .field("user_id", &self.user.id)
            .field("access_token", &"<redacted>")
            .finish()
    }
}
