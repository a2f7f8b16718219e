// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Identity Backend
//!
//! The gateway delegates every identity decision to a managed backend. This
//! module defines the narrow seam the handlers depend on:
//!
//! - [`IdentityBackend`]: sign-in, sign-up, sign-out, self-update and token
//!   resolution
//! - [`ProfileStore`]: best-effort writes to the denormalized profile table
//!
//! Implementations:
//!
//! - `remote` - GoTrue/PostgREST-compatible HTTP client
//! - `memory` - in-process fake, compiled for tests only

#[cfg(test)]
pub mod memory;
pub mod profiles;
pub mod remote;

use async_trait::async_trait;

use crate::models::{Session, User, UserAttributes, UserMetadata};

#[cfg(test)]
pub use memory::{BackendCall, MemoryBackend, MemoryProfileStore};
pub use profiles::{mirror_insert, mirror_update, MirrorError, ProfileStore};
pub use remote::{RemoteIdentityBackend, RemoteProfileStore};

/// Failure reported by the identity backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The backend understood the request and refused it (bad credentials,
    /// duplicate account, weak password, expired token).
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// The backend could not be reached or failed on its side.
    #[error("identity backend request failed: {0}")]
    Transport(String),

    /// The backend answered with a body we could not interpret.
    #[error("identity backend response was invalid: {0}")]
    InvalidResponse(String),
}

impl BackendError {
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }
}

/// Operations the gateway consumes from the identity backend.
///
/// User-scoped operations take the caller's access token explicitly; the
/// gateway keeps no session context of its own.
#[async_trait]
pub trait IdentityBackend: Send + Sync {
    /// Exchange email and password for a user and a fresh session.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(User, Session), BackendError>;

    /// Create an account. Returns `None` when the backend accepted the
    /// request without producing a user (e.g. pending confirmation).
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: UserMetadata,
    ) -> Result<Option<User>, BackendError>;

    /// Invalidate the session behind `access_token`.
    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError>;

    /// Update the password and/or metadata of the token's owner.
    async fn update_user(
        &self,
        access_token: &str,
        attributes: UserAttributes,
    ) -> Result<User, BackendError>;

    /// Resolve an access token to its user.
    async fn get_user(&self, access_token: &str) -> Result<User, BackendError>;
}
