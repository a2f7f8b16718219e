// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Best-effort profile mirror.
//!
//! Writes to the profile table never influence the HTTP outcome. The
//! helpers here await the write, log a failure, and return `()` so the
//! error cannot travel through the handler's result channel.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::models::{ProfileRecord, ProfileUpdate};

/// Profile store write failure. Logged, never surfaced to callers.
#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    #[error("profile store rejected the write: {0}")]
    Rejected(String),

    #[error("profile store unreachable: {0}")]
    Transport(String),
}

/// Secondary store holding denormalized profile rows.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn insert(&self, record: ProfileRecord) -> Result<(), MirrorError>;

    async fn update(&self, id: &str, fields: ProfileUpdate) -> Result<(), MirrorError>;
}

/// Insert a profile row, logging any failure.
pub async fn mirror_insert(store: &dyn ProfileStore, record: ProfileRecord) {
    let user_id = record.id.clone();
    match store.insert(record).await {
        Ok(()) => debug!(%user_id, "profile mirror inserted"),
        Err(e) => warn!(%user_id, error = %e, "Failed to insert profile mirror record"),
    }
}

/// Update a profile row, logging any failure.
pub async fn mirror_update(store: &dyn ProfileStore, id: &str, fields: ProfileUpdate) {
    match store.update(id, fields).await {
        Ok(()) => debug!(user_id = %id, "profile mirror updated"),
        Err(e) => warn!(user_id = %id, error = %e, "Failed to update profile mirror record"),
    }
}
