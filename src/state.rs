// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::TokenCache;
use crate::backend::{IdentityBackend, ProfileStore};

/// Shared handler state. Everything inside is immutable or internally
/// synchronized, so cloning per request is cheap.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn IdentityBackend>,
    pub profiles: Arc<dyn ProfileStore>,
    pub token_cache: Option<Arc<TokenCache>>,
}

impl AppState {
    pub fn new(backend: Arc<dyn IdentityBackend>, profiles: Arc<dyn ProfileStore>) -> Self {
        Self {
            backend,
            profiles,
            token_cache: None,
        }
    }

    pub fn with_token_cache(mut self, cache: TokenCache) -> Self {
        self.token_cache = Some(Arc::new(cache));
        self
    }

    /// Drop any cached validation of `token`.
    pub async fn forget_token(&self, token: &str) {
        if let Some(cache) = &self.token_cache {
            cache.evict(token).await;
        }
    }
}
