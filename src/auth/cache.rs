// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Short-lived cache of tokens the identity backend has already validated.
//!
//! ## Rules
//!
//! - Only tokens the backend resolved successfully are inserted
//! - An entry lives for at most the configured TTL
//! - An entry never outlives the token's own `exp` claim; tokens without a
//!   readable `exp` are not cached at all
//! - Logout and self-updates evict the token
//!
//! The `exp` claim is decoded without verifying the signature. It is only
//! ever used to shorten a cache entry, never to accept a token.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::models::User;

struct CacheEntry {
    user: User,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct ExpiryClaim {
    exp: i64,
}

/// LRU cache of validated access tokens.
pub struct TokenCache {
    ttl: Duration,
    entries: Mutex<LruCache<String, CacheEntry>>,
}

impl TokenCache {
    pub fn new(ttl: Duration, capacity: NonZeroUsize) -> Self {
        Self {
            ttl,
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Cached user for `token`, if the entry is still fresh.
    pub async fn get(&self, token: &str) -> Option<User> {
        let mut entries = self.entries.lock().await;
        let fresh = entries.get(token)?.expires_at > Instant::now();
        if fresh {
            entries.get(token).map(|entry| entry.user.clone())
        } else {
            entries.pop(token);
            None
        }
    }

    /// Remember a backend-validated token.
    pub async fn insert(&self, token: &str, user: &User) {
        let Some(lifetime) = self.lifetime_for(token, chrono::Utc::now().timestamp()) else {
            return;
        };
        self.entries.lock().await.put(
            token.to_string(),
            CacheEntry {
                user: user.clone(),
                expires_at: Instant::now() + lifetime,
            },
        );
    }

    pub async fn evict(&self, token: &str) {
        self.entries.lock().await.pop(token);
    }

    /// How long `token` may stay cached, given the current Unix time.
    fn lifetime_for(&self, token: &str, now: i64) -> Option<Duration> {
        let exp = token_expiry(token)?;
        let remaining = u64::try_from(exp.checked_sub(now)?).ok()?;
        if remaining == 0 {
            return None;
        }
        Some(self.ttl.min(Duration::from_secs(remaining)))
    }
}

/// Read the `exp` claim of a JWT without verifying it.
fn token_expiry(token: &str) -> Option<i64> {
    jsonwebtoken::dangerous::insecure_decode::<ExpiryClaim>(token)
        .ok()
        .map(|data| data.claims.exp)
}
