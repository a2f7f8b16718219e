// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory identity backend and profile store.
//!
//! Behaves like the managed backend for the operations the gateway uses:
//! passwords are checked, tokens are issued on sign-in and revoked on
//! sign-out, metadata updates merge into the existing bag. Every call is
//! recorded so tests can assert what reached the backend.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Map, Value};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{BackendError, IdentityBackend, MirrorError, ProfileStore};
use crate::models::{ProfileRecord, ProfileUpdate, Session, User, UserAttributes, UserMetadata};

const MIN_PASSWORD_LEN: usize = 6;
const ACCESS_TOKEN_TTL_SECS: i64 = 3600;

/// A call observed by [`MemoryBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    SignIn { email: String },
    SignUp { email: String, metadata: UserMetadata },
    SignOut { access_token: String },
    UpdateUser { access_token: String, attributes: UserAttributes },
    GetUser { access_token: String },
}

struct Account {
    password: String,
    user: User,
}

#[derive(Default)]
struct BackendInner {
    /// Accounts keyed by email.
    accounts: HashMap<String, Account>,
    /// Live access tokens mapped to the owner's email.
    sessions: HashMap<String, String>,
    calls: Vec<BackendCall>,
    unavailable: bool,
    confirm_email: bool,
}

impl BackendInner {
    fn check_available(&self) -> Result<(), BackendError> {
        if self.unavailable {
            return Err(BackendError::Transport(
                "connection refused (memory backend offline)".to_string(),
            ));
        }
        Ok(())
    }

    fn create_account(&mut self, email: &str, password: &str, metadata: &UserMetadata) -> User {
        let now = Utc::now().to_rfc3339();
        let user = User {
            id: Uuid::new_v4().to_string(),
            fields: Map::from_iter([
                ("aud".to_string(), json!("authenticated")),
                ("role".to_string(), json!("authenticated")),
                ("email".to_string(), json!(email)),
                ("email_confirmed_at".to_string(), Value::Null),
                ("app_metadata".to_string(), json!({"provider": "email"})),
                (
                    "user_metadata".to_string(),
                    serde_json::to_value(metadata).unwrap_or(Value::Null),
                ),
                ("created_at".to_string(), json!(now)),
                ("updated_at".to_string(), json!(now)),
            ]),
        };
        self.accounts.insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                user: user.clone(),
            },
        );
        user
    }

    fn issue_session(&mut self, email: &str) -> Session {
        let access_token = Uuid::new_v4().to_string();
        self.sessions.insert(access_token.clone(), email.to_string());
        Session {
            access_token,
            refresh_token: Uuid::new_v4().simple().to_string(),
            token_type: "bearer".to_string(),
            expires_in: Some(ACCESS_TOKEN_TTL_SECS),
            expires_at: Some(Utc::now().timestamp() + ACCESS_TOKEN_TTL_SECS),
            extra: Map::new(),
        }
    }

    fn account_for_token(&mut self, access_token: &str) -> Result<&mut Account, BackendError> {
        let email = self
            .sessions
            .get(access_token)
            .ok_or_else(|| BackendError::rejected(401, "invalid JWT: token is expired or revoked"))?;
        self.accounts
            .get_mut(email)
            .ok_or_else(|| BackendError::rejected(404, "User not found"))
    }
}

/// In-memory [`IdentityBackend`].
#[derive(Default)]
pub struct MemoryBackend {
    inner: Mutex<BackendInner>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account without recording a call.
    pub async fn add_user(&self, email: &str, password: &str) -> User {
        let mut inner = self.inner.lock().await;
        inner.create_account(email, password, &UserMetadata::default())
    }

    /// Issue an access token for an existing account without recording a call.
    pub async fn issue_token(&self, email: &str) -> Option<String> {
        let mut inner = self.inner.lock().await;
        if !inner.accounts.contains_key(email) {
            return None;
        }
        Some(inner.issue_session(email).access_token)
    }

    /// Calls received so far, oldest first.
    pub async fn calls(&self) -> Vec<BackendCall> {
        self.inner.lock().await.calls.clone()
    }

    /// Simulate an outage: every operation fails with a transport error.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.inner.lock().await.unavailable = unavailable;
    }

    /// When set, sign-up creates the account but returns no user.
    pub async fn require_email_confirmation(&self, required: bool) {
        self.inner.lock().await.confirm_email = required;
    }
}

#[async_trait]
impl IdentityBackend for MemoryBackend {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(User, Session), BackendError> {
        let mut inner = self.inner.lock().await;
        inner.calls.push(BackendCall::SignIn {
            email: email.to_string(),
        });
        inner.check_available()?;

        let user = match inner.accounts.get_mut(email) {
            Some(account) if account.password == password => {
                account
                    .user
                    .fields
                    .insert("last_sign_in_at".to_string(), json!(Utc::now().to_rfc3339()));
                account.user.clone()
            }
            _ => return Err(BackendError::rejected(400, "Invalid login credentials")),
        };
        let session = inner.issue_session(email);
        Ok((user, session))
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: UserMetadata,
    ) -> Result<Option<User>, BackendError> {
        let mut inner = self.inner.lock().await;
        inner.calls.push(BackendCall::SignUp {
            email: email.to_string(),
            metadata: metadata.clone(),
        });
        inner.check_available()?;

        if inner.accounts.contains_key(email) {
            return Err(BackendError::rejected(422, "User already registered"));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(BackendError::rejected(
                422,
                format!("Password should be at least {MIN_PASSWORD_LEN} characters."),
            ));
        }

        let user = inner.create_account(email, password, &metadata);
        if inner.confirm_email {
            return Ok(None);
        }
        Ok(Some(user))
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let mut inner = self.inner.lock().await;
        inner.calls.push(BackendCall::SignOut {
            access_token: access_token.to_string(),
        });
        inner.check_available()?;

        inner
            .sessions
            .remove(access_token)
            .map(|_| ())
            .ok_or_else(|| BackendError::rejected(401, "invalid JWT: token is expired or revoked"))
    }

    async fn update_user(
        &self,
        access_token: &str,
        attributes: UserAttributes,
    ) -> Result<User, BackendError> {
        let mut inner = self.inner.lock().await;
        inner.calls.push(BackendCall::UpdateUser {
            access_token: access_token.to_string(),
            attributes: attributes.clone(),
        });
        inner.check_available()?;

        if let Some(password) = &attributes.password {
            if password.chars().count() < MIN_PASSWORD_LEN {
                return Err(BackendError::rejected(
                    422,
                    format!("Password should be at least {MIN_PASSWORD_LEN} characters."),
                ));
            }
        }

        let account = inner.account_for_token(access_token)?;
        if let Some(password) = attributes.password {
            account.password = password;
        }
        if let Some(data) = attributes.data {
            // Partial update: submitted keys overwrite, the rest are kept.
            let metadata = account
                .user
                .fields
                .entry("user_metadata")
                .or_insert(Value::Null);
            if !metadata.is_object() {
                *metadata = Value::Object(Map::new());
            }
            if let (Value::Object(existing), Ok(Value::Object(incoming))) =
                (metadata, serde_json::to_value(data))
            {
                existing.extend(incoming);
            }
        }
        account
            .user
            .fields
            .insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));
        Ok(account.user.clone())
    }

    async fn get_user(&self, access_token: &str) -> Result<User, BackendError> {
        let mut inner = self.inner.lock().await;
        inner.calls.push(BackendCall::GetUser {
            access_token: access_token.to_string(),
        });
        inner.check_available()?;

        inner
            .account_for_token(access_token)
            .map(|account| account.user.clone())
    }
}

#[derive(Default)]
struct ProfileInner {
    inserts: Vec<ProfileRecord>,
    updates: Vec<(String, ProfileUpdate)>,
    failing: bool,
}

/// In-memory [`ProfileStore`] that records every attempted write.
#[derive(Default)]
pub struct MemoryProfileStore {
    inner: Mutex<ProfileInner>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail (attempts are still recorded).
    pub async fn set_failing(&self, failing: bool) {
        self.inner.lock().await.failing = failing;
    }

    pub async fn inserts(&self) -> Vec<ProfileRecord> {
        self.inner.lock().await.inserts.clone()
    }

    pub async fn updates(&self) -> Vec<(String, ProfileUpdate)> {
        self.inner.lock().await.updates.clone()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn insert(&self, record: ProfileRecord) -> Result<(), MirrorError> {
        let mut inner = self.inner.lock().await;
        inner.inserts.push(record);
        if inner.failing {
            return Err(MirrorError::Transport("profile table unavailable".to_string()));
        }
        Ok(())
    }

    async fn update(&self, id: &str, fields: ProfileUpdate) -> Result<(), MirrorError> {
        let mut inner = self.inner.lock().await;
        inner.updates.push((id.to_string(), fields));
        if inner.failing {
            return Err(MirrorError::Transport("profile table unavailable".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sign_in_issues_a_resolvable_token() {
        let backend = MemoryBackend::new();
        let created = backend.add_user("ada@example.com", "correct-horse").await;

        let (user, session) = backend
            .sign_in_with_password("ada@example.com", "correct-horse")
            .await
            .expect("sign-in succeeds");
        assert_eq!(user.id, created.id);

        let resolved = backend.get_user(&session.access_token).await.unwrap();
        assert_eq!(resolved.id, created.id);
    }

    #[tokio::test]
    async fn sign_in_rejects_wrong_password() {
        let backend = MemoryBackend::new();
        backend.add_user("ada@example.com", "correct-horse").await;

        let err = backend
            .sign_in_with_password("ada@example.com", "nope")
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Rejected { status: 400, .. }));
    }

    #[tokio::test]
    async fn sign_out_revokes_token() {
        let backend = MemoryBackend::new();
        backend.add_user("ada@example.com", "correct-horse").await;
        let token = backend.issue_token("ada@example.com").await.unwrap();

        backend.sign_out(&token).await.expect("first sign-out succeeds");

        assert!(matches!(
            backend.get_user(&token).await,
            Err(BackendError::Rejected { status: 401, .. })
        ));
    }

    #[tokio::test]
    async fn sign_up_rejects_duplicates_and_short_passwords() {
        let backend = MemoryBackend::new();
        backend.add_user("ada@example.com", "correct-horse").await;

        let duplicate = backend
            .sign_up("ada@example.com", "another-pass", UserMetadata::default())
            .await;
        assert!(matches!(duplicate, Err(BackendError::Rejected { .. })));

        let weak = backend
            .sign_up("bob@example.com", "123", UserMetadata::default())
            .await;
        assert!(matches!(weak, Err(BackendError::Rejected { status: 422, .. })));
    }

    #[tokio::test]
    async fn update_user_merges_metadata() {
        let backend = MemoryBackend::new();
        backend
            .sign_up(
                "ada@example.com",
                "correct-horse",
                UserMetadata {
                    username: Some("ada".into()),
                    phone: Some("+44 20 7946 0000".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let token = backend.issue_token("ada@example.com").await.unwrap();

        let user = backend
            .update_user(
                &token,
                UserAttributes {
                    password: None,
                    data: Some(UserMetadata {
                        full_name: Some("Ada Lovelace".into()),
                        ..Default::default()
                    }),
                },
            )
            .await
            .unwrap();

        let metadata = &user.fields["user_metadata"];
        assert_eq!(metadata["username"], "ada");
        assert_eq!(metadata["full_name"], "Ada Lovelace");
        assert_eq!(metadata["phone"], "+44 20 7946 0000");
    }

    #[tokio::test]
    async fn outage_fails_with_transport_error() {
        let backend = MemoryBackend::new();
        backend.set_unavailable(true).await;

        assert!(matches!(
            backend.get_user("anything").await,
            Err(BackendError::Transport(_))
        ));
        assert_eq!(backend.calls().await.len(), 1);
    }
}
