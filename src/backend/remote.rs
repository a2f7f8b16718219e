// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP client for a GoTrue/PostgREST-compatible managed backend.
//!
//! ## Endpoints
//!
//! | Operation | Request |
//! |-----------|---------|
//! | sign-in | `POST auth/v1/token?grant_type=password` |
//! | sign-up | `POST auth/v1/signup` |
//! | sign-out | `POST auth/v1/logout` |
//! | self-update | `PUT auth/v1/user` |
//! | token resolution | `GET auth/v1/user` |
//! | profile insert | `POST rest/v1/{table}` |
//! | profile update | `PATCH rest/v1/{table}?id=eq.{id}` |
//!
//! Every request carries the `apikey` header. User-scoped calls
//! authenticate with the caller's access token, everything else with the
//! API key itself.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use url::Url;

use super::{BackendError, IdentityBackend, MirrorError, ProfileStore};
use crate::config::BackendConfig;
use crate::models::{ProfileRecord, ProfileUpdate, Session, User, UserAttributes, UserMetadata};

const API_KEY_HEADER: &str = "apikey";

/// Keys probed, in order, for a human-readable error message.
const ERROR_MESSAGE_KEYS: [&str; 4] = ["msg", "message", "error_description", "error"];

/// Shared HTTP plumbing for the auth and data APIs.
#[derive(Debug, Clone)]
struct BackendHttp {
    base_url: Url,
    api_key: String,
    http: Client,
}

impl BackendHttp {
    fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BackendError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.url.clone(),
            api_key: config.api_key.clone(),
            http,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        self.base_url
            .join(path)
            .map_err(|e| BackendError::Transport(format!("invalid endpoint {path}: {e}")))
    }

    /// Attach the API key and the bearer credential (user token or API key).
    fn authorize(&self, request: RequestBuilder, access_token: Option<&str>) -> RequestBuilder {
        request
            .header(API_KEY_HEADER, &self.api_key)
            .bearer_auth(access_token.unwrap_or(&self.api_key))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, BackendError> {
        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(error_from_response(response).await)
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BackendError> {
        self.send(request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))
    }
}

/// Turn a non-2xx response into a [`BackendError`].
///
/// 4xx responses are rejections carrying the backend's own message;
/// 5xx responses are treated as transport failures.
async fn error_from_response(response: Response) -> BackendError {
    let status = response.status();
    let body = response.json::<Value>().await.ok();
    let message = body
        .as_ref()
        .and_then(error_message)
        .unwrap_or_else(|| status_text(status));

    if status.is_server_error() {
        BackendError::Transport(format!("HTTP {status}: {message}"))
    } else {
        BackendError::rejected(status.as_u16(), message)
    }
}

fn error_message(body: &Value) -> Option<String> {
    ERROR_MESSAGE_KEYS
        .iter()
        .find_map(|key| body.get(key).and_then(Value::as_str))
        .map(str::to_string)
}

fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("request failed")
        .to_string()
}

/// Password grant response: session fields sit next to `user`.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    user: User,
    #[serde(flatten)]
    session: Session,
}

/// Extract the user from a sign-up response.
///
/// Depending on the backend's confirmation settings the body is a bare
/// user, a session carrying `user`, or `{user, session}` with a null user.
fn signup_user(body: Value) -> Result<Option<User>, BackendError> {
    let candidate = match body.get("user") {
        Some(user) => user.clone(),
        None if body.get("id").is_some() => body,
        None => return Ok(None),
    };
    if candidate.is_null() {
        return Ok(None);
    }
    serde_json::from_value(candidate)
        .map(Some)
        .map_err(|e| BackendError::InvalidResponse(e.to_string()))
}

/// Production [`IdentityBackend`] talking to the auth REST API.
#[derive(Debug, Clone)]
pub struct RemoteIdentityBackend {
    http: BackendHttp,
}

impl RemoteIdentityBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        Ok(Self {
            http: BackendHttp::new(config)?,
        })
    }
}

#[async_trait]
impl IdentityBackend for RemoteIdentityBackend {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(User, Session), BackendError> {
        let url = self.http.endpoint("auth/v1/token")?;
        let request = self
            .http
            .authorize(self.http.http.post(url), None)
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }));

        let token: TokenResponse = self.http.send_json(request).await?;
        Ok((token.user, token.session))
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: UserMetadata,
    ) -> Result<Option<User>, BackendError> {
        let url = self.http.endpoint("auth/v1/signup")?;
        let request = self
            .http
            .authorize(self.http.http.post(url), None)
            .json(&json!({ "email": email, "password": password, "data": metadata }));

        let body: Value = self.http.send_json(request).await?;
        signup_user(body)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let url = self.http.endpoint("auth/v1/logout")?;
        let request = self
            .http
            .authorize(self.http.http.post(url), Some(access_token));

        self.http.send(request).await.map(|_| ())
    }

    async fn update_user(
        &self,
        access_token: &str,
        attributes: UserAttributes,
    ) -> Result<User, BackendError> {
        let url = self.http.endpoint("auth/v1/user")?;
        let request = self
            .http
            .authorize(self.http.http.put(url), Some(access_token))
            .json(&attributes);

        self.http.send_json(request).await
    }

    async fn get_user(&self, access_token: &str) -> Result<User, BackendError> {
        let url = self.http.endpoint("auth/v1/user")?;
        let request = self
            .http
            .authorize(self.http.http.get(url), Some(access_token));

        self.http.send_json(request).await
    }
}

/// Production [`ProfileStore`] writing through the data REST API.
#[derive(Debug, Clone)]
pub struct RemoteProfileStore {
    http: BackendHttp,
    table: String,
}

impl RemoteProfileStore {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        Ok(Self {
            http: BackendHttp::new(config)?,
            table: config.profile_table.clone(),
        })
    }

    fn table_url(&self) -> Result<Url, MirrorError> {
        self.http
            .endpoint(&format!("rest/v1/{}", self.table))
            .map_err(|e| MirrorError::Transport(e.to_string()))
    }

    async fn write(&self, request: RequestBuilder) -> Result<(), MirrorError> {
        let request = self
            .http
            .authorize(request, None)
            .header("Prefer", "return=minimal");

        match self.http.send(request).await {
            Ok(_) => Ok(()),
            Err(BackendError::Rejected { message, .. }) => Err(MirrorError::Rejected(message)),
            Err(other) => Err(MirrorError::Transport(other.to_string())),
        }
    }
}

#[async_trait]
impl ProfileStore for RemoteProfileStore {
    async fn insert(&self, record: ProfileRecord) -> Result<(), MirrorError> {
        let url = self.table_url()?;
        self.write(self.http.http.post(url).json(&record)).await
    }

    async fn update(&self, id: &str, fields: ProfileUpdate) -> Result<(), MirrorError> {
        let url = self.table_url()?;
        let filter = format!("eq.{id}");
        self.write(
            self.http
                .http
                .patch(url)
                .query(&[("id", filter.as_str())])
                .json(&fields),
        )
        .await
    }
}
