// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the gateway, plus the identity records
//! exchanged with the identity backend. Everything the backend owns
//! ([`User`], [`Session`]) is relayed to the caller unchanged.
//!
//! ## Model Categories
//!
//! - **Identity**: users and sessions issued by the backend
//! - **Metadata**: the profile fields stored on the backend user record
//! - **Profile mirror**: denormalized rows written best-effort
//! - **Requests / Responses**: the JSON bodies of the HTTP surface

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::{
    openapi::{
        schema::{AdditionalProperties, ObjectBuilder, Schema, Type},
        RefOr,
    },
    PartialSchema, ToSchema,
};

// =============================================================================
// Identity
// =============================================================================

/// A user record owned by the identity backend.
///
/// Only `id` is interpreted by the gateway. Every other key the backend
/// returns is kept in `fields` and echoed back exactly as received,
/// including nulls and keys added by newer backend versions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// Backend-assigned unique identifier.
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl PartialSchema for User {
    fn schema() -> RefOr<Schema> {
        passthrough_object(
            "User record as returned by the identity backend. Only `id` is guaranteed.",
            &["id"],
            ObjectBuilder::new().property("id", string_schema()),
        )
    }
}

impl ToSchema for User {}

/// Session issued by the backend on a successful sign-in.
///
/// Opaque to the gateway; the caller stores it and resends the access
/// token as a bearer credential. Keys beyond the token fields are kept in
/// `extra` and relayed unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Lifetime of the access token in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    /// Expiry of the access token (Unix timestamp).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PartialSchema for Session {
    fn schema() -> RefOr<Schema> {
        passthrough_object(
            "Session issued by the identity backend, relayed unchanged.",
            &["access_token", "refresh_token", "token_type"],
            ObjectBuilder::new()
                .property("access_token", string_schema())
                .property("refresh_token", string_schema())
                .property("token_type", string_schema())
                .property("expires_in", integer_schema())
                .property("expires_at", integer_schema()),
        )
    }
}

impl ToSchema for Session {}

fn string_schema() -> RefOr<Schema> {
    RefOr::T(Schema::Object(
        ObjectBuilder::new().schema_type(Type::String).build(),
    ))
}

fn integer_schema() -> RefOr<Schema> {
    RefOr::T(Schema::Object(
        ObjectBuilder::new().schema_type(Type::Integer).build(),
    ))
}

/// Object schema that documents the known keys and admits any others.
fn passthrough_object(
    description: &str,
    required: &[&str],
    properties: ObjectBuilder,
) -> RefOr<Schema> {
    let builder = required
        .iter()
        .fold(properties, |builder, name| builder.required(*name));
    RefOr::T(Schema::Object(
        builder
            .schema_type(Type::Object)
            .description(Some(description))
            .additional_properties(Some(AdditionalProperties::FreeForm(true)))
            .build(),
    ))
}

fn default_token_type() -> String {
    "bearer".to_string()
}

// =============================================================================
// Metadata
// =============================================================================

/// Profile metadata attached to a backend user.
///
/// Absent fields are omitted from the serialized form, so the backend only
/// sees what the caller actually submitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Attributes accepted by the backend's self-update operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<UserMetadata>,
}

// =============================================================================
// Profile mirror
// =============================================================================

/// Denormalized copy of select identity fields.
///
/// `id` always equals the backend user id. Not authoritative and never read
/// back by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Columns rewritten on a profile update. Absent fields are left out of
/// the write so the stored values are kept.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

// =============================================================================
// Requests
// =============================================================================

/// Body of `POST /api/auth/login`.
///
/// Fields are optional at the type level so a missing field surfaces as a
/// 400 with a readable message instead of a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Body of `POST /api/auth/register`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
}

/// Body of `PUT /api/user/profile`. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub phone: Option<String>,
}

/// Body of `PUT /api/user/password`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdatePasswordRequest {
    pub password: Option<String>,
}

// =============================================================================
// Responses
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub message: String,
    pub user: User,
    pub session: Session,
}

/// Registration result. `user` is `null` when the backend defers account
/// creation (e.g. pending email confirmation).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    pub message: String,
    pub user: Option<User>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub message: String,
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
