// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Identity Gateway
//!
//! Thin HTTP gateway over a managed identity backend. Login, registration,
//! logout, profile and password updates are forwarded to the backend and
//! its answers relayed to the caller; a denormalized profile table is kept
//! in step best-effort.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Bearer-token gate backed by the identity backend
//! - `backend` - Identity backend and profile store clients
//! - `server` - Listener, TLS and shutdown wiring

pub mod api;
pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod models;
pub mod server;
pub mod state;
pub mod telemetry;
