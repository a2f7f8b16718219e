// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Process wiring: build the backend clients from configuration, bind the
//! listener (plain HTTP or TLS), and drain connections on shutdown.

use std::{sync::Arc, time::Duration};

use axum_server::{tls_rustls::RustlsConfig, Handle};
use tracing::{info, warn};

use crate::{
    api::{cors_layer, router},
    auth::TokenCache,
    backend::{BackendError, RemoteIdentityBackend, RemoteProfileStore},
    config::{Config, ConfigError},
    state::AppState,
};

/// Time in-flight requests get to finish after a shutdown signal.
const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to initialize identity backend client: {0}")]
    Backend(#[from] BackendError),

    #[error("failed to load TLS credentials: {0}")]
    Tls(std::io::Error),

    #[error("server failed: {0}")]
    Io(std::io::Error),
}

/// Build handler state backed by the remote identity backend.
pub fn build_state(config: &Config) -> Result<AppState, BackendError> {
    let backend = RemoteIdentityBackend::new(&config.backend)?;
    let profiles = RemoteProfileStore::new(&config.backend)?;

    let mut state = AppState::new(Arc::new(backend), Arc::new(profiles));
    if !config.token_cache_ttl.is_zero() {
        info!(
            ttl_secs = config.token_cache_ttl.as_secs(),
            capacity = config.token_cache_capacity.get(),
            "Validated-token cache enabled"
        );
        state = state.with_token_cache(TokenCache::new(
            config.token_cache_ttl,
            config.token_cache_capacity,
        ));
    }
    Ok(state)
}

/// Run the gateway until a shutdown signal arrives.
pub async fn serve(config: Config) -> Result<(), ServerError> {
    let addr = config.bind_addr()?;
    let state = build_state(&config)?;
    let app = router(state, cors_layer(&config.cors_allowed_origins));

    let handle = Handle::new();
    let shutdown_handle = handle.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received, draining connections");
        shutdown_handle.graceful_shutdown(Some(SHUTDOWN_GRACE_PERIOD));
    });

    match &config.tls {
        Some(tls) => {
            // Install the ring crypto provider for rustls (must be done before any TLS operations)
            if rustls::crypto::ring::default_provider()
                .install_default()
                .is_err()
            {
                warn!("rustls crypto provider already installed");
            }
            let tls_config = RustlsConfig::from_pem_file(&tls.cert, &tls.key)
                .await
                .map_err(ServerError::Tls)?;

            info!(backend = %config.backend.url, "Identity gateway listening on https://{addr} (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .map_err(ServerError::Io)
        }
        None => {
            info!(backend = %config.backend.url, "Identity gateway listening on http://{addr} (docs at /docs)");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .map_err(ServerError::Io)
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
