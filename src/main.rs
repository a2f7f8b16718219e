// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::ExitCode;

use relational_identity_gateway::{config::Config, server, telemetry};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    telemetry::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    match server::serve(config).await {
        Ok(()) => {
            info!("Identity gateway stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Identity gateway failed");
            ExitCode::FAILURE
        }
    }
}
