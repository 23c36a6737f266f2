// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use tracing::{info, warn};
use wallet_invite_gate::{
    api::router,
    config::{Config, ConfigError},
    logging,
    providers::{DiscordIssuer, IssuerError, TezosVerifier, VerifierError},
    registration::RegistrationWorkflow,
    state::AppState,
    storage::{RegistrationStore, StorageError},
};

/// Fatal startup and serve failures.
#[derive(Debug, thiserror::Error)]
enum ServerError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to open registration database: {0}")]
    Storage(#[from] StorageError),

    #[error("failed to build wallet verifier: {0}")]
    Verifier(#[from] VerifierError),

    #[error("failed to build invite issuer: {0}")]
    Issuer(#[from] IssuerError),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let config = Arc::new(Config::from_env()?);

    if let Err(e) = logging::init(&config) {
        eprintln!("logging already initialised: {e}");
    }

    let store = RegistrationStore::open(&config.db_path)?;
    info!(path = %config.db_path.display(), "Registration database ready");

    let verifier = TezosVerifier::from_config(&config)?;
    let issuer = DiscordIssuer::from_config(&config)?;
    let workflow = RegistrationWorkflow::new(
        Arc::new(store),
        Arc::new(verifier),
        Arc::new(issuer),
        config.channel_id.clone(),
    );

    let app = router(AppState::new(workflow), &config.www_dir);

    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        %addr,
        environment = %config.environment,
        www_dir = %config.www_dir.display(),
        "Wallet invite gate listening (docs at /docs)"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
