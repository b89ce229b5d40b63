// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use vault_auth_server::{
    api::router, config::AuthConfig, init_tracing, state::AppState, storage::AuthDatabase,
};

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(e) = run().await {
        error!(error = %e, "Server exited with error");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AuthConfig::from_env();
    let db_path = config.database_path();
    let db = Arc::new(AuthDatabase::open(&db_path)?);
    info!(path = %db_path.display(), "Auth database opened");

    // No verifier is linked into this binary; sign-in answers 500 until one is.
    warn!("No signature verifier configured, sign-in is disabled");
    let state = AppState::new(db, &config, None);

    let shutdown = CancellationToken::new();
    let sweeper = tokio::spawn(state.sweeper(&config).run(shutdown.clone()));

    let app = router(state);
    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "Vault auth server listening (docs at /docs)");

    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutdown signal received");
            signal.cancel();
        })
        .await?;

    shutdown.cancel();
    if let Err(e) = sweeper.await {
        warn!(error = %e, "Session sweeper task failed");
    }
    Ok(())
}
