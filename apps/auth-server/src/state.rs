// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;
use std::time::Duration;

use crate::auth::{AuthService, Repositories, SignatureVerifier};
use crate::config::{chrono_duration, AuthConfig};
use crate::recover_codes::RecoverCodeStore;
use crate::sessions::{SessionStore, SessionSweeper};
use crate::storage::AuthDatabase;

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub db: Arc<AuthDatabase>,
    /// Deadline applied to every request's auth resolution.
    pub request_timeout: Duration,
}

impl AppState {
    /// Wire the stores and the auth service over one database.
    pub fn new(
        db: Arc<AuthDatabase>,
        config: &AuthConfig,
        verifier: Option<Arc<dyn SignatureVerifier>>,
    ) -> Self {
        let sessions = Arc::new(SessionStore::new(
            db.clone(),
            config.session_cache_capacity,
            chrono_duration(config.session_ttl),
        ));
        let codes = RecoverCodeStore::new(
            db.clone(),
            chrono_duration(config.recover_code_ttl),
            config.recover_code_max_uses,
        );
        let mut auth = AuthService::new(Repositories::from_database(db.clone()), sessions, codes)
            .with_cli_routes(config.cli_routes.clone());
        if let Some(verifier) = verifier {
            auth = auth.with_verifier(verifier);
        }

        Self {
            auth: Arc::new(auth),
            db,
            request_timeout: config.request_timeout,
        }
    }

    /// Background sweeper sharing this state's stores.
    pub fn sweeper(&self, config: &AuthConfig) -> SessionSweeper {
        SessionSweeper::new(
            self.auth.sessions().clone(),
            self.auth.recover_codes().clone(),
            config.sweep_interval,
            chrono_duration(config.recover_code_retention),
        )
    }
}
