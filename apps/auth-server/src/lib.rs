// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Vault Auth Server - Authentication & Authorization for multisig vaults
//!
//! Resolves every inbound credential (session token, one-time recover code,
//! CLI code, dapp connector session) into one request [`auth::Identity`], and
//! checks that identity against workspace permission tables before vault
//! routes run.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Credential strategies, permission evaluation, `AuthService`
//! - `sessions` - Session store and background sweeper
//! - `recover_codes` - Recover code issuance and consumption
//! - `storage` - redb persistence and the session cache
//! - `workspace` - Workspace aggregate owning the permission table

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod recover_codes;
pub mod sessions;
pub mod state;
pub mod storage;
pub mod workspace;

#[cfg(test)]
pub(crate) mod test_fixtures;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LOG_FORMAT_ENV;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// Install the global tracing subscriber.
///
/// `LOG_FORMAT=json` selects structured output; anything else is the
/// human-readable formatter.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json().with_current_span(false)).init();
    } else {
        registry.with(fmt::layer().with_target(true)).init();
    }
}
