// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, defaults, and the [`AuthConfig`] loaded from
//! them at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Directory holding `auth.redb` | `/data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `SESSION_TTL_SECS` | Sliding session window | `1200` |
//! | `SESSION_SWEEP_INTERVAL_SECS` | Expired-session sweep interval | `300` |
//! | `SESSION_CACHE_CAPACITY` | In-process session cache size | `10000` |
//! | `RECOVER_CODE_MAX_USES` | Uses allowed per one-time code | `3` |
//! | `RECOVER_CODE_TTL_SECS` | Recover code validity | `300` |
//! | `RECOVER_CODE_RETENTION_SECS` | Age after expiry before hard delete | `604800` |
//! | `REQUEST_TIMEOUT_MS` | Deadline for auth store calls per request | `5000` |
//! | `CLI_ROUTES` | Comma-separated `METHOD path` entries CLI codes may call | built-in list |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//!
//! Values that fail to parse fall back to the default with a warning.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::auth::strategies::{CliRoute, DEFAULT_CLI_ROUTES};
use crate::recover_codes::DEFAULT_MAX_USES;

/// Directory holding the redb file.
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const SESSION_TTL_ENV: &str = "SESSION_TTL_SECS";
pub const SESSION_SWEEP_INTERVAL_ENV: &str = "SESSION_SWEEP_INTERVAL_SECS";
pub const SESSION_CACHE_CAPACITY_ENV: &str = "SESSION_CACHE_CAPACITY";
pub const RECOVER_CODE_MAX_USES_ENV: &str = "RECOVER_CODE_MAX_USES";
pub const RECOVER_CODE_TTL_ENV: &str = "RECOVER_CODE_TTL_SECS";
pub const RECOVER_CODE_RETENTION_ENV: &str = "RECOVER_CODE_RETENTION_SECS";
pub const REQUEST_TIMEOUT_ENV: &str = "REQUEST_TIMEOUT_MS";
pub const CLI_ROUTES_ENV: &str = "CLI_ROUTES";
/// `json` for structured logs, anything else for human-readable output.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_DATA_DIR: &str = "/data";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
/// 20 minutes.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 20 * 60;
pub const DEFAULT_SESSION_SWEEP_INTERVAL_SECS: u64 = 5 * 60;
pub const DEFAULT_SESSION_CACHE_CAPACITY: usize = 10_000;
pub const DEFAULT_RECOVER_CODE_TTL_SECS: u64 = 5 * 60;
/// 7 days.
pub const DEFAULT_RECOVER_CODE_RETENTION_SECS: u64 = 7 * 24 * 60 * 60;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;

/// Name of the database file under `DATA_DIR`.
pub const DATABASE_FILE: &str = "auth.redb";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    pub data_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub session_ttl: Duration,
    pub sweep_interval: Duration,
    pub session_cache_capacity: usize,
    pub recover_code_max_uses: u32,
    pub recover_code_ttl: Duration,
    pub recover_code_retention: Duration,
    pub request_timeout: Duration,
    pub cli_routes: Vec<CliRoute>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            sweep_interval: Duration::from_secs(DEFAULT_SESSION_SWEEP_INTERVAL_SECS),
            session_cache_capacity: DEFAULT_SESSION_CACHE_CAPACITY,
            recover_code_max_uses: DEFAULT_MAX_USES,
            recover_code_ttl: Duration::from_secs(DEFAULT_RECOVER_CODE_TTL_SECS),
            recover_code_retention: Duration::from_secs(DEFAULT_RECOVER_CODE_RETENTION_SECS),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            cli_routes: DEFAULT_CLI_ROUTES
                .iter()
                .filter_map(|entry| CliRoute::parse(entry))
                .collect(),
        }
    }
}

impl AuthConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let secs = |name: &str, default: u64| Duration::from_secs(parsed(&lookup, name, default));

        Self {
            data_dir: lookup(DATA_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            host: lookup(HOST_ENV).unwrap_or(defaults.host),
            port: parsed(&lookup, PORT_ENV, DEFAULT_PORT),
            session_ttl: secs(SESSION_TTL_ENV, DEFAULT_SESSION_TTL_SECS),
            sweep_interval: secs(
                SESSION_SWEEP_INTERVAL_ENV,
                DEFAULT_SESSION_SWEEP_INTERVAL_SECS,
            ),
            session_cache_capacity: parsed(
                &lookup,
                SESSION_CACHE_CAPACITY_ENV,
                DEFAULT_SESSION_CACHE_CAPACITY,
            ),
            recover_code_max_uses: parsed(&lookup, RECOVER_CODE_MAX_USES_ENV, DEFAULT_MAX_USES)
                .max(1),
            recover_code_ttl: secs(RECOVER_CODE_TTL_ENV, DEFAULT_RECOVER_CODE_TTL_SECS),
            recover_code_retention: secs(
                RECOVER_CODE_RETENTION_ENV,
                DEFAULT_RECOVER_CODE_RETENTION_SECS,
            ),
            request_timeout: Duration::from_millis(parsed(
                &lookup,
                REQUEST_TIMEOUT_ENV,
                DEFAULT_REQUEST_TIMEOUT_MS,
            )),
            cli_routes: match lookup(CLI_ROUTES_ENV) {
                Some(raw) => cli_routes(&raw),
                None => defaults.cli_routes,
            },
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parsed<F, T>(lookup: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy + std::fmt::Display,
{
    match lookup(name) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(variable = name, value = %raw, default = %default, "Invalid value, using default");
            default
        }),
    }
}

fn cli_routes(raw: &str) -> Vec<CliRoute> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let route = CliRoute::parse(entry);
            if route.is_none() {
                warn!(variable = CLI_ROUTES_ENV, entry, "Skipping CLI route without a path");
            }
            route
        })
        .collect()
}

/// Convert a std duration into the chrono duration the stores compute with.
pub fn chrono_duration(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = AuthConfig::from_lookup(lookup(&[]));
        assert_eq!(config, AuthConfig::default());
        assert_eq!(config.session_ttl, Duration::from_secs(1200));
        assert_eq!(config.recover_code_max_uses, 3);
        assert_eq!(config.database_path(), PathBuf::from("/data/auth.redb"));
    }

    #[test]
    fn overrides_are_applied() {
        let config = AuthConfig::from_lookup(lookup(&[
            ("DATA_DIR", "/tmp/auth"),
            ("PORT", "9000"),
            ("SESSION_TTL_SECS", "60"),
            ("RECOVER_CODE_MAX_USES", "5"),
            ("REQUEST_TIMEOUT_MS", "250"),
        ]));
        assert_eq!(config.data_dir, PathBuf::from("/tmp/auth"));
        assert_eq!(config.bind_address(), "0.0.0.0:9000");
        assert_eq!(config.session_ttl, Duration::from_secs(60));
        assert_eq!(config.recover_code_max_uses, 5);
        assert_eq!(config.request_timeout, Duration::from_millis(250));
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = AuthConfig::from_lookup(lookup(&[
            ("PORT", "eighty"),
            ("SESSION_CACHE_CAPACITY", "-1"),
            ("RECOVER_CODE_MAX_USES", "0"),
        ]));
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.session_cache_capacity, DEFAULT_SESSION_CACHE_CAPACITY);
        assert_eq!(config.recover_code_max_uses, 1);
    }

    #[test]
    fn cli_routes_from_environment() {
        let config = AuthConfig::from_lookup(lookup(&[(
            "CLI_ROUTES",
            "GET /predicate, POST /transaction ,broken,",
        )]));
        assert_eq!(
            config.cli_routes,
            vec![
                CliRoute::parse("GET /predicate").unwrap(),
                CliRoute::parse("POST /transaction").unwrap(),
            ]
        );
        assert_eq!(
            AuthConfig::default().cli_routes.len(),
            DEFAULT_CLI_ROUTES.len()
        );
    }

    #[test]
    fn chrono_conversion() {
        assert_eq!(
            chrono_duration(Duration::from_secs(90)),
            chrono::Duration::seconds(90)
        );
    }
}
