// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential prefix dispatch.
//!
//! Recovery codes are only routed to the recovery-code strategy because code
//! generation emits values beginning with the literal `code` / `cli`
//! prefixes. Anything else silently falls through to the bearer-token path,
//! which rejects unknown tokens with `SESSION_NOT_FOUND`.

/// Prefix of CLI recovery codes.
pub const CLI_PREFIX: &str = "cli";
/// Prefix of recovery codes.
pub const CODE_PREFIX: &str = "code";
/// Prefix of dapp connector credentials, followed directly by the session id.
pub const CONNECTOR_PREFIX: &str = "connector";

/// The four ways a raw credential can be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStrategy {
    BearerToken,
    RecoverCode,
    CliRecoverCode,
    Connector,
}

impl AuthStrategy {
    /// Select the strategy for `raw`. First case-sensitive prefix match wins.
    pub fn select(raw: &str) -> Self {
        if raw.starts_with(CLI_PREFIX) {
            AuthStrategy::CliRecoverCode
        } else if raw.starts_with(CODE_PREFIX) {
            AuthStrategy::RecoverCode
        } else if raw.starts_with(CONNECTOR_PREFIX) {
            AuthStrategy::Connector
        } else {
            AuthStrategy::BearerToken
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AuthStrategy::BearerToken => "bearer_token",
            AuthStrategy::RecoverCode => "recover_code",
            AuthStrategy::CliRecoverCode => "cli_recover_code",
            AuthStrategy::Connector => "connector",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_by_prefix() {
        assert_eq!(AuthStrategy::select("cli9f2c"), AuthStrategy::CliRecoverCode);
        assert_eq!(AuthStrategy::select("code4a1b"), AuthStrategy::RecoverCode);
        assert_eq!(AuthStrategy::select("connectorabc"), AuthStrategy::Connector);
        assert_eq!(
            AuthStrategy::select("5b8c7f0e-7e55-4a39-9b52-1c3c1f0f9d11"),
            AuthStrategy::BearerToken
        );
    }

    #[test]
    fn prefix_test_is_case_sensitive() {
        assert_eq!(AuthStrategy::select("CODE123"), AuthStrategy::BearerToken);
        assert_eq!(AuthStrategy::select("Connector1"), AuthStrategy::BearerToken);
    }

    #[test]
    fn empty_and_bare_prefixes() {
        assert_eq!(AuthStrategy::select(""), AuthStrategy::BearerToken);
        assert_eq!(AuthStrategy::select("connector"), AuthStrategy::Connector);
        assert_eq!(AuthStrategy::select("code"), AuthStrategy::RecoverCode);
    }
}
