// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Domain Records
//!
//! Records read through the repository traits and the denormalized snapshots
//! carried inside sessions and identities. All types derive `Serialize` and
//! `Deserialize` so they can be persisted as JSON in redb; the ones exposed
//! through the HTTP API also derive `ToSchema`.
//!
//! ## Model Categories
//!
//! - **Users**: [`UserRecord`] (persisted) and [`UserSnapshot`] (denormalized)
//! - **Workspaces**: [`WorkspaceRef`] (the aggregate lives in `workspace`)
//! - **Vaults**: [`ResourceOwner`] links a vault to its owning workspace
//! - **Connectors**: [`DappSession`] binds a dapp session id to a user

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// =============================================================================
// Network
// =============================================================================

/// Network the caller is operating on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Network {
    /// RPC / provider URL.
    pub url: String,
    /// Chain identifier.
    pub chain_id: u64,
}

// =============================================================================
// Users
// =============================================================================

/// How a user signs: determines which verifier a signature is checked with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Encoder {
    Fuel,
    WebAuthn,
    Evm,
}

/// Persisted user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub avatar: String,
    /// Signer address (case-insensitive lookups).
    pub address: String,
    pub account_type: Encoder,
    pub notify: bool,
    pub first_login: bool,
    /// Personal workspace used when a credential does not carry one.
    pub default_workspace_id: String,
    pub created_at: DateTime<Utc>,
}

/// Denormalized user fields carried with every identity so handlers never
/// need a second lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserSnapshot {
    pub id: String,
    pub name: String,
    pub avatar: String,
    pub address: String,
    pub account_type: Encoder,
    pub notify: bool,
    pub first_login: bool,
}

impl From<&UserRecord> for UserSnapshot {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            avatar: user.avatar.clone(),
            address: user.address.clone(),
            account_type: user.account_type,
            notify: user.notify,
            first_login: user.first_login,
        }
    }
}

// =============================================================================
// Workspaces & vaults
// =============================================================================

/// Lightweight reference to a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct WorkspaceRef {
    pub id: String,
    pub name: String,
    /// Personal (single-user) workspace.
    pub single: bool,
}

/// Owning workspace of a vault (predicate).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceOwner {
    pub resource_id: String,
    pub workspace_id: String,
}

// =============================================================================
// Dapp connector
// =============================================================================

/// Binding between a connector session id and a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DappSession {
    /// Opaque id embedded in the `connector<id>` credential.
    pub session_id: String,
    pub origin_url: String,
    pub name: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_vault_id: Option<String>,
    pub authorized_vault_ids: BTreeSet<String>,
    pub network: Network,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoder_wire_format() {
        assert_eq!(serde_json::to_string(&Encoder::WebAuthn).unwrap(), r#""WEB_AUTHN""#);
        let parsed: Encoder = serde_json::from_str(r#""EVM""#).unwrap();
        assert_eq!(parsed, Encoder::Evm);
    }

    #[test]
    fn snapshot_copies_display_fields() {
        let user = UserRecord {
            id: "user-1".into(),
            name: "Alice".into(),
            avatar: "https://avatars.example/alice.png".into(),
            address: "0xabc".into(),
            account_type: Encoder::Fuel,
            notify: true,
            first_login: false,
            default_workspace_id: "ws-1".into(),
            created_at: Utc::now(),
        };

        let snapshot = UserSnapshot::from(&user);
        assert_eq!(snapshot.id, "user-1");
        assert_eq!(snapshot.avatar, user.avatar);
        assert!(snapshot.notify);
        assert_eq!(snapshot.account_type, Encoder::Fuel);
    }
}
