// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Workspace roles for authorization.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Roles a user can hold inside a workspace.
///
/// ## Role Semantics
///
/// - `Owner` - Created the workspace, seeded with every role on every vault
/// - `Admin` - Manages members and vaults
/// - `Manager` - Manages vaults and transactions
/// - `Signer` - Signs transactions on the vaults they are scoped to
/// - `Viewer` - Read-only access
///
/// Roles are not hierarchical: holding `Owner` on a vault does not imply
/// `Signer` unless the permission table says so.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Owner,
    Admin,
    Manager,
    Signer,
    Viewer,
}

impl Role {
    /// Every role, in declaration order.
    pub const ALL: [Role; 5] = [
        Role::Owner,
        Role::Admin,
        Role::Manager,
        Role::Signer,
        Role::Viewer,
    ];
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Owner => write!(f, "OWNER"),
            Role::Admin => write!(f, "ADMIN"),
            Role::Manager => write!(f, "MANAGER"),
            Role::Signer => write!(f, "SIGNER"),
            Role::Viewer => write!(f, "VIEWER"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_screaming_snake_case() {
        let json = serde_json::to_string(&Role::Manager).unwrap();
        assert_eq!(json, r#""MANAGER""#);
        let back: Role = serde_json::from_str(r#""ADMIN""#).unwrap();
        assert_eq!(back, Role::Admin);
    }

    #[test]
    fn display_matches_wire_format() {
        for role in Role::ALL {
            let wire = serde_json::to_string(&role).unwrap();
            assert_eq!(wire.trim_matches('"'), role.to_string());
        }
    }
}
