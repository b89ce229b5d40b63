// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Resolved request identity and the request context strategies see.

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use utoipa::ToSchema;

use crate::models::{DappSession, Network, UserSnapshot, WorkspaceRef};

/// Result of authentication.
///
/// Produced fresh per request and never persisted. `workspace` is `None`
/// for connector credentials: those are scoped to the dapp's authorized
/// vault set instead of a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Identity {
    pub user: UserSnapshot,
    pub workspace: Option<WorkspaceRef>,
    pub network: Network,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dapp: Option<DappSession>,
}

impl Identity {
    pub fn user_id(&self) -> &str {
        &self.user.id
    }

    pub fn workspace_id(&self) -> Option<&str> {
        self.workspace.as_ref().map(|w| w.id.as_str())
    }
}

/// Inbound request details an authentication decision may depend on.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// HTTP method, upper-case (`GET`, `POST`, ...).
    pub method: String,
    /// Request path, e.g. `/v1/predicate`.
    pub path: String,
    /// Store calls still pending at this instant fail as `Internal`.
    pub deadline: Option<Instant>,
}

impl RequestContext {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// `"METHOD path"`, the form route allow-lists are written in.
    pub fn route(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Encoder;

    fn sample_identity(workspace: Option<WorkspaceRef>) -> Identity {
        Identity {
            user: UserSnapshot {
                id: "user_123".into(),
                name: "Alice".into(),
                avatar: String::new(),
                address: "0xabc".into(),
                account_type: Encoder::Fuel,
                notify: false,
                first_login: false,
            },
            workspace,
            network: Network {
                url: "https://testnet.fuel.network/v1/graphql".into(),
                chain_id: 0,
            },
            dapp: None,
        }
    }

    #[test]
    fn accessors_read_through_snapshots() {
        let identity = sample_identity(Some(WorkspaceRef {
            id: "ws-1".into(),
            name: "Personal".into(),
            single: true,
        }));
        assert_eq!(identity.user_id(), "user_123");
        assert_eq!(identity.workspace_id(), Some("ws-1"));
        assert_eq!(sample_identity(None).workspace_id(), None);
    }

    #[test]
    fn context_formats_route() {
        let ctx = RequestContext::new("GET", "/v1/predicate");
        assert_eq!(ctx.route(), "GET /v1/predicate");
        assert!(ctx.deadline.is_none());
    }

    #[test]
    fn workspace_serializes_as_null_for_connectors() {
        let json = serde_json::to_value(sample_identity(None)).unwrap();
        assert!(json["workspace"].is_null());
        assert!(json.get("dapp").is_none());
    }
}
