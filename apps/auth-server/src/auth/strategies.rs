// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential strategies.
//!
//! Each strategy turns one kind of raw credential into an [`Identity`] or an
//! [`AuthError`]. [`AuthStrategy::select`](super::dispatcher::AuthStrategy)
//! picks which one runs; none of them falls back to another on failure.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use super::dispatcher::CONNECTOR_PREFIX;
use super::error::{AuthError, UnauthorizedTitle};
use super::identity::{Identity, RequestContext};
use crate::models::UserSnapshot;
use crate::recover_codes::RecoverCodeStore;
use crate::sessions::SessionStore;
use crate::storage::repository::{DappRepository, UserRepository, WorkspaceRepository};

/// Routes a CLI code may call, as `"METHOD path-fragment"`.
pub const DEFAULT_CLI_ROUTES: &[&str] = &[
    "GET /predicate",
    "GET /transaction",
    "POST /transaction",
    "PUT /transaction/sign",
];

// =============================================================================
// Bearer token
// =============================================================================

/// Resolves session tokens issued at sign-in.
#[derive(Clone)]
pub struct BearerTokenStrategy {
    sessions: Arc<SessionStore>,
}

impl BearerTokenStrategy {
    pub fn new(sessions: Arc<SessionStore>) -> Self {
        Self { sessions }
    }

    pub async fn resolve(&self, token: &str) -> Result<Identity, AuthError> {
        let session = self.sessions.get(token).await?.ok_or_else(|| {
            AuthError::unauthorized(UnauthorizedTitle::SessionNotFound, "Session not found")
        })?;

        if session.is_expired(Utc::now()) {
            self.sessions.remove(token).await?;
            debug!(session_id = %session.id, "Rejected expired session");
            return Err(AuthError::unauthorized(
                UnauthorizedTitle::ExpiredToken,
                "Session expired",
            ));
        }

        Ok(Identity {
            user: session.user,
            workspace: Some(session.workspace),
            network: session.network,
            dapp: None,
        })
    }
}

// =============================================================================
// Recover code
// =============================================================================

/// Resolves `AUTH_ONCE` recover codes (`code…`).
#[derive(Clone)]
pub struct RecoverCodeStrategy {
    codes: RecoverCodeStore,
    users: Arc<dyn UserRepository>,
    workspaces: Arc<dyn WorkspaceRepository>,
}

impl RecoverCodeStrategy {
    pub fn new(
        codes: RecoverCodeStore,
        users: Arc<dyn UserRepository>,
        workspaces: Arc<dyn WorkspaceRepository>,
    ) -> Self {
        Self {
            codes,
            users,
            workspaces,
        }
    }

    pub async fn resolve(&self, raw: &str) -> Result<Identity, AuthError> {
        let code = self.codes.consume_once(raw).await?;

        let Some(owner) = self.users.find_by_id(&code.owner_id).await? else {
            warn!(code_id = %code.id, owner_id = %code.owner_id, "Recover code owner missing");
            return Err(AuthError::unauthorized(
                UnauthorizedTitle::InvalidCredentials,
                "Invalid credentials",
            ));
        };

        let workspace = self
            .workspaces
            .find_by_id(&owner.default_workspace_id)
            .await?
            .map(|w| w.to_ref());
        if workspace.is_none() {
            warn!(
                user_id = %owner.id,
                workspace_id = %owner.default_workspace_id,
                "Default workspace missing"
            );
        }

        Ok(Identity {
            user: UserSnapshot::from(&owner),
            workspace,
            network: code.network,
            dapp: None,
        })
    }
}

// =============================================================================
// CLI
// =============================================================================

/// One allow-list entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliRoute {
    pub method: String,
    pub path: String,
}

impl CliRoute {
    /// Parse `"METHOD path"`. Returns `None` without a space separator.
    pub fn parse(entry: &str) -> Option<Self> {
        let (method, path) = entry.trim().split_once(' ')?;
        Some(Self {
            method: method.to_string(),
            path: path.trim().to_string(),
        })
    }

    /// Method must match exactly; the path only needs to contain the fragment.
    pub fn matches(&self, ctx: &RequestContext) -> bool {
        ctx.method == self.method && ctx.path.contains(&self.path)
    }
}

/// A recover code restricted to a fixed set of routes (`cli…`).
#[derive(Clone)]
pub struct CliStrategy {
    codes: RecoverCodeStrategy,
    routes: Vec<CliRoute>,
}

impl CliStrategy {
    pub fn new(codes: RecoverCodeStrategy, routes: Vec<CliRoute>) -> Self {
        Self { codes, routes }
    }

    pub fn with_default_routes(codes: RecoverCodeStrategy) -> Self {
        let routes = DEFAULT_CLI_ROUTES
            .iter()
            .filter_map(|entry| CliRoute::parse(entry))
            .collect();
        Self::new(codes, routes)
    }

    pub async fn resolve(&self, raw: &str, ctx: &RequestContext) -> Result<Identity, AuthError> {
        let identity = self.codes.resolve(raw).await?;

        if !self.routes.iter().any(|route| route.matches(ctx)) {
            debug!(route = %ctx.route(), "CLI code used outside its allow-list");
            return Err(AuthError::unauthorized(
                UnauthorizedTitle::UnauthorizedResource,
                "Route not available to CLI credentials",
            ));
        }

        Ok(identity)
    }
}

// =============================================================================
// Connector
// =============================================================================

/// Resolves dapp connector credentials (`connector<session_id>`).
#[derive(Clone)]
pub struct ConnectorStrategy {
    dapps: Arc<dyn DappRepository>,
    users: Arc<dyn UserRepository>,
}

impl ConnectorStrategy {
    pub fn new(dapps: Arc<dyn DappRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { dapps, users }
    }

    pub async fn resolve(&self, raw: &str) -> Result<Identity, AuthError> {
        let session_id = raw.strip_prefix(CONNECTOR_PREFIX).unwrap_or(raw);
        if session_id.is_empty() {
            return Err(AuthError::unauthorized(
                UnauthorizedTitle::MissingCredentials,
                "Missing connector session id",
            ));
        }

        let invalid = || {
            AuthError::unauthorized(UnauthorizedTitle::InvalidCredentials, "Invalid credentials")
        };

        let dapp = self
            .dapps
            .find_by_session_id(session_id)
            .await?
            .ok_or_else(invalid)?;
        let user = self
            .users
            .find_by_id(&dapp.user_id)
            .await?
            .ok_or_else(invalid)?;

        Ok(Identity {
            user: UserSnapshot::from(&user),
            workspace: None,
            network: dapp.network.clone(),
            dapp: Some(dapp),
        })
    }
}
