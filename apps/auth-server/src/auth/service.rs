// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Auth Service
//!
//! Single entry point for authentication and authorization:
//!
//! - [`AuthService::authenticate`] resolves a raw credential to an
//!   [`Identity`] through the strategy the prefix selects.
//! - [`AuthService::authorize`] checks an identity against a vault and a set
//!   of required roles.
//! - Sign-in, sign-out and code issuance create and retire the credentials
//!   the strategies consume.
//!
//! Store calls run under the request deadline carried by [`RequestContext`].
//! Running out of time is an `Internal` error, never `Unauthorized`.

use std::future::Future;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use super::dispatcher::AuthStrategy;
use super::error::{AuthError, UnauthorizedTitle};
use super::identity::{Identity, RequestContext};
use super::permissions::{has_general_permission, has_resource_permission, PermissionTable};
use super::roles::Role;
use super::strategies::{
    BearerTokenStrategy, CliRoute, CliStrategy, ConnectorStrategy, RecoverCodeStrategy,
};
use crate::models::{Encoder, Network, UserSnapshot};
use crate::recover_codes::{NewRecoverCode, RecoverCode, RecoverCodeKind, RecoverCodeStore};
use crate::sessions::{Session, SessionStore};
use crate::storage::repository::{
    DappRepository, ResourceRepository, UserRepository, WorkspaceRepository,
};
use crate::storage::AuthDatabase;

// =============================================================================
// Collaborators
// =============================================================================

/// Signature recovery failed or the signature is malformed.
#[derive(Debug, thiserror::Error)]
#[error("signature verification failed: {0}")]
pub struct SignatureError(pub String);

/// Recovers the signer address of a digest.
///
/// Cryptography lives outside this crate; deployments plug in a verifier
/// per supported [`Encoder`].
pub trait SignatureVerifier: Send + Sync {
    fn recover_address(
        &self,
        encoder: Encoder,
        digest: &str,
        signature: &str,
    ) -> Result<String, SignatureError>;
}

/// Read-side repositories the service consults.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub workspaces: Arc<dyn WorkspaceRepository>,
    pub resources: Arc<dyn ResourceRepository>,
    pub dapps: Arc<dyn DappRepository>,
}

impl Repositories {
    /// Every repository backed by the same redb database.
    pub fn from_database(db: Arc<AuthDatabase>) -> Self {
        Self {
            users: db.clone(),
            workspaces: db.clone(),
            resources: db.clone(),
            dapps: db,
        }
    }
}

/// Sign-in payload: the challenge code signed by the user's wallet.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SignInRequest {
    /// The `AUTH` challenge code that was signed.
    pub digest: String,
    pub signature: String,
    pub encoder: Encoder,
}

// =============================================================================
// AuthService
// =============================================================================

pub struct AuthService {
    repos: Repositories,
    sessions: Arc<SessionStore>,
    codes: RecoverCodeStore,
    bearer: BearerTokenStrategy,
    recover: RecoverCodeStrategy,
    cli: CliStrategy,
    connector: ConnectorStrategy,
    verifier: Option<Arc<dyn SignatureVerifier>>,
}

impl AuthService {
    pub fn new(repos: Repositories, sessions: Arc<SessionStore>, codes: RecoverCodeStore) -> Self {
        let recover =
            RecoverCodeStrategy::new(codes.clone(), repos.users.clone(), repos.workspaces.clone());
        Self {
            bearer: BearerTokenStrategy::new(sessions.clone()),
            cli: CliStrategy::with_default_routes(recover.clone()),
            connector: ConnectorStrategy::new(repos.dapps.clone(), repos.users.clone()),
            recover,
            repos,
            sessions,
            codes,
            verifier: None,
        }
    }

    pub fn with_verifier(mut self, verifier: Arc<dyn SignatureVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Replace the CLI allow-list.
    pub fn with_cli_routes(mut self, routes: Vec<CliRoute>) -> Self {
        self.cli = CliStrategy::new(self.recover.clone(), routes);
        self
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn recover_codes(&self) -> &RecoverCodeStore {
        &self.codes
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Resolve a raw credential (without any `Bearer ` prefix).
    pub async fn authenticate(
        &self,
        raw: &str,
        ctx: &RequestContext,
    ) -> Result<Identity, AuthError> {
        if raw.trim().is_empty() {
            return Err(missing_credentials());
        }

        let strategy = AuthStrategy::select(raw);
        debug!(strategy = strategy.name(), route = %ctx.route(), "Resolving credential");

        let resolution = async {
            match strategy {
                AuthStrategy::BearerToken => self.bearer.resolve(raw).await,
                AuthStrategy::RecoverCode => self.recover.resolve(raw).await,
                AuthStrategy::CliRecoverCode => self.cli.resolve(raw, ctx).await,
                AuthStrategy::Connector => self.connector.resolve(raw).await,
            }
        };

        let result = within_deadline(ctx, resolution).await;
        match &result {
            Err(AuthError::Unauthorized { title, .. }) => {
                warn!(strategy = strategy.name(), title = %title, "Credential rejected");
            }
            Err(e) => warn!(strategy = strategy.name(), error = %e, "Credential resolution failed"),
            Ok(identity) => {
                debug!(strategy = strategy.name(), user_id = %identity.user_id(), "Authenticated")
            }
        }
        result
    }

    // =========================================================================
    // Authorization
    // =========================================================================

    /// Check `identity` against a vault.
    ///
    /// The vault must belong to the identity's workspace, the user must be a
    /// member of it and hold one of `roles` over the vault (or the wildcard).
    /// An empty `roles` list only requires the workspace checks.
    pub async fn authorize(
        &self,
        identity: &Identity,
        roles: &[Role],
        resource_id: &str,
        ctx: &RequestContext,
    ) -> Result<(), AuthError> {
        within_deadline(ctx, async {
            let owner = self
                .repos
                .resources
                .find_owning_workspace(resource_id)
                .await?
                .ok_or_else(|| AuthError::NotFound(format!("Vault {resource_id}")))?;

            let workspace_id = identity.workspace_id().ok_or_else(|| {
                AuthError::unauthorized(
                    UnauthorizedTitle::InvalidPermission,
                    "Credential is not bound to a workspace",
                )
            })?;

            if workspace_id != owner.workspace_id {
                debug!(
                    user_id = %identity.user_id(),
                    resource_id,
                    "Vault belongs to another workspace"
                );
                return Err(missing_permission());
            }

            let table = self.member_permissions(identity, workspace_id).await?;
            if !has_resource_permission(&table, identity.user_id(), roles, resource_id) {
                return Err(missing_permission());
            }
            Ok(())
        })
        .await
    }

    /// Check `identity` against its own workspace for routes that are not
    /// about one vault. Requires the wildcard on one of `roles`.
    pub async fn authorize_workspace(
        &self,
        identity: &Identity,
        roles: &[Role],
        ctx: &RequestContext,
    ) -> Result<(), AuthError> {
        within_deadline(ctx, async {
            let workspace_id = identity.workspace_id().ok_or_else(|| {
                AuthError::unauthorized(
                    UnauthorizedTitle::InvalidPermission,
                    "Credential is not bound to a workspace",
                )
            })?;

            let table = self.member_permissions(identity, workspace_id).await?;
            if !roles.is_empty() && !has_general_permission(&table, identity.user_id(), roles) {
                return Err(missing_permission());
            }
            Ok(())
        })
        .await
    }

    async fn member_permissions(
        &self,
        identity: &Identity,
        workspace_id: &str,
    ) -> Result<PermissionTable, AuthError> {
        if !self
            .repos
            .workspaces
            .is_member(workspace_id, identity.user_id())
            .await?
        {
            debug!(user_id = %identity.user_id(), workspace_id, "Not a workspace member");
            return Err(missing_permission());
        }

        Ok(self
            .repos
            .workspaces
            .find_permission_table(workspace_id)
            .await?
            .unwrap_or_default())
    }

    // =========================================================================
    // Credential lifecycle
    // =========================================================================

    /// Issue a sign-in challenge for the user registered at `address`.
    pub async fn issue_challenge(
        &self,
        address: &str,
        origin: &str,
        network: Network,
    ) -> Result<RecoverCode, AuthError> {
        let user = self
            .repos
            .users
            .find_by_address(address)
            .await?
            .ok_or_else(|| AuthError::NotFound("User".to_string()))?;

        self.codes
            .issue(NewRecoverCode {
                owner_id: user.id,
                origin: origin.to_string(),
                kind: RecoverCodeKind::Auth,
                network,
                metadata: serde_json::json!({}),
                cli: false,
            })
            .await
    }

    /// Exchange a signed challenge for a session.
    pub async fn sign_in(&self, request: &SignInRequest) -> Result<Session, AuthError> {
        let Some(verifier) = self.verifier.as_ref() else {
            return Err(AuthError::internal("no signature verifier configured"));
        };

        let challenge = self.codes.find_challenge(&request.digest).await?;

        let owner = self
            .repos
            .users
            .find_by_id(&challenge.owner_id)
            .await?
            .ok_or_else(invalid_credentials)?;

        let signer = verifier
            .recover_address(request.encoder, &request.digest, &request.signature)
            .map_err(|e| {
                debug!(error = %e, "Signature recovery failed");
                invalid_credentials()
            })?;
        if !signer.eq_ignore_ascii_case(&owner.address) {
            return Err(invalid_credentials());
        }
        if request.encoder != owner.account_type {
            return Err(AuthError::unauthorized(
                UnauthorizedTitle::InvalidEncoder,
                "Encoder does not match the account type",
            ));
        }

        // Another sign-in racing on the same challenge loses here.
        let challenge = self.codes.consume_challenge(&request.digest).await?;

        let workspace = self
            .repos
            .workspaces
            .find_by_id(&owner.default_workspace_id)
            .await?
            .ok_or_else(|| AuthError::NotFound("Workspace".to_string()))?;

        let session = Session::start(
            UserSnapshot::from(&owner),
            workspace.to_ref(),
            challenge.network,
            self.sessions.ttl(),
        );
        self.sessions.add(session.clone()).await?;

        info!(
            user_id = %owner.id,
            session_id = %session.id,
            workspace_id = %workspace.id,
            "User signed in"
        );
        Ok(session)
    }

    /// Retire a session token. Unknown tokens are not an error.
    pub async fn sign_out(&self, token: &str) -> Result<(), AuthError> {
        if self.sessions.remove(token).await? {
            info!("Session signed out");
        }
        Ok(())
    }

    /// Issue an `AUTH_ONCE` code for the caller, `cli`-prefixed when asked.
    pub async fn request_code(
        &self,
        identity: &Identity,
        origin: &str,
        cli: bool,
    ) -> Result<RecoverCode, AuthError> {
        self.codes
            .issue(NewRecoverCode {
                owner_id: identity.user_id().to_string(),
                origin: origin.to_string(),
                kind: RecoverCodeKind::AuthOnce,
                network: identity.network.clone(),
                metadata: serde_json::json!({ "uses": if cli { "cli" } else { "code" } }),
                cli,
            })
            .await
    }
}

async fn within_deadline<T, F>(ctx: &RequestContext, fut: F) -> Result<T, AuthError>
where
    F: Future<Output = Result<T, AuthError>>,
{
    match ctx.deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, fut)
            .await
            .map_err(|_| AuthError::internal("deadline exceeded"))?,
        None => fut.await,
    }
}

fn missing_credentials() -> AuthError {
    AuthError::unauthorized(UnauthorizedTitle::MissingCredentials, "Missing credentials")
}

fn invalid_credentials() -> AuthError {
    AuthError::unauthorized(UnauthorizedTitle::InvalidCredentials, "Invalid credentials")
}

fn missing_permission() -> AuthError {
    AuthError::unauthorized(UnauthorizedTitle::MissingPermission, "Missing permission")
}
