// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sign-in, sign-out and code issuance endpoints.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{Auth, AuthError, Identity, RawCredential, SignInRequest};
use crate::models::{Network, UserSnapshot, WorkspaceRef};
use crate::recover_codes::{RecoverCode, RecoverCodeKind};
use crate::sessions::Session;
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ChallengeRequest {
    /// Signer address of a registered user.
    pub address: String,
    /// Origin of the client that will sign the challenge.
    #[serde(default)]
    pub origin: String,
    pub network: Network,
}

/// Issued code, challenge or one-time.
#[derive(Debug, Serialize, ToSchema)]
pub struct CodeResponse {
    pub code: String,
    pub kind: RecoverCodeKind,
    pub valid_at: DateTime<Utc>,
}

impl From<RecoverCode> for CodeResponse {
    fn from(code: RecoverCode) -> Self {
        Self {
            code: code.code,
            kind: code.kind,
            valid_at: code.valid_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SignInResponse {
    /// Bearer token for subsequent requests.
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub workspace: WorkspaceRef,
    pub network: Network,
    pub user: UserSnapshot,
}

impl From<Session> for SignInResponse {
    fn from(session: Session) -> Self {
        Self {
            token: session.token,
            expires_at: session.expires_at,
            workspace: session.workspace,
            network: session.network,
            user: session.user,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CodeRequest {
    #[serde(default)]
    pub origin: String,
    /// Issue a `cli`-prefixed code limited to the CLI route allow-list.
    #[serde(default)]
    pub cli: bool,
}

/// Issue a sign-in challenge for a registered address.
#[utoipa::path(
    post,
    path = "/v1/auth/challenge",
    request_body = ChallengeRequest,
    tag = "Auth",
    responses(
        (status = 201, description = "Challenge issued", body = CodeResponse),
        (status = 404, description = "No user registered at this address"),
    )
)]
pub async fn challenge(
    State(state): State<AppState>,
    Json(request): Json<ChallengeRequest>,
) -> Result<(StatusCode, Json<CodeResponse>), AuthError> {
    let code = state
        .auth
        .issue_challenge(&request.address, &request.origin, request.network)
        .await?;
    Ok((StatusCode::CREATED, Json(code.into())))
}

/// Exchange a signed challenge for a session token.
#[utoipa::path(
    post,
    path = "/v1/auth/sign-in",
    request_body = SignInRequest,
    tag = "Auth",
    responses(
        (status = 200, description = "Signed in", body = SignInResponse),
        (status = 401, description = "Invalid challenge, signature or encoder"),
    )
)]
pub async fn sign_in(
    State(state): State<AppState>,
    Json(request): Json<SignInRequest>,
) -> Result<Json<SignInResponse>, AuthError> {
    let session = state.auth.sign_in(&request).await?;
    Ok(Json(session.into()))
}

/// Retire the presented session token.
#[utoipa::path(
    delete,
    path = "/v1/auth/sign-out",
    tag = "Auth",
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Signed out"),
        (status = 401, description = "Missing credentials"),
    )
)]
pub async fn sign_out(
    State(state): State<AppState>,
    RawCredential(token): RawCredential,
) -> Result<StatusCode, AuthError> {
    state.auth.sign_out(&token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Issue a one-time code for the caller.
#[utoipa::path(
    post,
    path = "/v1/auth/code",
    request_body = CodeRequest,
    tag = "Auth",
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Code issued", body = CodeResponse),
        (status = 401, description = "Unauthorized"),
    )
)]
pub async fn request_code(
    State(state): State<AppState>,
    Auth(identity): Auth,
    Json(request): Json<CodeRequest>,
) -> Result<(StatusCode, Json<CodeResponse>), AuthError> {
    let code = state
        .auth
        .request_code(&identity, &request.origin, request.cli)
        .await?;
    Ok((StatusCode::CREATED, Json(code.into())))
}

/// Identity resolved from the presented credential.
#[utoipa::path(
    get,
    path = "/v1/auth/me",
    tag = "Auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Resolved identity", body = Identity),
        (status = 401, description = "Unauthorized"),
    )
)]
pub async fn me(Auth(identity): Auth) -> Json<Identity> {
    Json(identity)
}
