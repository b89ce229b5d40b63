// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Vault (predicate) access endpoints.
//!
//! Vault CRUD lives elsewhere; these routes answer whether and how the
//! caller may reach a vault and are what CLI codes are allowed to call.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::{Auth, AuthError, RequestContext, Role, UnauthorizedTitle};
use crate::state::AppState;

/// Any role grants read access.
const READ_ROLES: &[Role] = &Role::ALL;

#[derive(Debug, Serialize, ToSchema)]
pub struct PredicateListResponse {
    pub workspace_id: String,
    pub predicates: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PredicateAccessResponse {
    pub predicate_id: String,
    pub workspace_id: String,
    pub user_id: String,
}

/// Vaults of the caller's workspace.
///
/// Requires workspace-wide (wildcard) access under any role.
#[utoipa::path(
    get,
    path = "/v1/predicate",
    tag = "Predicates",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Vault ids", body = PredicateListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Missing permission"),
    )
)]
pub async fn list_predicates(
    State(state): State<AppState>,
    ctx: RequestContext,
    Auth(identity): Auth,
) -> Result<Json<PredicateListResponse>, AuthError> {
    state
        .auth
        .authorize_workspace(&identity, READ_ROLES, &ctx)
        .await?;

    let workspace_id = identity
        .workspace_id()
        .ok_or_else(|| {
            AuthError::unauthorized(UnauthorizedTitle::InvalidPermission, "No workspace")
        })?
        .to_string();
    let predicates = state.db.list_resources(&workspace_id)?;

    Ok(Json(PredicateListResponse {
        workspace_id,
        predicates,
    }))
}

/// Check the caller's access to one vault.
#[utoipa::path(
    get,
    path = "/v1/predicate/{predicate_id}",
    params(
        ("predicate_id" = String, Path, description = "Vault identifier")
    ),
    tag = "Predicates",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Access granted", body = PredicateAccessResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Missing permission"),
        (status = 404, description = "Vault not found"),
    )
)]
pub async fn get_predicate(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(predicate_id): Path<String>,
    Auth(identity): Auth,
) -> Result<Json<PredicateAccessResponse>, AuthError> {
    state
        .auth
        .authorize(&identity, READ_ROLES, &predicate_id, &ctx)
        .await?;

    Ok(Json(PredicateAccessResponse {
        workspace_id: identity.workspace_id().unwrap_or_default().to_string(),
        user_id: identity.user_id().to_string(),
        predicate_id,
    }))
}
