// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum integration: the `Auth` extractor and the `require_auth` middleware.
//!
//! Use the `Auth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(identity): Auth) -> impl IntoResponse {
//!     // identity is the resolved Identity
//! }
//! ```
//!
//! The raw credential is the `Authorization` header value with an optional
//! `Bearer ` prefix stripped. Recover codes and connector credentials are
//! sent the same way.

use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, OriginalUri, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tokio::time::Instant;

use super::{AuthError, Identity, RequestContext, UnauthorizedTitle};
use crate::state::AppState;

/// Extract the raw credential from the request headers.
pub fn credential(headers: &HeaderMap) -> Result<&str, AuthError> {
    let missing =
        || AuthError::unauthorized(UnauthorizedTitle::MissingCredentials, "Missing credentials");

    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(missing)?
        .to_str()
        .map_err(|_| {
            AuthError::unauthorized(
                UnauthorizedTitle::InvalidCredentials,
                "Authorization header is not valid ASCII",
            )
        })?;

    let raw = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    if raw.is_empty() {
        return Err(missing());
    }
    Ok(raw)
}

/// Build the context strategies see, with this request's deadline.
pub fn request_context(parts: &Parts, state: &AppState) -> RequestContext {
    // Inside nested routers `parts.uri` is relative to the nest point.
    let path = parts
        .extensions
        .get::<OriginalUri>()
        .map(|uri| uri.path().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string());

    RequestContext::new(parts.method.as_str(), path)
        .with_deadline(Instant::now() + state.request_timeout)
}

impl FromRequestParts<AppState> for RequestContext {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(request_context(parts, state))
    }
}

/// Extractor for authenticated requests.
///
/// Reuses the identity `require_auth` stored in the request extensions when
/// present; otherwise resolves the credential itself.
///
/// # Example
///
/// ```rust,ignore
/// async fn me(Auth(identity): Auth) -> Json<Identity> {
///     Json(identity)
/// }
/// ```
pub struct Auth(pub Identity);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(identity) = parts.extensions.get::<Identity>().cloned() {
            return Ok(Auth(identity));
        }

        let raw = credential(&parts.headers)?.to_string();
        let ctx = request_context(parts, state);
        let identity = state.auth.authenticate(&raw, &ctx).await?;

        parts.extensions.insert(identity.clone());
        Ok(Auth(identity))
    }
}

/// Raw credential of the request, unresolved. Used by sign-out.
pub struct RawCredential(pub String);

impl<S: Send + Sync> FromRequestParts<S> for RawCredential {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(RawCredential(credential(&parts.headers)?.to_string()))
    }
}

/// Middleware that rejects unauthenticated requests for a whole router
/// subtree and stores the resolved [`Identity`] in the request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let (mut parts, body) = request.into_parts();

    let raw = credential(&parts.headers)?.to_string();
    let ctx = request_context(&parts, &state);
    let identity = state.auth.authenticate(&raw, &ctx).await?;
    parts.extensions.insert(identity);

    Ok(next.run(Request::from_parts(parts, body)).await)
}
