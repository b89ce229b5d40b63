// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication and authorization errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::storage::StoreError;

/// Stable cause of an `Unauthorized` failure.
///
/// Callers (and tests) assert on the title rather than on the HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnauthorizedTitle {
    MissingCredentials,
    InvalidCredentials,
    InvalidRecoverCode,
    SessionNotFound,
    ExpiredToken,
    MissingPermission,
    UnauthorizedResource,
    InvalidPermission,
    InvalidEncoder,
}

impl UnauthorizedTitle {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnauthorizedTitle::MissingCredentials => "MISSING_CREDENTIALS",
            UnauthorizedTitle::InvalidCredentials => "INVALID_CREDENTIALS",
            UnauthorizedTitle::InvalidRecoverCode => "INVALID_RECOVER_CODE",
            UnauthorizedTitle::SessionNotFound => "SESSION_NOT_FOUND",
            UnauthorizedTitle::ExpiredToken => "EXPIRED_TOKEN",
            UnauthorizedTitle::MissingPermission => "MISSING_PERMISSION",
            UnauthorizedTitle::UnauthorizedResource => "UNAUTHORIZED_RESOURCE",
            UnauthorizedTitle::InvalidPermission => "INVALID_PERMISSION",
            UnauthorizedTitle::InvalidEncoder => "INVALID_ENCODER",
        }
    }

    /// Permission titles are authenticated-but-forbidden.
    fn is_forbidden(&self) -> bool {
        matches!(
            self,
            UnauthorizedTitle::MissingPermission
                | UnauthorizedTitle::UnauthorizedResource
                | UnauthorizedTitle::InvalidPermission
        )
    }
}

impl std::fmt::Display for UnauthorizedTitle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by strategies, the evaluator and the auth service.
///
/// Store and deadline failures are always `Internal`; they are never
/// reported as an authentication failure.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{detail}")]
    Unauthorized {
        title: UnauthorizedTitle,
        detail: String,
    },

    #[error("{0} not found")]
    NotFound(String),

    #[error("Internal authentication error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<UnauthorizedTitle>,
}

impl AuthError {
    pub fn unauthorized(title: UnauthorizedTitle, detail: impl Into<String>) -> Self {
        AuthError::Unauthorized {
            title,
            detail: detail.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        AuthError::Internal(message.into())
    }

    /// The `Unauthorized` title, if this is an authorization failure.
    pub fn title(&self) -> Option<UnauthorizedTitle> {
        match self {
            AuthError::Unauthorized { title, .. } => Some(*title),
            _ => None,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::Unauthorized { .. } => "unauthorized",
            AuthError::NotFound(_) => "not_found",
            AuthError::Internal(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Unauthorized { title, .. } if title.is_forbidden() => StatusCode::FORBIDDEN,
            AuthError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            AuthError::NotFound(_) => StatusCode::NOT_FOUND,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        AuthError::Internal(e.to_string())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
            title: self.title(),
        });
        (status, body).into_response()
    }
}
