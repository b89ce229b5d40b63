// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Credential resolution and workspace-scoped authorization for the vault API.
//!
//! ## Auth Flow
//!
//! 1. Client sends `Authorization: <credential>` (optionally `Bearer `-prefixed)
//! 2. The dispatcher picks a strategy from the credential prefix:
//!    - `cli…` → CLI recover code (route allow-list applies)
//!    - `code…` → one-time recover code
//!    - `connector…` → dapp connector session
//!    - anything else → bearer session token
//! 3. The strategy resolves an [`Identity`] or fails with a titled
//!    [`AuthError`]
//! 4. Vault routes then call [`AuthService::authorize`] with the roles they
//!    require
//!
//! ## Security
//!
//! - All non-health endpoints require authentication
//! - Sessions slide forward on use and are swept once expired
//! - One-time codes are consumed under a single serialized write
//! - Store failures and deadline overruns are `Internal`, never a denial

pub mod dispatcher;
pub mod error;
pub mod extractor;
pub mod identity;
pub mod permissions;
pub mod roles;
pub mod service;
pub mod strategies;

pub use dispatcher::AuthStrategy;
pub use error::{AuthError, UnauthorizedTitle};
pub use extractor::{require_auth, Auth, RawCredential};
pub use identity::{Identity, RequestContext};
pub use permissions::{has_general_permission, has_resource_permission, PermissionTable, WILDCARD};
pub use roles::Role;
pub use service::{AuthService, Repositories, SignInRequest, SignatureError, SignatureVerifier};
