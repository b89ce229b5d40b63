// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository traits the auth core reads and writes through.
//!
//! Every call is an I/O boundary. [`AuthDatabase`](super::AuthDatabase)
//! implements all of them on redb; other backends only need to honour the
//! atomicity requirement of [`RecoverCodeRepository::consume`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::StoreResult;
use crate::auth::permissions::PermissionTable;
use crate::models::{DappSession, ResourceOwner, UserRecord};
use crate::recover_codes::{RecoverCode, RecoverCodeKind};
use crate::sessions::Session;
use crate::workspace::Workspace;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, user_id: &str) -> StoreResult<Option<UserRecord>>;
    async fn find_by_address(&self, address: &str) -> StoreResult<Option<UserRecord>>;
}

#[async_trait]
pub trait WorkspaceRepository: Send + Sync {
    async fn find_by_id(&self, workspace_id: &str) -> StoreResult<Option<Workspace>>;
    async fn find_permission_table(&self, workspace_id: &str)
        -> StoreResult<Option<PermissionTable>>;
    async fn is_member(&self, workspace_id: &str, user_id: &str) -> StoreResult<bool>;
}

#[async_trait]
pub trait ResourceRepository: Send + Sync {
    async fn find_owning_workspace(&self, resource_id: &str) -> StoreResult<Option<ResourceOwner>>;
}

#[async_trait]
pub trait DappRepository: Send + Sync {
    async fn find_by_session_id(&self, session_id: &str) -> StoreResult<Option<DappSession>>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn find_by_token(&self, token: &str) -> StoreResult<Option<Session>>;
    async fn upsert(&self, session: &Session) -> StoreResult<()>;
    /// Overwrite the row only if it still exists. Returns whether it did.
    async fn update_if_exists(&self, session: &Session) -> StoreResult<bool>;
    /// Returns whether a row was removed.
    async fn delete(&self, token: &str) -> StoreResult<bool>;
    /// Delete every row with `expires_at <= now`. Returns the count removed.
    async fn delete_expired(&self, now: DateTime<Utc>) -> StoreResult<usize>;
}

/// Result of an atomic recover-code consumption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// Code accepted; carries the record after the update.
    Consumed(RecoverCode),
    /// Code exists but is used or expired. Nothing was written.
    Rejected(RecoverCode),
    /// No code of the requested kind with this value.
    NotFound,
}

#[async_trait]
pub trait RecoverCodeRepository: Send + Sync {
    async fn find_by_code(&self, code: &str) -> StoreResult<Option<RecoverCode>>;
    async fn insert(&self, code: &RecoverCode) -> StoreResult<()>;
    async fn update(&self, code: &RecoverCode) -> StoreResult<()>;

    /// Validate and record one use of `code` in a single serialized
    /// read-modify-write. Concurrent calls for the same code must never
    /// both observe the pre-increment count.
    async fn consume(
        &self,
        code: &str,
        kind: RecoverCodeKind,
        max_uses: u32,
        now: DateTime<Utc>,
    ) -> StoreResult<ConsumeOutcome>;

    /// Hard-delete codes whose `valid_at` is before `cutoff`.
    async fn delete_expired_before(&self, cutoff: DateTime<Utc>) -> StoreResult<usize>;
}
