// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded auth database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `sessions`: token → serialized Session
//! - `recover_codes`: code → serialized RecoverCode
//! - `users`: user_id → serialized UserRecord
//! - `user_address_index`: lowercase address → user_id
//! - `workspaces`: workspace_id → serialized Workspace (members + permissions)
//! - `resources`: resource_id → owning workspace_id
//! - `dapp_sessions`: session_id → serialized DappSession
//!
//! redb allows a single write transaction at a time, which is what makes
//! [`RecoverCodeRepository::consume`] race-free.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::{de::DeserializeOwned, Serialize};

use super::repository::{
    ConsumeOutcome, DappRepository, RecoverCodeRepository, ResourceRepository, SessionRepository,
    UserRepository, WorkspaceRepository,
};
use crate::auth::permissions::PermissionTable;
use crate::models::{DappSession, ResourceOwner, UserRecord};
use crate::recover_codes::{RecoverCode, RecoverCodeKind};
use crate::sessions::Session;
use crate::workspace::Workspace;

// =============================================================================
// Table Definitions
// =============================================================================

/// Tables holding JSON-serialized records keyed by id.
type JsonTable = TableDefinition<'static, &'static str, &'static [u8]>;

const SESSIONS: JsonTable = TableDefinition::new("sessions");

const RECOVER_CODES: JsonTable = TableDefinition::new("recover_codes");

const USERS: JsonTable = TableDefinition::new("users");

/// Lowercase signer address → user_id.
const USER_ADDRESS_INDEX: TableDefinition<&str, &str> = TableDefinition::new("user_address_index");

const WORKSPACES: JsonTable = TableDefinition::new("workspaces");

/// Vault (predicate) id → owning workspace id.
const RESOURCES: TableDefinition<&str, &str> = TableDefinition::new("resources");

const DAPP_SESSIONS: JsonTable = TableDefinition::new("dapp_sessions");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// AuthDatabase
// =============================================================================

/// Embedded ACID store for sessions, recover codes and the records the auth
/// core reads.
pub struct AuthDatabase {
    db: Database,
}

impl AuthDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(SESSIONS)?;
            let _ = write_txn.open_table(RECOVER_CODES)?;
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(USER_ADDRESS_INDEX)?;
            let _ = write_txn.open_table(WORKSPACES)?;
            let _ = write_txn.open_table(RESOURCES)?;
            let _ = write_txn.open_table(DAPP_SESSIONS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    // =========================================================================
    // Record writers (users, workspaces, vaults and dapps are owned by the
    // CRUD services; these keep the read side populated)
    // =========================================================================

    /// Insert or replace a user and its address index entry.
    pub fn put_user(&self, user: &UserRecord) -> StoreResult<()> {
        let json = serde_json::to_vec(user)?;
        let address = user.address.to_lowercase();
        let write_txn = self.db.begin_write()?;
        {
            let mut users = write_txn.open_table(USERS)?;
            users.insert(user.id.as_str(), json.as_slice())?;

            let mut index = write_txn.open_table(USER_ADDRESS_INDEX)?;
            index.insert(address.as_str(), user.id.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Insert or replace a workspace aggregate.
    pub fn put_workspace(&self, workspace: &Workspace) -> StoreResult<()> {
        self.put_json(WORKSPACES, &workspace.id, workspace)
    }

    /// Record which workspace owns a vault.
    pub fn put_resource(&self, owner: &ResourceOwner) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(RESOURCES)?;
            table.insert(owner.resource_id.as_str(), owner.workspace_id.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Vault ids owned by a workspace, in key order.
    pub fn list_resources(&self, workspace_id: &str) -> StoreResult<Vec<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RESOURCES)?;
        let mut resources = Vec::new();
        for entry in table.iter()? {
            let (resource_id, owner) = entry?;
            if owner.value() == workspace_id {
                resources.push(resource_id.value().to_string());
            }
        }
        Ok(resources)
    }

    pub fn put_dapp_session(&self, dapp: &DappSession) -> StoreResult<()> {
        self.put_json(DAPP_SESSIONS, &dapp.session_id, dapp)
    }

    /// Number of durable session rows.
    pub fn session_count(&self) -> StoreResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SESSIONS)?;
        Ok(table.len()?)
    }

    // =========================================================================
    // JSON helpers
    // =========================================================================

    fn get_json<T: DeserializeOwned>(
        &self,
        definition: JsonTable,
        key: &str,
    ) -> StoreResult<Option<T>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(definition)?;
        match table.get(key)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn put_json<T: Serialize>(
        &self,
        definition: JsonTable,
        key: &str,
        value: &T,
    ) -> StoreResult<()> {
        let json = serde_json::to_vec(value)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(definition)?;
            table.insert(key, json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Like `put_json`, but never creates a row.
    fn replace_json<T: Serialize>(
        &self,
        definition: JsonTable,
        key: &str,
        value: &T,
    ) -> StoreResult<bool> {
        let json = serde_json::to_vec(value)?;
        let write_txn = self.db.begin_write()?;
        let replaced = {
            let mut table = write_txn.open_table(definition)?;
            let exists = table.get(key)?.is_some();
            if exists {
                table.insert(key, json.as_slice())?;
            }
            exists
        };
        write_txn.commit()?;
        Ok(replaced)
    }

    fn remove_key(&self, definition: JsonTable, key: &str) -> StoreResult<bool> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(definition)?;
            let existed = table.remove(key)?.is_some();
            existed
        };
        write_txn.commit()?;
        Ok(removed)
    }

    /// Delete every row of a JSON table for which `expired` returns true.
    fn remove_where<T, F>(
        &self,
        definition: JsonTable,
        expired: F,
    ) -> StoreResult<usize>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> bool,
    {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(definition)?;
            let mut doomed = Vec::new();
            for entry in table.iter()? {
                let (key, value) = entry?;
                let record: T = serde_json::from_slice(value.value())?;
                if expired(&record) {
                    doomed.push(key.value().to_string());
                }
            }
            for key in &doomed {
                table.remove(key.as_str())?;
            }
            doomed.len()
        };
        write_txn.commit()?;
        Ok(removed)
    }
}

// =============================================================================
// Repository implementations
// =============================================================================

#[async_trait]
impl UserRepository for AuthDatabase {
    async fn find_by_id(&self, user_id: &str) -> StoreResult<Option<UserRecord>> {
        self.get_json(USERS, user_id)
    }

    async fn find_by_address(&self, address: &str) -> StoreResult<Option<UserRecord>> {
        let user_id = {
            let read_txn = self.db.begin_read()?;
            let index = read_txn.open_table(USER_ADDRESS_INDEX)?;
            let found = index
                .get(address.to_lowercase().as_str())?
                .map(|v| v.value().to_string());
            found
        };
        match user_id {
            Some(id) => self.get_json(USERS, &id),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl WorkspaceRepository for AuthDatabase {
    async fn find_by_id(&self, workspace_id: &str) -> StoreResult<Option<Workspace>> {
        self.get_json(WORKSPACES, workspace_id)
    }

    async fn find_permission_table(
        &self,
        workspace_id: &str,
    ) -> StoreResult<Option<PermissionTable>> {
        let workspace: Option<Workspace> = self.get_json(WORKSPACES, workspace_id)?;
        Ok(workspace.map(|w| w.permissions))
    }

    async fn is_member(&self, workspace_id: &str, user_id: &str) -> StoreResult<bool> {
        let workspace: Option<Workspace> = self.get_json(WORKSPACES, workspace_id)?;
        Ok(workspace.is_some_and(|w| w.is_member(user_id)))
    }
}

#[async_trait]
impl ResourceRepository for AuthDatabase {
    async fn find_owning_workspace(&self, resource_id: &str) -> StoreResult<Option<ResourceOwner>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RESOURCES)?;
        let owner = table.get(resource_id)?.map(|v| ResourceOwner {
            resource_id: resource_id.to_string(),
            workspace_id: v.value().to_string(),
        });
        Ok(owner)
    }
}

#[async_trait]
impl DappRepository for AuthDatabase {
    async fn find_by_session_id(&self, session_id: &str) -> StoreResult<Option<DappSession>> {
        self.get_json(DAPP_SESSIONS, session_id)
    }
}

#[async_trait]
impl SessionRepository for AuthDatabase {
    async fn find_by_token(&self, token: &str) -> StoreResult<Option<Session>> {
        self.get_json(SESSIONS, token)
    }

    async fn upsert(&self, session: &Session) -> StoreResult<()> {
        self.put_json(SESSIONS, &session.token, session)
    }

    async fn update_if_exists(&self, session: &Session) -> StoreResult<bool> {
        self.replace_json(SESSIONS, &session.token, session)
    }

    async fn delete(&self, token: &str) -> StoreResult<bool> {
        self.remove_key(SESSIONS, token)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        self.remove_where(SESSIONS, |session: &Session| session.is_expired(now))
    }
}

#[async_trait]
impl RecoverCodeRepository for AuthDatabase {
    async fn find_by_code(&self, code: &str) -> StoreResult<Option<RecoverCode>> {
        self.get_json(RECOVER_CODES, code)
    }

    async fn insert(&self, code: &RecoverCode) -> StoreResult<()> {
        self.put_json(RECOVER_CODES, &code.code, code)
    }

    async fn update(&self, code: &RecoverCode) -> StoreResult<()> {
        self.put_json(RECOVER_CODES, &code.code, code)
    }

    async fn consume(
        &self,
        code: &str,
        kind: RecoverCodeKind,
        max_uses: u32,
        now: DateTime<Utc>,
    ) -> StoreResult<ConsumeOutcome> {
        // Read, check and write inside one write transaction: redb admits a
        // single writer, so concurrent consumers queue here.
        let write_txn = self.db.begin_write()?;
        let outcome = {
            let mut table = write_txn.open_table(RECOVER_CODES)?;
            let existing = table.get(code)?.map(|v| v.value().to_vec());

            match existing {
                None => ConsumeOutcome::NotFound,
                Some(bytes) => {
                    let mut record: RecoverCode = serde_json::from_slice(&bytes)?;
                    if record.kind != kind {
                        ConsumeOutcome::NotFound
                    } else if !record.is_usable(now) {
                        ConsumeOutcome::Rejected(record)
                    } else {
                        record.record_use(max_uses);
                        let json = serde_json::to_vec(&record)?;
                        table.insert(code, json.as_slice())?;
                        ConsumeOutcome::Consumed(record)
                    }
                }
            }
        };
        write_txn.commit()?;
        Ok(outcome)
    }

    async fn delete_expired_before(&self, cutoff: DateTime<Utc>) -> StoreResult<usize> {
        self.remove_where(RECOVER_CODES, |code: &RecoverCode| code.valid_at < cutoff)
    }
}

// =============================================================================
// Tests
// =============================================================================
