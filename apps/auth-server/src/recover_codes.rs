// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Recover Codes
//!
//! Server-issued opaque codes used in lieu of a password.
//!
//! - `Auth` codes are sign-in challenges: the user signs the code and the
//!   signature is exchanged for a session. One successful sign-in marks the
//!   code used.
//! - `AuthOnce` codes authenticate a request directly (the `code…` and
//!   `cli…` credentials). Each use increments `uses_count`; reaching
//!   `max_uses` marks the code used in the same write.
//!
//! A code is usable iff `now < valid_at && !used`.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::auth::dispatcher::{CLI_PREFIX, CODE_PREFIX};
use crate::auth::error::{AuthError, UnauthorizedTitle};
use crate::models::Network;
use crate::storage::repository::{ConsumeOutcome, RecoverCodeRepository};

/// Default `AuthOnce` usage cap.
pub const DEFAULT_MAX_USES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecoverCodeKind {
    Auth,
    AuthOnce,
}

/// Persisted recover code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RecoverCode {
    pub id: String,
    pub code: String,
    pub owner_id: String,
    pub origin: String,
    pub kind: RecoverCodeKind,
    /// Expiry instant.
    pub valid_at: DateTime<Utc>,
    pub used: bool,
    pub uses_count: u32,
    pub network: Network,
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl RecoverCode {
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        now < self.valid_at && !self.used
    }

    /// Count one use. Flips `used` once the post-increment count reaches
    /// `max_uses`. Callers must hold the record's write lock.
    pub fn record_use(&mut self, max_uses: u32) {
        self.uses_count += 1;
        if self.uses_count >= max_uses {
            self.used = true;
        }
    }
}

/// Parameters for issuing a code.
#[derive(Debug, Clone)]
pub struct NewRecoverCode {
    pub owner_id: String,
    pub origin: String,
    pub kind: RecoverCodeKind,
    pub network: Network,
    pub metadata: serde_json::Value,
    /// Issue with the `cli` prefix instead of `code`.
    pub cli: bool,
}

/// Issuance and consumption of recover codes.
#[derive(Clone)]
pub struct RecoverCodeStore {
    repo: Arc<dyn RecoverCodeRepository>,
    ttl: Duration,
    max_uses: u32,
}

impl RecoverCodeStore {
    pub fn new(repo: Arc<dyn RecoverCodeRepository>, ttl: Duration, max_uses: u32) -> Self {
        Self {
            repo,
            ttl,
            max_uses,
        }
    }

    /// Issue and persist a new code valid for the configured TTL.
    pub async fn issue(&self, request: NewRecoverCode) -> Result<RecoverCode, AuthError> {
        let now = Utc::now();
        let prefix = if request.cli { CLI_PREFIX } else { CODE_PREFIX };
        let code = RecoverCode {
            id: uuid::Uuid::new_v4().to_string(),
            code: format!("{prefix}{}", uuid::Uuid::new_v4().simple()),
            owner_id: request.owner_id,
            origin: request.origin,
            kind: request.kind,
            valid_at: now + self.ttl,
            used: false,
            uses_count: 0,
            network: request.network,
            metadata: request.metadata,
            created_at: now,
        };

        self.repo.insert(&code).await?;
        debug!(
            code_id = %code.id,
            owner_id = %code.owner_id,
            kind = ?code.kind,
            "Issued recover code"
        );
        Ok(code)
    }

    /// Consume one use of an `AuthOnce` code.
    pub async fn consume_once(&self, code: &str) -> Result<RecoverCode, AuthError> {
        self.consume(code, RecoverCodeKind::AuthOnce, self.max_uses)
            .await
    }

    /// Consume an `Auth` sign-in challenge. A single use marks it used.
    pub async fn consume_challenge(&self, code: &str) -> Result<RecoverCode, AuthError> {
        self.consume(code, RecoverCodeKind::Auth, 1).await
    }

    /// Look up an `Auth` challenge without consuming it.
    pub async fn find_challenge(&self, code: &str) -> Result<RecoverCode, AuthError> {
        let record = self
            .repo
            .find_by_code(code)
            .await?
            .filter(|c| c.kind == RecoverCodeKind::Auth)
            .ok_or_else(invalid_code)?;
        if !record.is_usable(Utc::now()) {
            return Err(expired_code());
        }
        Ok(record)
    }

    /// Hard-delete codes that expired more than `retention` ago.
    pub async fn purge_expired(&self, retention: Duration) -> Result<usize, AuthError> {
        let cutoff = Utc::now() - retention;
        let purged = self.repo.delete_expired_before(cutoff).await?;
        if purged > 0 {
            info!(purged, "Purged expired recover codes");
        }
        Ok(purged)
    }

    async fn consume(
        &self,
        code: &str,
        kind: RecoverCodeKind,
        max_uses: u32,
    ) -> Result<RecoverCode, AuthError> {
        match self.repo.consume(code, kind, max_uses, Utc::now()).await? {
            ConsumeOutcome::Consumed(record) => Ok(record),
            ConsumeOutcome::Rejected(_) => Err(expired_code()),
            ConsumeOutcome::NotFound => Err(invalid_code()),
        }
    }
}

fn invalid_code() -> AuthError {
    AuthError::unauthorized(UnauthorizedTitle::InvalidRecoverCode, "Invalid recover code")
}

fn expired_code() -> AuthError {
    AuthError::unauthorized(UnauthorizedTitle::InvalidRecoverCode, "Recover code expired")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::AuthDatabase;

    fn network() -> Network {
        Network {
            url: "https://testnet.fuel.network/v1/graphql".into(),
            chain_id: 0,
        }
    }

    fn store(max_uses: u32) -> (RecoverCodeStore, Arc<AuthDatabase>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(AuthDatabase::open(&dir.path().join("auth.redb")).unwrap());
        let store = RecoverCodeStore::new(db.clone(), Duration::minutes(5), max_uses);
        (store, db, dir)
    }

    fn request(kind: RecoverCodeKind, cli: bool) -> NewRecoverCode {
        NewRecoverCode {
            owner_id: "user-1".into(),
            origin: "https://app.example".into(),
            kind,
            network: network(),
            metadata: serde_json::json!({}),
            cli,
        }
    }

    #[test]
    fn record_use_flips_used_at_cap() {
        let mut code = RecoverCode {
            id: "id".into(),
            code: "code1".into(),
            owner_id: "u".into(),
            origin: "o".into(),
            kind: RecoverCodeKind::AuthOnce,
            valid_at: Utc::now() + Duration::minutes(1),
            used: false,
            uses_count: 0,
            network: network(),
            metadata: serde_json::Value::Null,
            created_at: Utc::now(),
        };
        code.record_use(3);
        code.record_use(3);
        assert!(!code.used);
        code.record_use(3);
        assert!(code.used);
        assert_eq!(code.uses_count, 3);
    }

    #[tokio::test]
    async fn issued_codes_carry_dispatch_prefix() {
        let (store, _db, _dir) = store(3);
        let code = store.issue(request(RecoverCodeKind::AuthOnce, false)).await.unwrap();
        assert!(code.code.starts_with("code"));
        let cli = store.issue(request(RecoverCodeKind::AuthOnce, true)).await.unwrap();
        assert!(cli.code.starts_with("cli"));
    }

    #[tokio::test]
    async fn auth_once_code_is_capped() {
        let (store, _db, _dir) = store(3);
        let code = store.issue(request(RecoverCodeKind::AuthOnce, false)).await.unwrap();

        for expected in 1..=3 {
            let consumed = store.consume_once(&code.code).await.unwrap();
            assert_eq!(consumed.uses_count, expected);
        }

        let err = store.consume_once(&code.code).await.unwrap_err();
        assert_eq!(err.title(), Some(UnauthorizedTitle::InvalidRecoverCode));
    }

    #[tokio::test]
    async fn cap_is_configurable() {
        let (store, _db, _dir) = store(1);
        let code = store.issue(request(RecoverCodeKind::AuthOnce, false)).await.unwrap();
        assert!(store.consume_once(&code.code).await.is_ok());
        assert!(store.consume_once(&code.code).await.is_err());
    }

    #[tokio::test]
    async fn consume_once_ignores_auth_codes() {
        let (store, _db, _dir) = store(3);
        let challenge = store.issue(request(RecoverCodeKind::Auth, false)).await.unwrap();
        let err = store.consume_once(&challenge.code).await.unwrap_err();
        assert_eq!(err.title(), Some(UnauthorizedTitle::InvalidRecoverCode));
        assert!(store.find_challenge(&challenge.code).await.is_ok());
    }

    #[tokio::test]
    async fn expired_code_is_rejected() {
        let (store, db, _dir) = store(3);
        let mut code = store.issue(request(RecoverCodeKind::AuthOnce, false)).await.unwrap();
        code.valid_at = Utc::now() - Duration::seconds(1);
        db.update(&code).await.unwrap();

        let err = store.consume_once(&code.code).await.unwrap_err();
        assert_eq!(err.title(), Some(UnauthorizedTitle::InvalidRecoverCode));
        assert_eq!(err.to_string(), "Recover code expired");
    }

    #[tokio::test]
    async fn challenge_is_single_use() {
        let (store, _db, _dir) = store(3);
        let challenge = store.issue(request(RecoverCodeKind::Auth, false)).await.unwrap();
        assert!(store.consume_challenge(&challenge.code).await.unwrap().used);
        assert!(store.find_challenge(&challenge.code).await.is_err());
        assert!(store.consume_challenge(&challenge.code).await.is_err());
    }

    #[tokio::test]
    async fn purge_respects_retention() {
        let (store, db, _dir) = store(3);
        let mut old = store.issue(request(RecoverCodeKind::AuthOnce, false)).await.unwrap();
        old.valid_at = Utc::now() - Duration::days(10);
        db.update(&old).await.unwrap();
        let fresh = store.issue(request(RecoverCodeKind::AuthOnce, false)).await.unwrap();

        let purged = store.purge_expired(Duration::days(7)).await.unwrap();
        assert_eq!(purged, 1);
        assert!(db.find_by_code(&old.code).await.unwrap().is_none());
        assert!(db.find_by_code(&fresh.code).await.unwrap().is_some());
    }
}
