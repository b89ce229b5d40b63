// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Sessions
//!
//! Bearer sessions live in two places: an in-process LRU cache for the hot
//! set and the durable `sessions` table. [`SessionStore`] keeps them in step.
//!
//! ## Sliding window
//!
//! Every successful lookup of a live session moves `expires_at` to
//! `now + ttl`, so a client that keeps calling at intervals shorter than the
//! TTL never expires. The cached copy is renewed on every lookup; the durable
//! row only once it trails the cached expiry by more than half the TTL.
//!
//! ## Concurrency
//!
//! Every mutation of a token (add, renewal, remove, sweep) runs under that
//! token's lock, so a sign-out can never be overwritten by a renewal that
//! read the session before it.
//!
//! ## Sweeping
//!
//! [`SessionSweeper`] runs on a detached task and periodically removes
//! expired sessions from the cache and the durable table, including durable
//! rows that never made it back into the cache after a restart. Renewals
//! still pending in the cache are written back first, so redb never trails
//! the cache by more than one sweep interval.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use crate::auth::error::AuthError;
use crate::models::{Network, UserSnapshot, WorkspaceRef};
use crate::recover_codes::RecoverCodeStore;
use crate::storage::repository::SessionRepository;
use crate::storage::session_cache::{CachedSession, SessionCache};

/// Default interval between sweeps.
pub const DEFAULT_SWEEP_INTERVAL: StdDuration = StdDuration::from_secs(5 * 60);

/// Number of token lock stripes.
const LOCK_STRIPES: usize = 64;

/// Persisted bearer session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Session {
    pub id: String,
    /// Opaque bearer token; the durable key.
    pub token: String,
    pub user: UserSnapshot,
    pub workspace: WorkspaceRef,
    pub network: Network,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Start a new session for `user` in `workspace`, valid for `ttl`.
    pub fn start(
        user: UserSnapshot,
        workspace: WorkspaceRef,
        network: Network,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            token: uuid::Uuid::new_v4().to_string(),
            user,
            workspace,
            network,
            issued_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn user_id(&self) -> &str {
        &self.user.id
    }
}

/// Counts from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Expired sessions dropped from the cache.
    pub cached_removed: usize,
    /// Durable rows deleted (cached ones plus orphans).
    pub durable_purged: usize,
    /// Pending renewals written back to the durable row.
    pub flushed: usize,
}

/// Cache-fronted session store.
pub struct SessionStore {
    cache: SessionCache,
    repo: Arc<dyn SessionRepository>,
    ttl: Duration,
    locks: Vec<Mutex<()>>,
}

impl SessionStore {
    pub fn new(repo: Arc<dyn SessionRepository>, cache_capacity: usize, ttl: Duration) -> Self {
        Self {
            cache: SessionCache::new(cache_capacity),
            repo,
            ttl,
            locks: (0..LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock_for(&self, token: &str) -> &Mutex<()> {
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        &self.locks[hasher.finish() as usize % self.locks.len()]
    }

    /// Persist a session, then cache it.
    pub async fn add(&self, session: Session) -> Result<(), AuthError> {
        let _guard = self.lock_for(&session.token).lock().await;
        self.repo.upsert(&session).await?;
        self.cache.put(CachedSession::persisted(session));
        Ok(())
    }

    /// Look a token up, cache first.
    ///
    /// Live sessions come back renewed. Expired sessions come back untouched
    /// so the caller can tell "expired" apart from "unknown".
    pub async fn get(&self, token: &str) -> Result<Option<Session>, AuthError> {
        let _guard = self.lock_for(token).lock().await;

        let mut entry = match self.cache.get(token) {
            Some(entry) => entry,
            None => match self.repo.find_by_token(token).await? {
                Some(session) => {
                    debug!(session_id = %session.id, "Session cache miss, loaded from store");
                    CachedSession::persisted(session)
                }
                None => return Ok(None),
            },
        };

        let now = Utc::now();
        if entry.session.is_expired(now) {
            return Ok(Some(entry.session));
        }

        let renewed_until = now + self.ttl;
        if renewed_until > entry.session.expires_at {
            entry.session.expires_at = renewed_until;
        }

        if entry.session.expires_at - entry.persisted_until > self.ttl / 2 {
            // The row is gone if another writer revoked it.
            if !self.repo.update_if_exists(&entry.session).await? {
                self.cache.remove(token);
                return Ok(None);
            }
            entry.persisted_until = entry.session.expires_at;
        }

        let session = entry.session.clone();
        self.cache.put(entry);
        Ok(Some(session))
    }

    /// Drop a token from both layers. Returns whether anything was removed.
    pub async fn remove(&self, token: &str) -> Result<bool, AuthError> {
        let _guard = self.lock_for(token).lock().await;
        let cached = self.cache.remove(token).is_some();
        let durable = self.repo.delete(token).await?;
        Ok(cached || durable)
    }

    /// Remove every session expired at `now`.
    ///
    /// Cached sessions are the authority for their tokens: pending renewals
    /// are written back before expired rows are purged.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<SweepReport, AuthError> {
        let mut report = SweepReport::default();

        for token in self.cache.stale_tokens(now) {
            let _guard = self.lock_for(&token).lock().await;
            let Some(entry) = self.cache.peek(&token) else {
                continue;
            };

            if entry.session.is_expired(now) {
                self.cache.remove(&token);
                report.cached_removed += 1;
                if self.repo.delete(&token).await? {
                    report.durable_purged += 1;
                }
            } else if entry.persisted_until < entry.session.expires_at {
                if self.repo.update_if_exists(&entry.session).await? {
                    self.cache.put(CachedSession::persisted(entry.session));
                    report.flushed += 1;
                } else {
                    self.cache.remove(&token);
                }
            }
        }

        report.durable_purged += self.repo.delete_expired(now).await?;
        Ok(report)
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}

// =============================================================================
// Sweeper
// =============================================================================

/// Background task that expires sessions and purges stale recover codes.
pub struct SessionSweeper {
    sessions: Arc<SessionStore>,
    codes: RecoverCodeStore,
    interval: StdDuration,
    code_retention: Duration,
}

impl SessionSweeper {
    pub fn new(
        sessions: Arc<SessionStore>,
        codes: RecoverCodeStore,
        interval: StdDuration,
        code_retention: Duration,
    ) -> Self {
        Self {
            sessions,
            codes,
            interval,
            code_retention,
        }
    }

    /// Run until the cancellation token is triggered.
    ///
    /// ```rust,ignore
    /// tokio::spawn(sweeper.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Session sweeper starting"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Session sweeper shutting down");
                    return;
                }
            }

            self.sweep_step().await;
        }
    }

    async fn sweep_step(&self) {
        match self.sessions.sweep_expired(Utc::now()).await {
            Ok(report) if report.durable_purged > 0 || report.flushed > 0 => {
                info!(
                    cached_removed = report.cached_removed,
                    durable_purged = report.durable_purged,
                    flushed = report.flushed,
                    "Swept expired sessions"
                );
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Session sweep failed"),
        }

        if let Err(e) = self.codes.purge_expired(self.code_retention).await {
            warn!(error = %e, "Recover code purge failed");
        }
    }
}
