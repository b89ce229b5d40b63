// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LRU cache layer in front of the durable session table.
//!
//! Holds the hot set of sessions keyed by token. Entries evicted for
//! capacity are simply re-read from redb on the next lookup.
//!
//! Each entry remembers the `expires_at` last written to redb. Sliding
//! renewals only touch the cached copy until the two drift far enough apart
//! to be worth a write.

use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use lru::LruCache;

use crate::sessions::Session;

/// A cached session plus the expiry its durable row carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedSession {
    pub session: Session,
    pub persisted_until: DateTime<Utc>,
}

impl CachedSession {
    /// Entry for a session whose durable row matches it exactly.
    pub fn persisted(session: Session) -> Self {
        Self {
            persisted_until: session.expires_at,
            session,
        }
    }
}

/// In-process LRU cache of live sessions.
pub struct SessionCache {
    cache: Mutex<LruCache<String, CachedSession>>,
}

impl SessionCache {
    /// Create a new cache holding at most `capacity` sessions.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, token: &str) -> Option<CachedSession> {
        self.lock().get(token).cloned()
    }

    /// Read without touching LRU order.
    pub fn peek(&self, token: &str) -> Option<CachedSession> {
        self.lock().peek(token).cloned()
    }

    pub fn put(&self, entry: CachedSession) {
        self.lock().put(entry.session.token.clone(), entry);
    }

    pub fn remove(&self, token: &str) -> Option<CachedSession> {
        self.lock().pop(token)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tokens the sweeper has to look at: expired sessions, and live ones
    /// whose durable row trails the cached expiry.
    pub fn stale_tokens(&self, now: DateTime<Utc>) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|(_, entry)| {
                entry.session.is_expired(now) || entry.persisted_until < entry.session.expires_at
            })
            .map(|(token, _)| token.clone())
            .collect()
    }

    // A poisoned lock only means another request panicked mid-update; the
    // map itself is still a valid cache.
    fn lock(&self) -> MutexGuard<'_, LruCache<String, CachedSession>> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
