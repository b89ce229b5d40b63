// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistence for the auth core.
//!
//! ## Layers
//!
//! - [`repository`]: async traits every strategy and service reads through
//! - [`database`]: the redb implementation of all of them (`/data/auth.redb`)
//! - [`session_cache`]: in-process LRU in front of the session table
//!
//! ## Storage Layout
//!
//! ```text
//! /data/
//!   auth.redb       # sessions, recover codes, users, workspaces,
//!                   # vault ownership, dapp bindings
//! ```
//!
//! Store failures surface as [`StoreError`] and are always reported to
//! clients as internal errors, never as an authentication failure.

pub mod database;
pub mod repository;
pub mod session_cache;

pub use database::{AuthDatabase, StoreError, StoreResult};
pub use repository::{
    ConsumeOutcome, DappRepository, RecoverCodeRepository, ResourceRepository, SessionRepository,
    UserRepository, WorkspaceRepository,
};
pub use session_cache::{CachedSession, SessionCache};
