// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Seeded temporary databases shared by unit tests.

use std::sync::Arc;

use chrono::Utc;
use tempfile::TempDir;

use crate::models::{Encoder, Network, ResourceOwner, UserRecord};
use crate::storage::AuthDatabase;
use crate::workspace::Workspace;

pub fn network() -> Network {
    Network {
        url: "http://localhost:4000/v1/graphql".into(),
        chain_id: 0,
    }
}

/// A temp redb file; dropped with the fixture.
pub struct Fixture {
    pub db: Arc<AuthDatabase>,
    _dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let db = AuthDatabase::open(&dir.path().join("auth.redb")).expect("Failed to open db");
        Self {
            db: Arc::new(db),
            _dir: dir,
        }
    }

    /// Seed a user with a personal workspace and return both.
    pub fn user(&self, id: &str, address: &str) -> (UserRecord, Workspace) {
        let workspace = Workspace::create(format!("{id} personal"), id, true);
        let user = UserRecord {
            id: id.to_string(),
            name: id.to_string(),
            avatar: String::new(),
            address: address.to_string(),
            account_type: Encoder::Fuel,
            notify: false,
            first_login: false,
            default_workspace_id: workspace.id.clone(),
            created_at: Utc::now(),
        };
        self.db.put_user(&user).unwrap();
        self.db.put_workspace(&workspace).unwrap();
        (user, workspace)
    }

    pub fn workspace(&self, workspace: &Workspace) {
        self.db.put_workspace(workspace).unwrap();
    }

    pub fn vault(&self, resource_id: &str, workspace_id: &str) {
        self.db
            .put_resource(&ResourceOwner {
                resource_id: resource_id.to_string(),
                workspace_id: workspace_id.to_string(),
            })
            .unwrap();
    }
}
