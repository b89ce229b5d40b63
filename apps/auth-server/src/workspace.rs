// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Workspace aggregate.
//!
//! A workspace owns its member set and its [`PermissionTable`]. Both are only
//! mutated through the methods below; request handlers read them but never
//! edit them in place.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::permissions::{PermissionTable, WILDCARD};
use crate::auth::Role;
use crate::models::WorkspaceRef;

/// Workspace record as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    /// Personal (single-user) workspace.
    pub single: bool,
    pub members: BTreeSet<String>,
    pub permissions: PermissionTable,
    pub created_at: DateTime<Utc>,
}

/// Which resources a grant covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceScope {
    All,
    Only(Vec<String>),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WorkspaceError {
    #[error("user {0} is not a member of this workspace")]
    NotMember(String),
    #[error("the workspace owner cannot be removed")]
    OwnerRemoval,
}

impl Workspace {
    /// Create a workspace and seed the owner with the wildcard on every role.
    pub fn create(name: impl Into<String>, owner_id: impl Into<String>, single: bool) -> Self {
        let owner_id = owner_id.into();
        let mut permissions = PermissionTable::new();
        for role in Role::ALL {
            permissions.grant(&owner_id, role, WILDCARD);
        }

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            members: BTreeSet::from([owner_id.clone()]),
            owner_id,
            single,
            permissions,
            created_at: Utc::now(),
        }
    }

    pub fn is_member(&self, user_id: &str) -> bool {
        self.members.contains(user_id)
    }

    /// Add a member and grant them `role` over `scope`.
    pub fn add_member(&mut self, user_id: &str, role: Role, scope: ResourceScope) {
        self.members.insert(user_id.to_string());
        self.apply_grant(user_id, role, scope);
    }

    /// Grant an additional role to an existing member.
    pub fn grant(
        &mut self,
        user_id: &str,
        role: Role,
        scope: ResourceScope,
    ) -> Result<(), WorkspaceError> {
        if !self.is_member(user_id) {
            return Err(WorkspaceError::NotMember(user_id.to_string()));
        }
        self.apply_grant(user_id, role, scope);
        Ok(())
    }

    /// Revoke a role from a member. Membership is kept.
    pub fn revoke(&mut self, user_id: &str, role: Role) -> Result<bool, WorkspaceError> {
        if !self.is_member(user_id) {
            return Err(WorkspaceError::NotMember(user_id.to_string()));
        }
        Ok(self.permissions.revoke(user_id, role))
    }

    /// Remove a member and every permission they hold.
    pub fn remove_member(&mut self, user_id: &str) -> Result<(), WorkspaceError> {
        if user_id == self.owner_id {
            return Err(WorkspaceError::OwnerRemoval);
        }
        if !self.members.remove(user_id) {
            return Err(WorkspaceError::NotMember(user_id.to_string()));
        }
        self.permissions.remove_user(user_id);
        Ok(())
    }

    pub fn to_ref(&self) -> WorkspaceRef {
        WorkspaceRef {
            id: self.id.clone(),
            name: self.name.clone(),
            single: self.single,
        }
    }

    fn apply_grant(&mut self, user_id: &str, role: Role, scope: ResourceScope) {
        match scope {
            ResourceScope::All => self.permissions.grant(user_id, role, WILDCARD),
            ResourceScope::Only(resources) => {
                for resource in resources {
                    self.permissions.grant(user_id, role, resource);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::permissions::{has_general_permission, has_resource_permission};

    #[test]
    fn owner_is_seeded_with_every_role() {
        let ws = Workspace::create("Team", "user-a", false);
        assert!(ws.is_member("user-a"));
        for role in Role::ALL {
            assert!(has_general_permission(&ws.permissions, "user-a", &[role]));
        }
    }

    #[test]
    fn scoped_signer_scenario() {
        let mut ws = Workspace::create("W", "user-a", false);
        ws.add_member("user-b", Role::Signer, ResourceScope::Only(vec!["R9".into()]));

        let table = &ws.permissions;
        assert!(has_resource_permission(table, "user-b", &[Role::Signer], "R9"));
        assert!(!has_resource_permission(table, "user-b", &[Role::Signer], "R8"));
        assert!(!has_resource_permission(table, "user-b", &[Role::Owner], "R9"));
        assert!(has_resource_permission(table, "user-a", &[Role::Owner], "R8"));
    }

    #[test]
    fn grant_requires_membership() {
        let mut ws = Workspace::create("W", "user-a", false);
        let result = ws.grant("stranger", Role::Viewer, ResourceScope::All);
        assert_eq!(result, Err(WorkspaceError::NotMember("stranger".into())));
    }

    #[test]
    fn remove_member_drops_permissions() {
        let mut ws = Workspace::create("W", "user-a", false);
        ws.add_member("user-b", Role::Viewer, ResourceScope::All);
        ws.remove_member("user-b").unwrap();
        assert!(!ws.is_member("user-b"));
        assert!(!ws.permissions.contains_user("user-b"));
    }

    #[test]
    fn owner_cannot_be_removed() {
        let mut ws = Workspace::create("W", "user-a", true);
        assert_eq!(ws.remove_member("user-a"), Err(WorkspaceError::OwnerRemoval));
    }

    #[test]
    fn revoke_keeps_membership() {
        let mut ws = Workspace::create("W", "user-a", false);
        ws.add_member("user-b", Role::Manager, ResourceScope::All);
        assert_eq!(ws.revoke("user-b", Role::Manager), Ok(true));
        assert!(ws.is_member("user-b"));
        assert!(!has_general_permission(&ws.permissions, "user-b", &[Role::Manager]));
    }
}
