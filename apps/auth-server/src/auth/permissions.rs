// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Workspace permission table and its evaluators.
//!
//! The table is sparse: `user_id → role → {resource_id | WILDCARD}`. A user
//! missing from the outer map has no permission at all in the workspace.
//! Membership is tracked separately on the workspace aggregate and is never
//! inferred from this table.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use super::roles::Role;

/// Sentinel meaning "every resource in this workspace".
pub const WILDCARD: &str = "*";

/// Per-workspace permission table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionTable(HashMap<String, HashMap<Role, BTreeSet<String>>>);

impl PermissionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `role` on `resource` (or [`WILDCARD`]) to `user_id`.
    pub fn grant(&mut self, user_id: &str, role: Role, resource: impl Into<String>) {
        self.0
            .entry(user_id.to_string())
            .or_default()
            .entry(role)
            .or_default()
            .insert(resource.into());
    }

    /// Drop `role` entirely for `user_id`. Returns whether anything changed.
    pub fn revoke(&mut self, user_id: &str, role: Role) -> bool {
        let Some(roles) = self.0.get_mut(user_id) else {
            return false;
        };
        let removed = roles.remove(&role).is_some();
        if roles.is_empty() {
            self.0.remove(user_id);
        }
        removed
    }

    /// Remove every entry for `user_id`.
    pub fn remove_user(&mut self, user_id: &str) -> bool {
        self.0.remove(user_id).is_some()
    }

    pub fn contains_user(&self, user_id: &str) -> bool {
        self.0.contains_key(user_id)
    }
}

/// Contract A: the user holds at least one of `required` with the wildcard.
pub fn has_general_permission(table: &PermissionTable, user_id: &str, required: &[Role]) -> bool {
    let Some(roles) = table.0.get(user_id) else {
        return false;
    };
    required.iter().any(|role| {
        roles
            .get(role)
            .is_some_and(|resources| resources.contains(WILDCARD))
    })
}

/// Contract B: the user holds at least one of `required` either with the
/// wildcard or scoped to `resource_id`.
///
/// An empty `required` list is an open route and always passes.
pub fn has_resource_permission(
    table: &PermissionTable,
    user_id: &str,
    required: &[Role],
    resource_id: &str,
) -> bool {
    if required.is_empty() {
        return true;
    }
    let Some(roles) = table.0.get(user_id) else {
        return false;
    };
    required.iter().any(|role| {
        roles.get(role).is_some_and(|resources| {
            resources.contains(WILDCARD) || resources.contains(resource_id)
        })
    })
}
