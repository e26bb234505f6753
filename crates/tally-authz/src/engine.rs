//! The pure authorization decision.
//!
//! Nothing here touches storage: a [`Principal`] carries a role and an
//! already-resolved [`PermissionSet`], and [`check_permission`] answers
//! from those alone.

use std::collections::HashSet;

use serde::Serialize;
use tally_core::models::permission::{Action, PermissionKey, Resource};
use tally_core::models::user::UserRole;

/// The permissions a principal holds, deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PermissionSet {
    keys: HashSet<PermissionKey>,
}

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: PermissionKey) -> bool {
        self.keys.insert(key)
    }

    pub fn contains(&self, key: PermissionKey) -> bool {
        self.keys.contains(&key)
    }

    /// `true` if the set holds `resource:action` or `resource:manage`.
    pub fn allows(&self, resource: Resource, action: Action) -> bool {
        self.contains(PermissionKey::new(resource, action))
            || self.contains(PermissionKey::new(resource, Action::Manage))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PermissionKey> {
        self.keys.iter()
    }

    /// Keys in a stable order, for display and logging.
    pub fn sorted(&self) -> Vec<PermissionKey> {
        let mut keys: Vec<_> = self.keys.iter().copied().collect();
        keys.sort();
        keys
    }
}

impl FromIterator<PermissionKey> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = PermissionKey>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

impl Extend<PermissionKey> for PermissionSet {
    fn extend<I: IntoIterator<Item = PermissionKey>>(&mut self, iter: I) {
        self.keys.extend(iter);
    }
}

/// The acting user as far as authorization is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub role: UserRole,
    pub permissions: PermissionSet,
}

impl Principal {
    pub fn new(role: UserRole, permissions: PermissionSet) -> Self {
        Self { role, permissions }
    }
}

/// Decide whether `principal` may perform `action` on `resource`.
///
/// Admins are always allowed. Everyone else needs the exact permission or
/// `manage` on the same resource.
pub fn check_permission(principal: &Principal, resource: Resource, action: Action) -> bool {
    if principal.role == UserRole::Admin {
        return true;
    }
    principal.permissions.allows(resource, action)
}
