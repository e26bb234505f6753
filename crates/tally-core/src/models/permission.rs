//! Permission domain model.
//!
//! A permission is a `(resource, action)` pair. Both halves are closed
//! enumerations; the `"resource:action"` string form only exists for
//! display and for parsing values that arrive from outside.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TallyError;

/// Business entity category subject to access control.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum Resource {
    Services,
    Expenses,
    ServiceTypes,
    Users,
    Audit,
    ShoppingList,
    Dashboard,
    Settings,
}

impl Resource {
    pub const ALL: [Resource; 8] = [
        Resource::Services,
        Resource::Expenses,
        Resource::ServiceTypes,
        Resource::Users,
        Resource::Audit,
        Resource::ShoppingList,
        Resource::Dashboard,
        Resource::Settings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Services => "services",
            Resource::Expenses => "expenses",
            Resource::ServiceTypes => "service-types",
            Resource::Users => "users",
            Resource::Audit => "audit",
            Resource::ShoppingList => "shopping-list",
            Resource::Dashboard => "dashboard",
            Resource::Settings => "settings",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resource {
    type Err = TallyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resource::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| TallyError::Validation {
                message: format!("unknown resource: {s}"),
            })
    }
}

/// Operation kind on a resource. `Manage` subsumes every other action.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    Manage,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::Create,
        Action::Read,
        Action::Update,
        Action::Delete,
        Action::Manage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Manage => "manage",
        }
    }

    /// Whether holding `self` is enough to perform `requested`.
    pub fn satisfies(self, requested: Action) -> bool {
        self == Action::Manage || self == requested
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = TallyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| TallyError::Validation {
                message: format!("unknown action: {s}"),
            })
    }
}

/// The `(resource, action)` pair a permission grants.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PermissionKey {
    pub resource: Resource,
    pub action: Action,
}

impl PermissionKey {
    pub const fn new(resource: Resource, action: Action) -> Self {
        Self { resource, action }
    }
}

impl fmt::Display for PermissionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource, self.action)
    }
}

impl FromStr for PermissionKey {
    type Err = TallyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (resource, action) = s.split_once(':').ok_or_else(|| TallyError::Validation {
            message: format!("malformed permission: {s}"),
        })?;
        Ok(Self {
            resource: resource.parse()?,
            action: action.parse()?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Permission {
    pub id: Uuid,
    pub resource: Resource,
    pub action: Action,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Permission {
    pub fn key(&self) -> PermissionKey {
        PermissionKey::new(self.resource, self.action)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePermission {
    pub resource: Resource,
    pub action: Action,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_names_round_trip_through_from_str() {
        for resource in Resource::ALL {
            assert_eq!(resource.as_str().parse::<Resource>().unwrap(), resource);
        }
    }

    #[test]
    fn serde_names_match_display() {
        let json = serde_json::to_string(&Resource::ShoppingList).unwrap();
        assert_eq!(json, "\"shopping-list\"");
        let json = serde_json::to_string(&Action::Manage).unwrap();
        assert_eq!(json, "\"manage\"");
    }

    #[test]
    fn permission_key_display_and_parse() {
        let key = PermissionKey::new(Resource::ServiceTypes, Action::Update);
        assert_eq!(key.to_string(), "service-types:update");
        assert_eq!("service-types:update".parse::<PermissionKey>().unwrap(), key);
    }

    #[test]
    fn malformed_permission_strings_are_rejected() {
        assert!("services".parse::<PermissionKey>().is_err());
        assert!("invoices:read".parse::<PermissionKey>().is_err());
        assert!("services:approve".parse::<PermissionKey>().is_err());
    }

    #[test]
    fn manage_satisfies_every_action() {
        for action in Action::ALL {
            assert!(Action::Manage.satisfies(action));
        }
        assert!(Action::Read.satisfies(Action::Read));
        assert!(!Action::Read.satisfies(Action::Update));
    }
}
