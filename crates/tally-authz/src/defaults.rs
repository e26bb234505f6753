//! Built-in permissions and the default grants of each system role.

use tally_core::models::permission::{Action, PermissionKey, Resource};
use tally_core::models::user::UserRole;

use tally_core::models::permission::Action::{Create, Manage, Read, Update};
use tally_core::models::permission::Resource::{
    Audit, Dashboard, Expenses, ServiceTypes, Services, ShoppingList, Users,
};

/// Every `(resource, action)` pair, in declaration order.
pub fn all_permission_keys() -> Vec<PermissionKey> {
    Resource::ALL
        .into_iter()
        .flat_map(|r| Action::ALL.into_iter().map(move |a| PermissionKey::new(r, a)))
        .collect()
}

/// Human description stored alongside a seeded permission.
pub fn describe(key: PermissionKey) -> String {
    match key.action {
        Manage => format!("Full access to {}", key.resource),
        action => format!("Can {action} {}", key.resource),
    }
}

/// The grants a system role is seeded with.
pub fn default_grants(role: UserRole) -> Vec<PermissionKey> {
    let pairs: &[(Resource, Action)] = match role {
        UserRole::Admin => return Resource::ALL.map(|r| PermissionKey::new(r, Manage)).to_vec(),
        UserRole::Manager => &[
            (Services, Manage),
            (Expenses, Manage),
            (ServiceTypes, Manage),
            (ShoppingList, Manage),
            (Dashboard, Read),
            (Users, Read),
            (Audit, Read),
        ],
        UserRole::Staff => &[
            (Services, Create),
            (Services, Read),
            (Services, Update),
            (Expenses, Create),
            (Expenses, Read),
            (ServiceTypes, Read),
            (ShoppingList, Manage),
            (Dashboard, Read),
        ],
        UserRole::Viewer => &[
            (Services, Read),
            (Expenses, Read),
            (ServiceTypes, Read),
            (ShoppingList, Read),
            (Dashboard, Read),
        ],
    };
    pairs
        .iter()
        .map(|&(r, a)| PermissionKey::new(r, a))
        .collect()
}

/// Description stored on a seeded system role.
pub fn role_description(role: UserRole) -> &'static str {
    match role {
        UserRole::Admin => "Unrestricted access",
        UserRole::Manager => "Runs day-to-day operations",
        UserRole::Staff => "Records services and expenses",
        UserRole::Viewer => "Read-only access",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_pair_is_listed_once() {
        let keys = all_permission_keys();
        assert_eq!(keys.len(), 40);
        let unique: std::collections::HashSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), 40);
    }

    #[test]
    fn only_admin_and_manager_can_read_audit() {
        let can_read_audit = |role| {
            default_grants(role)
                .iter()
                .any(|k| k.resource == Audit && k.action.satisfies(Read))
        };
        assert!(can_read_audit(UserRole::Admin));
        assert!(can_read_audit(UserRole::Manager));
        assert!(!can_read_audit(UserRole::Staff));
        assert!(!can_read_audit(UserRole::Viewer));
    }

    #[test]
    fn viewer_grants_are_read_only() {
        assert!(
            default_grants(UserRole::Viewer)
                .iter()
                .all(|k| k.action == Read)
        );
    }

    #[test]
    fn descriptions() {
        assert_eq!(
            describe(PermissionKey::new(ShoppingList, Manage)),
            "Full access to shopping-list"
        );
        assert_eq!(
            describe(PermissionKey::new(Services, Action::Delete)),
            "Can delete services"
        );
    }
}
