//! Authorization service — resolves a user's permission set from the
//! store and answers permission checks.

use std::collections::BTreeSet;

use tally_core::error::{TallyError, TallyResult};
use tally_core::models::permission::{Action, Resource};
use tally_core::models::role::Role;
use tally_core::models::user::{User, UserRole};
use tally_core::repository::{PermissionRepository, RoleRepository};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::engine::{self, PermissionSet, Principal};

/// Authorization service.
///
/// Generic over repository implementations so that the authorization
/// layer has no dependency on the database crate.
pub struct AuthorizationService<R: RoleRepository, P: PermissionRepository> {
    role_repo: R,
    permission_repo: P,
}

impl<R: RoleRepository, P: PermissionRepository> AuthorizationService<R, P> {
    pub fn new(role_repo: R, permission_repo: P) -> Self {
        Self {
            role_repo,
            permission_repo,
        }
    }

    /// Union of the permissions granted by the user's built-in role and by
    /// every role in `role_ids`.
    ///
    /// Roles or permissions that no longer exist contribute nothing.
    pub async fn resolve_permissions(&self, user: &User) -> TallyResult<PermissionSet> {
        let mut roles = Vec::with_capacity(user.role_ids.len() + 1);
        if let Some(role) = self.system_role(user.role).await? {
            roles.push(role);
        }
        for &role_id in &user.role_ids {
            if let Some(role) = self.assigned_role(user.id, role_id).await? {
                roles.push(role);
            }
        }

        let permission_ids: Vec<Uuid> = roles
            .iter()
            .flat_map(|r| r.permission_ids.iter().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let permissions = self.permission_repo.get_many(&permission_ids).await?;
        let set: PermissionSet = permissions.iter().map(|p| p.key()).collect();

        debug!(
            user_id = %user.id,
            roles = roles.len(),
            permissions = set.len(),
            "Resolved permission set"
        );

        Ok(set)
    }

    /// Build the [`Principal`] the pure engine decides on.
    ///
    /// Admins get an empty set: the engine never consults it for them.
    pub async fn principal(&self, user: &User) -> TallyResult<Principal> {
        let permissions = match user.role {
            UserRole::Admin => PermissionSet::new(),
            _ => self.resolve_permissions(user).await?,
        };
        Ok(Principal::new(user.role, permissions))
    }

    /// Whether `user` may perform `action` on `resource`.
    pub async fn check_permission(
        &self,
        user: &User,
        resource: Resource,
        action: Action,
    ) -> TallyResult<bool> {
        let principal = self.principal(user).await?;
        Ok(engine::check_permission(&principal, resource, action))
    }

    /// Like [`check_permission`](Self::check_permission) but turns a denial
    /// into [`TallyError::AuthorizationDenied`].
    pub async fn require_permission(
        &self,
        user: &User,
        resource: Resource,
        action: Action,
    ) -> TallyResult<()> {
        if self.check_permission(user, resource, action).await? {
            Ok(())
        } else {
            Err(TallyError::AuthorizationDenied {
                reason: format!("{} may not {action} {resource}", user.email),
            })
        }
    }

    async fn system_role(&self, role: UserRole) -> TallyResult<Option<Role>> {
        match self.role_repo.get_by_name(role.as_str()).await {
            Ok(r) if r.is_system => Ok(Some(r)),
            Ok(r) => {
                warn!(
                    role = %role,
                    role_id = %r.id,
                    "Role under a built-in name is not a system role; it grants nothing"
                );
                Ok(None)
            }
            Err(TallyError::NotFound { .. }) => {
                warn!(role = %role, "System role missing; it grants nothing");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn assigned_role(&self, user_id: Uuid, role_id: Uuid) -> TallyResult<Option<Role>> {
        match self.role_repo.get_by_id(role_id).await {
            Ok(r) => Ok(Some(r)),
            Err(TallyError::NotFound { .. }) => {
                warn!(%user_id, %role_id, "Assigned role no longer exists");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
