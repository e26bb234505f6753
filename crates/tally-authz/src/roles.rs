//! Role management — CRUD on roles plus seeding of the built-in
//! permissions and system roles.
//!
//! System roles keep their name forever and cannot be deleted. Their
//! description and permission list stay editable. Custom roles may not take
//! a built-in role's name.

use std::collections::BTreeSet;

use tally_core::error::{TallyError, TallyResult};
use tally_core::models::permission::{CreatePermission, Permission};
use tally_core::models::role::{CreateRole, Role, UpdateRole};
use tally_core::models::user::UserRole;
use tally_core::repository::{PaginatedResult, Pagination, PermissionRepository, RoleRepository};
use tracing::{info, warn};
use uuid::Uuid;

use crate::defaults;
use crate::error::AuthzError;

/// Input for creating a custom (non-system) role.
#[derive(Debug, Clone)]
pub struct NewRole {
    pub name: String,
    pub description: String,
    pub permission_ids: Vec<Uuid>,
}

/// What [`RoleService::seed_defaults`] had to create.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub permissions_created: usize,
    pub roles_created: usize,
}

pub struct RoleService<R: RoleRepository, P: PermissionRepository> {
    role_repo: R,
    permission_repo: P,
}

impl<R: RoleRepository, P: PermissionRepository> RoleService<R, P> {
    pub fn new(role_repo: R, permission_repo: P) -> Self {
        Self {
            role_repo,
            permission_repo,
        }
    }

    pub async fn create_role(&self, input: NewRole) -> TallyResult<Role> {
        let name = validate_name(&input.name)?;
        ensure_not_reserved(&name)?;
        let permission_ids = self.validate_permissions(&input.permission_ids).await?;

        if self.find_by_name(&name).await?.is_some() {
            return Err(TallyError::AlreadyExists {
                entity: format!("role '{name}'"),
            });
        }

        let role = self
            .role_repo
            .create(CreateRole {
                name,
                description: input.description,
                is_system: false,
                permission_ids,
            })
            .await?;

        info!(role_id = %role.id, name = %role.name, "Role created");
        Ok(role)
    }

    pub async fn update_role(&self, id: Uuid, input: UpdateRole) -> TallyResult<Role> {
        let current = self.role_repo.get_by_id(id).await?;

        let name = match input.name {
            Some(name) => {
                let name = validate_name(&name)?;
                if name == current.name {
                    None
                } else if current.is_system {
                    return Err(AuthzError::SystemRoleRename { name: current.name }.into());
                } else {
                    ensure_not_reserved(&name)?;
                    if self.find_by_name(&name).await?.is_some() {
                        return Err(TallyError::AlreadyExists {
                            entity: format!("role '{name}'"),
                        });
                    }
                    Some(name)
                }
            }
            None => None,
        };

        let permission_ids = match input.permission_ids {
            Some(ids) => Some(self.validate_permissions(&ids).await?),
            None => None,
        };

        let role = self
            .role_repo
            .update(
                id,
                UpdateRole {
                    name,
                    description: input.description,
                    permission_ids,
                },
            )
            .await?;

        info!(role_id = %role.id, name = %role.name, "Role updated");
        Ok(role)
    }

    /// Delete a custom role. System roles are refused and left in place.
    pub async fn delete_role(&self, id: Uuid) -> TallyResult<()> {
        let role = self.role_repo.get_by_id(id).await?;
        if role.is_system {
            return Err(AuthzError::SystemRoleDeletion { name: role.name }.into());
        }

        self.role_repo.delete(id).await?;
        info!(role_id = %id, name = %role.name, "Role deleted");
        Ok(())
    }

    pub async fn get_role(&self, id: Uuid) -> TallyResult<Role> {
        self.role_repo.get_by_id(id).await
    }

    pub async fn list_roles(&self, pagination: Pagination) -> TallyResult<PaginatedResult<Role>> {
        self.role_repo.list(pagination).await
    }

    /// The permissions a role currently grants.
    pub async fn role_permissions(&self, id: Uuid) -> TallyResult<Vec<Permission>> {
        let role = self.role_repo.get_by_id(id).await?;
        self.permission_repo.get_many(&role.permission_ids).await
    }

    /// Create any missing built-in permission and system role.
    ///
    /// Safe to run on every start: existing records are left untouched,
    /// so edits made to system-role permission lists survive.
    pub async fn seed_defaults(&self) -> TallyResult<SeedReport> {
        let mut report = SeedReport::default();

        let mut permissions = Vec::new();
        for key in defaults::all_permission_keys() {
            let permission = match self.permission_repo.get_by_key(key).await {
                Ok(p) => p,
                Err(TallyError::NotFound { .. }) => {
                    report.permissions_created += 1;
                    self.permission_repo
                        .create(CreatePermission {
                            resource: key.resource,
                            action: key.action,
                            description: defaults::describe(key),
                        })
                        .await?
                }
                Err(e) => return Err(e),
            };
            permissions.push(permission);
        }

        for role in UserRole::ALL {
            if let Some(existing) = self.find_by_name(role.as_str()).await? {
                if !existing.is_system {
                    warn!(
                        role_id = %existing.id,
                        name = %existing.name,
                        "Custom role holds a built-in name; system role not seeded"
                    );
                }
                continue;
            }
            let grants = defaults::default_grants(role);
            let permission_ids = permissions
                .iter()
                .filter(|p| grants.contains(&p.key()))
                .map(|p| p.id)
                .collect();

            self.role_repo
                .create(CreateRole {
                    name: role.as_str().to_string(),
                    description: defaults::role_description(role).to_string(),
                    is_system: true,
                    permission_ids,
                })
                .await?;
            report.roles_created += 1;
        }

        info!(
            permissions_created = report.permissions_created,
            roles_created = report.roles_created,
            "Seeded default permissions and system roles"
        );

        Ok(report)
    }

    async fn find_by_name(&self, name: &str) -> TallyResult<Option<Role>> {
        match self.role_repo.get_by_name(name).await {
            Ok(role) => Ok(Some(role)),
            Err(TallyError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Deduplicate `ids` and make sure each refers to a stored permission.
    async fn validate_permissions(&self, ids: &[Uuid]) -> TallyResult<Vec<Uuid>> {
        let wanted: BTreeSet<Uuid> = ids.iter().copied().collect();
        let wanted: Vec<Uuid> = wanted.into_iter().collect();

        let found: BTreeSet<Uuid> = self
            .permission_repo
            .get_many(&wanted)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();

        let missing: Vec<Uuid> = wanted
            .iter()
            .filter(|id| !found.contains(id))
            .copied()
            .collect();
        if !missing.is_empty() {
            return Err(AuthzError::UnknownPermissions(missing).into());
        }

        Ok(wanted)
    }
}

fn validate_name(name: &str) -> Result<String, AuthzError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AuthzError::EmptyRoleName);
    }
    Ok(name.to_string())
}

/// Built-in role names are matched case-insensitively.
fn ensure_not_reserved(name: &str) -> Result<(), AuthzError> {
    if UserRole::ALL
        .iter()
        .any(|role| role.as_str().eq_ignore_ascii_case(name))
    {
        return Err(AuthzError::ReservedRoleName {
            name: name.to_string(),
        });
    }
    Ok(())
}
