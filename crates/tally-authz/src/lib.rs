//! Tally Authz — role-based permission checks and role management.
//!
//! [`engine`] holds the pure decision; [`AuthorizationService`] feeds it
//! from the store and [`RoleService`] manages roles.

pub mod defaults;
pub mod engine;
pub mod error;
pub mod roles;
pub mod service;

pub use engine::{PermissionSet, Principal, check_permission};
pub use error::AuthzError;
pub use roles::{NewRole, RoleService, SeedReport};
pub use service::AuthorizationService;
