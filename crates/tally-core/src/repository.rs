//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async and take `&self`, so a single
//! repository value can be shared across concurrent requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TallyResult;
use crate::models::{
    audit::{AuditAction, AuditLogEntry, AuditStatus, NewAuditLogEntry},
    permission::{CreatePermission, Permission, PermissionKey},
    role::{CreateRole, Role, UpdateRole},
    user::{CreateUser, UpdateUser, User},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

/// One-based page request as it arrives from a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    /// Build a request, treating page 0 as page 1 and a zero limit as 1.
    pub fn new(page: u64, limit: u64) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    pub fn to_pagination(self) -> Pagination {
        Pagination {
            offset: (self.page - 1).saturating_mul(self.limit),
            limit: self.limit,
        }
    }
}

/// Page metadata returned alongside a page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub total: u64,
    pub page: u64,
    pub total_pages: u64,
    pub limit: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
    pub next_page: Option<u64>,
    pub prev_page: Option<u64>,
}

impl PageInfo {
    pub fn new(total: u64, request: PageRequest) -> Self {
        let PageRequest { page, limit } = request;
        let total_pages = total.div_ceil(limit);
        let has_next_page = page < total_pages;
        let has_prev_page = page > 1;
        Self {
            total,
            page,
            total_pages,
            limit,
            has_next_page,
            has_prev_page,
            next_page: has_next_page.then(|| page + 1),
            prev_page: has_prev_page.then(|| page - 1),
        }
    }
}

/// `{ data, pagination }` envelope served to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: PageInfo,
}

impl<T> Page<T> {
    pub fn from_result(result: PaginatedResult<T>, request: PageRequest) -> Self {
        Self {
            pagination: PageInfo::new(result.total, request),
            data: result.items,
        }
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = TallyResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = TallyResult<User>> + Send;
    fn get_by_email(&self, email: &str) -> impl Future<Output = TallyResult<User>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateUser,
    ) -> impl Future<Output = TallyResult<User>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = TallyResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = TallyResult<PaginatedResult<User>>> + Send;
}

// ---------------------------------------------------------------------------
// Roles & permissions
// ---------------------------------------------------------------------------

pub trait RoleRepository: Send + Sync {
    fn create(&self, input: CreateRole) -> impl Future<Output = TallyResult<Role>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = TallyResult<Role>> + Send;
    fn get_by_name(&self, name: &str) -> impl Future<Output = TallyResult<Role>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateRole,
    ) -> impl Future<Output = TallyResult<Role>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = TallyResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = TallyResult<PaginatedResult<Role>>> + Send;
}

pub trait PermissionRepository: Send + Sync {
    fn create(
        &self,
        input: CreatePermission,
    ) -> impl Future<Output = TallyResult<Permission>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = TallyResult<Permission>> + Send;
    fn get_by_key(
        &self,
        key: PermissionKey,
    ) -> impl Future<Output = TallyResult<Permission>> + Send;
    /// Fetch every permission whose id is in `ids`. Unknown ids are skipped.
    fn get_many(&self, ids: &[Uuid]) -> impl Future<Output = TallyResult<Vec<Permission>>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = TallyResult<PaginatedResult<Permission>>> + Send;
}

// ---------------------------------------------------------------------------
// Audit (append-only)
// ---------------------------------------------------------------------------

/// Query filters for audit log entries. All set filters must match.
#[derive(Debug, Clone, Default)]
pub struct AuditLogFilter {
    pub user_id: Option<Uuid>,
    pub action: Option<AuditAction>,
    pub model: Option<String>,
    pub document_id: Option<String>,
    pub status: Option<AuditStatus>,
    /// Inclusive lower bound on `timestamp`.
    pub start_date: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `timestamp`.
    pub end_date: Option<DateTime<Utc>>,
}

pub trait AuditLogRepository: Send + Sync {
    /// Append a new audit log entry. Entries are never updated.
    fn append(
        &self,
        input: NewAuditLogEntry,
    ) -> impl Future<Output = TallyResult<AuditLogEntry>> + Send;
    /// List matching entries, newest first.
    fn list(
        &self,
        filter: AuditLogFilter,
        pagination: Pagination,
    ) -> impl Future<Output = TallyResult<PaginatedResult<AuditLogEntry>>> + Send;
    /// Remove every entry with a timestamp strictly before `cutoff`.
    /// Returns the number of entries removed.
    fn delete_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl Future<Output = TallyResult<u64>> + Send;
}
