//! Inputs accepted by the audit service.

use chrono::{DateTime, Utc};
use tally_core::models::audit::{AuditAction, AuditStatus, FieldChange};
use uuid::Uuid;

use crate::snapshot::SnapshotValue;

/// A request to record one audit entry.
///
/// Only the identity fields are required; everything else has a default
/// applied by [`AuditLogService::create_log`](crate::AuditLogService::create_log).
#[derive(Debug, Clone)]
pub struct CreateAuditLog {
    pub user_id: Uuid,
    pub user_name: String,
    pub action: AuditAction,
    pub model: String,
    pub document_id: String,
    pub previous_data: Option<SnapshotValue>,
    pub new_data: Option<SnapshotValue>,
    /// Computed from the snapshots when `None`.
    pub changed_fields: Option<Vec<FieldChange>>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    /// Defaults to now.
    pub timestamp: Option<DateTime<Utc>>,
    /// Defaults to [`AuditStatus::Success`].
    pub status: Option<AuditStatus>,
    pub error_message: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl CreateAuditLog {
    pub fn new(
        user_id: Uuid,
        user_name: impl Into<String>,
        action: AuditAction,
        model: impl Into<String>,
        document_id: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            user_name: user_name.into(),
            action,
            model: model.into(),
            document_id: document_id.into(),
            previous_data: None,
            new_data: None,
            changed_fields: None,
            ip_address: None,
            user_agent: None,
            timestamp: None,
            status: None,
            error_message: None,
            metadata: None,
        }
    }

    pub fn previous(mut self, data: impl Into<SnapshotValue>) -> Self {
        self.previous_data = Some(data.into());
        self
    }

    pub fn new_data(mut self, data: impl Into<SnapshotValue>) -> Self {
        self.new_data = Some(data.into());
        self
    }

    pub fn changes(mut self, changes: Vec<FieldChange>) -> Self {
        self.changed_fields = Some(changes);
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn failed(mut self, message: impl Into<String>) -> Self {
        self.status = Some(AuditStatus::Failed);
        self.error_message = Some(message.into());
        self
    }

    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Copy the acting user and network details from `ctx`.
    pub fn context(mut self, ctx: &AuditContext) -> Self {
        self.user_id = ctx.user_id;
        self.user_name = ctx.user_name.clone();
        self.ip_address = ctx.ip_address.clone();
        self.user_agent = ctx.user_agent.clone();
        self
    }
}

/// Who is acting and from where, as known to the request handler.
#[derive(Debug, Clone)]
pub struct AuditContext {
    pub user_id: Uuid,
    pub user_name: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl AuditContext {
    pub fn new(user_id: Uuid, user_name: impl Into<String>) -> Self {
        Self {
            user_id,
            user_name: user_name.into(),
            ip_address: None,
            user_agent: None,
        }
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    pub fn with_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub(crate) fn entry(
        &self,
        action: AuditAction,
        model: &str,
        document_id: &str,
    ) -> CreateAuditLog {
        CreateAuditLog::new(self.user_id, &*self.user_name, action, model, document_id)
            .context(self)
    }
}
