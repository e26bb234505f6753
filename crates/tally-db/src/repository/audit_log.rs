//! SurrealDB implementation of [`AuditLogRepository`].
//!
//! Entries are append-only. Snapshots, the changed-field list and
//! `metadata` are kept as JSON text so numbers come back exactly as written.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tally_core::error::TallyResult;
use tally_core::models::audit::{AuditLogEntry, FieldChange, NewAuditLogEntry};
use tally_core::repository::{AuditLogFilter, AuditLogRepository, PaginatedResult, Pagination};
use tracing::debug;
use uuid::Uuid;

use super::{CountRow, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct AuditLogRowWithId {
    record_id: String,
    user_id: String,
    user_name: String,
    action: String,
    model: String,
    document_id: String,
    previous_data: Option<String>,
    new_data: Option<String>,
    changed_fields: String,
    ip_address: Option<String>,
    user_agent: Option<String>,
    status: String,
    error_message: Option<String>,
    metadata: String,
    timestamp: DateTime<Utc>,
}

/// Only the timestamp is read back from deleted rows; it makes each
/// row deserializable without pulling the full record.
#[derive(Debug, SurrealValue)]
struct DeletedRow {
    #[allow(dead_code)]
    timestamp: DateTime<Utc>,
}

fn to_json_text(value: &impl serde::Serialize) -> Result<String, DbError> {
    serde_json::to_string(value).map_err(|e| DbError::Query(format!("JSON encode: {e}")))
}

fn from_json_text<T: serde::de::DeserializeOwned>(text: &str) -> Result<T, DbError> {
    serde_json::from_str(text).map_err(|e| DbError::Corrupt(format!("JSON decode: {e}")))
}

impl AuditLogRowWithId {
    fn try_into_entry(self) -> Result<AuditLogEntry, DbError> {
        let previous_data = self
            .previous_data
            .as_deref()
            .map(from_json_text)
            .transpose()?;
        let new_data = self.new_data.as_deref().map(from_json_text).transpose()?;
        let changed_fields: Vec<FieldChange> = from_json_text(&self.changed_fields)?;

        Ok(AuditLogEntry {
            id: parse_uuid(&self.record_id, "audit log")?,
            user_id: parse_uuid(&self.user_id, "user")?,
            user_name: self.user_name,
            action: self
                .action
                .parse()
                .map_err(|_| DbError::Corrupt(format!("unknown audit action: {}", self.action)))?,
            model: self.model,
            document_id: self.document_id,
            previous_data,
            new_data,
            changed_fields,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            timestamp: self.timestamp,
            status: self
                .status
                .parse()
                .map_err(|_| DbError::Corrupt(format!("unknown audit status: {}", self.status)))?,
            error_message: self.error_message,
            metadata: from_json_text(&self.metadata)?,
        })
    }
}

/// Build the `WHERE` clause for the filters that are set. The matching
/// parameters are bound by [`SurrealAuditLogRepository::list`].
fn where_clause(filter: &AuditLogFilter) -> String {
    let mut conditions = Vec::new();
    if filter.user_id.is_some() {
        conditions.push("user_id = $user_id");
    }
    if filter.action.is_some() {
        conditions.push("action = $action");
    }
    if filter.model.is_some() {
        conditions.push("model = $model");
    }
    if filter.document_id.is_some() {
        conditions.push("document_id = $document_id");
    }
    if filter.status.is_some() {
        conditions.push("status = $status");
    }
    if filter.start_date.is_some() {
        conditions.push("timestamp >= $start_date");
    }
    if filter.end_date.is_some() {
        conditions.push("timestamp <= $end_date");
    }

    if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    }
}

/// SurrealDB implementation of the audit log repository.
#[derive(Clone)]
pub struct SurrealAuditLogRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAuditLogRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> AuditLogRepository for SurrealAuditLogRepository<C> {
    async fn append(&self, input: NewAuditLogEntry) -> TallyResult<AuditLogEntry> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let previous_data = input.previous_data.as_ref().map(to_json_text).transpose()?;
        let new_data = input.new_data.as_ref().map(to_json_text).transpose()?;
        let changed_fields = to_json_text(&input.changed_fields)?;
        let metadata = to_json_text(&input.metadata)?;

        let result = self
            .db
            .query(
                "CREATE type::record('audit_log', $id) SET \
                 user_id = $user_id, user_name = $user_name, \
                 action = $action, model = $model, \
                 document_id = $document_id, \
                 previous_data = $previous_data, new_data = $new_data, \
                 changed_fields = $changed_fields, \
                 ip_address = $ip_address, user_agent = $user_agent, \
                 status = $status, error_message = $error_message, \
                 metadata = $metadata, timestamp = $timestamp; \
                 SELECT meta::id(id) AS record_id, * FROM type::record('audit_log', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("user_id", input.user_id.to_string()))
            .bind(("user_name", input.user_name))
            .bind(("action", input.action.as_str().to_string()))
            .bind(("model", input.model))
            .bind(("document_id", input.document_id))
            .bind(("previous_data", previous_data))
            .bind(("new_data", new_data))
            .bind(("changed_fields", changed_fields))
            .bind(("ip_address", input.ip_address))
            .bind(("user_agent", input.user_agent))
            .bind(("status", input.status.as_str().to_string()))
            .bind(("error_message", input.error_message))
            .bind(("metadata", metadata))
            .bind(("timestamp", input.timestamp))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_check("audit_log", e))?;

        let rows: Vec<AuditLogRowWithId> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "audit_log".into(),
            id: id_str,
        })?;

        Ok(row.try_into_entry()?)
    }

    async fn list(
        &self,
        filter: AuditLogFilter,
        pagination: Pagination,
    ) -> TallyResult<PaginatedResult<AuditLogEntry>> {
        let clause = where_clause(&filter);
        let count_query = format!("SELECT count() AS total FROM audit_log {clause} GROUP ALL");
        let page_query = format!(
            "SELECT meta::id(id) AS record_id, * FROM audit_log {clause} \
             ORDER BY timestamp DESC \
             LIMIT $limit START $offset"
        );

        // Unset filters are bound as NONE; the clause never references them.
        let user_id = filter.user_id.map(|u| u.to_string());
        let action = filter.action.map(|a| a.as_str().to_string());
        let status = filter.status.map(|s| s.as_str().to_string());

        let count = async {
            let mut result = self
                .db
                .query(count_query)
                .bind(("user_id", user_id.clone()))
                .bind(("action", action.clone()))
                .bind(("model", filter.model.clone()))
                .bind(("document_id", filter.document_id.clone()))
                .bind(("status", status.clone()))
                .bind(("start_date", filter.start_date))
                .bind(("end_date", filter.end_date))
                .await?;
            let rows: Vec<CountRow> = result.take(0)?;
            Ok::<u64, DbError>(rows.first().map(|r| r.total).unwrap_or(0))
        };

        let page = async {
            let mut result = self
                .db
                .query(page_query)
                .bind(("user_id", user_id.clone()))
                .bind(("action", action.clone()))
                .bind(("model", filter.model.clone()))
                .bind(("document_id", filter.document_id.clone()))
                .bind(("status", status.clone()))
                .bind(("start_date", filter.start_date))
                .bind(("end_date", filter.end_date))
                .bind(("limit", pagination.limit))
                .bind(("offset", pagination.offset))
                .await?;
            let rows: Vec<AuditLogRowWithId> = result.take(0)?;
            Ok::<Vec<AuditLogRowWithId>, DbError>(rows)
        };

        let (total, rows) = tokio::try_join!(count, page)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_entry())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> TallyResult<u64> {
        let result = self
            .db
            .query("DELETE audit_log WHERE timestamp < $cutoff RETURN BEFORE")
            .bind(("cutoff", cutoff))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_check("audit_log", e))?;

        let rows: Vec<DeletedRow> = result.take(0).map_err(DbError::from)?;
        let deleted = rows.len() as u64;

        debug!(%cutoff, deleted, "Removed expired audit log entries");

        Ok(deleted)
    }
}
