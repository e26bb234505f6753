//! Audit log service.
//!
//! Writes are best-effort: [`AuditLogService::create_log`] never fails the
//! caller. A request is first prepared into a sanitized
//! [`NewAuditLogEntry`] and then appended; a failure at either step is
//! logged and the entry is discarded.

use std::collections::HashSet;

use chrono::{Duration, Utc};
use serde_json::{Map, Value};
use tally_core::error::TallyResult;
use tally_core::models::audit::{AuditAction, AuditLogEntry, FieldChange, NewAuditLogEntry};
use tally_core::repository::{AuditLogFilter, AuditLogRepository, Page, PageRequest};
use tracing::{error, info};
use uuid::Uuid;

use crate::config::AuditConfig;
use crate::diff;
use crate::entry::{AuditContext, CreateAuditLog};
use crate::error::AuditError;
use crate::sanitize::{self, REDACTED, SensitiveKeys};
use crate::snapshot::SnapshotValue;

/// Audit log service.
///
/// Generic over the repository so it has no dependency on the database
/// crate.
pub struct AuditLogService<A: AuditLogRepository> {
    repo: A,
    config: AuditConfig,
    sensitive: SensitiveKeys,
    ignored: HashSet<String>,
}

impl<A: AuditLogRepository> AuditLogService<A> {
    pub fn new(repo: A) -> Self {
        Self::with_config(repo, AuditConfig::default())
    }

    pub fn with_config(repo: A, config: AuditConfig) -> Self {
        Self {
            sensitive: config.sensitive_keys(),
            ignored: config.ignored_set(),
            repo,
            config,
        }
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Record an entry. Returns `None` if it was discarded.
    pub async fn create_log(&self, input: CreateAuditLog) -> Option<AuditLogEntry> {
        let model = input.model.clone();
        let document_id = input.document_id.clone();

        let pending = match self.prepare(input) {
            Ok(pending) => pending,
            Err(e) => {
                error!(%model, %document_id, error = %e, "Discarding audit entry");
                return None;
            }
        };

        match self.repo.append(pending).await {
            Ok(entry) => Some(entry),
            Err(e) => {
                error!(%model, %document_id, error = %e, "Failed to persist audit entry");
                None
            }
        }
    }

    /// Validate and sanitize a request into the entry that would be stored.
    pub fn prepare(&self, input: CreateAuditLog) -> Result<NewAuditLogEntry, AuditError> {
        require("user_name", &input.user_name)?;
        require("model", &input.model)?;
        require("document_id", &input.document_id)?;

        let previous_data = input
            .previous_data
            .as_ref()
            .map(|s| sanitize::sanitize(s, &self.sensitive));
        let new_data = input
            .new_data
            .as_ref()
            .map(|s| sanitize::sanitize(s, &self.sensitive));

        let changed_fields = match input.changed_fields {
            Some(changes) => changes
                .into_iter()
                .map(|change| self.sanitize_change(change))
                .collect(),
            None => self.get_changed_fields(previous_data.as_ref(), new_data.as_ref()),
        };

        Ok(NewAuditLogEntry {
            user_id: input.user_id,
            user_name: input.user_name,
            action: input.action,
            model: input.model,
            document_id: input.document_id,
            previous_data,
            new_data,
            changed_fields,
            ip_address: input.ip_address,
            user_agent: input.user_agent,
            timestamp: input.timestamp.unwrap_or_else(Utc::now),
            status: input.status.unwrap_or_default(),
            error_message: input.error_message,
            metadata: self.sanitize_metadata(input.metadata),
        })
    }

    /// Entries matching `filter`, newest first.
    ///
    /// `page` below 1 is read as 1; `limit` falls back to the configured
    /// default and is clamped to `1..=max_page_size`.
    pub async fn get_audit_logs(
        &self,
        filter: AuditLogFilter,
        page: u64,
        limit: Option<u64>,
    ) -> TallyResult<Page<AuditLogEntry>> {
        let request = PageRequest::new(page, self.config.page_size(limit));
        let result = self.repo.list(filter, request.to_pagination()).await?;
        Ok(Page::from_result(result, request))
    }

    /// History of one document.
    pub async fn get_audit_logs_by_document(
        &self,
        model: &str,
        document_id: &str,
        page: u64,
        limit: Option<u64>,
    ) -> TallyResult<Page<AuditLogEntry>> {
        let filter = AuditLogFilter {
            model: Some(model.to_string()),
            document_id: Some(document_id.to_string()),
            ..Default::default()
        };
        self.get_audit_logs(filter, page, limit).await
    }

    /// Everything one user did.
    pub async fn get_audit_logs_by_user(
        &self,
        user_id: Uuid,
        page: u64,
        limit: Option<u64>,
    ) -> TallyResult<Page<AuditLogEntry>> {
        let filter = AuditLogFilter {
            user_id: Some(user_id),
            ..Default::default()
        };
        self.get_audit_logs(filter, page, limit).await
    }

    /// Field diff between two plain snapshots, skipping the configured
    /// ignored fields.
    pub fn get_changed_fields(&self, old: Option<&Value>, new: Option<&Value>) -> Vec<FieldChange> {
        diff::changed_fields(old, new, &self.ignored)
    }

    /// Delete entries older than `days_to_keep` days. Returns how many went.
    pub async fn cleanup_old_logs(&self, days_to_keep: u32) -> TallyResult<u64> {
        let cutoff = Duration::try_days(i64::from(days_to_keep))
            .and_then(|keep| Utc::now().checked_sub_signed(keep))
            .ok_or(AuditError::RetentionOutOfRange { days: days_to_keep })?;

        let deleted = self.repo.delete_older_than(cutoff).await?;
        info!(days_to_keep, %cutoff, deleted, "Cleaned up old audit entries");
        Ok(deleted)
    }

    pub async fn log_create(
        &self,
        ctx: &AuditContext,
        model: &str,
        document_id: &str,
        data: impl Into<SnapshotValue>,
    ) -> Option<AuditLogEntry> {
        let input = ctx
            .entry(AuditAction::Create, model, document_id)
            .new_data(data);
        self.create_log(input).await
    }

    pub async fn log_update(
        &self,
        ctx: &AuditContext,
        model: &str,
        document_id: &str,
        previous: impl Into<SnapshotValue>,
        current: impl Into<SnapshotValue>,
    ) -> Option<AuditLogEntry> {
        let input = ctx
            .entry(AuditAction::Update, model, document_id)
            .previous(previous)
            .new_data(current);
        self.create_log(input).await
    }

    pub async fn log_delete(
        &self,
        ctx: &AuditContext,
        model: &str,
        document_id: &str,
        previous: impl Into<SnapshotValue>,
    ) -> Option<AuditLogEntry> {
        let input = ctx
            .entry(AuditAction::Delete, model, document_id)
            .previous(previous);
        self.create_log(input).await
    }

    /// Record an attempted mutation that did not go through.
    pub async fn log_failure(
        &self,
        ctx: &AuditContext,
        action: AuditAction,
        model: &str,
        document_id: &str,
        error_message: impl Into<String>,
    ) -> Option<AuditLogEntry> {
        let input = ctx.entry(action, model, document_id).failed(error_message);
        self.create_log(input).await
    }

    fn sanitize_change(&self, change: FieldChange) -> FieldChange {
        if self.sensitive.contains(&change.field) {
            return FieldChange {
                field: change.field,
                old_value: Value::String(REDACTED.to_string()),
                new_value: Value::String(REDACTED.to_string()),
            };
        }
        FieldChange {
            field: change.field,
            old_value: sanitize::sanitize_json(change.old_value, &self.sensitive),
            new_value: sanitize::sanitize_json(change.new_value, &self.sensitive),
        }
    }

    /// Metadata is always stored as an object.
    fn sanitize_metadata(&self, metadata: Option<Value>) -> Value {
        match metadata {
            None | Some(Value::Null) => Value::Object(Map::new()),
            Some(value @ Value::Object(_)) => sanitize::sanitize_json(value, &self.sensitive),
            Some(other) => {
                let mut wrapped = Map::new();
                wrapped.insert(
                    "value".to_string(),
                    sanitize::sanitize_json(other, &self.sensitive),
                );
                Value::Object(wrapped)
            }
        }
    }
}

fn require(field: &'static str, value: &str) -> Result<(), AuditError> {
    if value.trim().is_empty() {
        return Err(AuditError::MissingField { field });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tally_core::error::TallyError;
    use tally_core::models::audit::AuditStatus;
    use tally_core::repository::{PaginatedResult, Pagination};

    /// Repository that is never reached by `prepare`.
    struct Unused;

    impl AuditLogRepository for Unused {
        async fn append(&self, _: NewAuditLogEntry) -> TallyResult<AuditLogEntry> {
            unreachable!()
        }
        async fn list(
            &self,
            _: AuditLogFilter,
            _: Pagination,
        ) -> TallyResult<PaginatedResult<AuditLogEntry>> {
            unreachable!()
        }
        async fn delete_older_than(&self, _: chrono::DateTime<Utc>) -> TallyResult<u64> {
            unreachable!()
        }
    }

    fn service() -> AuditLogService<Unused> {
        AuditLogService::new(Unused)
    }

    /// Store that rejects every write.
    struct Offline;

    impl AuditLogRepository for Offline {
        async fn append(&self, _: NewAuditLogEntry) -> TallyResult<AuditLogEntry> {
            Err(TallyError::Database("store offline".into()))
        }
        async fn list(
            &self,
            _: AuditLogFilter,
            _: Pagination,
        ) -> TallyResult<PaginatedResult<AuditLogEntry>> {
            Err(TallyError::Database("store offline".into()))
        }
        async fn delete_older_than(&self, _: chrono::DateTime<Utc>) -> TallyResult<u64> {
            Err(TallyError::Database("store offline".into()))
        }
    }

    fn request() -> CreateAuditLog {
        CreateAuditLog::new(Uuid::new_v4(), "ana", AuditAction::Update, "Service", "svc-1")
    }

    #[test]
    fn computes_changes_and_defaults_status() {
        let pending = service()
            .prepare(
                request()
                    .previous(json!({"price": 50}))
                    .new_data(json!({"price": 72})),
            )
            .unwrap();

        assert_eq!(pending.status, AuditStatus::Success);
        assert_eq!(
            pending.changed_fields,
            vec![FieldChange {
                field: "price".into(),
                old_value: json!(50),
                new_value: json!(72),
            }]
        );
        assert_eq!(pending.metadata, json!({}));
    }

    #[test]
    fn diff_runs_on_sanitized_snapshots() {
        let pending = service()
            .prepare(
                request()
                    .previous(json!({"password": "old"}))
                    .new_data(json!({"password": "new"})),
            )
            .unwrap();

        assert_eq!(pending.previous_data, Some(json!({"password": REDACTED})));
        assert!(pending.changed_fields.is_empty());
    }

    #[test]
    fn supplied_changes_are_kept_but_redacted() {
        let pending = service()
            .prepare(request().changes(vec![
                FieldChange {
                    field: "Token".into(),
                    old_value: json!("a"),
                    new_value: json!("b"),
                },
                FieldChange {
                    field: "profile".into(),
                    old_value: json!({"secret": 1}),
                    new_value: json!({"secret": 2}),
                },
            ]))
            .unwrap();

        assert_eq!(pending.changed_fields[0].old_value, json!(REDACTED));
        assert_eq!(pending.changed_fields[0].new_value, json!(REDACTED));
        assert_eq!(pending.changed_fields[1].new_value, json!({"secret": REDACTED}));
    }

    #[test]
    fn metadata_is_sanitized_and_wrapped() {
        let svc = service();
        let pending = svc
            .prepare(request().metadata(json!({"authorization": "Bearer x", "route": "/s"})))
            .unwrap();
        assert_eq!(pending.metadata, json!({"authorization": REDACTED, "route": "/s"}));

        let pending = svc.prepare(request().metadata(json!("bulk import"))).unwrap();
        assert_eq!(pending.metadata, json!({"value": "bulk import"}));
    }

    #[test]
    fn blank_identity_fields_are_rejected() {
        let svc = service();

        let mut input = request();
        input.model = "  ".into();
        assert!(matches!(
            svc.prepare(input),
            Err(AuditError::MissingField { field: "model" })
        ));

        let mut input = request();
        input.user_name.clear();
        assert!(matches!(
            svc.prepare(input),
            Err(AuditError::MissingField { field: "user_name" })
        ));
    }

    #[test]
    fn failure_entries_keep_the_message() {
        let pending = service()
            .prepare(request().failed("validation failed"))
            .unwrap();
        assert_eq!(pending.status, AuditStatus::Failed);
        assert_eq!(pending.error_message.as_deref(), Some("validation failed"));
    }

    #[tokio::test]
    async fn store_failure_discards_entry() {
        let svc = AuditLogService::new(Offline);

        let stored = svc
            .create_log(
                request()
                    .previous(json!({"price": 50}))
                    .new_data(json!({"price": 72})),
            )
            .await;
        assert!(stored.is_none());

        let ctx = AuditContext::new(Uuid::new_v4(), "ana");
        assert!(
            svc.log_create(&ctx, "Service", "svc-2", json!({"price": 50}))
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn store_failure_surfaces_on_reads() {
        let svc = AuditLogService::new(Offline);
        assert!(
            svc.get_audit_logs(AuditLogFilter::default(), 1, None)
                .await
                .is_err()
        );
        assert!(svc.cleanup_old_logs(30).await.is_err());
    }
}
