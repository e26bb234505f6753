//! Integration tests for the audit log repository using in-memory SurrealDB.

use chrono::{Duration, Utc};
use serde_json::json;
use tally_core::models::audit::{AuditAction, AuditStatus, FieldChange, NewAuditLogEntry};
use tally_core::repository::{AuditLogFilter, AuditLogRepository, Pagination};
use tally_db::repository::SurrealAuditLogRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use uuid::Uuid;

async fn setup() -> SurrealAuditLogRepository<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    tally_db::run_migrations(&db).await.unwrap();
    SurrealAuditLogRepository::new(db)
}

fn entry(user_id: Uuid, model: &str, document_id: &str, age: Duration) -> NewAuditLogEntry {
    NewAuditLogEntry {
        user_id,
        user_name: "Ana".into(),
        action: AuditAction::Update,
        model: model.into(),
        document_id: document_id.into(),
        previous_data: Some(json!({"price": 50})),
        new_data: Some(json!({"price": 72})),
        changed_fields: vec![FieldChange {
            field: "price".into(),
            old_value: json!(50),
            new_value: json!(72),
        }],
        ip_address: Some("10.0.0.1".into()),
        user_agent: None,
        timestamp: Utc::now() - age,
        status: AuditStatus::Success,
        error_message: None,
        metadata: json!({}),
    }
}

#[tokio::test]
async fn append_round_trips_every_field() {
    let repo = setup().await;
    let user_id = Uuid::new_v4();

    let mut input = entry(user_id, "Service", "svc-1", Duration::zero());
    input.previous_data = Some(json!({"price": 50, "tags": ["a", null], "note": null}));
    input.metadata = json!({"source": "import", "batch": 3});

    let stored = repo.append(input.clone()).await.unwrap();

    assert_eq!(stored.user_id, user_id);
    assert_eq!(stored.action, AuditAction::Update);
    assert_eq!(stored.model, "Service");
    assert_eq!(stored.document_id, "svc-1");
    assert_eq!(stored.previous_data, input.previous_data);
    assert_eq!(stored.new_data, input.new_data);
    assert_eq!(stored.changed_fields, input.changed_fields);
    assert_eq!(stored.ip_address.as_deref(), Some("10.0.0.1"));
    assert_eq!(stored.user_agent, None);
    assert_eq!(stored.status, AuditStatus::Success);
    assert_eq!(stored.metadata, json!({"source": "import", "batch": 3}));
}

#[tokio::test]
async fn metadata_keeps_large_integers_exact() {
    let repo = setup().await;

    let mut input = entry(Uuid::new_v4(), "Service", "svc-2", Duration::zero());
    input.metadata = json!({"big": u64::MAX, "id": 9007199254740993u64, "nested": {"n": -3}});

    let stored = repo.append(input).await.unwrap();
    assert_eq!(stored.metadata["big"].as_u64(), Some(u64::MAX));
    assert_eq!(stored.metadata["id"].as_u64(), Some(9007199254740993));
    assert_eq!(
        stored.metadata,
        json!({"big": u64::MAX, "id": 9007199254740993u64, "nested": {"n": -3}})
    );

    let listed = repo
        .list(AuditLogFilter::default(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(listed.items[0].metadata["big"].as_u64(), Some(u64::MAX));
}

#[tokio::test]
async fn append_keeps_absent_snapshots_absent() {
    let repo = setup().await;

    let mut input = entry(Uuid::new_v4(), "Expense", "exp-1", Duration::zero());
    input.action = AuditAction::Create;
    input.previous_data = None;
    input.changed_fields = Vec::new();

    let stored = repo.append(input).await.unwrap();
    assert_eq!(stored.previous_data, None);
    assert!(stored.changed_fields.is_empty());
}

#[tokio::test]
async fn list_is_newest_first_and_filtered() {
    let repo = setup().await;
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    repo.append(entry(alice, "Service", "s1", Duration::hours(3)))
        .await
        .unwrap();
    repo.append(entry(alice, "Expense", "e1", Duration::hours(2)))
        .await
        .unwrap();
    repo.append(entry(bob, "Service", "s1", Duration::hours(1)))
        .await
        .unwrap();

    let all = repo
        .list(AuditLogFilter::default(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(all.total, 3);
    let docs: Vec<&str> = all.items.iter().map(|e| e.document_id.as_str()).collect();
    assert_eq!(docs, vec!["s1", "e1", "s1"]);
    assert!(all.items[0].timestamp > all.items[1].timestamp);

    let by_user = repo
        .list(
            AuditLogFilter {
                user_id: Some(alice),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(by_user.total, 2);
    assert!(by_user.items.iter().all(|e| e.user_id == alice));

    let by_document = repo
        .list(
            AuditLogFilter {
                model: Some("Service".into()),
                document_id: Some("s1".into()),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(by_document.total, 2);
}

#[tokio::test]
async fn list_filters_by_status_and_action() {
    let repo = setup().await;
    let user = Uuid::new_v4();

    let mut failed = entry(user, "Service", "s1", Duration::minutes(5));
    failed.status = AuditStatus::Failed;
    failed.error_message = Some("validation failed".into());
    repo.append(failed).await.unwrap();

    let mut deleted = entry(user, "Service", "s2", Duration::minutes(4));
    deleted.action = AuditAction::Delete;
    repo.append(deleted).await.unwrap();

    let failures = repo
        .list(
            AuditLogFilter {
                status: Some(AuditStatus::Failed),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(failures.total, 1);
    assert_eq!(
        failures.items[0].error_message.as_deref(),
        Some("validation failed")
    );

    let deletes = repo
        .list(
            AuditLogFilter {
                action: Some(AuditAction::Delete),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(deletes.total, 1);
    assert_eq!(deletes.items[0].document_id, "s2");
}

#[tokio::test]
async fn date_range_bounds_are_inclusive() {
    let repo = setup().await;
    let user = Uuid::new_v4();

    let first = repo
        .append(entry(user, "Service", "old", Duration::days(3)))
        .await
        .unwrap();
    let middle = repo
        .append(entry(user, "Service", "mid", Duration::days(2)))
        .await
        .unwrap();
    repo.append(entry(user, "Service", "new", Duration::days(1)))
        .await
        .unwrap();

    let page = repo
        .list(
            AuditLogFilter {
                start_date: Some(first.timestamp),
                end_date: Some(middle.timestamp),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();

    let docs: Vec<&str> = page.items.iter().map(|e| e.document_id.as_str()).collect();
    assert_eq!(docs, vec!["mid", "old"]);
}

#[tokio::test]
async fn list_past_the_end_is_empty_with_total() {
    let repo = setup().await;
    let user = Uuid::new_v4();
    for i in 0..3 {
        repo.append(entry(user, "Service", &format!("s{i}"), Duration::minutes(i)))
            .await
            .unwrap();
    }

    let page = repo
        .list(
            AuditLogFilter::default(),
            Pagination {
                offset: 10,
                limit: 2,
            },
        )
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    assert!(page.items.is_empty());
}

#[tokio::test]
async fn delete_older_than_removes_only_expired_entries() {
    let repo = setup().await;
    let user = Uuid::new_v4();

    repo.append(entry(user, "Service", "old", Duration::days(40)))
        .await
        .unwrap();
    repo.append(entry(user, "Service", "recent", Duration::days(5)))
        .await
        .unwrap();

    let deleted = repo
        .delete_older_than(Utc::now() - Duration::days(30))
        .await
        .unwrap();
    assert_eq!(deleted, 1);

    let remaining = repo
        .list(AuditLogFilter::default(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(remaining.total, 1);
    assert_eq!(remaining.items[0].document_id, "recent");
}
