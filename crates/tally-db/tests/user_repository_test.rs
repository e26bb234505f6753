//! Integration tests for User repository using in-memory SurrealDB.

use tally_core::error::TallyError;
use tally_core::models::user::{CreateUser, UpdateUser, UserRole};
use tally_core::repository::{Pagination, UserRepository};
use tally_db::repository::SurrealUserRepository;
use tally_db::verify_password;
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use uuid::Uuid;

/// Helper: spin up in-memory DB and run migrations.
async fn setup() -> Surreal<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    tally_db::run_migrations(&db).await.unwrap();
    db
}

fn new_user(name: &str, email: &str, role: UserRole) -> CreateUser {
    CreateUser {
        name: name.into(),
        email: email.into(),
        password: "pass123".into(),
        role,
        role_ids: Vec::new(),
    }
}

#[tokio::test]
async fn create_and_get_user() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db);

    let user = repo
        .create(CreateUser {
            name: "Alice".into(),
            email: "alice@example.com".into(),
            password: "SuperSecret123!".into(),
            role: UserRole::Manager,
            role_ids: Vec::new(),
        })
        .await
        .unwrap();

    assert_eq!(user.name, "Alice");
    assert_eq!(user.email, "alice@example.com");
    assert_eq!(user.role, UserRole::Manager);
    assert!(user.is_active);

    // Password should be hashed, not stored in plaintext.
    assert_ne!(user.password_hash, "SuperSecret123!");
    assert!(user.password_hash.starts_with("$argon2id$"));

    let fetched = repo.get_by_id(user.id).await.unwrap();
    assert_eq!(fetched.id, user.id);
    assert_eq!(fetched.name, "Alice");
}

#[tokio::test]
async fn password_verification() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db);

    let user = repo
        .create(CreateUser {
            password: "MyPassword42!".into(),
            ..new_user("Bob", "bob@example.com", UserRole::Staff)
        })
        .await
        .unwrap();

    assert!(verify_password("MyPassword42!", &user.password_hash, None).unwrap());
    assert!(!verify_password("WrongPassword", &user.password_hash, None).unwrap());
}

#[tokio::test]
async fn password_with_pepper() {
    let db = setup().await;
    let pepper = "server-secret-pepper".to_string();
    let repo = SurrealUserRepository::with_pepper(db, pepper.clone());

    let user = repo
        .create(CreateUser {
            password: "PepperedPass!".into(),
            ..new_user("Carol", "carol@example.com", UserRole::Viewer)
        })
        .await
        .unwrap();

    assert!(verify_password("PepperedPass!", &user.password_hash, Some(&pepper)).unwrap());
    assert!(!verify_password("PepperedPass!", &user.password_hash, None).unwrap());
}

#[tokio::test]
async fn get_user_by_email() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db);

    let user = repo
        .create(new_user("Eve", "eve@example.com", UserRole::Staff))
        .await
        .unwrap();

    let fetched = repo.get_by_email("eve@example.com").await.unwrap();
    assert_eq!(fetched.id, user.id);

    let missing = repo.get_by_email("nobody@example.com").await;
    assert!(matches!(missing, Err(TallyError::NotFound { .. })));
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db);

    repo.create(new_user("Gus", "gus@example.com", UserRole::Staff))
        .await
        .unwrap();

    let err = repo
        .create(new_user("Gus Again", "gus@example.com", UserRole::Viewer))
        .await
        .unwrap_err();
    assert!(
        matches!(err, TallyError::AlreadyExists { .. }),
        "expected AlreadyExists, got {err:?}"
    );
}

#[tokio::test]
async fn update_user() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db);

    let user = repo
        .create(new_user("Frank", "frank@example.com", UserRole::Viewer))
        .await
        .unwrap();

    let extra_role = Uuid::new_v4();
    let updated = repo
        .update(
            user.id,
            UpdateUser {
                name: Some("Franklin".into()),
                role: Some(UserRole::Staff),
                role_ids: Some(vec![extra_role]),
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.name, "Franklin");
    assert_eq!(updated.role, UserRole::Staff);
    assert_eq!(updated.role_ids, vec![extra_role]);
    assert!(!updated.is_active);
    assert_eq!(updated.email, "frank@example.com");
}

#[tokio::test]
async fn delete_user() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db);

    let user = repo
        .create(new_user("Hal", "hal@example.com", UserRole::Staff))
        .await
        .unwrap();

    repo.delete(user.id).await.unwrap();

    let result = repo.get_by_id(user.id).await;
    assert!(matches!(result, Err(TallyError::NotFound { .. })));
}

#[tokio::test]
async fn list_users_paginates() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db);

    for i in 0..3 {
        repo.create(new_user(
            &format!("User {i}"),
            &format!("user{i}@example.com"),
            UserRole::Viewer,
        ))
        .await
        .unwrap();
    }

    let page = repo
        .list(Pagination {
            offset: 0,
            limit: 2,
        })
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 2);

    let rest = repo
        .list(Pagination {
            offset: 2,
            limit: 2,
        })
        .await
        .unwrap();
    assert_eq!(rest.items.len(), 1);
}
