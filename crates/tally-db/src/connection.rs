//! Store handle construction.
//!
//! The endpoint scheme picks the engine (`ws://host:port` for a server,
//! `mem://` for an embedded in-memory store), so the server binary and the
//! tests go through the same [`DbManager::connect`].

use serde::Deserialize;
use surrealdb::Surreal;
use surrealdb::engine::any::{self, Any};
use surrealdb::opt::auth::Root;
use tracing::info;

use crate::error::DbError;
use crate::schema::run_migrations;

/// Where the store lives and how to sign in to it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// Engine endpoint, e.g. `ws://127.0.0.1:8000` or `mem://`.
    pub url: String,
    pub namespace: String,
    pub database: String,
    /// Root credentials. Sign-in is skipped unless both are set.
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8000".into(),
            namespace: "tally".into(),
            database: "main".into(),
            username: Some("root".into()),
            password: Some("root".into()),
        }
    }
}

impl DbConfig {
    /// Embedded in-memory store without credentials.
    pub fn in_memory(namespace: &str, database: &str) -> Self {
        Self {
            url: "mem://".into(),
            namespace: namespace.into(),
            database: database.into(),
            username: None,
            password: None,
        }
    }

    fn credentials(&self) -> Option<Root> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some(Root {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }
}

/// An open, migrated store.
///
/// Cloning shares the connection; repositories take clones of
/// [`DbManager::client`].
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Any>,
}

impl DbManager {
    /// Open the endpoint, sign in when credentials are configured, select
    /// the namespace and database, then apply pending migrations.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "Opening store"
        );

        let db = any::connect(config.url.as_str()).await?;

        if let Some(root) = config.credentials() {
            db.signin(root).await?;
        }

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        run_migrations(&db).await?;

        info!("Store ready");
        Ok(Self { db })
    }

    pub fn client(&self) -> &Surreal<Any> {
        &self.db
    }
}
