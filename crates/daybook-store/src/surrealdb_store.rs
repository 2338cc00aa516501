//! SurrealDB connection management
//!
//! Opens the client, authenticates, selects namespace/database and
//! defines the schema the repositories rely on.

use crate::{with_timeout, Result, StoreError};
use daybook_core::DatabaseConfig;
use std::time::Duration;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use surrealdb::Surreal;

/// Table holding user documents
pub const USERS_TABLE: &str = "users";

/// Shared SurrealDB client
#[derive(Clone)]
pub struct SurrealDbStore {
    client: Surreal<Client>,
    query_timeout: Duration,
}

impl SurrealDbStore {
    /// Create a new SurrealDB connection
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        // Remove ws:// or wss:// prefix if present (surrealdb crate adds it automatically)
        let url = config
            .url
            .strip_prefix("ws://")
            .or_else(|| config.url.strip_prefix("wss://"))
            .unwrap_or(&config.url);

        let client = Surreal::new::<Ws>(url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        client
            .signin(Root {
                username: &config.username,
                password: &config.password,
            })
            .await
            .map_err(|e| StoreError::Connection(format!("auth failed: {e}")))?;

        client
            .use_ns(&config.namespace)
            .use_db(&config.database)
            .await
            .map_err(|e| StoreError::Connection(format!("namespace error: {e}")))?;

        tracing::info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "connected to SurrealDB"
        );

        Ok(Self {
            client,
            query_timeout: Duration::from_secs(config.query_timeout_secs),
        })
    }

    /// Initialize schema (idempotent, run on startup)
    ///
    /// Email, phone and user id are unique across the users table.
    pub async fn init_schema(&self) -> Result<()> {
        let statements = format!(
            r#"
            DEFINE TABLE IF NOT EXISTS {USERS_TABLE} SCHEMALESS;
            DEFINE INDEX IF NOT EXISTS idx_users_email ON TABLE {USERS_TABLE} FIELDS email UNIQUE;
            DEFINE INDEX IF NOT EXISTS idx_users_phone ON TABLE {USERS_TABLE} FIELDS phone UNIQUE;
            DEFINE INDEX IF NOT EXISTS idx_users_user_id ON TABLE {USERS_TABLE} FIELDS user_id UNIQUE;
            "#
        );

        with_timeout(self.query_timeout, async {
            self.client.query(statements).await?.check()
        })
        .await?;

        tracing::info!(table = USERS_TABLE, "schema initialized");
        Ok(())
    }

    /// Round-trip to the server, used by the readiness check
    pub async fn health(&self) -> Result<()> {
        with_timeout(self.query_timeout, self.client.health()).await
    }

    /// Underlying client
    pub fn client(&self) -> &Surreal<Client> {
        &self.client
    }

    /// Upper bound applied to each query
    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires SurrealDB"]
    async fn test_connect_and_init_schema() {
        let store = SurrealDbStore::connect(&DatabaseConfig::default())
            .await
            .expect("connection failed");

        store.init_schema().await.expect("schema init failed");
        // Second run must be a no-op
        store.init_schema().await.expect("schema re-init failed");
        store.health().await.expect("health check failed");
    }
}
