//! Daybook Store - document store access
//!
//! Provides the SurrealDB connection shared by the repositories and a
//! helper that bounds every database call with a timeout.

use std::future::IntoFuture;
use std::time::Duration;
use thiserror::Error;

pub mod surrealdb_store;

pub use surrealdb_store::{SurrealDbStore, USERS_TABLE};

/// Document store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SurrealDB connection failed: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Query timed out after {0:?}")]
    Timeout(Duration),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Run a database future, cancelling it once `limit` has elapsed.
///
/// The future is dropped on timeout; SurrealDB does not roll back a write
/// the server has already applied.
pub async fn with_timeout<F, T, E>(limit: Duration, fut: F) -> Result<T>
where
    F: IntoFuture<Output = std::result::Result<T, E>>,
    E: std::fmt::Display,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(StoreError::Query(e.to_string())),
        Err(_) => {
            tracing::warn!(timeout = ?limit, "database call timed out");
            Err(StoreError::Timeout(limit))
        }
    }
}
