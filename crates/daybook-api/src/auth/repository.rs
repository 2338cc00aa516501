//! User collection access
//!
//! [`UserRepository`] is the storage seam used by the auth service. Two
//! implementations exist:
//! - [`SurrealUserRepository`]: the `users` table in SurrealDB
//! - [`MemoryUserRepository`]: an in-process store for tests
//!
//! Every SurrealDB call is bounded by the configured query timeout.

use super::models::{InsertOneResult, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use daybook_store::{with_timeout, StoreError, SurrealDbStore, USERS_TABLE};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Repository errors
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Database query timed out")]
    Timeout,

    #[error("Duplicate value: {0}")]
    Duplicate(String),

    #[error("Corrupt user record: {0}")]
    CorruptRecord(String),
}

impl From<StoreError> for RepositoryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Timeout(_) => Self::Timeout,
            StoreError::Query(msg) if msg.contains("already contains") => Self::Duplicate(msg),
            StoreError::Query(msg) | StoreError::Connection(msg) => Self::Database(msg),
        }
    }
}

/// Equality filter on indexed fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserFilter {
    Email(String),
    Phone(String),
    UserId(String),
    /// The user whose stored refresh token is still the given one
    UserIdAndRefreshToken {
        user_id: String,
        refresh_token: String,
    },
}

impl UserFilter {
    /// `(field, value)` pairs that must all match
    pub fn conditions(&self) -> Vec<(&'static str, &str)> {
        match self {
            Self::Email(v) => vec![("email", v.as_str())],
            Self::Phone(v) => vec![("phone", v.as_str())],
            Self::UserId(v) => vec![("user_id", v.as_str())],
            Self::UserIdAndRefreshToken {
                user_id,
                refresh_token,
            } => vec![
                ("user_id", user_id.as_str()),
                ("refresh_token", refresh_token.as_str()),
            ],
        }
    }

    /// SurrealQL condition with one `$fN` parameter per field, plus the values to bind
    fn where_clause(&self) -> (String, Vec<(String, String)>) {
        let conditions = self.conditions();
        let clause = conditions
            .iter()
            .enumerate()
            .map(|(i, (field, _))| format!("{field} = $f{i}"))
            .collect::<Vec<_>>()
            .join(" AND ");
        let bindings = conditions
            .into_iter()
            .enumerate()
            .map(|(i, (_, value))| (format!("f{i}"), value.to_string()))
            .collect();
        (clause, bindings)
    }

    fn matches(&self, user: &User) -> bool {
        match self {
            Self::Email(v) => &user.email == v,
            Self::Phone(v) => &user.phone == v,
            Self::UserId(v) => &user.user_id == v,
            Self::UserIdAndRefreshToken {
                user_id,
                refresh_token,
            } => &user.user_id == user_id && user.refresh_token.as_ref() == Some(refresh_token),
        }
    }
}

/// Partial update applied by [`UserRepository::update_one`]
///
/// `None` fields are left untouched; `updated_at` is always written.
#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub token: Option<String>,
    pub refresh_token: Option<String>,
    pub password: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl UserUpdate {
    /// Replace both tokens
    pub fn tokens(token: String, refresh_token: String) -> Self {
        Self {
            token: Some(token),
            refresh_token: Some(refresh_token),
            password: None,
            updated_at: Utc::now(),
        }
    }

    /// Replace the password hash
    pub fn password(hash: String) -> Self {
        Self {
            token: None,
            refresh_token: None,
            password: Some(hash),
            updated_at: Utc::now(),
        }
    }
}

/// Outcome of an update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateResult {
    pub modified_count: u64,
}

/// Storage operations on the user collection
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Number of users matching the filter
    async fn count(&self, filter: &UserFilter) -> Result<u64, RepositoryError>;

    /// First user matching the filter
    async fn find_one(&self, filter: &UserFilter) -> Result<Option<User>, RepositoryError>;

    /// Insert a new user document
    async fn insert_one(&self, user: &User) -> Result<InsertOneResult, RepositoryError>;

    /// Apply a partial update to the first user matching the filter
    async fn update_one(
        &self,
        filter: &UserFilter,
        update: UserUpdate,
    ) -> Result<UpdateResult, RepositoryError>;

    /// Check the backing store is reachable
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Stored shape of a user; unlike [`User`] the password hash is serialized
#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserRecord {
    user_id: String,
    first_name: String,
    last_name: String,
    email: String,
    phone: String,
    password: String,
    token: Option<String>,
    refresh_token: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

const USER_FIELDS: &str = "user_id, first_name, last_name, email, phone, password, \
                           token, refresh_token, created_at, updated_at";

impl From<&User> for UserRecord {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.user_id.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            password: user.password.clone(),
            token: user.token.clone(),
            refresh_token: user.refresh_token.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl TryFrom<UserRecord> for User {
    type Error = RepositoryError;

    fn try_from(record: UserRecord) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&record.user_id)
            .map_err(|e| RepositoryError::CorruptRecord(format!("{}: {e}", record.user_id)))?;

        Ok(Self {
            id,
            user_id: record.user_id,
            first_name: record.first_name,
            last_name: record.last_name,
            email: record.email,
            phone: record.phone,
            password: record.password,
            token: record.token,
            refresh_token: record.refresh_token,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

#[derive(Debug, Deserialize)]
struct Touched {
    user_id: String,
}

/// SurrealDB-backed user repository
#[derive(Clone)]
pub struct SurrealUserRepository {
    store: SurrealDbStore,
}

impl SurrealUserRepository {
    pub fn new(store: SurrealDbStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl UserRepository for SurrealUserRepository {
    async fn count(&self, filter: &UserFilter) -> Result<u64, RepositoryError> {
        let (clause, bindings) = filter.where_clause();
        let query = format!("SELECT count() AS total FROM {USERS_TABLE} WHERE {clause} GROUP ALL");
        let client = self.store.client();

        let total: Option<u64> = with_timeout(self.store.query_timeout(), async move {
            let mut builder = client.query(query);
            for binding in bindings {
                builder = builder.bind(binding);
            }
            builder.await?.take((0, "total"))
        })
        .await?;

        Ok(total.unwrap_or(0))
    }

    async fn find_one(&self, filter: &UserFilter) -> Result<Option<User>, RepositoryError> {
        let (clause, bindings) = filter.where_clause();
        let query = format!("SELECT {USER_FIELDS} FROM {USERS_TABLE} WHERE {clause} LIMIT 1");
        let client = self.store.client();

        let records: Vec<UserRecord> = with_timeout(self.store.query_timeout(), async move {
            let mut builder = client.query(query);
            for binding in bindings {
                builder = builder.bind(binding);
            }
            builder.await?.take(0)
        })
        .await?;

        records.into_iter().next().map(User::try_from).transpose()
    }

    async fn insert_one(&self, user: &User) -> Result<InsertOneResult, RepositoryError> {
        let query = "CREATE type::thing($table, $id) CONTENT $content RETURN NONE";
        let record = UserRecord::from(user);
        let id = user.id.to_string();
        let client = self.store.client();

        with_timeout(self.store.query_timeout(), async move {
            client
                .query(query)
                .bind(("table", USERS_TABLE))
                .bind(("id", id))
                .bind(("content", record))
                .await?
                .check()
        })
        .await?;

        tracing::debug!(user_id = %user.user_id, "user document created");

        Ok(InsertOneResult {
            inserted_id: user.id.to_string(),
        })
    }

    async fn update_one(
        &self,
        filter: &UserFilter,
        update: UserUpdate,
    ) -> Result<UpdateResult, RepositoryError> {
        // Build dynamic update query
        let mut updates = vec!["updated_at = $updated_at"];
        if update.token.is_some() {
            updates.push("token = $token");
        }
        if update.refresh_token.is_some() {
            updates.push("refresh_token = $refresh_token");
        }
        if update.password.is_some() {
            updates.push("password = $password");
        }

        // The WHERE clause is evaluated per record inside the UPDATE, so a
        // compound filter acts as a compare-and-set
        let (clause, bindings) = filter.where_clause();
        let query = format!(
            "UPDATE {USERS_TABLE} SET {} WHERE {clause} RETURN user_id",
            updates.join(", ")
        );
        let client = self.store.client();

        let touched: Vec<Touched> = with_timeout(self.store.query_timeout(), async move {
            let mut builder = client
                .query(query)
                .bind(("updated_at", update.updated_at));
            for binding in bindings {
                builder = builder.bind(binding);
            }

            if let Some(token) = update.token {
                builder = builder.bind(("token", token));
            }
            if let Some(refresh_token) = update.refresh_token {
                builder = builder.bind(("refresh_token", refresh_token));
            }
            if let Some(password) = update.password {
                builder = builder.bind(("password", password));
            }

            builder.await?.take(0)
        })
        .await?;

        tracing::debug!(
            user_ids = ?touched.iter().map(|t| t.user_id.as_str()).collect::<Vec<_>>(),
            "user documents updated"
        );
        Ok(UpdateResult {
            modified_count: touched.len() as u64,
        })
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        self.store.health().await.map_err(RepositoryError::from)
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use memory::MemoryUserRepository;

#[cfg(any(test, feature = "test-utils"))]
mod memory {
    use super::*;
    use tokio::sync::RwLock;

    /// In-process user store with the same uniqueness rules as the schema
    #[derive(Default)]
    pub struct MemoryUserRepository {
        users: RwLock<Vec<User>>,
    }

    impl MemoryUserRepository {
        pub fn new() -> Self {
            Self::default()
        }

        /// Total number of stored users
        pub async fn len(&self) -> usize {
            self.users.read().await.len()
        }

        pub async fn is_empty(&self) -> bool {
            self.users.read().await.is_empty()
        }
    }

    #[async_trait]
    impl UserRepository for MemoryUserRepository {
        async fn count(&self, filter: &UserFilter) -> Result<u64, RepositoryError> {
            let users = self.users.read().await;
            Ok(users.iter().filter(|u| filter.matches(u)).count() as u64)
        }

        async fn find_one(&self, filter: &UserFilter) -> Result<Option<User>, RepositoryError> {
            let users = self.users.read().await;
            Ok(users.iter().find(|u| filter.matches(u)).cloned())
        }

        async fn insert_one(&self, user: &User) -> Result<InsertOneResult, RepositoryError> {
            let mut users = self.users.write().await;

            if users.iter().any(|u| u.email == user.email) {
                return Err(RepositoryError::Duplicate(format!("email {}", user.email)));
            }
            if users.iter().any(|u| u.phone == user.phone) {
                return Err(RepositoryError::Duplicate(format!("phone {}", user.phone)));
            }
            if users.iter().any(|u| u.user_id == user.user_id) {
                return Err(RepositoryError::Duplicate(format!("user_id {}", user.user_id)));
            }

            users.push(user.clone());
            Ok(InsertOneResult {
                inserted_id: user.id.to_string(),
            })
        }

        async fn update_one(
            &self,
            filter: &UserFilter,
            update: UserUpdate,
        ) -> Result<UpdateResult, RepositoryError> {
            let mut users = self.users.write().await;
            let Some(user) = users.iter_mut().find(|u| filter.matches(u)) else {
                return Ok(UpdateResult::default());
            };

            if let Some(token) = update.token {
                user.token = Some(token);
            }
            if let Some(refresh_token) = update.refresh_token {
                user.refresh_token = Some(refresh_token);
            }
            if let Some(password) = update.password {
                user.password = password;
            }
            user.updated_at = update.updated_at;

            Ok(UpdateResult { modified_count: 1 })
        }

        async fn ping(&self) -> Result<(), RepositoryError> {
            Ok(())
        }
    }
}
