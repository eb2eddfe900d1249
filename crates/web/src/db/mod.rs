//! Persistence for stores and users.
//!
//! # Backends
//!
//! - [`stores::PgStoreRepository`] / [`users::PgUserRepository`] - `PostgreSQL` via sqlx
//! - [`memory::MemoryDatabase`] - in-process, used by tests and when no
//!   database URL is configured
//!
//! Handlers never see a concrete backend: `AppState` holds the repositories
//! as trait objects built once at startup.
//!
//! # Tables
//!
//! - `users` - accounts owned by the identity provider, plus `hearts`
//! - `stores` - the store directory
//! - `tower_sessions.session` - session storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/web/migrations/` and run via:
//! ```bash
//! cargo run -p delicious-cli -- migrate
//! ```

pub mod memory;
pub mod stores;
pub mod users;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use delicious_core::{GeoPoint, Slug, StoreId, UserId};

use crate::models::{
    NearbyStore, NewStore, NewUser, ScoredStore, Store, StoreChanges, StoreDetail, TagCount, User,
};

pub use memory::MemoryDatabase;
pub use stores::PgStoreRepository;
pub use users::PgUserRepository;

/// Embedded migrations for the web database.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Constraint violation (e.g., duplicate slug).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Store persistence.
#[async_trait]
pub trait StoreRepository: Send + Sync {
    /// Cheap connectivity check for readiness probes.
    async fn ping(&self) -> Result<(), RepositoryError>;

    /// Insert a new store.
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    async fn insert(&self, store: NewStore) -> Result<Store, RepositoryError>;

    async fn find_by_id(&self, id: StoreId) -> Result<Option<Store>, RepositoryError>;

    /// Find a store by slug with its author resolved.
    async fn find_by_slug(&self, slug: &Slug) -> Result<Option<StoreDetail>, RepositoryError>;

    /// All stores, newest first.
    async fn list_all(&self) -> Result<Vec<Store>, RepositoryError>;

    /// Stores carrying `tag`, or every store with at least one tag when `None`.
    async fn list_by_tag(&self, tag: Option<&str>) -> Result<Vec<Store>, RepositoryError>;

    /// Distinct tags with the number of stores carrying each, most used first.
    async fn tag_counts(&self) -> Result<Vec<TagCount>, RepositoryError>;

    /// Slugs of the form `base` or `base-<n>` currently in use, ignoring `exclude`.
    async fn slug_family(
        &self,
        base: &Slug,
        exclude: Option<StoreId>,
    ) -> Result<Vec<Slug>, RepositoryError>;

    /// Replace a store's editable fields. Returns `None` if it does not exist.
    async fn update(
        &self,
        id: StoreId,
        changes: StoreChanges,
    ) -> Result<Option<Store>, RepositoryError>;

    /// Relevance-ranked search over name and description, best first.
    async fn search_text(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredStore>, RepositoryError>;

    /// Stores within `max_distance_m` of `point`, nearest first.
    async fn near(
        &self,
        point: GeoPoint,
        max_distance_m: f64,
        limit: usize,
    ) -> Result<Vec<NearbyStore>, RepositoryError>;
}

/// User persistence.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user. Returns `RepositoryError::Conflict` if the email exists.
    async fn insert(&self, user: NewUser) -> Result<User, RepositoryError>;

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;

    /// Add `store` to the user's hearts if absent, remove it if present.
    ///
    /// Implementations apply this as one atomic update. Returns `None` if the
    /// user does not exist.
    async fn toggle_heart(
        &self,
        user: UserId,
        store: StoreId,
    ) -> Result<Option<User>, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Map a unique-constraint violation to `RepositoryError::Conflict`.
pub(crate) fn conflict_on_unique(err: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(err)
}
