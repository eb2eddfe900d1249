//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::WebConfig;
use crate::db::{MemoryDatabase, PgStoreRepository, PgUserRepository, StoreRepository, UserRepository};
use crate::services::{FavoritesService, ImageResizer, StoreService};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Repositories are held as trait objects so
/// handlers run unchanged against `PostgreSQL` or the in-memory backend.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: WebConfig,
    stores: Arc<dyn StoreRepository>,
    users: Arc<dyn UserRepository>,
    resizer: ImageResizer,
}

impl AppState {
    /// Create application state from explicit repositories.
    #[must_use]
    pub fn new(
        config: WebConfig,
        stores: Arc<dyn StoreRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        let resizer = ImageResizer::new(config.uploads_dir.clone(), config.photo_width);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                stores,
                users,
                resizer,
            }),
        }
    }

    /// State backed by a `PostgreSQL` pool.
    #[must_use]
    pub fn with_postgres(config: WebConfig, pool: PgPool) -> Self {
        Self::new(
            config,
            Arc::new(PgStoreRepository::new(pool.clone())),
            Arc::new(PgUserRepository::new(pool)),
        )
    }

    /// State backed by a fresh in-memory database.
    ///
    /// Also returns the database so callers can seed users directly.
    #[must_use]
    pub fn in_memory(config: WebConfig) -> (Self, Arc<MemoryDatabase>) {
        let db = Arc::new(MemoryDatabase::new());
        let state = Self::new(config, db.clone(), db.clone());
        (state, db)
    }

    #[must_use]
    pub fn config(&self) -> &WebConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn stores(&self) -> &dyn StoreRepository {
        self.inner.stores.as_ref()
    }

    #[must_use]
    pub fn users(&self) -> &dyn UserRepository {
        self.inner.users.as_ref()
    }

    #[must_use]
    pub fn resizer(&self) -> &ImageResizer {
        &self.inner.resizer
    }

    /// Store service over this state's repository.
    #[must_use]
    pub fn store_service(&self) -> StoreService<'_> {
        StoreService::new(self.stores())
    }

    /// Favorites service over this state's repositories.
    #[must_use]
    pub fn favorites_service(&self) -> FavoritesService<'_> {
        FavoritesService::new(self.stores(), self.users())
    }
}
