//! Hearting stores.

use delicious_core::{StoreId, UserId};

use super::ServiceError;
use crate::db::{StoreRepository, UserRepository};
use crate::models::User;

/// Favorites service.
pub struct FavoritesService<'a> {
    stores: &'a dyn StoreRepository,
    users: &'a dyn UserRepository,
}

impl<'a> FavoritesService<'a> {
    #[must_use]
    pub const fn new(stores: &'a dyn StoreRepository, users: &'a dyn UserRepository) -> Self {
        Self { stores, users }
    }

    /// Heart `store` for `user`, or un-heart it if already hearted.
    ///
    /// Returns the user with the updated hearts.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the store or the user is unknown.
    #[tracing::instrument(skip(self))]
    pub async fn toggle_favorite(&self, user: UserId, store: StoreId) -> Result<User, ServiceError> {
        if self.stores.find_by_id(store).await?.is_none() {
            return Err(ServiceError::NotFound("store"));
        }

        self.users
            .toggle_heart(user, store)
            .await?
            .ok_or(ServiceError::NotFound("user"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryDatabase;
    use crate::models::{NewUser, StoreInput};
    use crate::services::StoreService;

    async fn setup(db: &MemoryDatabase) -> (User, StoreId) {
        let user = UserRepository::insert(
            db,
            NewUser {
                id: UserId::generate(),
                email: "wes@example.com".to_string(),
                name: "Wes".to_string(),
            },
        )
        .await
        .unwrap();

        let store = StoreService::new(db)
            .create(
                StoreInput {
                    name: "Wes Cafe".to_string(),
                    ..StoreInput::default()
                },
                user.id,
            )
            .await
            .unwrap();

        (user, store.id)
    }

    #[tokio::test]
    async fn test_toggle_twice_restores_hearts() {
        let db = MemoryDatabase::new();
        let (user, store) = setup(&db).await;
        let service = FavoritesService::new(&db, &db);

        let hearted = service.toggle_favorite(user.id, store).await.unwrap();
        assert!(hearted.has_hearted(store));

        let restored = service.toggle_favorite(user.id, store).await.unwrap();
        assert_eq!(restored.hearts, user.hearts);
    }

    #[tokio::test]
    async fn test_unknown_store_or_user() {
        let db = MemoryDatabase::new();
        let (user, store) = setup(&db).await;
        let service = FavoritesService::new(&db, &db);

        assert!(matches!(
            service.toggle_favorite(user.id, StoreId::generate()).await,
            Err(ServiceError::NotFound("store"))
        ));
        assert!(matches!(
            service.toggle_favorite(UserId::generate(), store).await,
            Err(ServiceError::NotFound("user"))
        ));
    }
}
