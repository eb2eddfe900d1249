//! Store operations used by the page and API handlers.

use delicious_core::{GeoPoint, Slug, StoreId, UserId, ValidationError, next_available_slug, slugify};

use super::{ServiceError, confirm_owner};
use crate::db::{RepositoryError, StoreRepository};
use crate::models::{
    NearbyStore, NewStore, ScoredStore, Store, StoreChanges, StoreDetail, StoreInput, TagListing,
};

/// Maximum number of text-search hits returned.
pub const SEARCH_LIMIT: usize = 5;

/// Maximum number of stores returned by a proximity lookup.
pub const NEAR_LIMIT: usize = 10;

/// Default proximity radius in meters.
pub const DEFAULT_MAX_DISTANCE_M: f64 = 10_000.0;

/// Shown when a name has nothing to build a slug from.
pub const UNSLUGGABLE_NAME: &str = "Store name must contain at least one letter or digit!";

/// Shown when another store claimed the same slug mid-write.
pub const SLUG_TAKEN: &str = "A store with that name was just added, please try again!";

/// Store service.
pub struct StoreService<'a> {
    stores: &'a dyn StoreRepository,
}

impl<'a> StoreService<'a> {
    /// Create a new store service.
    #[must_use]
    pub const fn new(stores: &'a dyn StoreRepository) -> Self {
        Self { stores }
    }

    /// Validate `input` and save it as a new store authored by `author`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` if a field is missing or invalid or
    /// if no usable slug can be derived from the name.
    #[tracing::instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: StoreInput, author: UserId) -> Result<Store, ServiceError> {
        let fields = input.validate()?;
        let slug = self.unique_slug(&fields.name, None).await?;

        let store = self
            .stores
            .insert(NewStore {
                id: StoreId::generate(),
                slug,
                author,
                fields,
            })
            .await
            .map_err(slug_conflict)?;

        tracing::info!(store_id = %store.id, slug = %store.slug, "Store created");
        Ok(store)
    }

    /// All stores, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Upstream` on database failure.
    pub async fn list(&self) -> Result<Vec<Store>, ServiceError> {
        Ok(self.stores.list_all().await?)
    }

    /// Look up a store and its author by slug.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if no store has this slug.
    pub async fn get_by_slug(&self, slug: &str) -> Result<StoreDetail, ServiceError> {
        let Ok(slug) = Slug::parse(slug) else {
            return Err(ServiceError::NotFound("store"));
        };

        self.stores
            .find_by_slug(&slug)
            .await?
            .ok_or(ServiceError::NotFound("store"))
    }

    /// Tag counts plus the stores carrying `tag` (or any tag at all).
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Upstream` if either query fails.
    pub async fn list_by_tag(&self, tag: Option<&str>) -> Result<TagListing, ServiceError> {
        let tag = tag.map(str::trim).filter(|t| !t.is_empty());
        let (tags, stores) =
            tokio::try_join!(self.stores.tag_counts(), self.stores.list_by_tag(tag))?;

        Ok(TagListing { tags, stores })
    }

    /// Fetch a store for its edit form.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the store does not exist and
    /// `ServiceError::Authorization` if `requester` is not its author.
    pub async fn get_for_edit(&self, id: StoreId, requester: UserId) -> Result<Store, ServiceError> {
        let store = self.find(id).await?;
        confirm_owner(&store, requester)?;
        Ok(store)
    }

    /// Replace a store's fields on behalf of its author.
    ///
    /// The slug follows the name: it is regenerated only when the name
    /// changed. The stored photo is kept unless `input` carries a new one.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Authorization` for anyone but the author,
    /// `ServiceError::Validation` for bad input and `ServiceError::NotFound`
    /// if the store does not exist.
    #[tracing::instrument(skip(self, input), fields(store_id = %id))]
    pub async fn update(
        &self,
        id: StoreId,
        input: StoreInput,
        requester: UserId,
    ) -> Result<Store, ServiceError> {
        let current = self.find(id).await?;
        confirm_owner(&current, requester)?;

        let fields = input.validate()?;
        let slug = if fields.name == current.name {
            current.slug
        } else {
            self.unique_slug(&fields.name, Some(id)).await?
        };

        let store = self
            .stores
            .update(id, StoreChanges { slug, fields })
            .await
            .map_err(slug_conflict)?
            .ok_or(ServiceError::NotFound("store"))?;

        tracing::info!(store_id = %store.id, slug = %store.slug, "Store updated");
        Ok(store)
    }

    /// Relevance search over names and descriptions.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Upstream` on database failure.
    pub async fn search_by_text(&self, query: &str) -> Result<Vec<ScoredStore>, ServiceError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.stores.search_text(query, SEARCH_LIMIT).await?)
    }

    /// Stores within `max_distance_m` of `point`, nearest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Upstream` on database failure.
    pub async fn list_near(
        &self,
        point: GeoPoint,
        max_distance_m: f64,
    ) -> Result<Vec<NearbyStore>, ServiceError> {
        Ok(self.stores.near(point, max_distance_m, NEAR_LIMIT).await?)
    }

    async fn find(&self, id: StoreId) -> Result<Store, ServiceError> {
        self.stores
            .find_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound("store"))
    }

    async fn unique_slug(&self, name: &str, exclude: Option<StoreId>) -> Result<Slug, ServiceError> {
        let base = slugify(name).map_err(|_| ValidationError::single("slug", UNSLUGGABLE_NAME))?;
        let family = self.stores.slug_family(&base, exclude).await?;
        Ok(next_available_slug(base, &family))
    }
}

fn slug_conflict(err: RepositoryError) -> ServiceError {
    match err {
        RepositoryError::Conflict(_) => ValidationError::single("slug", SLUG_TAKEN).into(),
        other => other.into(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryDatabase;
    use crate::services::NOT_OWNER;

    fn input(name: &str) -> StoreInput {
        StoreInput {
            name: name.to_string(),
            description: "Coffee and bagels".to_string(),
            tags: vec!["Wifi".to_string()],
            ..StoreInput::default()
        }
    }

    fn located(name: &str, lng: f64, lat: f64) -> StoreInput {
        StoreInput {
            address: "Somewhere".to_string(),
            longitude: lng.to_string(),
            latitude: lat.to_string(),
            ..input(name)
        }
    }

    #[tokio::test]
    async fn test_create_dedupes_slugs() {
        let db = MemoryDatabase::new();
        let service = StoreService::new(&db);
        let author = UserId::generate();

        let first = service.create(input("Wes Cafe"), author).await.unwrap();
        let second = service.create(input("Wes Cafe"), author).await.unwrap();
        let third = service.create(input("Wes  Cafe!"), author).await.unwrap();

        assert_eq!(first.slug.as_str(), "wes-cafe");
        assert_eq!(second.slug.as_str(), "wes-cafe-2");
        assert_eq!(third.slug.as_str(), "wes-cafe-3");
        assert_eq!(first.author, author);
    }

    #[tokio::test]
    async fn test_create_after_rename_skips_taken_suffix() {
        let db = MemoryDatabase::new();
        let service = StoreService::new(&db);
        let author = UserId::generate();

        let first = service.create(input("Cafe"), author).await.unwrap();
        service.create(input("Cafe"), author).await.unwrap();
        service.update(first.id, input("Bistro"), author).await.unwrap();

        // Only "cafe-2" is left in the family, so counting would reuse it.
        let third = service.create(input("Cafe"), author).await.unwrap();
        assert_eq!(third.slug.as_str(), "cafe-3");
    }

    #[tokio::test]
    async fn test_create_rejects_missing_name() {
        let db = MemoryDatabase::new();
        let service = StoreService::new(&db);

        let err = service.create(input("  "), UserId::generate()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = service.create(input("???"), UserId::generate()).await.unwrap_err();
        let ServiceError::Validation(v) = err else {
            panic!("expected validation error");
        };
        assert_eq!(v.errors()[0].field, "slug");
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_by_slug_not_found() {
        let db = MemoryDatabase::new();
        let service = StoreService::new(&db);
        assert!(matches!(
            service.get_by_slug("nope").await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.get_by_slug("Not A Slug").await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_by_non_author_fails() {
        let db = MemoryDatabase::new();
        let service = StoreService::new(&db);
        let author = UserId::generate();
        let store = service.create(input("Wes Cafe"), author).await.unwrap();

        let err = service
            .update(store.id, input("Hijacked"), UserId::generate())
            .await
            .unwrap_err();
        let ServiceError::Authorization(e) = err else {
            panic!("expected authorization error");
        };
        assert_eq!(e.to_string(), NOT_OWNER);

        assert!(matches!(
            service.get_for_edit(store.id, UserId::generate()).await,
            Err(ServiceError::Authorization(_))
        ));
        let unchanged = service.get_for_edit(store.id, author).await.unwrap();
        assert_eq!(unchanged.name, "Wes Cafe");
    }

    #[tokio::test]
    async fn test_update_by_author_persists() {
        let db = MemoryDatabase::new();
        let service = StoreService::new(&db);
        let author = UserId::generate();
        let store = service
            .create(
                StoreInput {
                    photo: Some("old.jpeg".to_string()),
                    ..input("Wes Cafe")
                },
                author,
            )
            .await
            .unwrap();

        // Same name keeps the slug even though the family now has two members.
        service.create(input("Wes Cafe"), author).await.unwrap();
        let same = service
            .update(store.id, input("Wes Cafe"), author)
            .await
            .unwrap();
        assert_eq!(same.slug.as_str(), "wes-cafe");
        assert_eq!(same.photo.as_deref(), Some("old.jpeg"));

        let renamed = service
            .update(store.id, located("Bagel Barn", -79.4, 43.6), author)
            .await
            .unwrap();
        assert_eq!(renamed.slug.as_str(), "bagel-barn");
        assert!(renamed.location.is_some());

        let fetched = service.get_by_slug("bagel-barn").await.unwrap();
        assert_eq!(fetched.store.id, store.id);
    }

    #[tokio::test]
    async fn test_update_missing_store() {
        let db = MemoryDatabase::new();
        let service = StoreService::new(&db);
        assert!(matches!(
            service
                .update(StoreId::generate(), input("X"), UserId::generate())
                .await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_by_tag() {
        let db = MemoryDatabase::new();
        let service = StoreService::new(&db);
        let author = UserId::generate();
        service.create(input("A"), author).await.unwrap();
        service
            .create(
                StoreInput {
                    tags: vec!["Licensed".to_string()],
                    ..input("B")
                },
                author,
            )
            .await
            .unwrap();
        service
            .create(StoreInput { tags: vec![], ..input("C") }, author)
            .await
            .unwrap();

        let all = service.list_by_tag(None).await.unwrap();
        assert_eq!(all.stores.len(), 2);
        assert_eq!(all.tags.len(), 2);

        let wifi = service.list_by_tag(Some("Wifi")).await.unwrap();
        assert_eq!(wifi.stores.len(), 1);
        assert_eq!(wifi.stores[0].name, "A");
    }

    #[tokio::test]
    async fn test_search_by_text_limits_and_orders() {
        let db = MemoryDatabase::new();
        let service = StoreService::new(&db);
        let author = UserId::generate();
        for i in 0..7 {
            service.create(input(&format!("Cafe {i}")), author).await.unwrap();
        }
        service
            .create(
                StoreInput {
                    description: "cafe cafe cafe".to_string(),
                    ..input("Best Cafe")
                },
                author,
            )
            .await
            .unwrap();

        let hits = service.search_by_text("cafe").await.unwrap();
        assert_eq!(hits.len(), SEARCH_LIMIT);
        assert_eq!(hits[0].store.name, "Best Cafe");
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
        assert!(service.search_by_text("   ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_near_limits_and_orders() {
        let db = MemoryDatabase::new();
        let service = StoreService::new(&db);
        let author = UserId::generate();
        // Toronto-ish, stepping ~550 m north each time.
        for i in 0..12 {
            let lat = 43.65 + f64::from(i) * 0.005;
            service
                .create(located(&format!("Store {i}"), -79.38, lat), author)
                .await
                .unwrap();
        }
        service
            .create(located("Far Away", -73.57, 45.50), author)
            .await
            .unwrap();

        let origin = GeoPoint::new(-79.38, 43.65).unwrap();
        let near = service
            .list_near(origin, DEFAULT_MAX_DISTANCE_M)
            .await
            .unwrap();

        assert_eq!(near.len(), NEAR_LIMIT);
        assert_eq!(near[0].name, "Store 0");
        assert!(near.iter().all(|s| s.distance_m <= DEFAULT_MAX_DISTANCE_M));
        assert!(near.windows(2).all(|w| w[0].distance_m <= w[1].distance_m));
    }
}
