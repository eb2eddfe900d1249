//! In-process backend.
//!
//! Implements both repository traits over plain collections behind one
//! `RwLock` each. Semantics match the `PostgreSQL` backend closely enough for
//! the router tests and for running the server without a database; data is
//! lost on restart.
//!
//! Text relevance is a plain term-frequency score: every occurrence of a
//! query word in the store's name or description counts once.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use delicious_core::{GeoPoint, Slug, StoreId, UserId};

use super::{RepositoryError, StoreRepository, UserRepository};
use crate::models::{
    NearbyStore, NewStore, NewUser, ScoredStore, Store, StoreChanges, StoreDetail, TagCount, User,
    UserSummary,
};

/// In-memory store and user tables.
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    stores: RwLock<Vec<Store>>,
    users: RwLock<HashMap<UserId, User>>,
}

impl MemoryDatabase {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

fn text_score(store: &Store, terms: &[String]) -> f64 {
    let hits = words(&store.name)
        .chain(words(&store.description))
        .filter(|w| terms.contains(w))
        .count();
    #[allow(clippy::cast_precision_loss)] // word counts stay far below 2^52
    let score = hits as f64;
    score
}

fn newest_first(stores: &mut [Store]) {
    stores.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[async_trait]
impl StoreRepository for MemoryDatabase {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn insert(&self, new: NewStore) -> Result<Store, RepositoryError> {
        let mut stores = self.stores.write().await;
        if stores.iter().any(|s| s.slug == new.slug) {
            return Err(RepositoryError::Conflict("slug already exists".to_owned()));
        }

        let store = Store {
            id: new.id,
            name: new.fields.name,
            slug: new.slug,
            description: new.fields.description,
            tags: new.fields.tags,
            location: new.fields.location,
            photo: new.fields.photo,
            author: new.author,
            created_at: Utc::now(),
        };
        stores.push(store.clone());
        Ok(store)
    }

    async fn find_by_id(&self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        Ok(self.stores.read().await.iter().find(|s| s.id == id).cloned())
    }

    async fn find_by_slug(&self, slug: &Slug) -> Result<Option<StoreDetail>, RepositoryError> {
        let Some(store) = self
            .stores
            .read()
            .await
            .iter()
            .find(|s| &s.slug == slug)
            .cloned()
        else {
            return Ok(None);
        };

        let author = self.users.read().await.get(&store.author).map(|u| UserSummary {
            id: u.id,
            name: u.name.clone(),
            email: u.email.clone(),
        });

        Ok(Some(StoreDetail { store, author }))
    }

    async fn list_all(&self) -> Result<Vec<Store>, RepositoryError> {
        let mut stores = self.stores.read().await.clone();
        newest_first(&mut stores);
        Ok(stores)
    }

    async fn list_by_tag(&self, tag: Option<&str>) -> Result<Vec<Store>, RepositoryError> {
        let mut stores: Vec<Store> = self
            .stores
            .read()
            .await
            .iter()
            .filter(|s| tag.map_or(!s.tags.is_empty(), |t| s.has_tag(t)))
            .cloned()
            .collect();
        newest_first(&mut stores);
        Ok(stores)
    }

    async fn tag_counts(&self) -> Result<Vec<TagCount>, RepositoryError> {
        let mut counts: HashMap<String, i64> = HashMap::new();
        for store in self.stores.read().await.iter() {
            for tag in &store.tags {
                *counts.entry(tag.clone()).or_insert(0) += 1;
            }
        }

        let mut tags: Vec<TagCount> = counts
            .into_iter()
            .map(|(tag, count)| TagCount { tag, count })
            .collect();
        tags.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
        Ok(tags)
    }

    async fn slug_family(
        &self,
        base: &Slug,
        exclude: Option<StoreId>,
    ) -> Result<Vec<Slug>, RepositoryError> {
        Ok(self
            .stores
            .read()
            .await
            .iter()
            .filter(|s| Some(s.id) != exclude && base.is_family_member(s.slug.as_str()))
            .map(|s| s.slug.clone())
            .collect())
    }

    async fn update(
        &self,
        id: StoreId,
        changes: StoreChanges,
    ) -> Result<Option<Store>, RepositoryError> {
        let mut stores = self.stores.write().await;
        if stores.iter().any(|s| s.id != id && s.slug == changes.slug) {
            return Err(RepositoryError::Conflict("slug already exists".to_owned()));
        }

        let Some(store) = stores.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };

        let fields = changes.fields;
        store.name = fields.name;
        store.slug = changes.slug;
        store.description = fields.description;
        store.tags = fields.tags;
        store.location = fields.location;
        if let Some(photo) = fields.photo {
            store.photo = Some(photo);
        }
        Ok(Some(store.clone()))
    }

    async fn search_text(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredStore>, RepositoryError> {
        let mut terms: Vec<String> = words(query).collect();
        terms.dedup();
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut hits: Vec<ScoredStore> = self
            .stores
            .read()
            .await
            .iter()
            .map(|s| ScoredStore {
                score: text_score(s, &terms),
                store: s.clone(),
            })
            .filter(|hit| hit.score > 0.0)
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| b.store.created_at.cmp(&a.store.created_at))
        });
        hits.truncate(limit);
        Ok(hits)
    }

    async fn near(
        &self,
        point: GeoPoint,
        max_distance_m: f64,
        limit: usize,
    ) -> Result<Vec<NearbyStore>, RepositoryError> {
        let mut nearby: Vec<NearbyStore> = self
            .stores
            .read()
            .await
            .iter()
            .filter_map(|s| {
                let location = s.location.clone()?;
                let distance_m = point.distance_to(&location.coordinates);
                (distance_m <= max_distance_m).then(|| NearbyStore {
                    slug: s.slug.clone(),
                    name: s.name.clone(),
                    description: s.description.clone(),
                    location,
                    photo: s.photo.clone(),
                    distance_m,
                })
            })
            .collect();

        nearby.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));
        nearby.truncate(limit);
        Ok(nearby)
    }
}

#[async_trait]
impl UserRepository for MemoryDatabase {
    async fn insert(&self, new: NewUser) -> Result<User, RepositoryError> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&new.email))
        {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let user = User {
            id: new.id,
            email: new.email,
            name: new.name,
            hearts: Vec::new(),
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn toggle_heart(
        &self,
        user: UserId,
        store: StoreId,
    ) -> Result<Option<User>, RepositoryError> {
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(&user) else {
            return Ok(None);
        };

        if let Some(pos) = user.hearts.iter().position(|h| *h == store) {
            user.hearts.remove(pos);
        } else {
            user.hearts.push(store);
        }
        Ok(Some(user.clone()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::{Location, ValidatedStore};

    fn new_store(name: &str, slug: &str, description: &str, tags: &[&str]) -> NewStore {
        NewStore {
            id: StoreId::generate(),
            slug: Slug::parse(slug).unwrap(),
            author: UserId::generate(),
            fields: ValidatedStore {
                name: name.to_string(),
                description: description.to_string(),
                tags: tags.iter().map(ToString::to_string).collect(),
                location: None,
                photo: None,
            },
        }
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_slug() {
        let db = MemoryDatabase::new();
        StoreRepository::insert(&db, new_store("A", "a", "", &[])).await.unwrap();
        let err = StoreRepository::insert(&db, new_store("A", "a", "", &[])).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_tag_counts_sorted_by_count_then_name() {
        let db = MemoryDatabase::new();
        StoreRepository::insert(&db, new_store("A", "a", "", &["Wifi", "Licensed"])).await.unwrap();
        StoreRepository::insert(&db, new_store("B", "b", "", &["Wifi"])).await.unwrap();
        StoreRepository::insert(&db, new_store("C", "c", "", &["Family Friendly"])).await.unwrap();
        StoreRepository::insert(&db, new_store("D", "d", "", &[])).await.unwrap();

        let tags = db.tag_counts().await.unwrap();
        let flat: Vec<(&str, i64)> = tags.iter().map(|t| (t.tag.as_str(), t.count)).collect();
        assert_eq!(flat, [("Wifi", 2), ("Family Friendly", 1), ("Licensed", 1)]);

        assert_eq!(db.list_by_tag(None).await.unwrap().len(), 3);
        assert_eq!(db.list_by_tag(Some("Wifi")).await.unwrap().len(), 2);
        assert!(db.list_by_tag(Some("Nope")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_text_score_counts_term_occurrences() {
        let db = MemoryDatabase::new();
        StoreRepository::insert(&db, new_store("Cafe Cafe", "cafe-cafe", "the best cafe", &[]))
            .await
            .unwrap();
        StoreRepository::insert(&db, new_store("Corner Cafe", "corner-cafe", "bagels", &[]))
            .await
            .unwrap();
        StoreRepository::insert(&db, new_store("Pub", "pub", "beer", &[])).await.unwrap();

        let hits = db.search_text("CAFE", 5).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].store.slug.as_str(), "cafe-cafe");
        assert!((hits[0].score - 3.0).abs() < f64::EPSILON);
        assert!(db.search_text("  ", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_keeps_photo_when_none_given() {
        let db = MemoryDatabase::new();
        let mut new = new_store("A", "a", "", &[]);
        new.fields.photo = Some("old.jpeg".to_string());
        new.fields.location = Some(Location {
            address: "Somewhere".to_string(),
            coordinates: GeoPoint::new(1.0, 2.0).unwrap(),
        });
        let store = StoreRepository::insert(&db, new).await.unwrap();

        let mut fields = new_store("B", "b", "changed", &[]).fields;
        fields.photo = None;
        let updated = db
            .update(
                store.id,
                StoreChanges {
                    slug: Slug::parse("b").unwrap(),
                    fields,
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.photo.as_deref(), Some("old.jpeg"));
        assert_eq!(updated.slug.as_str(), "b");
        assert!(updated.location.is_none());
    }
}
