//! Store repository for `PostgreSQL`.
//!
//! Full-text search uses an `english` tsvector over name and description.
//! Proximity is the haversine distance computed on the `longitude`/`latitude`
//! columns, so no PostGIS extension is required.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use delicious_core::{EARTH_RADIUS_M, GeoPoint, Slug, StoreId, UserId};

use super::{RepositoryError, StoreRepository, conflict_on_unique};
use crate::models::{
    Location, NearbyStore, NewStore, ScoredStore, Store, StoreChanges, StoreDetail, TagCount,
    UserSummary,
};

const STORE_COLUMNS: &str = "s.id, s.name, s.slug, s.description, s.tags, s.address, \
     s.longitude, s.latitude, s.photo, s.author, s.created_at";

const TEXT_VECTOR: &str = "to_tsvector('english', s.name || ' ' || s.description)";

/// Repository for store database operations.
#[derive(Clone)]
pub struct PgStoreRepository {
    pool: PgPool,
}

impl PgStoreRepository {
    /// Create a new store repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_stores(&self, sql: &str) -> Result<Vec<Store>, RepositoryError> {
        sqlx::query_as::<_, StoreRow>(sql)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Store::try_from)
            .collect()
    }
}

#[derive(sqlx::FromRow)]
struct StoreRow {
    id: StoreId,
    name: String,
    slug: String,
    description: String,
    tags: Vec<String>,
    address: Option<String>,
    longitude: Option<f64>,
    latitude: Option<f64>,
    photo: Option<String>,
    author: UserId,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct StoreDetailRow {
    #[sqlx(flatten)]
    store: StoreRow,
    author_name: Option<String>,
    author_email: Option<String>,
}

#[derive(sqlx::FromRow)]
struct ScoredRow {
    #[sqlx(flatten)]
    store: StoreRow,
    score: f64,
}

#[derive(sqlx::FromRow)]
struct NearbyRow {
    slug: String,
    name: String,
    description: String,
    address: Option<String>,
    longitude: f64,
    latitude: f64,
    photo: Option<String>,
    distance_m: f64,
}

#[derive(sqlx::FromRow)]
struct TagCountRow {
    tag: String,
    count: i64,
}

fn parse_slug(raw: &str) -> Result<Slug, RepositoryError> {
    Slug::parse(raw)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid slug {raw:?}: {e}")))
}

fn parse_location(
    address: Option<String>,
    longitude: Option<f64>,
    latitude: Option<f64>,
) -> Result<Option<Location>, RepositoryError> {
    match (longitude, latitude) {
        (Some(lng), Some(lat)) => {
            let coordinates = GeoPoint::new(lng, lat).map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid coordinates in database: {e}"))
            })?;
            Ok(Some(Location {
                address: address.unwrap_or_default(),
                coordinates,
            }))
        }
        (None, None) => Ok(None),
        _ => Err(RepositoryError::DataCorruption(
            "store has only one coordinate".to_owned(),
        )),
    }
}

impl TryFrom<StoreRow> for Store {
    type Error = RepositoryError;

    fn try_from(r: StoreRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            slug: parse_slug(&r.slug)?,
            location: parse_location(r.address, r.longitude, r.latitude)?,
            name: r.name,
            description: r.description,
            tags: r.tags,
            photo: r.photo,
            author: r.author,
            created_at: r.created_at,
        })
    }
}

fn location_columns(location: Option<&Location>) -> (Option<&str>, Option<f64>, Option<f64>) {
    location.map_or((None, None, None), |l| {
        (
            Some(l.address.as_str()),
            Some(l.coordinates.longitude()),
            Some(l.coordinates.latitude()),
        )
    })
}

/// Build an OR-combined `to_tsquery` expression from free text.
///
/// Only alphanumeric words survive, so the result never contains tsquery
/// operators supplied by the user.
fn any_term_tsquery(query: &str) -> Option<String> {
    let terms: Vec<String> = query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect();
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" | "))
    }
}

fn to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[async_trait]
impl StoreRepository for PgStoreRepository {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert(&self, new: NewStore) -> Result<Store, RepositoryError> {
        let (address, longitude, latitude) = location_columns(new.fields.location.as_ref());
        let sql = format!(
            "INSERT INTO stores AS s
                 (id, name, slug, description, tags, address, longitude, latitude, photo, author)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {STORE_COLUMNS}"
        );

        let row = sqlx::query_as::<_, StoreRow>(&sql)
            .bind(new.id)
            .bind(&new.fields.name)
            .bind(new.slug.as_str())
            .bind(&new.fields.description)
            .bind(&new.fields.tags)
            .bind(address)
            .bind(longitude)
            .bind(latitude)
            .bind(new.fields.photo.as_deref())
            .bind(new.author)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, "slug"))?;

        row.try_into()
    }

    async fn find_by_id(&self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        let sql = format!("SELECT {STORE_COLUMNS} FROM stores s WHERE s.id = $1");
        sqlx::query_as::<_, StoreRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Store::try_from)
            .transpose()
    }

    async fn find_by_slug(&self, slug: &Slug) -> Result<Option<StoreDetail>, RepositoryError> {
        let sql = format!(
            "SELECT {STORE_COLUMNS}, u.name AS author_name, u.email AS author_email
             FROM stores s
             LEFT JOIN users u ON u.id = s.author
             WHERE s.slug = $1"
        );
        let Some(row) = sqlx::query_as::<_, StoreDetailRow>(&sql)
            .bind(slug.as_str())
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let author = match (row.author_name, row.author_email) {
            (Some(name), Some(email)) => Some(UserSummary {
                id: row.store.author,
                name,
                email,
            }),
            _ => None,
        };

        Ok(Some(StoreDetail {
            store: row.store.try_into()?,
            author,
        }))
    }

    async fn list_all(&self) -> Result<Vec<Store>, RepositoryError> {
        self.fetch_stores(&format!(
            "SELECT {STORE_COLUMNS} FROM stores s ORDER BY s.created_at DESC"
        ))
        .await
    }

    async fn list_by_tag(&self, tag: Option<&str>) -> Result<Vec<Store>, RepositoryError> {
        let Some(tag) = tag else {
            return self
                .fetch_stores(&format!(
                    "SELECT {STORE_COLUMNS} FROM stores s
                     WHERE cardinality(s.tags) > 0
                     ORDER BY s.created_at DESC"
                ))
                .await;
        };

        let sql = format!(
            "SELECT {STORE_COLUMNS} FROM stores s
             WHERE $1 = ANY(s.tags)
             ORDER BY s.created_at DESC"
        );
        sqlx::query_as::<_, StoreRow>(&sql)
            .bind(tag)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Store::try_from)
            .collect()
    }

    async fn tag_counts(&self) -> Result<Vec<TagCount>, RepositoryError> {
        let rows = sqlx::query_as::<_, TagCountRow>(
            "SELECT tag, COUNT(*) AS count
             FROM stores, unnest(tags) AS tag
             GROUP BY tag
             ORDER BY count DESC, tag ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| TagCount {
                tag: r.tag,
                count: r.count,
            })
            .collect())
    }

    async fn slug_family(
        &self,
        base: &Slug,
        exclude: Option<StoreId>,
    ) -> Result<Vec<Slug>, RepositoryError> {
        let slugs: Vec<String> = sqlx::query_scalar(
            "SELECT slug FROM stores
             WHERE slug ~ $1 AND ($2::uuid IS NULL OR id <> $2)",
        )
        .bind(base.family_pattern())
        .bind(exclude)
        .fetch_all(&self.pool)
        .await?;

        slugs.iter().map(|raw| parse_slug(raw)).collect()
    }

    async fn update(
        &self,
        id: StoreId,
        changes: StoreChanges,
    ) -> Result<Option<Store>, RepositoryError> {
        let (address, longitude, latitude) = location_columns(changes.fields.location.as_ref());
        let sql = format!(
            "UPDATE stores AS s SET
                 name = $2, slug = $3, description = $4, tags = $5,
                 address = $6, longitude = $7, latitude = $8,
                 photo = COALESCE($9, s.photo)
             WHERE s.id = $1
             RETURNING {STORE_COLUMNS}"
        );

        sqlx::query_as::<_, StoreRow>(&sql)
            .bind(id)
            .bind(&changes.fields.name)
            .bind(changes.slug.as_str())
            .bind(&changes.fields.description)
            .bind(&changes.fields.tags)
            .bind(address)
            .bind(longitude)
            .bind(latitude)
            .bind(changes.fields.photo.as_deref())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, "slug"))?
            .map(Store::try_from)
            .transpose()
    }

    async fn search_text(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredStore>, RepositoryError> {
        let Some(tsquery) = any_term_tsquery(query) else {
            return Ok(Vec::new());
        };

        let sql = format!(
            "SELECT {STORE_COLUMNS}, ts_rank({TEXT_VECTOR}, q)::float8 AS score
             FROM stores s, to_tsquery('english', $1) AS q
             WHERE {TEXT_VECTOR} @@ q
             ORDER BY score DESC, s.created_at DESC
             LIMIT $2"
        );

        sqlx::query_as::<_, ScoredRow>(&sql)
            .bind(tsquery)
            .bind(to_i64(limit))
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|r| {
                Ok(ScoredStore {
                    score: r.score,
                    store: r.store.try_into()?,
                })
            })
            .collect()
    }

    async fn near(
        &self,
        point: GeoPoint,
        max_distance_m: f64,
        limit: usize,
    ) -> Result<Vec<NearbyStore>, RepositoryError> {
        let rows = sqlx::query_as::<_, NearbyRow>(
            "SELECT * FROM (
                 SELECT slug, name, description, address, longitude, latitude, photo,
                        2 * $3 * asin(least(1.0, sqrt(
                            power(sin(radians(latitude - $2) / 2), 2)
                            + cos(radians($2)) * cos(radians(latitude))
                              * power(sin(radians(longitude - $1) / 2), 2)
                        ))) AS distance_m
                 FROM stores
                 WHERE longitude IS NOT NULL AND latitude IS NOT NULL
             ) nearby
             WHERE distance_m <= $4
             ORDER BY distance_m ASC
             LIMIT $5",
        )
        .bind(point.longitude())
        .bind(point.latitude())
        .bind(EARTH_RADIUS_M)
        .bind(max_distance_m)
        .bind(to_i64(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                let location = parse_location(r.address, Some(r.longitude), Some(r.latitude))?
                    .ok_or_else(|| RepositoryError::DataCorruption("missing location".into()))?;
                Ok(NearbyStore {
                    slug: parse_slug(&r.slug)?,
                    name: r.name,
                    description: r.description,
                    location,
                    photo: r.photo,
                    distance_m: r.distance_m,
                })
            })
            .collect()
    }
}
