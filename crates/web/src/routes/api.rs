//! JSON endpoints used by the search box, the map and the heart buttons.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use delicious_core::{GeoPoint, StoreId};

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::store::INVALID_COORDINATES;
use crate::models::{NearbyStore, ScoredStore, User};
use crate::services::stores::DEFAULT_MAX_DISTANCE_M;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// `GET /api/search?q=`
#[tracing::instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<ScoredStore>>> {
    let stores = state.store_service().search_by_text(&query.q).await?;
    Ok(Json(stores))
}

/// Coordinates arrive as text so a bad number is a 400 with a useful message.
#[derive(Debug, Deserialize)]
pub struct NearQuery {
    pub lng: Option<String>,
    pub lat: Option<String>,
}

impl NearQuery {
    fn point(&self) -> Option<GeoPoint> {
        let lng = self.lng.as_deref()?.trim().parse().ok()?;
        let lat = self.lat.as_deref()?.trim().parse().ok()?;
        GeoPoint::new(lng, lat).ok()
    }
}

/// `GET /api/stores/near?lng=&lat=`
#[tracing::instrument(skip(state))]
pub async fn near(
    State(state): State<AppState>,
    Query(query): Query<NearQuery>,
) -> Result<Json<Vec<NearbyStore>>> {
    let point = query
        .point()
        .ok_or_else(|| AppError::BadRequest(INVALID_COORDINATES.to_string()))?;

    let stores = state
        .store_service()
        .list_near(point, DEFAULT_MAX_DISTANCE_M)
        .await?;
    Ok(Json(stores))
}

/// `POST /api/stores/{id}/heart`
#[tracing::instrument(skip_all, fields(store_id = %id))]
pub async fn heart(
    State(state): State<AppState>,
    Path(id): Path<String>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<User>> {
    let store: StoreId = id
        .parse()
        .map_err(|_| AppError::NotFound("store".to_string()))?;

    let user = state
        .favorites_service()
        .toggle_favorite(user.id, store)
        .await?;
    Ok(Json(user))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_near_query_point() {
        let q = |lng: &str, lat: &str| NearQuery {
            lng: Some(lng.to_string()),
            lat: Some(lat.to_string()),
        };
        assert!(q("-79.38", "43.65").point().is_some());
        assert!(q("abc", "43.65").point().is_none());
        assert!(q("-79.38", "95").point().is_none());
        assert!(NearQuery { lng: None, lat: None }.point().is_none());
    }
}
