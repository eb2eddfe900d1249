//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /, /stores              - Store listing
//! GET  /store/{slug}           - Store detail (404 page if absent)
//! GET  /add                    - Add store form (auth)
//! POST /add                    - Create store (auth, multipart)
//! GET  /stores/{id}/edit       - Edit form (auth, author only)
//! POST /add/{id}               - Update store (auth, author only, multipart)
//! GET  /tags, /tags/{tag}      - Tag browser
//! GET  /map                    - Map page
//!
//! # JSON API
//! GET  /api/search?q=          - Text search, at most 5 hits
//! GET  /api/stores/near        - Stores within 10 km of ?lng=&lat=, at most 10
//! POST /api/stores/{id}/heart  - Toggle a heart (auth)
//!
//! # Operations
//! GET  /health                 - Liveness
//! GET  /health/ready           - Readiness (database ping)
//! GET  /uploads/*, /static/*   - Files
//! ```

pub mod api;
pub mod errors;
pub mod map;
pub mod stores;
pub mod tags;
pub mod views;

use axum::{
    Router,
    extract::{DefaultBodyLimit, Request, State},
    http::StatusCode,
    middleware::from_fn,
    routing::{get, post},
};
use tower_http::{limit::RequestBodyLimitLayer, services::ServeDir, trace::TraceLayer};
use tower_sessions::SessionStore;

use crate::error::Result;
use crate::middleware::{create_session_layer, request_id_middleware};
use crate::models::{CurrentUser, User};
use crate::state::AppState;

/// Create the store page routes.
pub fn store_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(stores::index))
        .route("/stores", get(stores::index))
        .route("/store/{slug}", get(stores::show))
        .route("/add", get(stores::new_store).post(stores::create))
        .route("/add/{id}", post(stores::update))
        .route("/stores/{id}/edit", get(stores::edit))
        .route("/tags", get(tags::index))
        .route("/tags/{tag}", get(tags::index))
        .route("/map", get(map::page))
}

/// Create the JSON API routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/search", get(api::search))
        .route("/stores/near", get(api::near))
        .route("/stores/{id}/heart", post(api::heart))
}

/// Create all application routes (no middleware).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(store_routes())
        .nest("/api", api_routes())
}

/// Wrap `router` with files, the 404 fallback, sessions, body limits,
/// request IDs and tracing, then bind the state.
pub fn with_middleware<S>(router: Router<AppState>, state: AppState, session_store: S) -> Router
where
    S: SessionStore + Clone,
{
    let config = state.config().clone();
    let session_layer = create_session_layer(session_store, &config);

    router
        .nest_service("/uploads", ServeDir::new(&config.uploads_dir))
        .nest_service("/static", ServeDir::new(&config.static_dir))
        .fallback(errors::not_found)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.max_upload_bytes))
        .layer(session_layer)
        .layer(from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
            )
        }))
        .with_state(state)
}

/// The complete application router.
pub fn build_router<S>(state: AppState, session_store: S) -> Router
where
    S: SessionStore + Clone,
{
    with_middleware(routes(), state, session_store)
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.stores().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Load the full user record behind a session identity, for heart state.
async fn viewer(state: &AppState, user: Option<&CurrentUser>) -> Result<Option<User>> {
    match user {
        Some(user) => Ok(state.users().find_by_id(user.id).await?),
        None => Ok(None),
    }
}
