//! Integration tests for Delicious.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p delicious-integration-tests
//! ```
//!
//! Tests drive the complete router (sessions, body limits, file serving and
//! the 404 fallback included) in-process with `tower::ServiceExt::oneshot`,
//! against the in-memory backend. No database or running server is needed.
//!
//! # Test Categories
//!
//! - `stores` - pages, add/edit forms, ownership, tags
//! - `uploads` - photo filtering and resizing
//! - `api` - search, proximity and hearts

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode, header},
    routing::post,
};
use http_body_util::BodyExt;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use serde::de::DeserializeOwned;
use tempfile::TempDir;
use tower::ServiceExt;
use tower_sessions::{MemoryStore, Session};

use delicious_core::{Slug, UserId};
use delicious_web::config::WebConfig;
use delicious_web::db::{MemoryDatabase, StoreRepository, UserRepository};
use delicious_web::middleware::set_current_user;
use delicious_web::models::{CurrentUser, NewUser, Store, User};
use delicious_web::routes::{routes, with_middleware};
use delicious_web::state::AppState;

/// Boundary used by [`MultipartForm`].
const BOUNDARY: &str = "delicious-test-boundary";

/// One running application with its own database, uploads directory and
/// session cookie.
pub struct TestApp {
    router: Router,
    pub db: Arc<MemoryDatabase>,
    pub uploads: TempDir,
    cookie: Option<String>,
}

/// A fully buffered response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: String,
}

impl TestResponse {
    /// Decode the body as JSON.
    ///
    /// # Panics
    ///
    /// Panics if the body is not valid JSON for `T`.
    #[must_use]
    pub fn json<T: DeserializeOwned>(&self) -> T {
        serde_json::from_str(&self.body).expect("Response body is not the expected JSON")
    }
}

impl TestApp {
    /// Build a fresh application.
    ///
    /// # Panics
    ///
    /// Panics if the temporary uploads directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self::with_upload_limit(WebConfig::default().max_upload_bytes)
    }

    /// Build a fresh application that refuses request bodies over
    /// `max_upload_bytes`.
    ///
    /// # Panics
    ///
    /// Panics if the temporary uploads directory cannot be created.
    #[must_use]
    pub fn with_upload_limit(max_upload_bytes: usize) -> Self {
        let uploads = TempDir::new().expect("Failed to create uploads dir");
        let config = WebConfig {
            uploads_dir: uploads.path().to_path_buf(),
            static_dir: PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../web/static")),
            max_upload_bytes,
            ..WebConfig::default()
        };

        let (state, db) = AppState::in_memory(config);
        let router = routes().route("/__test/login/{id}", post(login_as));

        Self {
            router: with_middleware(router, state, MemoryStore::default()),
            db,
            uploads,
            cookie: None,
        }
    }

    /// Insert a user directly into the database.
    ///
    /// # Panics
    ///
    /// Panics if the email is already taken.
    pub async fn create_user(&self, email: &str, name: &str) -> User {
        UserRepository::insert(
            self.db.as_ref(),
            NewUser {
                id: UserId::generate(),
                email: email.to_owned(),
                name: name.to_owned(),
            },
        )
        .await
        .expect("Failed to create test user")
    }

    /// Sign in as `user` for subsequent requests.
    ///
    /// # Panics
    ///
    /// Panics if the login route refuses.
    pub async fn login(&mut self, user: &User) {
        let resp = self.post(&format!("/__test/login/{}", user.id)).await;
        assert_eq!(resp.status, StatusCode::NO_CONTENT, "test login failed");
    }

    /// Forget the session cookie.
    pub fn logout(&mut self) {
        self.cookie = None;
    }

    /// Look a store up by slug, straight from the database.
    ///
    /// # Panics
    ///
    /// Panics if the slug is malformed or the lookup fails.
    pub async fn store(&self, slug: &str) -> Option<Store> {
        let slug = Slug::parse(slug).expect("Invalid slug");
        StoreRepository::find_by_slug(self.db.as_ref(), &slug)
            .await
            .expect("Store lookup failed")
            .map(|detail| detail.store)
    }

    /// Every store in the database.
    ///
    /// # Panics
    ///
    /// Panics if the listing fails.
    pub async fn all_stores(&self) -> Vec<Store> {
        StoreRepository::list_all(self.db.as_ref())
            .await
            .expect("Store listing failed")
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        let request = Request::get(uri)
            .body(Body::empty())
            .expect("Failed to build request");
        self.send(request).await
    }

    pub async fn post(&mut self, uri: &str) -> TestResponse {
        let request = Request::post(uri)
            .body(Body::empty())
            .expect("Failed to build request");
        self.send(request).await
    }

    pub async fn post_form(&mut self, uri: &str, form: MultipartForm) -> TestResponse {
        let request = Request::post(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(form.into_body()))
            .expect("Failed to build request");
        self.send(request).await
    }

    /// Submit the add form and return the new store's slug.
    ///
    /// # Panics
    ///
    /// Panics unless the submission redirects to a store page.
    pub async fn create_store(&mut self, form: MultipartForm) -> String {
        let resp = self.post_form("/add", form).await;
        assert_eq!(resp.status, StatusCode::SEE_OTHER);
        let location = resp.location.expect("Missing redirect");
        location
            .strip_prefix("/store/")
            .unwrap_or_else(|| panic!("Unexpected redirect to {location}"))
            .to_owned()
    }

    async fn send(&mut self, mut request: Request<Body>) -> TestResponse {
        if let Some(cookie) = &self.cookie {
            request.headers_mut().insert(
                header::COOKIE,
                cookie.parse().expect("Invalid cookie header"),
            );
        }

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Router is infallible");

        if let Some(set_cookie) = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
        {
            // A removal cookie has an empty value.
            self.cookie = set_cookie
                .split(';')
                .next()
                .filter(|pair| !pair.ends_with('='))
                .map(str::to_owned);
        }

        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes();

        TestResponse {
            status,
            location,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Stands in for the identity provider's login.
async fn login_as(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    session: Session,
) -> StatusCode {
    match state.users().find_by_id(id).await {
        Ok(Some(user)) => match set_current_user(&session, &CurrentUser::from(&user)).await {
            Ok(()) => StatusCode::NO_CONTENT,
            Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
        },
        Ok(None) => StatusCode::NOT_FOUND,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

enum Part {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        filename: String,
        content_type: String,
        bytes: Vec<u8>,
    },
}

/// Builder for `multipart/form-data` bodies, as the store form sends them.
#[derive(Default)]
pub struct MultipartForm {
    parts: Vec<Part>,
}

impl MultipartForm {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A complete, valid store submission.
    #[must_use]
    pub fn store(name: &str, address: &str, lng: f64, lat: f64) -> Self {
        Self::new()
            .text("name", name)
            .text("description", &format!("All about {name}"))
            .text("location[address]", address)
            .text("location[coordinates][0]", &lng.to_string())
            .text("location[coordinates][1]", &lat.to_string())
    }

    #[must_use]
    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.parts.push(Part::Text {
            name: name.to_owned(),
            value: value.to_owned(),
        });
        self
    }

    #[must_use]
    pub fn tag(self, tag: &str) -> Self {
        self.text("tags", tag)
    }

    #[must_use]
    pub fn file(mut self, name: &str, filename: &str, content_type: &str, bytes: Vec<u8>) -> Self {
        self.parts.push(Part::File {
            name: name.to_owned(),
            filename: filename.to_owned(),
            content_type: content_type.to_owned(),
            bytes,
        });
        self
    }

    fn into_body(self) -> Vec<u8> {
        let mut body = Vec::new();
        for part in self.parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::Text { name, value } => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n")
                            .as_bytes(),
                    );
                    body.extend_from_slice(value.as_bytes());
                }
                Part::File {
                    name,
                    filename,
                    content_type,
                    bytes,
                } => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                             Content-Type: {content_type}\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(&bytes);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }
}

/// Encode a solid-colour PNG of the given size.
///
/// # Panics
///
/// Panics if encoding fails.
#[must_use]
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba([200, 80, 40, 255]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(image)
        .write_to(&mut out, ImageFormat::Png)
        .expect("Failed to encode PNG");
    out.into_inner()
}
