//! Fallback pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::{http::StatusCode, response::IntoResponse};

use super::views::PageContext;
use crate::middleware::OptionalAuth;

/// 404 page.
#[derive(Template, WebTemplate)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub page: PageContext,
}

impl NotFoundTemplate {
    /// The 404 page without session data, for use from error conversion.
    #[must_use]
    pub fn bare() -> Self {
        Self {
            page: PageContext::new("Not Found", None, Vec::new()),
        }
    }
}

/// Router fallback.
pub async fn not_found(OptionalAuth(user): OptionalAuth) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        NotFoundTemplate {
            page: PageContext::new("Not Found", user, Vec::new()),
        },
    )
}
