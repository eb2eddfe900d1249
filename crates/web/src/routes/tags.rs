//! Tag browsing.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, State};

use super::viewer;
use super::views::{PageContext, StoreView};
use crate::error::Result;
use crate::middleware::{Flash, OptionalAuth};
use crate::models::TagCount;
use crate::state::AppState;

/// Tag page: every tag with its count, plus the matching stores.
#[derive(Template, WebTemplate)]
#[template(path = "tag.html")]
pub struct TagTemplate {
    pub page: PageContext,
    pub tags: Vec<TagCount>,
    /// Selected tag, if any.
    pub tag: Option<String>,
    pub stores: Vec<StoreView>,
}

impl TagTemplate {
    fn is_active(&self, tag: &str) -> bool {
        self.tag.as_deref() == Some(tag)
    }
}

/// `GET /tags` and `GET /tags/{tag}`
#[tracing::instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    tag: Option<Path<String>>,
    OptionalAuth(user): OptionalAuth,
    flash: Flash,
) -> Result<TagTemplate> {
    let tag = tag.map(|Path(t)| t);
    let listing = state.store_service().list_by_tag(tag.as_deref()).await?;
    let viewer = viewer(&state, user.as_ref()).await?;

    let title = tag.clone().unwrap_or_else(|| "Tags".to_string());

    Ok(TagTemplate {
        page: PageContext::new(title, user, flash.take().await),
        tags: listing.tags,
        tag,
        stores: listing
            .stores
            .iter()
            .map(|s| StoreView::new(s, viewer.as_ref()))
            .collect(),
    })
}
