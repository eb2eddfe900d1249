//! Map page. The page itself is static; stores are fetched from
//! `/api/stores/near` by the browser.

use askama::Template;
use askama_web::WebTemplate;

use super::views::PageContext;
use crate::middleware::{Flash, OptionalAuth};

#[derive(Template, WebTemplate)]
#[template(path = "map.html")]
pub struct MapTemplate {
    pub page: PageContext,
}

/// `GET /map`
pub async fn page(OptionalAuth(user): OptionalAuth, flash: Flash) -> MapTemplate {
    MapTemplate {
        page: PageContext::new("Map", user, flash.take().await),
    }
}
