//! Template view types shared by the page handlers.

use delicious_core::StoreId;

use crate::middleware::FlashMessage;
use crate::models::{CurrentUser, Store, User};

/// Shown when a store has no photo.
pub const PLACEHOLDER_PHOTO: &str = "/static/images/store.svg";

/// Tags offered on the store form.
pub const TAG_CHOICES: [&str; 5] = [
    "Wifi",
    "Open Late",
    "Family Friendly",
    "Vegetarian",
    "Licensed",
];

/// Data every page layout needs.
pub struct PageContext {
    pub title: String,
    pub user: Option<CurrentUser>,
    pub flashes: Vec<FlashMessage>,
}

impl PageContext {
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        user: Option<CurrentUser>,
        flashes: Vec<FlashMessage>,
    ) -> Self {
        Self {
            title: title.into(),
            user,
            flashes,
        }
    }
}

/// URL of a stored photo, or the placeholder.
#[must_use]
pub fn photo_url(photo: Option<&str>) -> String {
    photo.map_or_else(|| PLACEHOLDER_PHOTO.to_string(), |p| format!("/uploads/{p}"))
}

/// A store as shown on cards and the detail page.
pub struct StoreView {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub tags: Vec<String>,
    pub photo_url: String,
    pub address: Option<String>,
    /// `"lat, lng"` for display.
    pub position: Option<String>,
    /// Signed-in author may edit.
    pub editable: bool,
    pub hearted: bool,
}

impl StoreView {
    /// Build a view for `store` as seen by `viewer`.
    #[must_use]
    pub fn new(store: &Store, viewer: Option<&User>) -> Self {
        let hearted = viewer.is_some_and(|u| u.has_hearted(store.id));
        let editable = viewer.is_some_and(|u| store.is_owned_by(u.id));
        Self {
            id: store.id.to_string(),
            name: store.name.clone(),
            slug: store.slug.to_string(),
            description: store.description.clone(),
            tags: store.tags.clone(),
            photo_url: photo_url(store.photo.as_deref()),
            address: store.location.as_ref().map(|l| l.address.clone()),
            position: store.location.as_ref().map(|l| {
                format!(
                    "{:.5}, {:.5}",
                    l.coordinates.latitude(),
                    l.coordinates.longitude()
                )
            }),
            editable,
            hearted,
        }
    }

    /// First 25 words of the description.
    #[must_use]
    pub fn excerpt(&self) -> String {
        let words: Vec<&str> = self.description.split_whitespace().collect();
        if words.len() <= 25 {
            words.join(" ")
        } else {
            format!("{}...", words.iter().take(25).copied().collect::<Vec<_>>().join(" "))
        }
    }
}

/// Values pre-filled into the store form.
#[derive(Default)]
pub struct StoreForm {
    /// `None` when adding a new store.
    pub id: Option<StoreId>,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub address: String,
    pub longitude: String,
    pub latitude: String,
    pub photo_url: Option<String>,
}

impl StoreForm {
    #[must_use]
    pub fn from_store(store: &Store) -> Self {
        let (address, longitude, latitude) = store.location.as_ref().map_or_else(
            || (String::new(), String::new(), String::new()),
            |l| {
                (
                    l.address.clone(),
                    l.coordinates.longitude().to_string(),
                    l.coordinates.latitude().to_string(),
                )
            },
        );
        Self {
            id: Some(store.id),
            name: store.name.clone(),
            description: store.description.clone(),
            tags: store.tags.clone(),
            address,
            longitude,
            latitude,
            photo_url: store.photo.as_deref().map(|p| photo_url(Some(p))),
        }
    }

    /// Form target: `/add` for a new store, `/add/{id}` when editing.
    #[must_use]
    pub fn action(&self) -> String {
        self.id.map_or_else(|| "/add".to_string(), |id| format!("/add/{id}"))
    }

    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_photo_url() {
        assert_eq!(photo_url(None), PLACEHOLDER_PHOTO);
        assert_eq!(photo_url(Some("a.jpeg")), "/uploads/a.jpeg");
    }

    #[test]
    fn test_form_action() {
        assert_eq!(StoreForm::default().action(), "/add");
        let id = StoreId::generate();
        let form = StoreForm {
            id: Some(id),
            ..StoreForm::default()
        };
        assert_eq!(form.action(), format!("/add/{id}"));
    }
}
