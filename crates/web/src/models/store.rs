//! Store domain types and input validation.

use chrono::{DateTime, Utc};
use serde::Serialize;

use delicious_core::{GeoPoint, Slug, StoreId, UserId, ValidationError};

use super::UserSummary;

pub const MISSING_NAME: &str = "Please enter a store name!";
pub const MISSING_ADDRESS: &str = "You must supply an address!";
pub const INVALID_COORDINATES: &str = "You must supply valid coordinates!";

/// A store's street address and map position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    pub address: String,
    /// `[longitude, latitude]`
    pub coordinates: GeoPoint,
}

/// A store (domain type).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Store {
    pub id: StoreId,
    pub name: String,
    pub slug: Slug,
    pub description: String,
    pub tags: Vec<String>,
    pub location: Option<Location>,
    /// Filename under the uploads directory; `None` shows the placeholder.
    pub photo: Option<String>,
    pub author: UserId,
    pub created_at: DateTime<Utc>,
}

impl Store {
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    #[must_use]
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.author == user
    }
}

/// A store with its author resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreDetail {
    pub store: Store,
    /// `None` if the author account no longer exists.
    pub author: Option<UserSummary>,
}

/// A text-search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredStore {
    #[serde(flatten)]
    pub store: Store,
    pub score: f64,
}

/// Reduced projection returned by proximity lookups.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyStore {
    pub slug: Slug,
    pub name: String,
    pub description: String,
    pub location: Location,
    pub photo: Option<String>,
    #[serde(skip)]
    pub distance_m: f64,
}

/// One distinct tag and how many stores carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: i64,
}

/// Result of a tag-filtered listing.
#[derive(Debug, Clone, PartialEq)]
pub struct TagListing {
    pub tags: Vec<TagCount>,
    pub stores: Vec<Store>,
}

/// Raw store fields as submitted by the store form.
///
/// Coordinates are kept as text so that a bad number becomes a validation
/// message instead of a request rejection.
#[derive(Debug, Clone, Default)]
pub struct StoreInput {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub address: String,
    pub longitude: String,
    pub latitude: String,
    /// Filename of a freshly resized upload, if any.
    pub photo: Option<String>,
}

/// Store fields that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedStore {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub location: Option<Location>,
    pub photo: Option<String>,
}

/// Everything the repository needs to insert a store.
#[derive(Debug, Clone)]
pub struct NewStore {
    pub id: StoreId,
    pub slug: Slug,
    pub author: UserId,
    pub fields: ValidatedStore,
}

/// A full replacement of a store's editable fields.
///
/// `fields.photo == None` keeps the current photo.
#[derive(Debug, Clone)]
pub struct StoreChanges {
    pub slug: Slug,
    pub fields: ValidatedStore,
}

impl StoreInput {
    /// Check every rule and normalise the fields.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] listing every failed rule.
    pub fn validate(self) -> Result<ValidatedStore, ValidationError> {
        let mut errors = ValidationError::default();

        let name = self.name.trim().to_owned();
        if name.is_empty() {
            errors.push("name", MISSING_NAME);
        }

        let location = match validate_location(&self.address, &self.longitude, &self.latitude) {
            Ok(location) => location,
            Err(e) => {
                for fe in e.errors() {
                    errors.push(fe.field.clone(), fe.message.clone());
                }
                None
            }
        };

        errors.into_result()?;

        Ok(ValidatedStore {
            name,
            description: self.description.trim().to_owned(),
            tags: normalize_tags(self.tags),
            location,
            photo: self.photo.filter(|p| !p.is_empty()),
        })
    }
}

/// Trim tags, drop blanks, and collapse duplicates keeping first-seen order.
#[must_use]
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_owned());
        }
    }
    out
}

fn validate_location(
    address: &str,
    longitude: &str,
    latitude: &str,
) -> Result<Option<Location>, ValidationError> {
    let address = address.trim();
    let (longitude, latitude) = (longitude.trim(), latitude.trim());

    if address.is_empty() && longitude.is_empty() && latitude.is_empty() {
        return Ok(None);
    }

    let mut errors = ValidationError::default();
    if address.is_empty() {
        errors.push("location.address", MISSING_ADDRESS);
    }

    let point = match (longitude.parse::<f64>(), latitude.parse::<f64>()) {
        (Ok(lng), Ok(lat)) => GeoPoint::new(lng, lat).ok(),
        _ => None,
    };
    if point.is_none() {
        errors.push("location.coordinates", INVALID_COORDINATES);
    }

    errors.into_result()?;

    Ok(point.map(|coordinates| Location {
        address: address.to_owned(),
        coordinates,
    }))
}
