//! Core types for Delicious.

pub mod geo;
pub mod id;
pub mod slug;
pub mod validation;

pub use geo::{EARTH_RADIUS_M, GeoError, GeoPoint, haversine_distance_m};
pub use id::*;
pub use slug::{Slug, SlugError, next_available_slug, slugify};
pub use validation::{FieldError, ValidationError};
