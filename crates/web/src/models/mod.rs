//! Domain models for the store directory.
//!
//! These types represent validated domain objects separate from database row
//! types and template view types.

pub mod session;
pub mod store;
pub mod user;

pub use session::{CurrentUser, keys as session_keys};
pub use store::{
    Location, NearbyStore, NewStore, ScoredStore, Store, StoreChanges, StoreDetail, StoreInput,
    TagCount, TagListing, ValidatedStore,
};
pub use user::{NewUser, User, UserSummary};
