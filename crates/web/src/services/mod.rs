//! Business logic services.
//!
//! # Services
//!
//! - `stores` - store creation, listing, editing, search and proximity
//! - `favorites` - toggling a store in a user's hearts
//! - `uploads` - photo upload filter and resizer
//!
//! Services borrow repositories as trait objects and are cheap to build per
//! request:
//!
//! ```rust,ignore
//! let stores = StoreService::new(state.stores());
//! let store = stores.create(input, user.id).await?;
//! ```

pub mod favorites;
pub mod stores;
pub mod uploads;

use thiserror::Error;

use delicious_core::{UserId, ValidationError};

use crate::db::RepositoryError;
use crate::models::Store;

pub use favorites::FavoritesService;
pub use stores::StoreService;
pub use uploads::{ImageResizer, PhotoUpload, UploadError};

/// Message shown when someone other than the author tries to edit a store.
pub const NOT_OWNER: &str = "You must own the store in order to edit it!";

/// A caller tried to change something they do not own.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct AuthorizationError(pub &'static str);

/// Errors returned by service operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Input failed one or more rules.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Requester is not allowed to perform the operation.
    #[error("not authorized: {0}")]
    Authorization(#[from] AuthorizationError),

    /// Referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Database failure.
    #[error("upstream error: {0}")]
    Upstream(#[from] RepositoryError),
}

/// Fail unless `user` authored `store`.
///
/// # Errors
///
/// Returns [`AuthorizationError`] carrying [`NOT_OWNER`].
pub fn confirm_owner(store: &Store, user: UserId) -> Result<(), AuthorizationError> {
    if store.is_owned_by(user) {
        Ok(())
    } else {
        Err(AuthorizationError(NOT_OWNER))
    }
}
