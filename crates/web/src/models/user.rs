//! User domain types.

use serde::Serialize;

use delicious_core::{StoreId, UserId};

use super::CurrentUser;

/// A user (domain type).
///
/// Accounts are managed by the identity provider; this application only
/// reads them and maintains the `hearts` set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    /// Stores this user has hearted, without duplicates.
    pub hearts: Vec<StoreId>,
}

impl User {
    #[must_use]
    pub fn has_hearted(&self, store: StoreId) -> bool {
        self.hearts.contains(&store)
    }
}

/// Data needed to create a user (seeding only).
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: UserId,
    pub email: String,
    pub name: String,
}

/// The author fields shown next to a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
        }
    }
}
