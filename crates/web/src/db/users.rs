//! User repository for `PostgreSQL`.

use async_trait::async_trait;
use sqlx::PgPool;

use delicious_core::{StoreId, UserId};

use super::{RepositoryError, UserRepository, conflict_on_unique};
use crate::models::{NewUser, User};

/// Repository for user database operations.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    email: String,
    name: String,
    hearts: Vec<StoreId>,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        Self {
            id: r.id,
            email: r.email,
            name: r.name,
            hearts: r.hearts,
        }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn insert(&self, user: NewUser) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (id, email, name)
             VALUES ($1, $2, $3)
             RETURNING id, email, name, hearts",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "email"))?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, name, hearts FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, name, hearts FROM users WHERE lower(email) = lower($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn toggle_heart(
        &self,
        user: UserId,
        store: StoreId,
    ) -> Result<Option<User>, RepositoryError> {
        // Single statement: concurrent toggles never lose an update.
        let row = sqlx::query_as::<_, UserRow>(
            "UPDATE users SET hearts = CASE
                 WHEN $2 = ANY(hearts) THEN array_remove(hearts, $2)
                 ELSE array_append(hearts, $2)
             END
             WHERE id = $1
             RETURNING id, email, name, hearts",
        )
        .bind(user)
        .bind(store)
        .fetch_optional(&self.pool)
        .await?;

        tracing::debug!(%user, %store, found = row.is_some(), "Toggled heart");

        Ok(row.map(User::from))
    }
}
