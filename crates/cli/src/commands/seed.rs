//! Seed the database with users and stores from a YAML fixture.
//!
//! ```yaml
//! users:
//!   - email: wes@example.com
//!     name: Wes
//! stores:
//!   - name: Cafe Cuba
//!     description: Cuban coffee and sandwiches
//!     tags: [Wifi, Open Late]
//!     address: 12 Queen St W, Toronto
//!     lng: -79.38
//!     lat: 43.65
//!     author: wes@example.com
//! ```
//!
//! Users that already exist (same email) are reused. Stores go through the
//! same validation and slug rules as the web form, so seeding twice adds
//! `-2` suffixed copies rather than failing.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{error, info, warn};

use delicious_core::UserId;
use delicious_web::db::{self, PgStoreRepository, PgUserRepository, RepositoryError, UserRepository};
use delicious_web::models::{NewUser, StoreInput};
use delicious_web::services::StoreService;

/// Root of a seed file.
#[derive(Debug, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub users: Vec<FixtureUser>,
    #[serde(default)]
    pub stores: Vec<FixtureStore>,
}

#[derive(Debug, Deserialize)]
pub struct FixtureUser {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct FixtureStore {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub address: String,
    pub lng: f64,
    pub lat: f64,
    /// Email of one of the fixture's users.
    pub author: String,
}

impl FixtureStore {
    /// The form input this entry would have been submitted as.
    fn into_input(self) -> StoreInput {
        StoreInput {
            name: self.name,
            description: self.description,
            tags: self.tags,
            address: self.address,
            longitude: self.lng.to_string(),
            latitude: self.lat.to_string(),
            photo: None,
        }
    }
}

impl Fixture {
    /// Check that every store names a known author.
    fn unknown_authors(&self) -> Vec<String> {
        self.stores
            .iter()
            .filter(|s| !self.users.iter().any(|u| u.email.eq_ignore_ascii_case(&s.author)))
            .map(|s| format!("{}: unknown author {}", s.name, s.author))
            .collect()
    }
}

/// Parse a seed file's contents.
///
/// # Errors
///
/// Returns an error if the YAML is malformed or a store names an author the
/// file does not define.
pub fn parse_fixture(content: &str) -> Result<Fixture, Box<dyn std::error::Error>> {
    let fixture: Fixture = serde_yaml::from_str(content)?;

    let problems = fixture.unknown_authors();
    if !problems.is_empty() {
        for problem in &problems {
            error!("  - {problem}");
        }
        return Err(format!("{} validation errors found", problems.len()).into());
    }

    Ok(fixture)
}

/// Seed users and stores from `file_path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, the database is
/// unreachable, or a store fails validation.
pub async fn stores(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let database_url = super::database_url()?;

    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading fixture");
    let content = tokio::fs::read_to_string(path).await?;
    let fixture = parse_fixture(&content)?;
    info!(
        users = fixture.users.len(),
        stores = fixture.stores.len(),
        "Parsed fixture"
    );

    let pool = db::create_pool(&database_url).await?;
    info!("Connected to database");

    let users = PgUserRepository::new(pool.clone());
    let mut authors: HashMap<String, UserId> = HashMap::new();
    for user in fixture.users {
        let (id, email) = ensure_user(&users, user).await?;
        authors.insert(email, id);
    }

    let repo = PgStoreRepository::new(pool);
    let service = StoreService::new(&repo);
    let mut created = 0_usize;
    for store in fixture.stores {
        let Some(&author) = authors.get(&store.author.to_lowercase()) else {
            warn!(store = %store.name, "Skipping store with unknown author");
            continue;
        };
        let name = store.name.clone();
        let saved = service
            .create(store.into_input(), author)
            .await
            .map_err(|e| format!("{name}: {e}"))?;
        info!(slug = %saved.slug, "Created store");
        created += 1;
    }

    info!("Seeding complete!");
    info!("  Users: {}", authors.len());
    info!("  Stores created: {created}");
    Ok(())
}

/// Insert a user, or find the existing account with the same email.
///
/// Returns the user's ID and lowercased email.
async fn ensure_user(
    users: &PgUserRepository,
    user: FixtureUser,
) -> Result<(UserId, String), Box<dyn std::error::Error>> {
    let email = user.email.to_lowercase();
    let new = NewUser {
        id: UserId::generate(),
        email: email.clone(),
        name: user.name,
    };

    match users.insert(new).await {
        Ok(saved) => {
            info!(email = %email, "Created user");
            Ok((saved.id, email))
        }
        Err(RepositoryError::Conflict(_)) => {
            let existing = users
                .find_by_email(&email)
                .await?
                .ok_or_else(|| format!("user {email} conflicted but was not found"))?;
            info!(email = %email, "User already exists");
            Ok((existing.id, email))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SAMPLE: &str = "
users:
  - email: Wes@Example.com
    name: Wes
stores:
  - name: Cafe Cuba
    tags: [Wifi]
    address: 12 Queen St W
    lng: -79.38
    lat: 43.65
    author: wes@example.com
";

    #[test]
    fn test_parse_fixture() {
        let fixture = parse_fixture(SAMPLE).unwrap();
        assert_eq!(fixture.users.len(), 1);
        assert_eq!(fixture.stores.len(), 1);
        assert!(fixture.stores[0].description.is_empty());
    }

    #[test]
    fn test_unknown_author_rejected() {
        let content = SAMPLE.replace("author: wes@example.com", "author: nobody@example.com");
        assert!(parse_fixture(&content).is_err());
    }

    #[test]
    fn test_fixture_store_becomes_valid_input() {
        let mut fixture = parse_fixture(SAMPLE).unwrap();
        let input = fixture.stores.remove(0).into_input();
        assert_eq!(input.longitude, "-79.38");

        let validated = input.validate().unwrap();
        let location = validated.location.unwrap();
        assert!((location.coordinates.latitude() - 43.65).abs() < 1e-9);
    }

    #[test]
    fn test_bundled_fixture_parses() {
        let content = include_str!("../../fixtures/stores.yaml");
        let fixture = parse_fixture(content).unwrap();
        assert!(!fixture.stores.is_empty());
    }
}
