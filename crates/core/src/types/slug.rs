//! URL slugs derived from store names.
//!
//! A slug is the lowercase, hyphen-separated ASCII form of a name. Slugs must
//! be unique across stores; collisions are resolved by appending a numeric
//! suffix, see [`next_available_slug`].

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when building a [`Slug`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SlugError {
    /// Nothing slug-worthy was left after normalisation.
    #[error("slug cannot be empty")]
    Empty,
    /// The input contains characters a slug may not hold.
    #[error("slug may only contain lowercase letters, digits and single hyphens")]
    InvalidCharacters,
}

/// A URL-safe store identifier.
///
/// ## Constraints
///
/// - Non-empty
/// - Only `a-z`, `0-9` and `-`
/// - No leading, trailing, or doubled hyphens
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    /// Parse an already-normalised slug (e.g. from a URL path).
    ///
    /// # Errors
    ///
    /// Returns [`SlugError`] if the input is empty or not in normal form.
    pub fn parse(s: &str) -> Result<Self, SlugError> {
        if s.is_empty() {
            return Err(SlugError::Empty);
        }
        let well_formed = s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
            && !s.starts_with('-')
            && !s.ends_with('-')
            && !s.contains("--");
        if !well_formed {
            return Err(SlugError::InvalidCharacters);
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if `candidate` is this slug or this slug followed by a
    /// numeric collision suffix (`base`, `base-2`, `base-17`, and also the
    /// bare `base-`).
    #[must_use]
    pub fn is_family_member(&self, candidate: &str) -> bool {
        candidate.strip_prefix(self.as_str()).is_some_and(|rest| {
            rest.is_empty()
                || rest
                    .strip_prefix('-')
                    .is_some_and(|n| n.chars().all(|c| c.is_ascii_digit()))
        })
    }

    /// The collision number `candidate` occupies in this slug's family.
    ///
    /// The base slug (and a bare `base-`) is number 1; `base-7` is 7.
    /// Returns `None` for non-members and for suffixes too large to count.
    #[must_use]
    pub fn family_suffix(&self, candidate: &str) -> Option<u64> {
        if !self.is_family_member(candidate) {
            return None;
        }
        match candidate.strip_prefix(self.as_str())?.trim_start_matches('-') {
            "" => Some(1),
            digits => digits.parse().ok(),
        }
    }

    /// Regular expression matching the same family as [`Self::is_family_member`],
    /// for use in database queries.
    #[must_use]
    pub fn family_pattern(&self) -> String {
        format!("^{}(-[0-9]*)?$", self.0)
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Slug {
    type Error = SlugError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Slug> for String {
    fn from(slug: Slug) -> Self {
        slug.0
    }
}

/// Derive a slug from a display name.
///
/// ASCII letters and digits are kept (lowercased); every run of anything
/// else collapses into a single hyphen.
///
/// # Errors
///
/// Returns [`SlugError::Empty`] if the name has no ASCII alphanumerics.
pub fn slugify(name: &str) -> Result<Slug, SlugError> {
    let mut out = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    if out.is_empty() {
        return Err(SlugError::Empty);
    }
    Ok(Slug(out))
}

/// Pick a slug for `base` that none of `family` already holds.
///
/// With no collisions the base slug is used as is. Otherwise the suffix is
/// one past the highest number in use, so the second "Tim Hortons" becomes
/// `tim-hortons-2`, and a family of `tim-hortons-2` alone (the original was
/// renamed) yields `tim-hortons-3`.
#[must_use]
pub fn next_available_slug<'a>(base: Slug, family: impl IntoIterator<Item = &'a Slug>) -> Slug {
    let highest = family
        .into_iter()
        .filter_map(|slug| base.family_suffix(slug.as_str()))
        .max();

    match highest {
        None => base,
        Some(n) => Slug(format!("{}-{}", base.0, n.saturating_add(1))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Tim Hortons").unwrap().as_str(), "tim-hortons");
        assert_eq!(
            slugify("  Café & Bar -- Downtown!  ").unwrap().as_str(),
            "caf-bar-downtown"
        );
        assert_eq!(slugify("123 Main").unwrap().as_str(), "123-main");
    }

    #[test]
    fn test_slugify_empty() {
        assert_eq!(slugify(""), Err(SlugError::Empty));
        assert_eq!(slugify("!!! ???"), Err(SlugError::Empty));
    }

    #[test]
    fn test_parse_rejects_non_normal_form() {
        assert!(Slug::parse("tim-hortons").is_ok());
        assert_eq!(Slug::parse("Tim"), Err(SlugError::InvalidCharacters));
        assert_eq!(Slug::parse("-tim"), Err(SlugError::InvalidCharacters));
        assert_eq!(Slug::parse("tim--h"), Err(SlugError::InvalidCharacters));
        assert_eq!(Slug::parse(""), Err(SlugError::Empty));
    }

    #[test]
    fn test_family_membership() {
        let base = Slug::parse("tim-hortons").unwrap();
        assert!(base.is_family_member("tim-hortons"));
        assert!(base.is_family_member("tim-hortons-2"));
        assert!(base.is_family_member("tim-hortons-15"));
        assert!(!base.is_family_member("tim-hortons-downtown"));
        assert!(!base.is_family_member("tim"));
        assert_eq!(base.family_pattern(), "^tim-hortons(-[0-9]*)?$");
    }

    #[test]
    fn test_family_suffix() {
        let base = Slug::parse("wes-cafe").unwrap();
        assert_eq!(base.family_suffix("wes-cafe"), Some(1));
        assert_eq!(base.family_suffix("wes-cafe-"), Some(1));
        assert_eq!(base.family_suffix("wes-cafe-12"), Some(12));
        assert_eq!(base.family_suffix("wes-cafe-bar"), None);
        assert_eq!(base.family_suffix("wes"), None);
    }

    #[test]
    fn test_next_available_slug() {
        let base = Slug::parse("wes-cafe").unwrap();
        let taken = |names: &[&str]| -> Vec<Slug> {
            names.iter().map(|n| Slug::parse(n).unwrap()).collect()
        };

        assert_eq!(next_available_slug(base.clone(), &taken(&[])).as_str(), "wes-cafe");
        assert_eq!(
            next_available_slug(base.clone(), &taken(&["wes-cafe"])).as_str(),
            "wes-cafe-2"
        );
        assert_eq!(
            next_available_slug(base.clone(), &taken(&["wes-cafe", "wes-cafe-2"])).as_str(),
            "wes-cafe-3"
        );
        // Unrelated slugs never count
        assert_eq!(
            next_available_slug(base.clone(), &taken(&["wes-cafe-bar"])).as_str(),
            "wes-cafe"
        );
    }

    #[test]
    fn test_next_available_slug_skips_past_gaps() {
        let base = Slug::parse("wes-cafe").unwrap();

        // The original `wes-cafe` was renamed away, leaving only `-2`.
        let family = [Slug::parse("wes-cafe-2").unwrap()];
        assert_eq!(next_available_slug(base.clone(), &family).as_str(), "wes-cafe-3");

        let family = [
            Slug::parse("wes-cafe").unwrap(),
            Slug::parse("wes-cafe-9").unwrap(),
        ];
        assert_eq!(next_available_slug(base, &family).as_str(), "wes-cafe-10");
    }
}
