//! URL-safe post identifiers.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when building a [`Slug`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SlugError {
    /// The title contains no ASCII letters or digits.
    #[error("title must contain at least one letter or digit")]
    Empty,
    /// The key contains characters outside `[a-z0-9-]` or has stray separators.
    #[error("invalid slug: {0}")]
    Invalid(String),
}

/// The primary key of a blog post.
///
/// Derived once from the title when the post is created and never changed
/// afterwards, even if the title is edited.
///
/// ## Examples
///
/// ```
/// use folio_core::Slug;
///
/// let slug = Slug::from_title("Hello, World! 2.0").unwrap();
/// assert_eq!(slug.as_str(), "hello-world-2-0");
///
/// assert!(Slug::from_title("!!!").is_err());
/// assert!(Slug::parse("Not A Slug").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    /// Separator placed between alphanumeric runs.
    pub const SEPARATOR: char = '-';

    /// Derive a slug from a post title.
    ///
    /// Lowercases the title, collapses every run of characters outside
    /// `[a-z0-9]` into a single `-` and trims separators from both ends.
    ///
    /// # Errors
    ///
    /// Returns [`SlugError::Empty`] if nothing alphanumeric remains.
    pub fn from_title(title: &str) -> Result<Self, SlugError> {
        let mut slug = String::with_capacity(title.len());
        let mut pending_separator = false;

        for c in title.chars().flat_map(char::to_lowercase) {
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                if pending_separator && !slug.is_empty() {
                    slug.push(Self::SEPARATOR);
                }
                pending_separator = false;
                slug.push(c);
            } else {
                pending_separator = true;
            }
        }

        if slug.is_empty() {
            return Err(SlugError::Empty);
        }
        Ok(Self(slug))
    }

    /// Accept an existing key (e.g. a document id or URL segment).
    ///
    /// # Errors
    ///
    /// Returns [`SlugError::Invalid`] unless the key already has slug shape.
    pub fn parse(key: &str) -> Result<Self, SlugError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == Self::SEPARATOR)
            && !key.starts_with(Self::SEPARATOR)
            && !key.ends_with(Self::SEPARATOR)
            && !key.contains("--");

        if valid {
            Ok(Self(key.to_owned()))
        } else {
            Err(SlugError::Invalid(key.to_owned()))
        }
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
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

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
