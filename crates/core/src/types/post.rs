//! Blog post domain type.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::identity::Author;
use super::slug::Slug;

/// Number of characters kept when an excerpt has to be synthesized.
pub const EXCERPT_LENGTH: usize = 200;

/// A published blog post as seen by pages and feeds.
///
/// Soft-deleted records never become a `BlogPost`; the store adapter filters
/// them out before handing posts to callers.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BlogPost {
    pub slug: Slug,
    pub title: String,
    pub excerpt: String,
    /// Raw Markdown or HTML body as stored.
    pub content: String,
    pub tags: Vec<String>,
    /// Publication instant.
    pub date: DateTime<Utc>,
    pub author: Author,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl BlogPost {
    /// Whether the post carries the given tag (case-insensitive).
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

/// Split a free-form comma separated tag string.
///
/// Entries are trimmed, empty entries dropped and duplicates removed while
/// keeping the first occurrence, so the result behaves as a set with a stable
/// display order.
#[must_use]
pub fn parse_tag_list(raw: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if !tags.iter().any(|existing| existing == tag) {
            tags.push(tag.to_owned());
        }
    }
    tags
}

/// Build an excerpt from the first [`EXCERPT_LENGTH`] characters of a body.
#[must_use]
pub fn synthesize_excerpt(content: &str) -> String {
    content.trim().chars().take(EXCERPT_LENGTH).collect()
}
