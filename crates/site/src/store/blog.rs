//! Blog post persistence.
//!
//! [`BlogStore`] is the only writer of the `blogs` collection. Writes are
//! validated and surface every failure. Reads are tolerant: records written
//! by older tooling are coerced into shape, unusable records are skipped
//! with a log line, and a failing backend degrades to an empty or missing
//! result instead of an error.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use thiserror::Error;

use folio_core::{Author, BlogPost, Identity, Slug, parse_tag_list, synthesize_excerpt};

use super::{Document, DocumentStore, StoreError, WriteMode};

/// Collection holding blog posts.
pub const BLOG_COLLECTION: &str = "blogs";

/// Errors on the write path.
#[derive(Debug, Error)]
pub enum BlogStoreError {
    /// The submitted post is incomplete or malformed.
    #[error("{0}")]
    Validation(String),

    /// No live post with this slug.
    #[error("post not found: {0}")]
    NotFound(String),

    /// The backend failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// =============================================================================
// Normalization
// =============================================================================

/// A stored record after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredPost {
    Live(BlogPost),
    Deleted(Slug),
}

/// Why a stored record could not be turned into a post.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("record is not an object")]
    NotAnObject,
    #[error("record id '{0}' is not a valid slug")]
    InvalidId(String),
    #[error("record has no title")]
    MissingTitle,
}

/// Convert a raw record into a post, applying every default and coercion.
///
/// `now` is substituted for a publication date that cannot be read.
///
/// # Errors
///
/// Returns the [`SkipReason`] for records that cannot be displayed at all.
pub fn normalize(doc: &Document, now: DateTime<Utc>) -> Result<StoredPost, SkipReason> {
    let Value::Object(fields) = &doc.data else {
        return Err(SkipReason::NotAnObject);
    };
    let slug = Slug::parse(&doc.id).map_err(|_| SkipReason::InvalidId(doc.id.clone()))?;

    if fields.get("deleted").and_then(Value::as_bool) == Some(true) {
        return Ok(StoredPost::Deleted(slug));
    }

    let title = non_blank(fields, "title").ok_or(SkipReason::MissingTitle)?;
    let content = fields
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();
    let excerpt = non_blank(fields, "excerpt").unwrap_or_else(|| synthesize_excerpt(&content));

    let date = fields.get("date").and_then(coerce_instant).unwrap_or_else(|| {
        tracing::warn!(slug = %slug, "Post has no readable date, using current time");
        now
    });

    Ok(StoredPost::Live(BlogPost {
        title,
        excerpt,
        content,
        tags: coerce_tags(fields.get("tags")),
        date,
        author: coerce_author(fields.get("author")),
        created_at: fields.get("createdAt").and_then(coerce_instant),
        updated_at: fields.get("updatedAt").and_then(coerce_instant),
        slug,
    }))
}

fn non_blank(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

/// Read an instant from any representation found in stored records.
///
/// Accepts RFC 3339 and RFC 2822 strings, bare dates, naive date-times
/// (taken as UTC), timestamp maps with `seconds`/`nanoseconds` (optionally
/// underscore-prefixed) and epoch-millisecond numbers.
pub fn coerce_instant(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_instant_str(s),
        #[allow(clippy::cast_possible_truncation)] // fractional millis are dropped
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .and_then(DateTime::from_timestamp_millis),
        Value::Object(map) => {
            let seconds = map
                .get("seconds")
                .or_else(|| map.get("_seconds"))
                .and_then(Value::as_i64)?;
            let nanos = map
                .get("nanoseconds")
                .or_else(|| map.get("_nanoseconds"))
                .and_then(Value::as_u64)
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(0);
            DateTime::from_timestamp(seconds, nanos)
        }
        _ => None,
    }
}

fn parse_instant_str(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn is_bare_date(raw: &str) -> bool {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").is_ok()
}

/// Tags from an array of strings or a legacy comma separated string.
#[must_use]
pub fn coerce_tags(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => {
            let mut tags: Vec<String> = Vec::new();
            for tag in items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|t| !t.is_empty())
            {
                if !tags.iter().any(|existing| existing == tag) {
                    tags.push(tag.to_owned());
                }
            }
            tags
        }
        Some(Value::String(raw)) => parse_tag_list(raw),
        _ => Vec::new(),
    }
}

/// Author from an object, a legacy plain name, or nothing at all.
#[must_use]
pub fn coerce_author(value: Option<&Value>) -> Author {
    let text = |map: &Map<String, Value>, key: &str| {
        map.get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned()
    };

    match value {
        Some(Value::Object(map)) => Author {
            name: text(map, "name"),
            email: text(map, "email"),
            photo_url: text(map, "photoURL"),
        },
        Some(Value::String(name)) if !name.trim().is_empty() => Author {
            name: name.trim().to_owned(),
            email: String::new(),
            photo_url: String::new(),
        },
        _ => Author::unknown(),
    }
}

// =============================================================================
// Submissions
// =============================================================================

/// A post as submitted through the admin form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewPost {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub content: String,
    /// Free-form comma separated tags.
    #[serde(default)]
    pub tags: String,
    /// `YYYY-MM-DD` or RFC 3339. Blank means now.
    #[serde(default)]
    pub date: String,
}

/// A validated submission.
#[derive(Debug, Clone)]
struct ValidPost {
    title: String,
    excerpt: String,
    content: String,
    tags: Vec<String>,
    date: DateTime<Utc>,
}

impl NewPost {
    fn validate(self, now: DateTime<Utc>) -> Result<ValidPost, BlogStoreError> {
        let title = self.title.trim().to_owned();
        if title.is_empty() {
            return Err(BlogStoreError::Validation("Title is required.".to_owned()));
        }
        if self.content.trim().is_empty() {
            return Err(BlogStoreError::Validation("Content is required.".to_owned()));
        }

        let date = if self.date.trim().is_empty() {
            now
        } else {
            parse_instant_str(&self.date).ok_or_else(|| {
                BlogStoreError::Validation(format!("Invalid date: {}", self.date.trim()))
            })?
        };

        let excerpt = match self.excerpt.trim() {
            "" => synthesize_excerpt(&self.content),
            excerpt => excerpt.to_owned(),
        };

        Ok(ValidPost {
            title,
            excerpt,
            tags: parse_tag_list(&self.tags),
            content: self.content,
            date,
        })
    }
}

/// A post imported from a Markdown file by the CLI.
#[derive(Debug, Clone)]
pub struct ImportedPost {
    pub slug: Slug,
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub tags: Vec<String>,
    pub date: Option<DateTime<Utc>>,
    pub author: Option<Author>,
}

fn record(post: &BlogPost) -> Value {
    let stamp = |instant: Option<DateTime<Utc>>| instant.map(|i| i.to_rfc3339());
    json!({
        "slug": post.slug,
        "title": post.title,
        "excerpt": post.excerpt,
        "content": post.content,
        "tags": post.tags,
        "date": post.date.to_rfc3339(),
        "author": post.author,
        "createdAt": stamp(post.created_at),
        "updatedAt": stamp(post.updated_at),
        "deleted": false,
    })
}

// =============================================================================
// Store
// =============================================================================

/// Blog post persistence over a [`DocumentStore`].
#[derive(Debug, Clone)]
pub struct BlogStore<D> {
    documents: D,
}

impl<D: DocumentStore> BlogStore<D> {
    #[must_use]
    pub const fn new(documents: D) -> Self {
        Self { documents }
    }

    /// The underlying document store.
    #[must_use]
    pub const fn documents(&self) -> &D {
        &self.documents
    }

    /// Create a post, keyed by the slug of its title.
    ///
    /// An existing record with the same slug is replaced, including a
    /// soft-deleted one.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for incomplete input and `Store` if the write fails.
    #[tracing::instrument(skip_all, fields(title = %post.title))]
    pub async fn create(
        &self,
        post: NewPost,
        author: &Identity,
    ) -> Result<BlogPost, BlogStoreError> {
        let now = Utc::now();
        let valid = post.validate(now)?;
        let slug = Slug::from_title(&valid.title).map_err(|_| {
            BlogStoreError::Validation(
                "Title must contain at least one letter or digit.".to_owned(),
            )
        })?;

        let post = BlogPost {
            slug,
            title: valid.title,
            excerpt: valid.excerpt,
            content: valid.content,
            tags: valid.tags,
            date: valid.date,
            author: Author::snapshot(author),
            created_at: Some(now),
            updated_at: Some(now),
        };

        self.documents
            .set(
                BLOG_COLLECTION,
                post.slug.as_str(),
                record(&post),
                WriteMode::Replace,
            )
            .await?;

        tracing::info!(slug = %post.slug, "Blog post created");
        Ok(post)
    }

    /// Edit a live post. The slug, author and creation time are kept.
    ///
    /// A bare `YYYY-MM-DD` date naming the day the post already carries
    /// keeps the stored time of day.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for missing or deleted posts, `Validation` for
    /// incomplete input and `Store` if the backend fails.
    #[tracing::instrument(skip_all, fields(slug = %slug))]
    pub async fn update(&self, slug: &Slug, post: NewPost) -> Result<BlogPost, BlogStoreError> {
        let now = Utc::now();
        let existing = self
            .fetch_live(slug)
            .await?
            .ok_or_else(|| BlogStoreError::NotFound(slug.to_string()))?;
        let day_only = is_bare_date(&post.date);
        let mut valid = post.validate(now)?;
        if day_only && valid.date.date_naive() == existing.date.date_naive() {
            valid.date = existing.date;
        }

        let patch = json!({
            "title": valid.title,
            "excerpt": valid.excerpt,
            "content": valid.content,
            "tags": valid.tags,
            "date": valid.date.to_rfc3339(),
            "updatedAt": now.to_rfc3339(),
            "deleted": false,
        });
        self.documents
            .set(BLOG_COLLECTION, slug.as_str(), patch, WriteMode::Merge)
            .await?;

        tracing::info!("Blog post updated");
        Ok(BlogPost {
            title: valid.title,
            excerpt: valid.excerpt,
            content: valid.content,
            tags: valid.tags,
            date: valid.date,
            updated_at: Some(now),
            ..existing
        })
    }

    /// Mark a post deleted. The record is kept.
    ///
    /// Accepted unconditionally; confirmation belongs to the caller.
    ///
    /// # Errors
    ///
    /// Returns `Store` if the write fails.
    #[tracing::instrument(skip_all, fields(slug = %slug))]
    pub async fn soft_delete(&self, slug: &Slug) -> Result<(), BlogStoreError> {
        let patch = json!({
            "deleted": true,
            "updatedAt": Utc::now().to_rfc3339(),
        });
        self.documents
            .set(BLOG_COLLECTION, slug.as_str(), patch, WriteMode::Merge)
            .await?;

        tracing::info!("Blog post deleted");
        Ok(())
    }

    /// Write a post imported from a Markdown file, replacing any record with
    /// the same slug.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a missing title and `Store` if the write fails.
    pub async fn import(&self, imported: ImportedPost) -> Result<BlogPost, BlogStoreError> {
        let now = Utc::now();
        let title = imported.title.trim().to_owned();
        if title.is_empty() {
            return Err(BlogStoreError::Validation("Title is required.".to_owned()));
        }

        let excerpt = imported
            .excerpt
            .map(|e| e.trim().to_owned())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| synthesize_excerpt(&imported.content));

        let post = BlogPost {
            slug: imported.slug,
            title,
            excerpt,
            content: imported.content,
            tags: imported.tags,
            date: imported.date.unwrap_or(now),
            author: imported.author.unwrap_or_else(Author::unknown),
            created_at: Some(now),
            updated_at: Some(now),
        };

        self.documents
            .set(
                BLOG_COLLECTION,
                post.slug.as_str(),
                record(&post),
                WriteMode::Replace,
            )
            .await?;

        tracing::info!(slug = %post.slug, "Blog post imported");
        Ok(post)
    }

    /// All live posts, newest first.
    ///
    /// Never fails: unusable records are skipped and a backend failure
    /// yields an empty list. Both are logged.
    pub async fn list(&self) -> Vec<BlogPost> {
        let documents = match self.documents.list(BLOG_COLLECTION).await {
            Ok(documents) => documents,
            Err(e) => {
                tracing::error!(error = %e, "Failed to list blog posts");
                return Vec::new();
            }
        };

        let now = Utc::now();
        let mut posts: Vec<BlogPost> = documents
            .iter()
            .filter_map(|doc| match normalize(doc, now) {
                Ok(StoredPost::Live(post)) => Some(post),
                Ok(StoredPost::Deleted(_)) => None,
                Err(reason) => {
                    tracing::warn!(id = %doc.id, %reason, "Skipping blog record");
                    None
                }
            })
            .collect();

        posts.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.slug.cmp(&b.slug)));
        tracing::debug!(count = posts.len(), "Listed blog posts");
        posts
    }

    /// The `limit` newest live posts.
    pub async fn recent(&self, limit: usize) -> Vec<BlogPost> {
        let mut posts = self.list().await;
        posts.truncate(limit);
        posts
    }

    /// One live post. Missing, deleted, unreadable and failed lookups all
    /// read as `None`.
    pub async fn get(&self, slug: &str) -> Option<BlogPost> {
        let slug = Slug::parse(slug).ok()?;
        match self.fetch_live(&slug).await {
            Ok(post) => post,
            Err(e) => {
                tracing::error!(slug = %slug, error = %e, "Failed to fetch blog post");
                None
            }
        }
    }

    async fn fetch_live(&self, slug: &Slug) -> Result<Option<BlogPost>, StoreError> {
        let Some(doc) = self.documents.get(BLOG_COLLECTION, slug.as_str()).await? else {
            return Ok(None);
        };

        match normalize(&doc, Utc::now()) {
            Ok(StoredPost::Live(post)) => Ok(Some(post)),
            Ok(StoredPost::Deleted(_)) => Ok(None),
            Err(reason) => {
                tracing::warn!(id = %doc.id, %reason, "Skipping blog record");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use folio_core::Email;

    use super::*;
    use crate::store::MemoryDocumentStore;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn doc(id: &str, data: Value) -> Document {
        Document {
            id: id.to_owned(),
            data,
        }
    }

    fn live(result: Result<StoredPost, SkipReason>) -> BlogPost {
        match result.unwrap() {
            StoredPost::Live(post) => post,
            StoredPost::Deleted(slug) => panic!("unexpected deleted record {slug}"),
        }
    }

    fn identity() -> Identity {
        Identity {
            email: Email::parse("owner@example.com").unwrap(),
            display_name: "Site Owner".to_owned(),
            photo_url: Some("https://example.com/me.png".to_owned()),
        }
    }

    fn submission(title: &str) -> NewPost {
        NewPost {
            title: title.to_owned(),
            content: "Body text".to_owned(),
            tags: "rust, web ,".to_owned(),
            date: "2026-01-15".to_owned(),
            ..NewPost::default()
        }
    }

    // =========================================================================
    // normalize
    // =========================================================================

    #[test]
    fn test_normalize_applies_defaults() {
        let post = live(normalize(
            &doc("legacy", json!({"title": "Legacy", "content": "x".repeat(500)})),
            now(),
        ));

        assert_eq!(post.excerpt.chars().count(), 200);
        assert_eq!(post.author, Author::unknown());
        assert!(post.tags.is_empty());
        assert_eq!(post.date, now());
        assert_eq!(post.created_at, None);
    }

    #[test]
    fn test_normalize_coerces_dates() {
        let cases = [
            json!("2024-05-06T07:08:09Z"),
            json!("2024-05-06T07:08:09+00:00"),
            json!("Mon, 06 May 2024 07:08:09 +0000"),
            json!("2024-05-06T07:08:09"),
            json!({"seconds": 1_714_979_289, "nanoseconds": 0}),
            json!({"_seconds": 1_714_979_289, "_nanoseconds": 0}),
            json!(1_714_979_289_000_i64),
        ];
        let expected = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();

        for date in cases {
            let post = live(normalize(
                &doc("p", json!({"title": "T", "date": date.clone()})),
                now(),
            ));
            assert_eq!(post.date, expected, "{date}");
        }

        let post = live(normalize(
            &doc("p", json!({"title": "T", "date": "2024-05-06"})),
            now(),
        ));
        assert_eq!(post.date, Utc.with_ymd_and_hms(2024, 5, 6, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_normalize_substitutes_unparseable_date() {
        for date in [json!("next tuesday"), json!(true), json!([1, 2]), json!({})] {
            let post = live(normalize(
                &doc("p", json!({"title": "T", "date": date})),
                now(),
            ));
            assert_eq!(post.date, now());
        }
    }

    #[test]
    fn test_normalize_author_and_tags_shapes() {
        let post = live(normalize(
            &doc(
                "p",
                json!({
                    "title": "T",
                    "author": {"name": "Ann", "photoURL": "u"},
                    "tags": ["a", " b ", "a", 7],
                }),
            ),
            now(),
        ));
        assert_eq!(post.author.name, "Ann");
        assert_eq!(post.author.email, "");
        assert_eq!(post.author.photo_url, "u");
        assert_eq!(post.tags, vec!["a", "b"]);

        let post = live(normalize(
            &doc("p", json!({"title": "T", "author": "Bob", "tags": "x, y"})),
            now(),
        ));
        assert_eq!(post.author.name, "Bob");
        assert_eq!(post.tags, vec!["x", "y"]);
    }

    #[test]
    fn test_normalize_skips_unusable_records() {
        assert_eq!(
            normalize(&doc("p", json!("string body")), now()),
            Err(SkipReason::NotAnObject)
        );
        assert_eq!(
            normalize(&doc("Bad Id", json!({"title": "T"})), now()),
            Err(SkipReason::InvalidId("Bad Id".to_owned()))
        );
        assert_eq!(
            normalize(&doc("p", json!({"title": "   "})), now()),
            Err(SkipReason::MissingTitle)
        );
    }

    #[test]
    fn test_normalize_deleted_record() {
        let result = normalize(&doc("gone", json!({"deleted": true})), now());
        assert_eq!(
            result,
            Ok(StoredPost::Deleted(Slug::parse("gone").unwrap()))
        );
    }

    // =========================================================================
    // BlogStore
    // =========================================================================

    #[tokio::test]
    async fn test_create_writes_record() {
        let documents = MemoryDocumentStore::new();
        let store = BlogStore::new(documents.clone());

        let post = store
            .create(submission("Hello, World! 2.0"), &identity())
            .await
            .unwrap();
        assert_eq!(post.slug.as_str(), "hello-world-2-0");
        assert_eq!(post.tags, vec!["rust", "web"]);
        assert_eq!(post.excerpt, "Body text");
        assert_eq!(post.author.name, "Site Owner");

        let raw = documents
            .get(BLOG_COLLECTION, "hello-world-2-0")
            .await
            .unwrap()
            .unwrap()
            .data;
        assert_eq!(raw["deleted"], json!(false));
        assert_eq!(raw["author"]["photoURL"], json!("https://example.com/me.png"));
        assert_eq!(raw["date"], json!("2026-01-15T00:00:00+00:00"));

        assert_eq!(store.get("hello-world-2-0").await, Some(post));
    }

    #[tokio::test]
    async fn test_create_same_title_replaces() {
        let documents = MemoryDocumentStore::new();
        let store = BlogStore::new(documents.clone());

        store.create(submission("Same"), &identity()).await.unwrap();
        let mut second = submission("Same");
        second.content = "Second body".to_owned();
        store.create(second, &identity()).await.unwrap();

        assert_eq!(documents.len(BLOG_COLLECTION).await, 1);
        assert_eq!(store.get("same").await.unwrap().content, "Second body");
    }

    #[tokio::test]
    async fn test_create_validation() {
        let store = BlogStore::new(MemoryDocumentStore::new());

        let mut missing_content = submission("Title");
        missing_content.content = "  ".to_owned();
        assert!(matches!(
            store.create(missing_content, &identity()).await,
            Err(BlogStoreError::Validation(_))
        ));

        assert!(matches!(
            store.create(submission("  "), &identity()).await,
            Err(BlogStoreError::Validation(_))
        ));
        assert!(matches!(
            store.create(submission("!!!"), &identity()).await,
            Err(BlogStoreError::Validation(_))
        ));

        let mut bad_date = submission("Title");
        bad_date.date = "31/12/2025".to_owned();
        assert!(matches!(
            store.create(bad_date, &identity()).await,
            Err(BlogStoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_soft_delete_hides_post() {
        let documents = MemoryDocumentStore::new();
        let store = BlogStore::new(documents.clone());
        let post = store.create(submission("Doomed"), &identity()).await.unwrap();

        store.soft_delete(&post.slug).await.unwrap();

        assert!(store.list().await.is_empty());
        assert_eq!(store.get("doomed").await, None);
        // The record itself is retained.
        assert_eq!(documents.len(BLOG_COLLECTION).await, 1);
    }

    #[tokio::test]
    async fn test_soft_delete_missing_slug_is_accepted() {
        let store = BlogStore::new(MemoryDocumentStore::new());
        let slug = Slug::parse("never-existed").unwrap();
        store.soft_delete(&slug).await.unwrap();
        assert!(store.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_update_keeps_slug_and_author() {
        let store = BlogStore::new(MemoryDocumentStore::new());
        let original = store.create(submission("Original"), &identity()).await.unwrap();

        let mut edit = submission("Renamed Title");
        edit.tags = "one".to_owned();
        let updated = store.update(&original.slug, edit).await.unwrap();

        assert_eq!(updated.slug.as_str(), "original");
        assert_eq!(updated.title, "Renamed Title");
        assert_eq!(updated.author, original.author);
        assert_eq!(updated.created_at, original.created_at);
        assert_eq!(store.get("original").await.unwrap().tags, vec!["one"]);
        assert_eq!(store.get("renamed-title").await, None);
    }

    #[tokio::test]
    async fn test_update_same_day_keeps_time_of_day() {
        let store = BlogStore::new(MemoryDocumentStore::new());
        let mut first = submission("Timed");
        first.date = "2024-05-06T15:30:00Z".to_owned();
        let original = store.create(first, &identity()).await.unwrap();

        let mut edit = submission("Timed");
        edit.date = "2024-05-06".to_owned();
        let updated = store.update(&original.slug, edit).await.unwrap();
        let expected = Utc.with_ymd_and_hms(2024, 5, 6, 15, 30, 0).unwrap();
        assert_eq!(updated.date, expected);
        assert_eq!(store.get("timed").await.unwrap().date, expected);

        let mut moved = submission("Timed");
        moved.date = "2024-05-07".to_owned();
        let updated = store.update(&original.slug, moved).await.unwrap();
        assert_eq!(updated.date, Utc.with_ymd_and_hms(2024, 5, 7, 0, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn test_update_deleted_is_not_found() {
        let store = BlogStore::new(MemoryDocumentStore::new());
        let post = store.create(submission("Gone"), &identity()).await.unwrap();
        store.soft_delete(&post.slug).await.unwrap();

        assert!(matches!(
            store.update(&post.slug, submission("Gone")).await,
            Err(BlogStoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_orders_newest_first_and_skips_bad_records() {
        let documents = MemoryDocumentStore::new();
        documents
            .insert_raw(BLOG_COLLECTION, "old", json!({"title": "Old", "date": "2020-01-01"}))
            .await;
        documents
            .insert_raw(BLOG_COLLECTION, "new", json!({"title": "New", "date": "2025-01-01"}))
            .await;
        documents
            .insert_raw(BLOG_COLLECTION, "broken", json!(["not", "an", "object"]))
            .await;
        documents
            .insert_raw(BLOG_COLLECTION, "untitled", json!({"content": "no title"}))
            .await;

        let store = BlogStore::new(documents);
        let slugs: Vec<String> = store
            .list()
            .await
            .into_iter()
            .map(|p| p.slug.to_string())
            .collect();
        assert_eq!(slugs, vec!["new", "old"]);

        let recent = store.recent(1).await;
        assert_eq!(recent.len(), 1);
        assert_eq!(recent.first().unwrap().slug.as_str(), "new");
    }

    #[tokio::test]
    async fn test_get_rejects_non_slug_keys() {
        let store = BlogStore::new(MemoryDocumentStore::new());
        assert_eq!(store.get("../etc/passwd").await, None);
    }

    #[tokio::test]
    async fn test_import_defaults() {
        let store = BlogStore::new(MemoryDocumentStore::new());
        let post = store
            .import(ImportedPost {
                slug: Slug::parse("from-file").unwrap(),
                title: "From File".to_owned(),
                content: "Imported body".to_owned(),
                excerpt: None,
                tags: vec!["md".to_owned()],
                date: None,
                author: None,
            })
            .await
            .unwrap();

        assert_eq!(post.author, Author::unknown());
        assert_eq!(post.excerpt, "Imported body");
        assert_eq!(store.get("from-file").await, Some(post));
    }
}
