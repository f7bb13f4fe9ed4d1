//! Blog route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    extract::{Path, State},
    http::header::{CACHE_CONTROL, CONTENT_TYPE},
    response::IntoResponse,
    routing::get,
};
use chrono::{DateTime, Utc};
use folio_core::BlogPost;
use tracing::instrument;

use crate::content;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::CspNonce;
use crate::state::AppState;

/// Cache lifetime for the code highlighting stylesheet.
const HIGHLIGHT_CACHE_CONTROL: &str = "public, max-age=86400";

/// Number of recent posts to show under a post.
const RECENT_POSTS_COUNT: usize = 3;

/// Post view for templates.
#[derive(Clone)]
pub struct PostView {
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub tags: Vec<String>,
    pub date: DateTime<Utc>,
    pub author_name: String,
    pub author_photo: Option<String>,
}

impl PostView {
    /// Publication date for display, e.g. `March 4, 2024`.
    #[must_use]
    pub fn date_display(&self) -> String {
        self.date.format("%B %-d, %Y").to_string()
    }

    /// Publication date for `<time datetime>`.
    #[must_use]
    pub fn date_iso(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

impl From<BlogPost> for PostView {
    fn from(post: BlogPost) -> Self {
        Self {
            slug: post.slug.to_string(),
            title: post.title,
            excerpt: post.excerpt,
            content: post.content,
            tags: post.tags,
            date: post.date,
            author_name: post.author.name,
            author_photo: Some(post.author.photo_url).filter(|url| !url.is_empty()),
        }
    }
}

/// Blog index page template.
#[derive(Template, WebTemplate)]
#[template(path = "blog/index.html")]
pub struct BlogIndexTemplate {
    pub posts: Vec<PostView>,
    pub nonce: String,
    /// Base URL for canonical links.
    pub base_url: String,
}

/// Blog post detail template.
#[derive(Template, WebTemplate)]
#[template(path = "blog/show.html")]
pub struct BlogShowTemplate {
    pub post: PostView,
    /// Rendered body markup.
    pub body_html: String,
    pub recent_posts: Vec<PostView>,
    pub nonce: String,
    /// Base URL for canonical links.
    pub base_url: String,
}

/// Display the blog index page with all live posts.
#[instrument(skip(state, nonce))]
pub async fn index(State(state): State<AppState>, CspNonce(nonce): CspNonce) -> impl IntoResponse {
    let posts: Vec<PostView> = state
        .blog()
        .list()
        .await
        .into_iter()
        .map(PostView::from)
        .collect();

    BlogIndexTemplate {
        posts,
        nonce,
        base_url: state.config().base_url.clone(),
    }
}

/// Display a single blog post by slug.
///
/// # Errors
///
/// Returns 404 if the post doesn't exist or was deleted.
#[instrument(skip(state, nonce))]
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    CspNonce(nonce): CspNonce,
) -> Result<impl IntoResponse> {
    let post = state
        .blog()
        .get(&slug)
        .await
        .ok_or_else(|| AppError::NotFound(slug.clone()))?;

    let body = state
        .render_cache()
        .render(post.slug.as_str(), post.updated_at, &post.content)
        .await;

    let recent_posts: Vec<PostView> = state
        .blog()
        .recent(RECENT_POSTS_COUNT + 1)
        .await
        .into_iter()
        .filter(|recent| recent.slug != post.slug)
        .take(RECENT_POSTS_COUNT)
        .map(PostView::from)
        .collect();

    Ok(BlogShowTemplate {
        post: PostView::from(post),
        body_html: body.html.clone(),
        recent_posts,
        nonce,
        base_url: state.config().base_url.clone(),
    })
}

/// Create the blog routes router.
/// Serve the stylesheet for highlighted code blocks.
pub async fn highlight_css() -> impl IntoResponse {
    (
        [
            (CONTENT_TYPE, "text/css; charset=utf-8"),
            (CACHE_CONTROL, HIGHLIGHT_CACHE_CONTROL),
        ],
        content::highlight_css(),
    )
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/{slug}", get(show))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use folio_core::{Author, Slug};

    use super::*;

    #[test]
    fn test_post_view_from_post() {
        let post = BlogPost {
            slug: Slug::parse("hello-world").unwrap(),
            title: "Hello, World".to_owned(),
            excerpt: "Hi".to_owned(),
            content: "Hi there".to_owned(),
            tags: vec!["rust".to_owned()],
            date: Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap(),
            author: Author::unknown(),
            created_at: None,
            updated_at: None,
        };

        let view = PostView::from(post);
        assert_eq!(view.slug, "hello-world");
        assert_eq!(view.author_name, "Unknown Author");
        assert_eq!(view.author_photo, None);
        assert_eq!(view.date_display(), "March 4, 2024");
        assert_eq!(view.date_iso(), "2024-03-04");
    }
}
