//! Sitemap and robots.txt.
//!
//! Both are read-only consumers of the post listing.

use axum::{
    extract::State,
    http::header::{CACHE_CONTROL, CONTENT_TYPE},
    response::IntoResponse,
};
use folio_core::BlogPost;
use tracing::instrument;

use crate::state::AppState;

/// Cache lifetime for generated SEO files.
const SEO_CACHE_CONTROL: &str = "public, max-age=3600";

/// Pages listed in the sitemap besides the posts.
const STATIC_PATHS: &[&str] = &["/", "/about", "/projects", "/blog", "/contact"];

/// Paths never meant for crawlers.
const DISALLOWED_PATHS: &[&str] = &["/admin", "/api/"];

/// Build the sitemap for the given posts.
#[must_use]
pub fn render_sitemap(base_url: &str, posts: &[BlogPost]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );

    let base = html_escape::encode_text(base_url);
    for path in STATIC_PATHS {
        xml.push_str(&format!("  <url><loc>{base}{path}</loc></url>\n"));
    }

    for post in posts {
        xml.push_str(&format!(
            "  <url><loc>{base}/blog/{}</loc><lastmod>{}</lastmod></url>\n",
            html_escape::encode_text(post.slug.as_str()),
            post.date.format("%Y-%m-%d"),
        ));
    }

    xml.push_str("</urlset>\n");
    xml
}

/// Build robots.txt.
#[must_use]
pub fn render_robots(base_url: &str) -> String {
    let mut robots = String::from("User-agent: *\nAllow: /\n");
    for path in DISALLOWED_PATHS {
        robots.push_str(&format!("Disallow: {path}\n"));
    }
    robots.push_str(&format!("\nSitemap: {base_url}/sitemap.xml\n"));
    robots
}

/// Serve `/sitemap.xml`.
#[instrument(skip(state))]
pub async fn sitemap(State(state): State<AppState>) -> impl IntoResponse {
    let posts = state.blog().list().await;
    (
        [
            (CONTENT_TYPE, "application/xml; charset=utf-8"),
            (CACHE_CONTROL, SEO_CACHE_CONTROL),
        ],
        render_sitemap(&state.config().base_url, &posts),
    )
}

/// Serve `/robots.txt`.
pub async fn robots(State(state): State<AppState>) -> impl IntoResponse {
    (
        [
            (CONTENT_TYPE, "text/plain; charset=utf-8"),
            (CACHE_CONTROL, SEO_CACHE_CONTROL),
        ],
        render_robots(&state.config().base_url),
    )
}
