//! HTTP route handlers for the site.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                          - Home page (recent posts)
//! GET  /health                    - Liveness check
//! GET  /health/ready              - Readiness check (document store ping)
//!
//! # Pages
//! GET  /about                     - About page
//! GET  /projects                  - Latest GitHub repositories
//! GET  /contact                   - Contact details
//!
//! # Blog
//! GET  /blog                      - Post listing
//! GET  /blog/{slug}               - Post detail (404 for missing or deleted)
//! GET  /highlight.css             - Code highlighting stylesheet
//!
//! # SEO
//! GET  /sitemap.xml               - One entry per live post
//! GET  /robots.txt                - Crawl rules
//!
//! # Admin
//! GET  /admin/login               - Popup sign-in page
//! POST /admin/login               - Sign-in result (rate limited)
//! POST /admin/logout              - Explicit logout
//! GET  /admin                     - Dashboard (requires admin)
//! POST /admin/posts               - Create post
//! GET  /admin/posts/{slug}/edit   - Edit form
//! POST /admin/posts/{slug}        - Save edits
//! POST /admin/posts/{slug}/delete - Soft delete (requires `confirm=yes`)
//! GET  /admin/session/events      - Session countdown (server-sent events)
//! ```

pub mod admin;
pub mod blog;
pub mod home;
pub mod pages;
pub mod seo;

use axum::{Router, routing::get};

use crate::state::AppState;

/// Create all routes for the site.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Home page
        .route("/", get(home::home))
        // Pages
        .route("/about", get(pages::about))
        .route("/projects", get(pages::projects))
        .route("/contact", get(pages::contact))
        // Blog
        .nest("/blog", blog::router())
        .route("/highlight.css", get(blog::highlight_css))
        // SEO
        .route("/sitemap.xml", get(seo::sitemap))
        .route("/robots.txt", get(seo::robots))
        // Admin
        .nest("/admin", admin::router())
}
