//! Integration tests for the HTTP surface.
//!
//! Requests go through the full middleware stack via `oneshot`.

#![allow(clippy::unwrap_used)]

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::{Json, Router, routing::get as get_route};
use folio_integration_tests::{spawn_server, test_app, test_app_with, test_config};
use folio_site::config::SocialLink;
use folio_site::services::auth::FirebaseIdentityProvider;
use folio_site::services::github::ProjectFeed;
use folio_site::store::{BLOG_COLLECTION, MemoryDocumentStore};
use serde_json::json;
use tower::ServiceExt;

async fn get(app: Router, uri: &str) -> (StatusCode, header::HeaderMap, String) {
    let response = app
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn seeded() -> MemoryDocumentStore {
    let documents = MemoryDocumentStore::new();
    documents
        .insert_raw(
            BLOG_COLLECTION,
            "hello-world",
            json!({
                "title": "Hello World",
                "content": "First paragraph.\n\n```rust\nfn main() {}\n```\n",
                "date": "2024-03-01T00:00:00Z",
                "tags": ["rust"],
            }),
        )
        .await;
    documents
        .insert_raw(
            BLOG_COLLECTION,
            "removed",
            json!({"title": "Removed", "deleted": true}),
        )
        .await;
    documents
}

// ============================================================================
// Operational Endpoints
// ============================================================================

#[tokio::test]
async fn test_health_and_readiness() {
    let app = test_app(MemoryDocumentStore::new());
    let (status, _, body) = get(app.clone(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");

    let (status, _, _) = get(app, "/health/ready").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_responses_carry_security_headers() {
    let (_, headers, _) = get(test_app(MemoryDocumentStore::new()), "/health").await;
    assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
    assert!(headers.contains_key(header::CONTENT_SECURITY_POLICY));
    assert!(headers.contains_key("x-request-id"));
}

// ============================================================================
// Public Pages
// ============================================================================

#[tokio::test]
async fn test_blog_post_page_renders_body() {
    let (status, headers, body) = get(test_app(seeded().await), "/blog/hello-world").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Hello World"));
    assert!(body.contains(r#"<figure class="code-block" data-language="rust">"#));

    let csp = headers[header::CONTENT_SECURITY_POLICY].to_str().unwrap();
    assert!(csp.contains("'nonce-"));
}

#[tokio::test]
async fn test_post_page_links_highlight_stylesheet() {
    let app = test_app(seeded().await);
    let (_, _, body) = get(app.clone(), "/blog/hello-world").await;
    assert!(body.contains(r#"<link rel="stylesheet" href="/highlight.css">"#));
    assert!(body.contains(r#"class="hl-"#));

    let (status, headers, css) = get(app, "/highlight.css").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "text/css; charset=utf-8");
    assert!(css.contains(".hl-"));
}

#[tokio::test]
async fn test_portfolio_pages_render() {
    let app = test_app(MemoryDocumentStore::new());
    for (uri, heading) in [
        ("/about", "About Me"),
        ("/projects", "My Projects"),
        ("/contact", "Contact"),
    ] {
        let (status, _, body) = get(app.clone(), uri).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert!(body.contains(&format!("<h1>{heading}</h1>")), "{uri}");
        assert!(body.contains(r#"<a href="/projects">Projects</a>"#), "{uri}");
    }

    let (_, _, projects) = get(app.clone(), "/projects").await;
    assert!(projects.contains("No projects to show yet."));
    let (_, _, contact) = get(app, "/contact").await;
    assert!(contact.contains("Contact details have not been published yet."));
}

#[tokio::test]
async fn test_projects_page_lists_github_repositories() {
    let github = Router::new().route(
        "/users/{user}/repos",
        get_route(|| async {
            Json(json!([
                {
                    "name": "older",
                    "description": "An older project",
                    "html_url": "https://github.com/owner/older",
                    "homepage": null,
                    "language": "Go",
                    "stargazers_count": 1,
                    "forks_count": 0,
                    "updated_at": "2023-01-01T00:00:00Z"
                },
                {
                    "name": "folio",
                    "description": "This site",
                    "html_url": "https://github.com/owner/folio",
                    "homepage": "https://folio.example.com",
                    "language": "Rust",
                    "stargazers_count": 42,
                    "forks_count": 3,
                    "topics": ["rust", "axum"],
                    "updated_at": "2024-06-01T00:00:00Z"
                }
            ]))
        }),
    );
    let root = spawn_server(github).await;

    let mut config = test_config();
    config.profile.github_user = Some("owner".to_owned());
    config.profile.contact_email = Some("owner@example.com".to_owned());
    config.profile.social_links = vec![SocialLink {
        name: "LinkedIn".to_owned(),
        url: "https://www.linkedin.com/in/owner".to_owned(),
    }];
    let provider = FirebaseIdentityProvider::new(&config.firebase).unwrap();
    let projects = ProjectFeed::with_endpoint(Some("owner".to_owned()), &root).unwrap();
    let app = test_app_with(config, MemoryDocumentStore::new(), provider, projects);

    let (status, _, body) = get(app.clone(), "/projects").await;
    assert_eq!(status, StatusCode::OK);
    let newest = body.find("<h3>folio</h3>").unwrap();
    let oldest = body.find("<h3>older</h3>").unwrap();
    assert!(newest < oldest);
    assert!(body.contains(r#"href="https://folio.example.com""#));
    assert!(body.contains("https://github.com/owner?tab=repositories"));

    let (_, _, contact) = get(app, "/contact").await;
    assert!(contact.contains(r#"href="mailto:owner@example.com""#));
    assert!(contact.contains(r#"href="https://github.com/owner""#));
    assert!(contact.contains(r#"href="https://www.linkedin.com/in/owner""#));
}

#[tokio::test]
async fn test_projects_page_survives_github_outage() {
    let root = spawn_server(Router::new()).await;
    let config = test_config();
    let provider = FirebaseIdentityProvider::new(&config.firebase).unwrap();
    let projects = ProjectFeed::with_endpoint(Some("owner".to_owned()), &root).unwrap();
    let app = test_app_with(config, MemoryDocumentStore::new(), provider, projects);

    let (status, _, body) = get(app, "/projects").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Projects could not be loaded right now."));
}

#[tokio::test]
async fn test_deleted_and_missing_posts_are_not_found() {
    let app = test_app(seeded().await);
    let (status, _, _) = get(app.clone(), "/blog/removed").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = get(app, "/blog/never-written").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_blog_index_lists_live_posts() {
    let (status, _, body) = get(test_app(seeded().await), "/blog").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("/blog/hello-world"));
    assert!(!body.contains("/blog/removed"));
}

#[tokio::test]
async fn test_sitemap_and_robots() {
    let app = test_app(seeded().await);
    let (status, _, sitemap) = get(app.clone(), "/sitemap.xml").await;
    assert_eq!(status, StatusCode::OK);
    assert!(sitemap.contains("<loc>http://localhost:3000/blog/hello-world</loc>"));
    assert!(sitemap.contains("<lastmod>2024-03-01</lastmod>"));
    assert!(!sitemap.contains("removed"));
    for page in ["/about", "/projects", "/contact"] {
        assert!(
            sitemap.contains(&format!("<loc>http://localhost:3000{page}</loc>")),
            "{page}"
        );
    }

    let (_, _, robots) = get(app, "/robots.txt").await;
    assert!(robots.contains("Disallow: /admin"));
    assert!(robots.contains("Sitemap: http://localhost:3000/sitemap.xml"));
}

// ============================================================================
// Admin Area
// ============================================================================

#[tokio::test]
async fn test_admin_requires_sign_in() {
    let app = test_app(MemoryDocumentStore::new());
    for uri in ["/admin", "/admin/posts/hello-world/edit", "/admin/session/events"] {
        let (status, headers, _) = get(app.clone(), uri).await;
        assert_eq!(status, StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(headers[header::LOCATION], "/admin/login", "{uri}");
    }
}

#[tokio::test]
async fn test_login_page_renders_firebase_config() {
    let (status, headers, body) = get(test_app(MemoryDocumentStore::new()), "/admin/login").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("folio-test.firebaseapp.com"));
    assert_eq!(headers[header::CACHE_CONTROL], "no-store, max-age=0");
}

#[tokio::test]
async fn test_expired_notice_on_login_page() {
    let (_, _, body) = get(
        test_app(MemoryDocumentStore::new()),
        "/admin/login?expired=1",
    )
    .await;
    assert!(body.contains("Your session has expired. Please log in again."));
}
