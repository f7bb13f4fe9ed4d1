//! Integration tests for Folio.
//!
//! Everything here runs in-process: the router is driven with
//! `tower::ServiceExt::oneshot`, storage uses the in-memory backends and the
//! identity provider is stubbed. Flows that need the real provider clients
//! point them at small axum servers on an ephemeral local port.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p folio-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `blog_store` - post persistence, soft delete, tolerant reads
//! - `admin_session` - session window, countdown and expiry
//! - `sign_in` - allow-list gate and its interaction with the session
//! - `http` - routes, redirects and response headers
//! - `admin_flow` - a signed-in admin creating, editing and deleting posts

#![cfg_attr(not(test), forbid(unsafe_code))]

use axum::{Json, Router, routing::post};
use folio_core::{Email, Identity};
use folio_site::config::{FirebaseConfig, ProfileConfig, SiteConfig};
use folio_site::middleware::create_session_layer;
use folio_site::services::auth::{
    AllowList, FirebaseIdentityProvider, IdentityProvider, SignInError,
};
use folio_site::services::github::ProjectFeed;
use folio_site::state::AppState;
use folio_site::store::{
    Document, DocumentBackend, DocumentStore, MemoryDocumentStore, StoreError, WriteMode,
};
use serde_json::{Value, json};
use tower_sessions::MemoryStore;

/// Email on the test allow-list.
pub const OWNER_EMAIL: &str = "owner@example.com";

/// Configuration pointing at nothing real.
#[must_use]
pub fn test_config() -> SiteConfig {
    SiteConfig {
        database_url: None,
        host: [127, 0, 0, 1].into(),
        port: 0,
        base_url: "http://localhost:3000".to_owned(),
        authorized_emails: AllowList::parse(OWNER_EMAIL),
        firebase: FirebaseConfig {
            api_key: "test-api-key".to_owned(),
            auth_domain: "folio-test.firebaseapp.com".to_owned(),
            project_id: "folio-test".to_owned(),
        },
        profile: ProfileConfig::default(),
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// The full application over an in-memory store, with the session layer
/// `main` would add.
///
/// # Panics
///
/// Panics if the application state cannot be built.
#[must_use]
pub fn test_app(documents: MemoryDocumentStore) -> Router {
    let config = test_config();
    let session_layer = create_session_layer(MemoryStore::default(), &config);
    let state = AppState::new(config, DocumentBackend::Memory(documents))
        .unwrap_or_else(|e| panic!("failed to build state: {e}"));
    folio_site::router(state).layer(session_layer)
}

/// The full application with explicit provider clients.
#[must_use]
pub fn test_app_with(
    config: SiteConfig,
    documents: MemoryDocumentStore,
    provider: FirebaseIdentityProvider,
    projects: ProjectFeed,
) -> Router {
    let session_layer = create_session_layer(MemoryStore::default(), &config);
    let state = AppState::with_services(
        config,
        DocumentBackend::Memory(documents),
        provider,
        projects,
    );
    folio_site::router(state).layer(session_layer)
}

/// Serve `router` on an ephemeral local port and return its base URL.
///
/// # Panics
///
/// Panics if no local port can be bound.
pub async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap_or_else(|e| panic!("failed to bind test server: {e}"));
    let addr = listener
        .local_addr()
        .unwrap_or_else(|e| panic!("test server has no address: {e}"));
    tokio::spawn(async move { axum::serve(listener, router).await });
    format!("http://{addr}")
}

/// Account lookup endpoint that reports `email` as a verified account for
/// any token. Served at `/lookup`.
#[must_use]
pub fn fake_account_lookup(email: &'static str) -> Router {
    Router::new().route(
        "/lookup",
        post(move || async move {
            Json(json!({
                "users": [{
                    "email": email,
                    "emailVerified": true,
                    "displayName": "Site Owner",
                }]
            }))
        }),
    )
}

/// An identity for the given address.
///
/// # Panics
///
/// Panics if `email` is not a valid address.
#[must_use]
pub fn identity(email: &str) -> Identity {
    Identity {
        email: Email::parse(email).unwrap_or_else(|e| panic!("bad test email: {e}")),
        display_name: "Test User".to_owned(),
        photo_url: None,
    }
}

/// Identity provider that accepts any token and returns a fixed identity.
#[derive(Debug, Clone)]
pub struct StubProvider {
    identity: Identity,
}

impl StubProvider {
    #[must_use]
    pub const fn new(identity: Identity) -> Self {
        Self { identity }
    }
}

impl IdentityProvider for StubProvider {
    async fn verify(&self, id_token: &str) -> Result<Identity, SignInError> {
        if id_token.is_empty() {
            return Err(SignInError::Unknown("empty token".to_owned()));
        }
        Ok(self.identity.clone())
    }
}

/// Document store whose every operation fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingStore;

impl DocumentStore for FailingStore {
    async fn get(&self, _collection: &str, _id: &str) -> Result<Option<Document>, StoreError> {
        Err(StoreError::Unavailable("offline".to_owned()))
    }

    async fn list(&self, _collection: &str) -> Result<Vec<Document>, StoreError> {
        Err(StoreError::Unavailable("offline".to_owned()))
    }

    async fn set(
        &self,
        _collection: &str,
        _id: &str,
        _data: Value,
        _mode: WriteMode,
    ) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("offline".to_owned()))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("offline".to_owned()))
    }
}
