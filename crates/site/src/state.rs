//! Application state shared across handlers.

use std::sync::Arc;

use thiserror::Error;

use crate::config::SiteConfig;
use crate::content::RenderCache;
use crate::services::auth::{AuthGate, FirebaseIdentityProvider, SignInError};
use crate::services::github::{ProjectFeed, ProjectsError};
use crate::store::{BlogStore, DocumentBackend};

/// Errors building the application state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("identity provider: {0}")]
    Auth(#[from] SignInError),
    #[error("project feed: {0}")]
    Projects(#[from] ProjectsError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and is constructed once at
/// process start; every component receives its collaborators from here.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: SiteConfig,
    blog: BlogStore<DocumentBackend>,
    auth: AuthGate<FirebaseIdentityProvider>,
    projects: ProjectFeed,
    render_cache: RenderCache,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Site configuration
    /// * `documents` - Document store backing the blog
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn new(config: SiteConfig, documents: DocumentBackend) -> Result<Self, StateError> {
        let provider = FirebaseIdentityProvider::new(&config.firebase)?;
        let projects = ProjectFeed::new(config.profile.github_user.clone())?;
        Ok(Self::with_services(config, documents, provider, projects))
    }

    /// Create a state around already-built provider clients, such as ones
    /// pointed at local emulators.
    #[must_use]
    pub fn with_services(
        config: SiteConfig,
        documents: DocumentBackend,
        provider: FirebaseIdentityProvider,
        projects: ProjectFeed,
    ) -> Self {
        let auth = AuthGate::new(provider, config.authorized_emails.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                blog: BlogStore::new(documents),
                auth,
                projects,
                render_cache: RenderCache::new(),
            }),
        }
    }

    /// Get a reference to the site configuration.
    #[must_use]
    pub fn config(&self) -> &SiteConfig {
        &self.inner.config
    }

    /// Get a reference to the blog store.
    #[must_use]
    pub fn blog(&self) -> &BlogStore<DocumentBackend> {
        &self.inner.blog
    }

    /// Get a reference to the admin auth gate.
    #[must_use]
    pub fn auth(&self) -> &AuthGate<FirebaseIdentityProvider> {
        &self.inner.auth
    }

    /// Get a reference to the GitHub project feed.
    #[must_use]
    pub fn projects(&self) -> &ProjectFeed {
        &self.inner.projects
    }

    /// Get a reference to the rendered-body cache.
    #[must_use]
    pub fn render_cache(&self) -> &RenderCache {
        &self.inner.render_cache
    }
}
