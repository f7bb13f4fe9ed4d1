//! Session middleware configuration.
//!
//! The session record is the server-side half of the admin's browser
//! context: it holds the signed-in identity and the persisted session window.
//! It lives in `PostgreSQL` when a database is configured and in memory
//! otherwise.

use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};

use crate::config::SiteConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "folio_session";

/// Lifetime of the session record in seconds (1 day).
///
/// The admin window is enforced separately and is much shorter; this only
/// bounds how long an abandoned record is kept.
const SESSION_EXPIRY_SECONDS: i64 = 24 * 60 * 60;

/// Create the session layer over the given store.
///
/// # Arguments
///
/// * `store` - Session store (`PostgresStore` or `MemoryStore`)
/// * `config` - Site configuration (for the `Secure` cookie flag)
#[must_use]
pub fn create_session_layer<S>(store: S, config: &SiteConfig) -> SessionManagerLayer<S>
where
    S: SessionStore + Clone,
{
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_https())
        .with_same_site(tower_sessions::cookie::SameSite::Strict)
        .with_http_only(true)
        .with_path("/")
}
