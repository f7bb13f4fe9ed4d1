//! Site configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `FOLIO_BASE_URL` - Public URL of the site (used for sitemap and robots)
//! - `ADMIN_AUTHORIZED_EMAILS` - Admin allow-list (comma, semicolon or whitespace separated)
//! - `FIREBASE_API_KEY` - Firebase web API key
//! - `FIREBASE_AUTH_DOMAIN` - Firebase auth domain (e.g. your-project.firebaseapp.com)
//! - `FIREBASE_PROJECT_ID` - Firebase project ID
//!
//! ## Optional
//! - `FOLIO_HOST` - Bind address (default: 127.0.0.1)
//! - `FOLIO_PORT` - Listen port (default: 3000)
//! - `FOLIO_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`; without either, posts and sessions are kept in memory)
//! - `FOLIO_GITHUB_USER` - GitHub account whose repositories the projects
//!   page lists
//! - `FOLIO_CONTACT_EMAIL` - Address shown on the contact page
//! - `FOLIO_SOCIAL_LINKS` - Contact page links as `Name=url` pairs, comma
//!   separated (e.g. `LinkedIn=https://linkedin.com/in/me,X=https://x.com/me`)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::services::auth::AllowList;

/// Placeholder fragments rejected in provider credentials (case-insensitive).
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "xxx",
    "todo",
    "insert",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Site configuration.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// `PostgreSQL` connection URL (contains password). `None` keeps state in memory.
    pub database_url: Option<SecretString>,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL, without trailing slash
    pub base_url: String,
    /// Emails allowed to sign in to the admin area
    pub authorized_emails: AllowList,
    /// Firebase web configuration for the browser sign-in flow
    pub firebase: FirebaseConfig,
    /// Public profile shown on the projects and contact pages
    pub profile: ProfileConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Firebase web app configuration.
///
/// These values are rendered into the login page for the browser SDK, so
/// none of them is a secret.
#[derive(Debug, Clone)]
pub struct FirebaseConfig {
    pub api_key: String,
    pub auth_domain: String,
    pub project_id: String,
}

/// Owner details for the static pages.
#[derive(Debug, Clone, Default)]
pub struct ProfileConfig {
    pub github_user: Option<String>,
    pub contact_email: Option<String>,
    pub social_links: Vec<SocialLink>,
}

/// A named external profile link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocialLink {
    pub name: String,
    pub url: String,
}

impl ProfileConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let social_links = get_optional_env("FOLIO_SOCIAL_LINKS")
            .map(|raw| parse_social_links("FOLIO_SOCIAL_LINKS", &raw))
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            github_user: get_optional_env("FOLIO_GITHUB_USER")
                .map(|user| user.trim().to_owned())
                .filter(|user| !user.is_empty()),
            contact_email: get_optional_env("FOLIO_CONTACT_EMAIL")
                .map(|email| email.trim().to_owned())
                .filter(|email| !email.is_empty()),
            social_links,
        })
    }
}

impl SiteConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("FOLIO_DATABASE_URL");
        let host = get_env_or_default("FOLIO_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("FOLIO_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("FOLIO_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("FOLIO_PORT".to_string(), e.to_string()))?;
        let base_url = parse_base_url("FOLIO_BASE_URL", &get_required_env("FOLIO_BASE_URL")?)?;
        let authorized_emails = parse_allow_list(
            "ADMIN_AUTHORIZED_EMAILS",
            &get_required_env("ADMIN_AUTHORIZED_EMAILS")?,
        )?;
        let firebase = FirebaseConfig::from_env()?;
        let profile = ProfileConfig::from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            authorized_emails,
            firebase,
            profile,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the site is served over HTTPS (controls the `Secure` cookie flag).
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl FirebaseConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let api_key = get_required_env("FIREBASE_API_KEY")?;
        reject_placeholder(&api_key, "FIREBASE_API_KEY")?;

        Ok(Self {
            api_key,
            auth_domain: get_required_env("FIREBASE_AUTH_DOMAIN")?,
            project_id: get_required_env("FIREBASE_PROJECT_ID")?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required, non-blank environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Option<SecretString> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(SecretString::from)
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Validate an absolute http(s) URL and strip any trailing slash.
fn parse_base_url(var_name: &str, raw: &str) -> Result<String, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}

/// Parse `Name=url` pairs. Every URL must be absolute http(s).
fn parse_social_links(var_name: &str, raw: &str) -> Result<Vec<SocialLink>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (name, url) = entry.split_once('=').ok_or_else(|| {
                ConfigError::InvalidEnvVar(var_name.to_string(), format!("'{entry}' is not Name=url"))
            })?;
            Ok(SocialLink {
                name: name.trim().to_owned(),
                url: parse_base_url(var_name, url)?,
            })
        })
        .collect()
}

/// Parse the admin allow-list, requiring at least one valid address.
fn parse_allow_list(var_name: &str, raw: &str) -> Result<AllowList, ConfigError> {
    let list = AllowList::parse(raw);
    if list.is_empty() {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            "must contain at least one valid email address".to_string(),
        ));
    }
    Ok(list)
}

/// Reject values that are obviously copied from a sample `.env`.
fn reject_placeholder(value: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = value.to_lowercase();
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InvalidEnvVar(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_base_url_strips_trailing_slash() {
        assert_eq!(
            parse_base_url("FOLIO_BASE_URL", "https://example.com/").unwrap(),
            "https://example.com"
        );
        assert_eq!(
            parse_base_url("FOLIO_BASE_URL", " http://localhost:3000 ").unwrap(),
            "http://localhost:3000"
        );
    }

    #[test]
    fn test_parse_base_url_rejects_invalid() {
        assert!(matches!(
            parse_base_url("FOLIO_BASE_URL", "not a url"),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
        assert!(parse_base_url("FOLIO_BASE_URL", "ftp://example.com").is_err());
    }

    #[test]
    fn test_parse_allow_list_requires_an_entry() {
        assert!(parse_allow_list("ADMIN_AUTHORIZED_EMAILS", "nobody, ,").is_err());
        let list = parse_allow_list("ADMIN_AUTHORIZED_EMAILS", "me@example.com").unwrap();
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_parse_social_links() {
        let links = parse_social_links(
            "FOLIO_SOCIAL_LINKS",
            "LinkedIn=https://www.linkedin.com/in/me/, X = https://x.com/me ,",
        )
        .unwrap();
        assert_eq!(
            links,
            vec![
                SocialLink {
                    name: "LinkedIn".to_owned(),
                    url: "https://www.linkedin.com/in/me".to_owned(),
                },
                SocialLink {
                    name: "X".to_owned(),
                    url: "https://x.com/me".to_owned(),
                },
            ]
        );

        assert!(parse_social_links("FOLIO_SOCIAL_LINKS", "just-a-name").is_err());
        assert!(parse_social_links("FOLIO_SOCIAL_LINKS", "Mail=mailto:me@example.com").is_err());
    }

    #[test]
    fn test_reject_placeholder() {
        assert!(reject_placeholder("your-firebase-api-key", "FIREBASE_API_KEY").is_err());
        assert!(reject_placeholder("CHANGEME", "FIREBASE_API_KEY").is_err());
        assert!(reject_placeholder("AIzaSyA1b2C3d4E5f6G7h8", "FIREBASE_API_KEY").is_ok());
    }

    #[test]
    fn test_socket_addr_and_https() {
        let config = SiteConfig {
            database_url: None,
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "https://example.com".to_string(),
            authorized_emails: AllowList::parse("me@example.com"),
            firebase: FirebaseConfig {
                api_key: "key".to_string(),
                auth_domain: "folio.firebaseapp.com".to_string(),
                project_id: "folio".to_string(),
            },
            profile: ProfileConfig::default(),
            sentry_dsn: None,
            sentry_environment: None,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
        assert!(config.is_https());
    }

    #[test]
    fn test_config_debug_redacts_database_url() {
        let config = SiteConfig {
            database_url: Some(SecretString::from("postgres://user:hunter2@db/folio")),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            authorized_emails: AllowList::default(),
            firebase: FirebaseConfig {
                api_key: "key".to_string(),
                auth_domain: "folio.firebaseapp.com".to_string(),
                project_id: "folio".to_string(),
            },
            profile: ProfileConfig::default(),
            sentry_dsn: None,
            sentry_environment: None,
        };

        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains("hunter2"));
        assert!(!config.is_https());
    }
}
