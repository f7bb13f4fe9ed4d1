//! Request-level errors and Sentry context.
//!
//! Store and session failures are reported to Sentry before the response is
//! built. Validation and lookup failures are answered directly.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use folio_core::Slug;
use thiserror::Error;

use crate::session::{SessionError, StorageError};
use crate::store::BlogStoreError;

/// Application-level error type for the site.
#[derive(Debug, Error)]
pub enum AppError {
    /// A post write failed.
    #[error("Blog error: {0}")]
    Blog(#[from] BlogStoreError),

    /// The admin session could not be read or written.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        Self::Session(SessionError::Storage(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if matches!(
            self,
            Self::Blog(BlogStoreError::Store(_)) | Self::Session(_) | Self::Internal(_)
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Blog(err) => match err {
                BlogStoreError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                BlogStoreError::NotFound(_) => StatusCode::NOT_FOUND,
                BlogStoreError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        let message = match &self {
            Self::Session(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Blog(err) => match err {
                BlogStoreError::Validation(msg) => msg.clone(),
                BlogStoreError::NotFound(slug) => format!("Post not found: {slug}"),
                BlogStoreError::Store(_) => {
                    "The post could not be saved. Please try again.".to_string()
                }
            },
            _ => self.to_string(),
        };

        (status, message).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context to the signed-in admin.
pub fn set_sentry_user(email: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            email: Some(email.to_owned()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the admin.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Record an admin write against a post, shown in later Sentry reports.
pub fn post_breadcrumb(message: &str, slug: &Slug) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some("admin".to_owned()),
        message: Some(message.to_owned()),
        level: sentry::Level::Info,
        ..Default::default()
    };
    breadcrumb
        .data
        .insert("slug".to_owned(), serde_json::Value::from(slug.as_str()));
    sentry::add_breadcrumb(breadcrumb);
}
