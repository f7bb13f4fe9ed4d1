//! Sign-in error types.

use thiserror::Error;

use crate::session::{SessionError, StorageError};

/// Fallback text for provider errors without a message of their own.
const GENERIC_MESSAGE: &str = "An error occurred during sign-in. Please try again.";

/// Errors that can occur while signing an admin in.
///
/// Every variant is recoverable: the page shows [`SignInError::user_message`]
/// and the admin may try again.
#[derive(Debug, Error)]
pub enum SignInError {
    /// The browser blocked the provider popup.
    #[error("sign-in popup was blocked")]
    PopupBlocked,

    /// The admin closed the popup before finishing.
    #[error("sign-in popup was closed")]
    PopupClosed,

    /// A newer popup request superseded this one.
    #[error("sign-in popup request was cancelled")]
    Cancelled,

    /// The provider could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// The identity is not on the allow-list.
    #[error("unauthorized email address")]
    Unauthorized,

    /// Anything else the provider reported.
    #[error("sign-in failed: {0}")]
    Unknown(String),

    /// The identity could not be stored or cleared.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The session window could not be started.
    #[error("session error: {0}")]
    Session(#[from] SessionError),
}

impl SignInError {
    /// Map a provider error code from the browser sign-in flow.
    #[must_use]
    pub fn from_code(code: &str, message: Option<&str>) -> Self {
        match code.trim() {
            "auth/popup-blocked" => Self::PopupBlocked,
            "auth/popup-closed-by-user" => Self::PopupClosed,
            "auth/cancelled-popup-request" => Self::Cancelled,
            "auth/network-request-failed" => Self::Network(code.to_owned()),
            _ => Self::Unknown(
                message
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .unwrap_or(GENERIC_MESSAGE)
                    .to_owned(),
            ),
        }
    }

    /// Text shown to the admin on the login page.
    #[must_use]
    pub fn user_message(&self) -> &str {
        match self {
            Self::PopupBlocked => "Please allow popups for this website to sign in with Google.",
            Self::PopupClosed => "The sign-in window was closed before finishing. Please try again.",
            Self::Cancelled => {
                "Another sign-in attempt is already in progress. Please finish or close it first."
            }
            Self::Network(_) => {
                "Network error. Please check your internet connection and try again."
            }
            Self::Unauthorized => "Unauthorized email address. Please use an authorized account.",
            Self::Unknown(message) => message,
            Self::Storage(_) | Self::Session(_) => GENERIC_MESSAGE,
        }
    }
}
