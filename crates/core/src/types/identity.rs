//! Signed-in identities and the author snapshots taken from them.

use serde::{Deserialize, Serialize};

use super::email::Email;

/// An identity returned by the external sign-in provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    /// Verified email address.
    pub email: Email,
    /// Display name shown in the admin header.
    pub display_name: String,
    /// Avatar URL, if the provider has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

/// Author details stored on a post.
///
/// This is a copy taken at creation time, not a reference to a live account.
/// Every field may be empty for records written by older tooling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Author {
    pub name: String,
    pub email: String,
    #[serde(rename = "photoURL")]
    pub photo_url: String,
}

impl Author {
    /// Placeholder used when a stored post has no author at all.
    pub const UNKNOWN_NAME: &'static str = "Unknown Author";

    /// The author substituted for records without one.
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            name: Self::UNKNOWN_NAME.to_owned(),
            email: String::new(),
            photo_url: String::new(),
        }
    }

    /// Snapshot the signed-in identity.
    #[must_use]
    pub fn snapshot(identity: &Identity) -> Self {
        Self {
            name: identity.display_name.clone(),
            email: identity.email.to_string(),
            photo_url: identity.photo_url.clone().unwrap_or_default(),
        }
    }
}
