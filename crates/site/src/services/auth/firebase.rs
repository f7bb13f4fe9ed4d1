//! Firebase Authentication identity provider.
//!
//! Verifies the ID token produced by the browser's Google popup sign-in by
//! looking the account up through the Identity Toolkit REST API.

use std::time::Duration;

use serde::Deserialize;
use url::Url;

use folio_core::{Email, Identity};

use super::{IdentityProvider, SignInError};
use crate::config::FirebaseConfig;

/// Identity Toolkit account lookup endpoint.
const LOOKUP_URL: &str = "https://identitytoolkit.googleapis.com/v1/accounts:lookup";

/// Upper bound for one lookup request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Identity provider backed by Firebase Authentication.
#[derive(Debug, Clone)]
pub struct FirebaseIdentityProvider {
    client: reqwest::Client,
    lookup_url: Url,
}

impl FirebaseIdentityProvider {
    /// Create a provider for the configured Firebase project.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build or the endpoint
    /// cannot be formed.
    pub fn new(config: &FirebaseConfig) -> Result<Self, SignInError> {
        Self::with_endpoint(config, LOOKUP_URL)
    }

    /// Create a provider that talks to a different lookup endpoint, such as
    /// the Firebase Auth emulator.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build or the endpoint
    /// cannot be formed.
    pub fn with_endpoint(config: &FirebaseConfig, endpoint: &str) -> Result<Self, SignInError> {
        let lookup_url = Url::parse_with_params(endpoint, &[("key", config.api_key.as_str())])
            .map_err(|e| SignInError::Unknown(format!("Invalid lookup endpoint: {e}")))?;

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SignInError::Unknown(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, lookup_url })
    }
}

impl IdentityProvider for FirebaseIdentityProvider {
    #[tracing::instrument(skip_all)]
    async fn verify(&self, id_token: &str) -> Result<Identity, SignInError> {
        let body = serde_json::json!({ "idToken": id_token });

        let response = self
            .client
            .post(self.lookup_url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Identity lookup request failed");
                SignInError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), %message, "Identity lookup rejected");
            return Err(SignInError::Unknown(
                "Could not verify your sign-in. Please try again.".to_owned(),
            ));
        }

        let lookup: LookupResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to parse identity lookup response");
            SignInError::Unknown("Unexpected response from the sign-in provider.".to_owned())
        })?;

        identity_from_lookup(lookup)
    }
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    display_name: Option<String>,
    photo_url: Option<String>,
}

fn identity_from_lookup(lookup: LookupResponse) -> Result<Identity, SignInError> {
    let user = lookup
        .users
        .into_iter()
        .next()
        .ok_or_else(|| SignInError::Unknown("No account found for this sign-in.".to_owned()))?;

    let email = user
        .email
        .as_deref()
        .map(Email::parse)
        .transpose()
        .ok()
        .flatten()
        .ok_or_else(|| {
            SignInError::Unknown("Your account does not have a usable email address.".to_owned())
        })?;

    if !user.email_verified {
        return Err(SignInError::Unknown(
            "Your email address has not been verified.".to_owned(),
        ));
    }

    let display_name = user
        .display_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| email.to_string());

    Ok(Identity {
        email,
        display_name,
        photo_url: user.photo_url.filter(|url| !url.is_empty()),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<Identity, SignInError> {
        identity_from_lookup(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn test_identity_from_lookup() {
        let identity = parse(
            r#"{"kind":"identitytoolkit#GetAccountInfoResponse","users":[{
                "localId":"abc","email":"owner@example.com","emailVerified":true,
                "displayName":"Site Owner","photoUrl":"https://example.com/me.png"}]}"#,
        )
        .unwrap();

        assert_eq!(identity.email.as_str(), "owner@example.com");
        assert_eq!(identity.display_name, "Site Owner");
        assert_eq!(identity.photo_url.as_deref(), Some("https://example.com/me.png"));
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        let identity =
            parse(r#"{"users":[{"email":"owner@example.com","emailVerified":true}]}"#).unwrap();
        assert_eq!(identity.display_name, "owner@example.com");
        assert_eq!(identity.photo_url, None);
    }

    #[test]
    fn test_lookup_rejects_unusable_accounts() {
        assert!(parse(r#"{"users":[]}"#).is_err());
        assert!(parse("{}").is_err());
        assert!(parse(r#"{"users":[{"emailVerified":true}]}"#).is_err());
        assert!(parse(r#"{"users":[{"email":"owner@example.com","emailVerified":false}]}"#).is_err());
    }

    #[test]
    fn test_lookup_url_carries_api_key() {
        let config = FirebaseConfig {
            api_key: "AIzaTestKey".to_owned(),
            auth_domain: "folio.firebaseapp.com".to_owned(),
            project_id: "folio".to_owned(),
        };
        let provider = FirebaseIdentityProvider::new(&config).unwrap();
        assert_eq!(
            provider.lookup_url.as_str(),
            "https://identitytoolkit.googleapis.com/v1/accounts:lookup?key=AIzaTestKey"
        );
    }
}
