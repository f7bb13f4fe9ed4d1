//! Admin authentication.
//!
//! The browser runs the provider's popup flow and posts back either an ID
//! token or the provider's error code. The gate verifies the token with an
//! [`IdentityProvider`], checks the email against the [`AllowList`] and only
//! then stores the identity for the browser context.

mod error;
mod firebase;

pub use error::SignInError;
pub use firebase::FirebaseIdentityProvider;

use std::future::Future;

use folio_core::{Email, Identity};

use crate::session::{Clock, ContextStorage, Scheduler, SessionTimer, SessionWindow, StorageError};

/// Storage key holding the signed-in identity as JSON.
pub const IDENTITY_KEY: &str = "admin_identity";

/// Something that can turn a sign-in token into a verified identity.
pub trait IdentityProvider: Send + Sync {
    /// Verify an ID token produced by the browser sign-in flow.
    fn verify(&self, id_token: &str) -> impl Future<Output = Result<Identity, SignInError>> + Send;
}

/// What the login form posted back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInAttempt {
    /// The popup flow succeeded and produced an ID token.
    Token(String),
    /// The popup flow failed with a provider error code.
    Failed {
        code: String,
        message: Option<String>,
    },
}

impl SignInAttempt {
    /// Build an attempt from the login form fields. A token wins over an
    /// error code; neither is treated as an unknown failure.
    #[must_use]
    pub fn from_form(
        id_token: Option<String>,
        error_code: Option<String>,
        error_message: Option<String>,
    ) -> Self {
        match id_token.filter(|t| !t.trim().is_empty()) {
            Some(token) => Self::Token(token),
            None => Self::Failed {
                code: error_code.unwrap_or_default(),
                message: error_message,
            },
        }
    }
}

// =============================================================================
// Allow-list
// =============================================================================

/// Fixed set of email addresses permitted to sign in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    emails: Vec<Email>,
}

impl AllowList {
    /// Parse a delimited list (commas, semicolons or whitespace).
    ///
    /// Invalid entries are logged and skipped.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let mut emails: Vec<Email> = Vec::new();
        for entry in raw
            .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
            .filter(|e| !e.is_empty())
        {
            match Email::parse(entry) {
                Ok(email) => {
                    if !emails.iter().any(|e| e.eq_ignore_case(&email)) {
                        emails.push(email);
                    }
                }
                Err(e) => tracing::warn!(entry, error = %e, "Ignoring invalid allow-list entry"),
            }
        }
        Self { emails }
    }

    /// Whether the email is allowed (ASCII case-insensitive).
    #[must_use]
    pub fn contains(&self, email: &Email) -> bool {
        self.emails.iter().any(|allowed| allowed.eq_ignore_case(email))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.emails.len()
    }
}

// =============================================================================
// Gate
// =============================================================================

/// Restricts admin sign-in to allow-listed identities.
#[derive(Debug, Clone)]
pub struct AuthGate<P> {
    provider: P,
    allow_list: AllowList,
}

impl<P: IdentityProvider> AuthGate<P> {
    #[must_use]
    pub const fn new(provider: P, allow_list: AllowList) -> Self {
        Self {
            provider,
            allow_list,
        }
    }

    #[must_use]
    pub const fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    /// Complete a sign-in attempt.
    ///
    /// On success the identity becomes the active session subject. A verified
    /// identity that is not allow-listed is signed straight back out.
    ///
    /// # Errors
    ///
    /// Returns the mapped provider failure, [`SignInError::Unauthorized`] for
    /// identities outside the allow-list, or a storage error.
    pub async fn sign_in<S: ContextStorage>(
        &self,
        storage: &S,
        attempt: SignInAttempt,
    ) -> Result<Identity, SignInError> {
        let identity = match attempt {
            SignInAttempt::Token(token) => self.provider.verify(&token).await?,
            SignInAttempt::Failed { code, message } => {
                let err = SignInError::from_code(&code, message.as_deref());
                tracing::info!(code = %code, error = %err, "Sign-in flow failed in browser");
                return Err(err);
            }
        };

        if !self.allow_list.contains(&identity.email) {
            tracing::warn!(email = %identity.email, "Unauthorized sign-in attempt");
            clear_identity(storage).await?;
            return Err(SignInError::Unauthorized);
        }

        let encoded = serde_json::to_string(&identity).map_err(StorageError::from)?;
        storage.set(IDENTITY_KEY, encoded).await?;
        tracing::info!(email = %identity.email, "Admin signed in");
        Ok(identity)
    }

    /// Sign in and, only on success, establish the session window.
    ///
    /// # Errors
    ///
    /// Same as [`AuthGate::sign_in`], plus session storage failures.
    pub async fn sign_in_with_session<S, C, K>(
        &self,
        timer: &mut SessionTimer<S, C, K>,
        attempt: SignInAttempt,
    ) -> Result<(Identity, SessionWindow), SignInError>
    where
        S: ContextStorage,
        C: Clock,
        K: Scheduler,
    {
        let identity = self.sign_in(timer.storage(), attempt).await?;
        let window = timer.establish().await?;
        Ok((identity, window))
    }

    /// Clear the identity unconditionally.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be written.
    pub async fn sign_out<S: ContextStorage>(&self, storage: &S) -> Result<(), SignInError> {
        clear_identity(storage).await?;
        Ok(())
    }
}

/// Read the signed-in identity, if any. Unreadable values count as signed out.
pub async fn current_identity<S: ContextStorage>(storage: &S) -> Option<Identity> {
    let raw = match storage.get(IDENTITY_KEY).await {
        Ok(raw) => raw?,
        Err(e) => {
            tracing::error!(error = %e, "Failed to read admin identity");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(identity) => Some(identity),
        Err(e) => {
            tracing::warn!(error = %e, "Discarding unreadable admin identity");
            None
        }
    }
}

/// Remove the signed-in identity.
///
/// # Errors
///
/// Returns an error if storage cannot be written.
pub async fn clear_identity<S: ContextStorage>(storage: &S) -> Result<(), StorageError> {
    storage.remove(IDENTITY_KEY).await
}
