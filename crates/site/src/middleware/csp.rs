//! Content Security Policy: per-request nonce and policy construction.
//!
//! Inline scripts (the sign-in bootstrap and the session countdown) carry
//! the request nonce. The only third-party origins allowed are the ones the
//! Firebase popup sign-in needs.

use axum::{
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use base64::{Engine, engine::general_purpose::STANDARD};
use rand::RngCore;

/// Origin serving the Firebase JS SDK.
const FIREBASE_SDK_ORIGIN: &str = "https://www.gstatic.com";

/// Origins the Firebase SDK calls during sign-in.
const FIREBASE_API_ORIGINS: &str = "https://identitytoolkit.googleapis.com \
                                    https://securetoken.googleapis.com \
                                    https://apis.google.com";

/// Origin of Google profile photos.
const PROFILE_PHOTO_ORIGIN: &str = "https://lh3.googleusercontent.com";

/// A CSP nonce value for inline scripts.
///
/// Each request gets a unique, cryptographically random nonce (128-bit, base64-encoded).
#[derive(Clone, Debug)]
pub struct CspNonce(pub String);

impl CspNonce {
    /// Generate a new random nonce.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::rng().fill_bytes(&mut bytes);
        Self(STANDARD.encode(bytes))
    }

    /// Get the nonce value for use in templates.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.0
    }
}

/// Middleware that generates a CSP nonce and stores it in request extensions.
///
/// Must run before `security_headers_middleware` so the nonce is available
/// when building the CSP header.
pub async fn csp_nonce_middleware(mut request: Request, next: Next) -> Response {
    let nonce = CspNonce::generate();
    request.extensions_mut().insert(nonce.clone());

    let mut response = next.run(request).await;
    response.extensions_mut().insert(nonce);
    response
}

impl<S> FromRequestParts<S> for CspNonce
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Self>().cloned().unwrap_or_else(|| {
            tracing::warn!(
                "CSP nonce not found in request extensions - middleware may be misconfigured"
            );
            Self(String::new())
        }))
    }
}

/// Build the policy for one response.
///
/// `auth_domain` is the Firebase auth domain hosting the sign-in popup
/// helper frame.
#[must_use]
pub fn content_security_policy(nonce: Option<&str>, auth_domain: &str) -> String {
    let script_nonce = nonce
        .filter(|n| !n.is_empty())
        .map(|n| format!(" 'nonce-{n}'"))
        .unwrap_or_default();

    format!(
        "default-src 'none'; \
         script-src 'self'{script_nonce} {FIREBASE_SDK_ORIGIN} https://apis.google.com; \
         style-src 'self'; \
         font-src 'self'; \
         img-src 'self' {PROFILE_PHOTO_ORIGIN}; \
         connect-src 'self' {FIREBASE_API_ORIGINS}; \
         frame-src https://{auth_domain}; \
         object-src 'none'; \
         base-uri 'self'; \
         form-action 'self'; \
         frame-ancestors 'none'; \
         upgrade-insecure-requests"
    )
}
