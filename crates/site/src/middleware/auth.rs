//! Admin authentication extractor.
//!
//! Every admin page load re-validates the persisted session window before
//! the handler runs. A signed-in admin whose window has ended gets a fresh
//! one; a stale window without an identity sends the browser to login.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use folio_core::Identity;
use tower_sessions::Session;

use crate::services::auth::current_identity;
use crate::session::{SessionStatus, SessionTimer, SessionWindow, SystemClock, TokioScheduler};

/// Login page path.
pub const LOGIN_PATH: &str = "/admin/login";

/// Login page path shown after an expired session.
pub const EXPIRED_LOGIN_PATH: &str = "/admin/login?expired=1";

/// Session timer as used by request handlers.
pub type RequestTimer = SessionTimer<Session, SystemClock, TokioScheduler>;

/// Create a timer over the request's session record.
#[must_use]
pub fn request_timer(session: Session) -> RequestTimer {
    SessionTimer::new(session, SystemClock, TokioScheduler::new())
}

/// Extractor that requires a signed-in admin with an open session window.
///
/// # Example
///
/// ```rust,ignore
/// async fn dashboard(RequireAdmin { identity, .. }: RequireAdmin) -> impl IntoResponse {
///     format!("Hello, {}!", identity.display_name)
/// }
/// ```
pub struct RequireAdmin {
    pub identity: Identity,
    pub window: SessionWindow,
    pub session: Session,
}

/// Rejection when the admin is not signed in.
pub enum AdminRejection {
    /// No identity or no window: back to the login page.
    RedirectToLogin,
    /// The window ended: back to the login page with the expiry notice.
    SessionExpired,
    /// The session layer is missing or the session store failed.
    Unavailable,
}

impl IntoResponse for AdminRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to(LOGIN_PATH).into_response(),
            Self::SessionExpired => Redirect::to(EXPIRED_LOGIN_PATH).into_response(),
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AdminRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AdminRejection::Unavailable)?;

        let mut timer = request_timer(session.clone());
        let status = timer.revalidate().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to resume admin session");
            AdminRejection::Unavailable
        })?;

        let window = match status {
            SessionStatus::Active { window, .. } => window,
            SessionStatus::Expired(_) => return Err(AdminRejection::SessionExpired),
            SessionStatus::Inactive => return Err(AdminRejection::RedirectToLogin),
        };

        let identity = current_identity(&session)
            .await
            .ok_or(AdminRejection::RedirectToLogin)?;

        Ok(Self {
            identity,
            window,
            session,
        })
    }
}
