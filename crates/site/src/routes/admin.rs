//! Admin route handlers.
//!
//! Sign-in goes through the browser popup flow: the login page runs the
//! Firebase SDK and posts back either an ID token or the provider's error
//! code. Every other admin page requires [`RequireAdmin`], which re-validates
//! the one-hour session window on each load.

use std::convert::Infallible;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Router,
    extract::{Path, Query, State},
    response::{
        IntoResponse, Redirect, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use chrono::Utc;
use folio_core::{BlogPost, Identity, Slug};
use futures::Stream;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::config::FirebaseConfig;
use crate::error::{AppError, Result, clear_sentry_user, post_breadcrumb, set_sentry_user};
use crate::filters;
use crate::middleware::{CspNonce, RequireAdmin, login_rate_limiter, request_timer};
use crate::routes::blog::PostView;
use crate::services::auth::{SignInAttempt, SignInError};
use crate::session::{
    LogoutReason, SessionNotice, SessionStatus, SessionUpdate, SessionWindow, format_countdown,
};
use crate::state::AppState;
use crate::store::{BlogStoreError, NewPost};

/// Value the delete form must send to confirm.
const DELETE_CONFIRMATION: &str = "yes";

// =============================================================================
// Form Types
// =============================================================================

/// Login form posted by the sign-in script.
#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    pub id_token: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

/// Delete confirmation form.
#[derive(Debug, Deserialize)]
pub struct DeleteForm {
    pub confirm: Option<String>,
}

// =============================================================================
// Query Types
// =============================================================================

/// Query parameters for the login page.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub expired: Option<String>,
}

/// Query parameters for dashboard notices after a write.
#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub saved: Option<String>,
    pub deleted: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Values shown in the post form.
#[derive(Debug, Clone, Default)]
pub struct PostForm {
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub tags: String,
    pub date: String,
}

impl From<&NewPost> for PostForm {
    fn from(post: &NewPost) -> Self {
        Self {
            title: post.title.clone(),
            excerpt: post.excerpt.clone(),
            content: post.content.clone(),
            tags: post.tags.clone(),
            date: post.date.clone(),
        }
    }
}

impl From<&BlogPost> for PostForm {
    fn from(post: &BlogPost) -> Self {
        Self {
            title: post.title.clone(),
            excerpt: post.excerpt.clone(),
            content: post.content.clone(),
            tags: post.tags.join(", "),
            date: post.date.format("%Y-%m-%d").to_string(),
        }
    }
}

/// Session details every admin page shows.
#[derive(Debug, Clone)]
pub struct SessionView {
    pub identity: Identity,
    pub countdown: String,
}

impl SessionView {
    fn new(identity: Identity, window: SessionWindow) -> Self {
        Self {
            identity,
            countdown: format_countdown(window.remaining(Utc::now())),
        }
    }
}

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/login.html")]
pub struct LoginTemplate {
    pub firebase: FirebaseConfig,
    pub notice: Option<String>,
    pub error: Option<String>,
    pub nonce: String,
}

/// Admin dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/dashboard.html")]
pub struct DashboardTemplate {
    pub session: SessionView,
    pub posts: Vec<PostView>,
    pub notice: Option<String>,
    pub form: PostForm,
    pub nonce: String,
}

/// Post create/edit form template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/edit.html")]
pub struct PostFormTemplate {
    pub session: SessionView,
    pub heading: String,
    pub action: String,
    pub form: PostForm,
    pub error: Option<String>,
    pub nonce: String,
}

// =============================================================================
// Sign-in Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
    CspNonce(nonce): CspNonce,
) -> impl IntoResponse {
    LoginTemplate {
        firebase: state.config().firebase.clone(),
        notice: query
            .expired
            .map(|_| SessionNotice::Expired.message().to_owned()),
        error: None,
        nonce,
    }
}

/// Complete a sign-in attempt posted by the login page.
///
/// On success the session id is rotated and the session window established;
/// any failure re-renders the login page with its message.
#[instrument(skip(state, session, nonce, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    CspNonce(nonce): CspNonce,
    Form(form): Form<LoginForm>,
) -> Response {
    let attempt = SignInAttempt::from_form(form.id_token, form.error_code, form.error_message);
    let mut timer = request_timer(session.clone());

    match state.auth().sign_in_with_session(&mut timer, attempt).await {
        Ok((identity, window)) => {
            if let Err(e) = session.cycle_id().await {
                tracing::error!(error = %e, "Failed to rotate session id after sign-in");
            }
            set_sentry_user(identity.email.as_str());
            tracing::info!(
                email = %identity.email,
                expires_at = %window.expires_at,
                "Admin session established"
            );
            Redirect::to("/admin").into_response()
        }
        Err(err) => {
            if matches!(err, SignInError::Storage(_) | SignInError::Session(_)) {
                let event_id = sentry::capture_error(&err);
                tracing::error!(error = %err, sentry_event_id = %event_id, "Sign-in failed");
            }
            LoginTemplate {
                firebase: state.config().firebase.clone(),
                notice: None,
                error: Some(err.user_message().to_owned()),
                nonce,
            }
            .into_response()
        }
    }
}

/// Explicit logout. Silent: no notice is shown.
///
/// # Errors
///
/// Returns an error if the session cannot be cleared.
#[instrument(skip(state, session))]
pub async fn logout(State(state): State<AppState>, session: Session) -> Result<Redirect> {
    state
        .auth()
        .sign_out(&session)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    request_timer(session)
        .force_logout(LogoutReason::UserRequested)
        .await?;
    clear_sentry_user();

    Ok(Redirect::to("/admin/login"))
}

// =============================================================================
// Dashboard & Post Routes
// =============================================================================

/// Display the dashboard: identity, countdown, create form and post list.
#[instrument(skip_all)]
pub async fn dashboard(
    State(state): State<AppState>,
    RequireAdmin {
        identity, window, ..
    }: RequireAdmin,
    Query(query): Query<DashboardQuery>,
    CspNonce(nonce): CspNonce,
) -> impl IntoResponse {
    let posts = state
        .blog()
        .list()
        .await
        .into_iter()
        .map(PostView::from)
        .collect();

    let notice = query
        .saved
        .map(|slug| format!("Saved \"{slug}\"."))
        .or_else(|| query.deleted.map(|slug| format!("Deleted \"{slug}\".")));

    DashboardTemplate {
        session: SessionView::new(identity, window),
        posts,
        notice,
        form: PostForm::default(),
        nonce,
    }
}

/// Create a post from the dashboard form.
///
/// # Errors
///
/// Store failures are returned; validation failures re-render the form.
#[instrument(skip_all, fields(title = %post.title))]
pub async fn create_post(
    State(state): State<AppState>,
    RequireAdmin {
        identity, window, ..
    }: RequireAdmin,
    CspNonce(nonce): CspNonce,
    Form(post): Form<NewPost>,
) -> Result<Response> {
    let form = PostForm::from(&post);

    match state.blog().create(post, &identity).await {
        Ok(created) => {
            post_breadcrumb("Post saved", &created.slug);
            Ok(saved_redirect(&created.slug))
        }
        Err(BlogStoreError::Validation(message)) => Ok(PostFormTemplate {
            session: SessionView::new(identity, window),
            heading: "New post".to_owned(),
            action: "/admin/posts".to_owned(),
            form,
            error: Some(message),
            nonce,
        }
        .into_response()),
        Err(e) => Err(e.into()),
    }
}

/// Display the edit form for a post.
///
/// # Errors
///
/// Returns 404 if the post doesn't exist or was deleted.
#[instrument(skip(state, admin, nonce))]
pub async fn edit_post(
    State(state): State<AppState>,
    admin: RequireAdmin,
    Path(slug): Path<String>,
    CspNonce(nonce): CspNonce,
) -> Result<impl IntoResponse> {
    let post = state
        .blog()
        .get(&slug)
        .await
        .ok_or_else(|| AppError::NotFound(slug.clone()))?;

    Ok(PostFormTemplate {
        session: SessionView::new(admin.identity, admin.window),
        heading: format!("Edit \"{}\"", post.title),
        action: format!("/admin/posts/{}", post.slug),
        form: PostForm::from(&post),
        error: None,
        nonce,
    })
}

/// Save edits to a post. The slug never changes.
///
/// # Errors
///
/// Returns 404 for unknown slugs and store failures; validation failures
/// re-render the form.
#[instrument(skip(state, admin, nonce, post))]
pub async fn update_post(
    State(state): State<AppState>,
    admin: RequireAdmin,
    Path(slug): Path<String>,
    CspNonce(nonce): CspNonce,
    Form(post): Form<NewPost>,
) -> Result<Response> {
    let slug = parse_slug(&slug)?;
    let form = PostForm::from(&post);

    match state.blog().update(&slug, post).await {
        Ok(updated) => {
            post_breadcrumb("Post updated", &updated.slug);
            Ok(saved_redirect(&updated.slug))
        }
        Err(BlogStoreError::Validation(message)) => Ok(PostFormTemplate {
            session: SessionView::new(admin.identity, admin.window),
            heading: format!("Edit \"{}\"", form.title),
            action: format!("/admin/posts/{slug}"),
            form,
            error: Some(message),
            nonce,
        }
        .into_response()),
        Err(e) => Err(e.into()),
    }
}

/// Soft-delete a post. The form must carry the confirmation field.
///
/// # Errors
///
/// Returns 400 without confirmation and the store error if the write fails.
#[instrument(skip(state, _admin, form))]
pub async fn delete_post(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(slug): Path<String>,
    Form(form): Form<DeleteForm>,
) -> Result<Redirect> {
    if form.confirm.as_deref().map(str::trim) != Some(DELETE_CONFIRMATION) {
        return Err(AppError::BadRequest("Deletion must be confirmed".to_owned()));
    }

    let slug = parse_slug(&slug)?;
    state.blog().soft_delete(&slug).await?;
    post_breadcrumb("Post deleted", &slug);

    Ok(Redirect::to(&format!("/admin?deleted={slug}")))
}

// =============================================================================
// Session Events
// =============================================================================

fn tick_event(countdown: String) -> std::result::Result<Event, Infallible> {
    Ok(Event::default().event("tick").data(countdown))
}

fn expired_event(notice: SessionNotice) -> std::result::Result<Event, Infallible> {
    Ok(Event::default().event("expired").data(notice.message()))
}

/// Stream the session countdown once per second and a single `expired`
/// event at the deadline.
///
/// At expiry the session record is saved without the identity, so the next
/// page load lands on the login page.
pub async fn session_events(
    admin: RequireAdmin,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let mut timer = request_timer(admin.session);

    let stream = async_stream::stream! {
        match timer.resume_session().await {
            Ok(SessionStatus::Active { .. }) => {}
            Ok(_) => {
                yield expired_event(SessionNotice::Expired);
                return;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to resume session for event stream");
                return;
            }
        }

        if let Some(countdown) = timer.countdown() {
            yield tick_event(countdown);
        }

        loop {
            match timer.next_event().await {
                Ok(Some(SessionUpdate::Countdown(countdown))) => yield tick_event(countdown),
                Ok(Some(SessionUpdate::Expired(notice))) => {
                    clear_sentry_user();
                    yield expired_event(notice);
                    break;
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(error = %e, "Session timer failed");
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

// =============================================================================
// Helpers
// =============================================================================

fn parse_slug(raw: &str) -> Result<Slug> {
    Slug::parse(raw).map_err(|_| AppError::NotFound(raw.to_owned()))
}

fn saved_redirect(slug: &Slug) -> Response {
    Redirect::to(&format!("/admin?saved={slug}")).into_response()
}

/// Create the admin routes router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard))
        .route(
            "/login",
            get(login_page).merge(post(login).layer(login_rate_limiter())),
        )
        .route("/logout", post(logout))
        .route("/posts", post(create_post))
        .route("/posts/{slug}", post(update_post))
        .route("/posts/{slug}/edit", get(edit_post))
        .route("/posts/{slug}/delete", post(delete_post))
        .route("/session/events", get(session_events))
}
