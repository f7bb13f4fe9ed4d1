//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use crate::filters;
use crate::middleware::CspNonce;
use crate::routes::blog::PostView;
use crate::state::AppState;

/// Number of posts featured on the home page.
const FEATURED_POSTS_COUNT: usize = 3;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub recent_posts: Vec<PostView>,
    pub nonce: String,
    pub base_url: String,
}

/// Display the home page with the most recent posts.
#[instrument(skip(state, nonce))]
pub async fn home(State(state): State<AppState>, CspNonce(nonce): CspNonce) -> impl IntoResponse {
    let recent_posts = state
        .blog()
        .recent(FEATURED_POSTS_COUNT)
        .await
        .into_iter()
        .map(PostView::from)
        .collect();

    HomeTemplate {
        recent_posts,
        nonce,
        base_url: state.config().base_url.clone(),
    }
}
