//! Static portfolio pages: about, projects and contact.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use crate::config::SocialLink;
use crate::filters;
use crate::middleware::CspNonce;
use crate::services::github::Repository;
use crate::state::AppState;

/// Skills listed on the about page.
const SKILLS: &[&str] = &[
    "Rust",
    "TypeScript",
    "React & Next.js",
    "Node.js",
    "PostgreSQL",
    "Docker",
    "Git",
    "REST & GraphQL APIs",
];

/// About page template.
#[derive(Template, WebTemplate)]
#[template(path = "about.html")]
pub struct AboutTemplate {
    pub skills: Vec<&'static str>,
    pub nonce: String,
    pub base_url: String,
}

/// Projects page template.
#[derive(Template, WebTemplate)]
#[template(path = "projects.html")]
pub struct ProjectsTemplate {
    pub repositories: Vec<RepositoryView>,
    pub github_user: Option<String>,
    pub error: Option<String>,
    pub nonce: String,
    pub base_url: String,
}

/// Contact page template.
#[derive(Template, WebTemplate)]
#[template(path = "contact.html")]
pub struct ContactTemplate {
    pub email: Option<String>,
    pub links: Vec<SocialLink>,
    pub nonce: String,
    pub base_url: String,
}

/// Repository card data.
#[derive(Debug, Clone)]
pub struct RepositoryView {
    pub name: String,
    pub description: String,
    pub url: String,
    pub homepage: Option<String>,
    pub language: Option<String>,
    pub stars: u64,
    pub forks: u64,
    pub topics: Vec<String>,
    pub updated: String,
}

impl From<&Repository> for RepositoryView {
    fn from(repo: &Repository) -> Self {
        Self {
            name: repo.name.clone(),
            description: repo
                .description
                .clone()
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| "No description available".to_owned()),
            url: repo.html_url.clone(),
            homepage: repo.homepage().map(str::to_owned),
            language: repo.language.clone(),
            stars: repo.stargazers_count,
            forks: repo.forks_count,
            topics: repo.shown_topics().to_vec(),
            updated: repo.updated_at.format("%B %-d, %Y").to_string(),
        }
    }
}

/// Display the about page.
pub async fn about(State(state): State<AppState>, CspNonce(nonce): CspNonce) -> impl IntoResponse {
    AboutTemplate {
        skills: SKILLS.to_vec(),
        nonce,
        base_url: state.config().base_url.clone(),
    }
}

/// Display the latest GitHub repositories.
///
/// A GitHub failure renders the page with an error message instead of
/// failing the request.
#[instrument(skip(state, nonce))]
pub async fn projects(
    State(state): State<AppState>,
    CspNonce(nonce): CspNonce,
) -> impl IntoResponse {
    let feed = state.projects();
    let (repositories, error) = match feed.latest().await {
        Ok(repos) => (repos.iter().map(RepositoryView::from).collect(), None),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load projects");
            (
                Vec::new(),
                Some("Projects could not be loaded right now. Please try again later.".to_owned()),
            )
        }
    };

    ProjectsTemplate {
        repositories,
        github_user: feed.user().map(str::to_owned),
        error,
        nonce,
        base_url: state.config().base_url.clone(),
    }
}

/// Display the contact page.
pub async fn contact(
    State(state): State<AppState>,
    CspNonce(nonce): CspNonce,
) -> impl IntoResponse {
    let profile = &state.config().profile;
    let has_github = profile
        .social_links
        .iter()
        .any(|link| link.name.eq_ignore_ascii_case("github"));
    let github = profile
        .github_user
        .as_ref()
        .filter(|_| !has_github)
        .map(|user| SocialLink {
            name: "GitHub".to_owned(),
            url: format!("https://github.com/{user}"),
        });
    let links = github
        .into_iter()
        .chain(profile.social_links.iter().cloned())
        .collect();

    ContactTemplate {
        email: profile.contact_email.clone(),
        links,
        nonce,
        base_url: state.config().base_url.clone(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn test_repository_view_fills_blanks() {
        let repo = Repository {
            name: "folio".to_owned(),
            description: Some("  ".to_owned()),
            html_url: "https://github.com/me/folio".to_owned(),
            homepage: Some("https://folio.example.com".to_owned()),
            language: Some("Rust".to_owned()),
            stargazers_count: 3,
            forks_count: 1,
            topics: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            updated_at: Utc.with_ymd_and_hms(2024, 3, 4, 5, 6, 7).unwrap(),
            fork: false,
        };

        let view = RepositoryView::from(&repo);
        assert_eq!(view.description, "No description available");
        assert_eq!(view.homepage.as_deref(), Some("https://folio.example.com"));
        assert_eq!(view.topics, vec!["a", "b", "c"]);
        assert_eq!(view.updated, "March 4, 2024");
    }

    #[test]
    fn test_about_lists_skills() {
        let html = AboutTemplate {
            skills: SKILLS.to_vec(),
            nonce: "n".to_owned(),
            base_url: "https://example.com".to_owned(),
        }
        .render()
        .unwrap();

        assert!(html.contains("<li>Rust</li>"));
        assert!(html.contains(r#"href="https://example.com/about""#));
        assert!(html.contains(r#"href="/contact""#));
    }
}
