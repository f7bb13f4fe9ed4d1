//! Markdown post import.
//!
//! Reads every `*.md` file in a directory, takes the post metadata from YAML
//! frontmatter and writes it through [`BlogStore::import`]. The slug is the
//! file stem. A file that fails to parse or write is logged and skipped.
//!
//! ```markdown
//! ---
//! title: Hello World
//! date: 2024-03-01
//! author: Ada Lovelace
//! tags: [rust, notes]
//! excerpt: Optional summary
//! ---
//!
//! Body in Markdown or HTML.
//! ```

use std::path::{Path, PathBuf};

use folio_core::Slug;
use folio_site::store::{
    BlogStore, DocumentStore, ImportedPost, coerce_author, coerce_instant, coerce_tags,
};
use gray_matter::{Matter, ParsedEntity, engine::YAML};
use serde_json::Value;
use thiserror::Error;

use super::{CliError, blog_store};

/// Why a single file could not be imported.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("failed to parse frontmatter: {0}")]
    Frontmatter(String),
    #[error("missing frontmatter")]
    MissingFrontmatter,
    #[error("frontmatter has no title")]
    MissingTitle,
    #[error("'{0}' cannot be turned into a slug")]
    InvalidSlug(String),
}

/// Outcome of an import run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    pub failed: usize,
}

/// Import every Markdown file in `dir` into the configured database.
///
/// # Errors
///
/// Returns an error if the directory cannot be read or the database is
/// unreachable. Per-file failures are counted, not returned.
pub async fn run(dir: &Path, dry_run: bool) -> Result<ImportReport, CliError> {
    if dry_run {
        tracing::info!("Dry run: nothing will be written");
        return Ok(dry_run_dir(dir)?);
    }
    let store = blog_store().await?;
    import_dir(&store, dir).await
}

/// Import every Markdown file in `dir` through `store`.
///
/// # Errors
///
/// Returns an error only if the directory cannot be read.
pub async fn import_dir<D: DocumentStore>(
    store: &BlogStore<D>,
    dir: &Path,
) -> Result<ImportReport, CliError> {
    let mut report = ImportReport::default();

    for path in markdown_files(dir)? {
        let post = match load_file(&path) {
            Ok(post) => post,
            Err(e) => {
                tracing::error!("Skipping {:?}: {}", path, e);
                report.failed += 1;
                continue;
            }
        };

        match store.import(post).await {
            Ok(post) => {
                tracing::info!("Imported post: {}", post.slug);
                report.imported += 1;
            }
            Err(e) => {
                tracing::error!("Failed to import {:?}: {}", path, e);
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

fn dry_run_dir(dir: &Path) -> Result<ImportReport, CliError> {
    let mut report = ImportReport::default();
    for path in markdown_files(dir)? {
        match load_file(&path) {
            Ok(post) => {
                tracing::info!(slug = %post.slug, title = %post.title, "Would import");
                report.imported += 1;
            }
            Err(e) => {
                tracing::error!("Skipping {:?}: {}", path, e);
                report.failed += 1;
            }
        }
    }
    Ok(report)
}

/// `*.md` files directly inside `dir`, sorted by name.
fn markdown_files(dir: &Path) -> Result<Vec<PathBuf>, CliError> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "md"))
        .collect();
    paths.sort();
    Ok(paths)
}

#[derive(Debug, Error)]
enum LoadError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

fn load_file(path: &Path) -> Result<ImportedPost, LoadError> {
    let text = std::fs::read_to_string(path)?;
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    Ok(parse_post_file(stem, &text)?)
}

/// Parse one Markdown file into an importable post.
///
/// `stem` is the file name without `.md`. It is used as the slug when it is
/// already a valid slug and slugified otherwise.
///
/// # Errors
///
/// Returns a [`ParseError`] for broken or missing frontmatter, a missing
/// title, or a stem with nothing slug-worthy in it.
pub fn parse_post_file(stem: &str, text: &str) -> Result<ImportedPost, ParseError> {
    let slug = Slug::parse(stem)
        .or_else(|_| Slug::from_title(stem))
        .map_err(|_| ParseError::InvalidSlug(stem.to_owned()))?;

    let matter = Matter::<YAML>::new();
    let parsed: ParsedEntity<Value> = matter
        .parse(text)
        .map_err(|e| ParseError::Frontmatter(e.to_string()))?;
    let Some(Value::Object(meta)) = parsed.data else {
        return Err(ParseError::MissingFrontmatter);
    };

    let title = meta
        .get("title")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(ParseError::MissingTitle)?
        .to_owned();

    Ok(ImportedPost {
        slug,
        title,
        content: parsed.content.trim().to_owned(),
        excerpt: meta
            .get("excerpt")
            .and_then(Value::as_str)
            .map(str::to_owned),
        tags: coerce_tags(meta.get("tags")),
        date: meta.get("date").and_then(coerce_instant),
        author: meta.get("author").map(|a| coerce_author(Some(a))),
    })
}
