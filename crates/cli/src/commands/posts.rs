//! Post listing and soft delete.

use folio_core::Slug;

use super::{CliError, blog_store};

/// Print every live post, newest first.
///
/// # Errors
///
/// Returns an error if the database cannot be reached.
#[allow(clippy::print_stdout)]
pub async fn list() -> Result<(), CliError> {
    let posts = blog_store().await?.list().await;

    for post in &posts {
        println!(
            "{}  {}  {}",
            post.date.format("%Y-%m-%d"),
            post.slug,
            post.title
        );
    }
    println!("{} post(s)", posts.len());
    Ok(())
}

/// Soft-delete a post by slug.
///
/// # Errors
///
/// Returns an error for an invalid slug or a failed write.
pub async fn delete(slug: &str) -> Result<(), CliError> {
    let slug = Slug::parse(slug).map_err(|_| CliError::InvalidSlug(slug.to_owned()))?;
    blog_store().await?.soft_delete(&slug).await?;
    tracing::info!(%slug, "Post deleted");
    Ok(())
}
