//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

use crate::content;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Returns the estimated reading time of a post body in minutes.
///
/// Usage in templates: `{{ post.content|reading_time }} min read`
#[askama::filter_fn]
pub fn reading_time(body: impl Display, _env: &dyn askama::Values) -> askama::Result<u32> {
    Ok(content::reading_time_minutes(&body.to_string()))
}
