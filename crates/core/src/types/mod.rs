//! Core types for folio.
//!
//! This module provides type-safe wrappers for the blog's domain concepts.

pub mod email;
pub mod identity;
pub mod post;
pub mod slug;

pub use email::{Email, EmailError};
pub use identity::{Author, Identity};
pub use post::{BlogPost, EXCERPT_LENGTH, parse_tag_list, synthesize_excerpt};
pub use slug::{Slug, SlugError};
