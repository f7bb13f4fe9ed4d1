//! Folio Core - Shared domain types.
//!
//! This crate provides the types shared by every folio component:
//! - `site` - Public portfolio/blog plus the single-admin editor
//! - `cli` - Migrations, bulk import and post maintenance
//!
//! # Architecture
//!
//! The core crate contains only types and pure helpers - no I/O, no database
//! access, no HTTP clients. Normalization of loosely-typed stored records lives
//! in the site's store adapter; this crate only describes the clean shapes.
//!
//! # Modules
//!
//! - [`types`] - Slugs, emails, identities, authors and blog posts

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
