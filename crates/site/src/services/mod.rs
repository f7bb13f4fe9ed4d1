//! Services wrapping external providers.
//!
//! - `auth` - Admin sign-in through the identity provider, gated by the
//!   allow-list
//! - `github` - Public repository listing for the projects page

pub mod auth;
pub mod github;
