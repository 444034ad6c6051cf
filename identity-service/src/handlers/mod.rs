//! HTTP handlers for the identity endpoints.

pub mod auth;
pub mod profile;
pub mod social;

pub use auth::*;
pub use profile::*;
pub use social::*;
