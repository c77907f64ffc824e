//! # Google Workspace Directory Library
//!
//! Provides the retrieval core every Admin Directory call is built on:
//! resolving a bearer token, executing one request, following page tokens,
//! retrying rate limited mutations, and normalizing JSON answers.
//!
//! Modules:
//! - `config`: service configuration, loading and validation
//! - `auth`: credential modes, token resolver, file backed profile store
//! - `transport`: request description and the single-call executor
//! - `fetch`: paginated collection retrieval
//! - `resilience`: rate limit retry with full-jitter exponential backoff
//! - `normalize`: JSON to ordered records/lists/scalars
//! - `directory`: users, groups, members, org units, roles, customers

pub mod auth;
pub mod config;
pub mod directory;
pub mod error;
pub mod fetch;
pub mod helpers;
pub mod normalize;
pub mod observability;
pub mod resilience;
pub mod transport;
pub mod utils;

#[cfg(test)]
pub mod tests;

pub use crate::config::settings::{ApiSettings, ServiceConfig};
pub use crate::directory::DirectoryClient;
pub use crate::error::{DirectoryError, Result};
pub use crate::normalize::{normalize, NormalizedValue};
