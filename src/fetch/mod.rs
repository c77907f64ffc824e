//! Fetch module
//!
//! Paged collection retrieval over the transport executor.

pub mod paginate;

pub use paginate::{Page, PaginatedFetcher, PaginationSettings};
