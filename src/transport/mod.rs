//! Transport module
//!
//! Request description and the executor that performs exactly one HTTP call.

pub mod executor;
pub mod request;

pub use executor::{ExecuteRequest, HttpOutcome, RequestExecutor};
pub use request::ApiRequest;
