//! Auth module
//!
//! Credential modes, the token resolver and the bundled file backed profile store.

pub mod credential;
pub mod profile_store;
pub mod resolver;

pub use credential::{AccessToken, Credential};
pub use profile_store::FileProfileStore;
pub use resolver::{TokenProvider, TokenResolver};
