pub mod retry;

pub use retry::{backoff_delay, RetrySettings, RetryingMutator};
