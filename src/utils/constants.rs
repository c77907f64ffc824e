//! Shared constants and invariants

pub const DEFAULT_BASE_URL: &str = "https://admin.googleapis.com/admin/directory/v1";
pub const DEFAULT_CUSTOMER: &str = "my_customer";
pub const DEFAULT_USER_AGENT: &str = concat!("gdirectory/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 30_000;

// Retry budget for rate limited mutations
pub const MIN_RETRY_ATTEMPTS: u32 = 1;
pub const MAX_RETRY_ATTEMPTS: u32 = 5;
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 5;
pub const DEFAULT_BASE_DELAY_MS: u64 = 1000;
/// the provider's "retry later" answer on creation calls
pub const RATE_LIMITED_STATUS: u16 = 503;

// Pagination wire names
pub const NEXT_PAGE_TOKEN_FIELD: &str = "nextPageToken";
pub const PAGE_TOKEN_PARAM: &str = "pageToken";
pub const MAX_RESULTS_PARAM: &str = "maxResults";
pub const MAX_RESULTS_LIMIT: u32 = 500;

pub const DEFAULT_CONFIG_PATH: &str = "gdirectory.yaml";
