//! Shared constants for end-to-end tests

// ============================================================================
// Timeouts
// ============================================================================

/// Maximum time to wait for a spawned server to answer
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Delay between readiness polls
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 20;

/// Timeout of every request made by the test client
pub const REQUEST_TIMEOUT_SECS: u64 = 5;

// ============================================================================
// Catalogs
// ============================================================================

/// Name of the Sql catalog created by the fixtures
pub const SQL_CATALOG_NAME: &str = "shop";

/// Item whose name matches the free-text query "mug"
#[allow(dead_code)]
pub const MUG_QUERY: &str = "mug";
