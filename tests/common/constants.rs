//! Shared constants for end-to-end tests

// ============================================================================
// Test Users
// ============================================================================

/// Owner of most jobs created in tests
pub const TEST_USER_ID: i64 = 1001;

/// A second user, for ownership isolation checks
pub const OTHER_USER_ID: i64 = 2002;

// ============================================================================
// Scan Targets
// ============================================================================

/// Target that maps to the competitor scenario (score 85)
pub const COMPETITOR_TARGET: &str = "https://competitor-x.com";

/// Target that maps to the own-brand scenario (score 92)
pub const OWN_BRAND_TARGET: &str = "https://example.com/product";

pub const COMPETITOR_SCORE: i64 = 85;
pub const OWN_BRAND_SCORE: i64 = 92;

// ============================================================================
// Status Codes
// ============================================================================

pub const STATUS_PENDING: i64 = 0;
pub const STATUS_COMPLETED: i64 = 2;

// ============================================================================
// Timeouts
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Timeout for individual HTTP requests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Polling interval when waiting for server ready (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;

/// Poll interval used by servers spawned with a background poller (milliseconds)
pub const FAST_POLL_INTERVAL_MS: u64 = 50;
