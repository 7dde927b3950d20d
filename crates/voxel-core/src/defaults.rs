//! Centralized default constants for the voxel metadata store.
//!
//! All crates reference these constants instead of defining their own magic
//! numbers.

// =============================================================================
// QUERY
// =============================================================================

/// Hard upper bound for the `limit` query parameter.
pub const MAX_QUERY_RESULT_COUNT: i64 = 200;

/// Default page size when `limit` is not supplied.
pub const DEFAULT_QUERY_RESULT_COUNT: i64 = 100;

// =============================================================================
// EXTENDED ATTRIBUTES
// =============================================================================

/// Default maximum number of live (non-Deleting) extended attributes.
pub const MAX_EXTENDED_ATTRIBUTES: usize = 128;

// =============================================================================
// CHANGE FEED
// =============================================================================

/// Default page size for change feed reads.
pub const CHANGE_FEED_PAGE_LIMIT: i64 = 10;

/// Hard upper bound for a single change feed read.
pub const CHANGE_FEED_MAX_LIMIT: i64 = 100;

// =============================================================================
// ORCHESTRATION ENGINE
// =============================================================================

/// Request timeout for orchestration engine calls (seconds).
pub const ENGINE_TIMEOUT_SECS: u64 = 30;

/// Default route for starting a reindex operation, relative to the base URL.
pub const ENGINE_START_REINDEX_ROUTE: &str = "reindex";

/// Default route prefix for operation status, relative to the base URL.
pub const ENGINE_OPERATION_STATUS_ROUTE: &str = "operations";
