//! Structured logging field name constants for voxel.
//!
//! All crates use these constants for consistent structured logging fields so
//! log aggregation tools can query by standardized names across subsystems.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, caller-visible failure surfaced |
//! | INFO  | Lifecycle events, operation completions |
//! | DEBUG | Decision points, intermediate values |
//! | TRACE | Per-item iteration (change feed entries, instance fetches) |

/// Subsystem originating the log event.
/// Values: "query", "db", "reindex", "retrieve"
pub const SUBSYSTEM: &str = "subsystem";

/// Logical operation name.
/// Examples: "register", "start_reindex", "read_feed", "retrieve_study"
pub const OPERATION: &str = "op";

/// Partition/tenant key scoping the operation.
pub const PARTITION: &str = "partition";

/// Study instance UID being operated on.
pub const STUDY_UID: &str = "study_uid";

/// Series instance UID being operated on.
pub const SERIES_UID: &str = "series_uid";

/// SOP instance UID being operated on.
pub const SOP_UID: &str = "sop_uid";

/// Change feed / version watermark.
pub const WATERMARK: &str = "watermark";

/// Extended attribute registry key.
pub const TAG_KEY: &str = "tag_key";

/// Orchestration engine operation id.
pub const OPERATION_ID: &str = "operation_id";

/// Elapsed wall-clock time in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Result row/entry count.
pub const COUNT: &str = "count";
