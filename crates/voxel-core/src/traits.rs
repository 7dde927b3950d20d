//! Core traits for voxel abstractions.
//!
//! These traits define the seams between the control plane and its backing
//! stores and external collaborators, enabling pluggable backends and
//! testability.

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// EXTENDED ATTRIBUTE REGISTRY
// =============================================================================

/// Repository owning extended attribute definitions and their lifecycle.
#[async_trait]
pub trait ExtendedAttributeRepository: Send + Sync {
    /// Register a batch of attribute definitions atomically.
    ///
    /// Either every definition is persisted with a newly assigned key, or
    /// none are. Fails with `AlreadyExists` when any tag already has a
    /// non-Deleting definition, and with `TooManyAttributes` when the
    /// post-insert live count would exceed `max_allowed_count`.
    ///
    /// New rows default to Adding; `mark_ready_immediately` is reserved for
    /// out-of-band loads that need no backfill.
    async fn register(
        &self,
        definitions: Vec<CreateExtendedAttribute>,
        max_allowed_count: usize,
        mark_ready_immediately: bool,
    ) -> Result<Vec<ExtendedAttributeDefinition>>;

    /// Transition the given keys Adding -> Ready.
    ///
    /// Fails if any key does not exist or is not currently Adding; no key is
    /// transitioned in that case.
    async fn mark_ready(&self, keys: &[i64]) -> Result<()>;

    /// Transition the given keys Ready -> Deleting.
    ///
    /// Fails if any key does not exist or is not currently Ready. Physical
    /// purge is an external sweep.
    async fn mark_deleting(&self, keys: &[i64]) -> Result<()>;

    /// Fetch definitions by key. Missing keys are simply absent from the
    /// result; callers decide whether that is an error.
    async fn get_by_keys(&self, keys: &[i64]) -> Result<Vec<ExtendedAttributeDefinition>>;

    /// Look up the live (non-Deleting) definition for a tag, if any.
    async fn get_by_tag(&self, tag: &AttributeTag) -> Result<Option<ExtendedAttributeDefinition>>;

    /// List all definitions, Deleting included, in key order.
    async fn list(&self) -> Result<Vec<ExtendedAttributeDefinition>>;
}

// =============================================================================
// CHANGE FEED & INSTANCE INDEX
// =============================================================================

/// Read access to the append-only change feed.
#[async_trait]
pub trait ChangeFeedRepository: Send + Sync {
    /// Read entries with watermark strictly greater than `offset`, ascending,
    /// bounded by `limit`. A negative offset fails with
    /// `InvalidChangeFeedOffset`.
    ///
    /// Watermarks are assigned mid-transaction, so near the head of the feed
    /// an entry can become visible after a later watermark has already
    /// committed. Consumers should re-poll from their checkpoint rather than
    /// treat a page tail as final.
    async fn read(
        &self,
        partition: Option<&str>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<ChangeFeedEntry>>;

    /// The newest entry, if the feed is non-empty. Used by consumers to
    /// bootstrap a cursor.
    async fn latest(&self, partition: Option<&str>) -> Result<Option<ChangeFeedEntry>>;
}

/// Instance index: version currency plus watermark assignment.
///
/// Every write appends the matching change feed entry in the same
/// transaction, so watermark order matches true commit order.
#[async_trait]
pub trait InstanceIndexRepository: Send + Sync {
    /// Record a new instance version and return its watermark. Replaces any
    /// prior current version for the same triple.
    async fn create_instance(
        &self,
        partition: Option<&str>,
        study_uid: &str,
        series_uid: &str,
        sop_uid: &str,
    ) -> Result<i64>;

    /// Mark the triple's current version as superseded and append a Delete
    /// entry. Returns the watermark of the Delete entry.
    async fn delete_instance(
        &self,
        partition: Option<&str>,
        study_uid: &str,
        series_uid: &str,
        sop_uid: &str,
    ) -> Result<i64>;

    /// Current instance identifiers for a study, in watermark order.
    async fn resolve_study(
        &self,
        partition: Option<&str>,
        study_uid: &str,
    ) -> Result<Vec<VersionedInstanceIdentifier>>;

    /// Current instance identifiers for a series, in watermark order.
    async fn resolve_series(
        &self,
        partition: Option<&str>,
        study_uid: &str,
        series_uid: &str,
    ) -> Result<Vec<VersionedInstanceIdentifier>>;
}

// =============================================================================
// EXTERNAL COLLABORATORS
// =============================================================================

/// Metadata blob store, keyed by versioned instance identifier.
///
/// `Ok(None)` means the blob is absent; the aggregator turns any absence
/// within a scope into `IncompleteMetadata`.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn fetch(&self, identifier: &VersionedInstanceIdentifier) -> Result<Option<JsonValue>>;
}

/// Produces the ETag for a resolved scope. Byte-level format is the
/// implementation's concern.
pub trait EtagGenerator: Send + Sync {
    fn etag(&self, identifiers: &[VersionedInstanceIdentifier]) -> String;
}

/// Client contract for the external durable-orchestration engine.
///
/// Implementations map engine responses but never retry: a 409 on start
/// becomes `AlreadyExists`, a 404 on status becomes `Ok(None)`, and any other
/// non-success becomes `Transport` carrying the original status code.
#[async_trait]
pub trait ReindexClient: Send + Sync {
    /// Launch a backfill for the given attribute keys, returning the opaque
    /// engine-assigned operation id.
    async fn start_reindex(&self, tag_keys: &[i64]) -> Result<String>;

    /// Poll an operation. `Ok(None)` means the engine does not know the id,
    /// which is a routine outcome, not an error.
    async fn get_status(&self, operation_id: &str) -> Result<Option<OperationStatus>>;
}

/// Resolves an `includefield` token to an attribute tag.
pub trait TagResolver: Send + Sync {
    fn resolve(&self, token: &str) -> Option<AttributeTag>;
}
