//! # voxel-retrieve
//!
//! All-or-nothing study/series metadata aggregation for the voxel metadata
//! store.
//!
//! The aggregator resolves a scope to its current instance versions through
//! the instance index, fetches each version's metadata document from the
//! external blob store, and refuses to return partial results. Conditional
//! reads short-circuit on a matching ETag without touching the blob store.

pub mod aggregator;
pub mod etag;

// Re-export core types
pub use voxel_core::{Error, EtagGenerator, InstanceMetadata, MetadataStore, Result};

pub use aggregator::{MetadataAggregator, MetadataResponse};
pub use etag::WatermarkEtagGenerator;
