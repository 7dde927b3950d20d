//! # voxel-reindex
//!
//! Reindex coordination for the voxel metadata store.
//!
//! When a new extended attribute is registered, existing records must be
//! backfilled into the index before the attribute becomes searchable. That
//! backfill runs out of process in a durable-orchestration engine; this
//! crate validates and launches it, and polls its status.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use voxel_reindex::{HttpReindexClient, ReindexClientConfig, ReindexCoordinator};
//!
//! let engine = Arc::new(HttpReindexClient::new(
//!     ReindexClientConfig::new("http://localhost:7071/api"),
//! ));
//! let coordinator = ReindexCoordinator::new(registry, engine);
//!
//! let operation_id = coordinator.start_reindex(&[1, 2]).await?;
//! while let Some(status) = coordinator.get_status(&operation_id).await? {
//!     if status.status.is_terminal() {
//!         break;
//!     }
//! }
//! ```

pub mod client;
pub mod coordinator;
pub mod mock;

// Re-export core types
pub use voxel_core::{
    Error, OperationRuntimeStatus, OperationStatus, OperationType, ReindexClient, Result,
};

pub use client::{HttpReindexClient, ReindexClientConfig};
pub use coordinator::ReindexCoordinator;
pub use mock::MockReindexClient;
