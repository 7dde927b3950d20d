//! # voxel-db
//!
//! PostgreSQL index layer for the voxel metadata store.
//!
//! This crate provides:
//! - Connection pool management
//! - The extended attribute registry (`extended_query_tag`)
//! - The instance index with commit-time watermark assignment
//! - The append-only change feed, written in the same transaction as the
//!   instance-index update it describes
//!
//! ## Example
//!
//! ```rust,ignore
//! use voxel_db::{create_pool, PgInstanceRepository, PgChangeFeedRepository};
//! use voxel_core::{ChangeFeedRepository, InstanceIndexRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = create_pool("postgres://localhost/voxel").await?;
//!
//!     let instances = PgInstanceRepository::new(pool.clone());
//!     let watermark = instances
//!         .create_instance(None, "1.2.3", "1.2.3.4", "1.2.3.4.5")
//!         .await?;
//!
//!     let feed = PgChangeFeedRepository::new(pool);
//!     let entries = feed.read(None, 0, 10).await?;
//!     assert!(entries.iter().any(|e| e.watermark == watermark));
//!     Ok(())
//! }
//! ```

pub mod change_feed;
pub mod extended_attributes;
pub mod instances;
pub mod pool;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use voxel_core::*;

// Re-export repository implementations
pub use change_feed::PgChangeFeedRepository;
pub use extended_attributes::PgExtendedAttributeRepository;
pub use instances::PgInstanceRepository;
pub use pool::{create_pool, create_pool_with_config, PoolConfig};
