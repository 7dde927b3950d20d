//! # voxel-core
//!
//! Core types, traits, and abstractions for the voxel imaging metadata store.
//!
//! This crate provides the foundational data structures and trait definitions
//! that the other voxel crates depend on: the error type, domain models
//! (attribute tags, change feed entries, versioned instance identifiers,
//! operation status views), and the repository/client seams.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
