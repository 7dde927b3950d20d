//! # voxel-query
//!
//! Query parameter parsing for the voxel metadata store.
//!
//! This crate turns raw, string-valued query parameters (`offset`, `limit`,
//! `fuzzymatching`, `includefield`) into a validated
//! [`voxel_core::QueryExpressionParams`] consumed by the query execution
//! engine. Parsing is pure and stateless; the recognized parameter set is
//! closed and unknown parameters pass through unmatched.

pub mod builder;
pub mod dictionary;

// Re-export core types
pub use voxel_core::{Error, QueryExpressionParams, Result, TagResolver};

pub use builder::{QueryExpressionBuilder, QueryParam, QueryParserConfig};
pub use dictionary::StandardTagResolver;
