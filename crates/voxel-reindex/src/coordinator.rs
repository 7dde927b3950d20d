//! Reindex coordination.
//!
//! The coordinator validates locally, delegates execution to the engine, and
//! reports status. It never mutates registry state itself: callers observe a
//! Completed status and then invoke the registry's `mark_ready`.

use std::sync::Arc;

use tracing::{debug, info};

use voxel_core::{
    Error, ExtendedAttributeRepository, OperationStatus, ReindexClient, Result, TagStatus,
};

/// Starts and polls backfill operations for newly registered attributes.
pub struct ReindexCoordinator {
    attributes: Arc<dyn ExtendedAttributeRepository>,
    engine: Arc<dyn ReindexClient>,
}

impl ReindexCoordinator {
    pub fn new(
        attributes: Arc<dyn ExtendedAttributeRepository>,
        engine: Arc<dyn ReindexClient>,
    ) -> Self {
        Self { attributes, engine }
    }

    /// Start a backfill for the given attribute keys.
    ///
    /// Every key must reference an Adding-state definition. An overlapping
    /// in-flight operation surfaces as `AlreadyExists`; starting is
    /// idempotent-safe and never silently merges work.
    pub async fn start_reindex(&self, tag_keys: &[i64]) -> Result<String> {
        if tag_keys.is_empty() {
            return Err(Error::EmptyTagKeys);
        }

        let definitions = self.attributes.get_by_keys(tag_keys).await?;
        for key in tag_keys {
            let def = definitions
                .iter()
                .find(|d| d.key == *key)
                .ok_or_else(|| Error::InvalidInput(format!("unknown tag key: {key}")))?;
            if def.status != TagStatus::Adding {
                return Err(Error::InvalidInput(format!(
                    "tag key {key} is not awaiting backfill"
                )));
            }
        }

        let operation_id = self.engine.start_reindex(tag_keys).await?;
        info!(
            operation_id = %operation_id,
            count = tag_keys.len(),
            "reindex backfill started"
        );
        Ok(operation_id)
    }

    /// Poll an operation by id.
    ///
    /// A blank id fails locally with zero engine calls. An id unknown to the
    /// engine resolves to `Ok(None)`, a routine outcome. Transport failures
    /// carry the engine's status code and are never retried here.
    pub async fn get_status(&self, operation_id: &str) -> Result<Option<OperationStatus>> {
        let trimmed = operation_id.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput(
                "operation id must not be blank".to_string(),
            ));
        }

        let status = self.engine.get_status(trimmed).await?;
        debug!(
            operation_id = trimmed,
            known = status.is_some(),
            "operation status polled"
        );
        Ok(status)
    }
}
