//! Study/series metadata aggregation.
//!
//! Resolves a scope to its current instance versions and fetches every
//! instance's metadata document. Completeness is all-or-nothing: one missing
//! document fails the whole read, and no partial response ever escapes.

use std::sync::Arc;

use tracing::{debug, info, warn};

use voxel_core::{
    Error, EtagGenerator, InstanceIndexRepository, InstanceMetadata, MetadataStore, Result,
    VersionedInstanceIdentifier,
};

/// Result of a metadata retrieval.
#[derive(Debug, Clone)]
pub struct MetadataResponse {
    /// Current ETag of the scope, echoed to the caller for conditional reads.
    pub etag: String,
    /// True when the caller's `If-None-Match` tag matched; `instances` is
    /// empty in that case.
    pub not_modified: bool,
    /// Metadata documents in resolution (watermark) order.
    pub instances: Vec<InstanceMetadata>,
}

/// Aggregates per-instance metadata for a study or series scope.
///
/// Stateless; safe to share across concurrent requests.
pub struct MetadataAggregator {
    index: Arc<dyn InstanceIndexRepository>,
    store: Arc<dyn MetadataStore>,
    etags: Arc<dyn EtagGenerator>,
}

impl MetadataAggregator {
    pub fn new(
        index: Arc<dyn InstanceIndexRepository>,
        store: Arc<dyn MetadataStore>,
        etags: Arc<dyn EtagGenerator>,
    ) -> Self {
        Self {
            index,
            store,
            etags,
        }
    }

    /// Retrieve metadata for every current instance of a study.
    pub async fn retrieve_for_study(
        &self,
        partition: Option<&str>,
        study_uid: &str,
        if_none_match: Option<&str>,
    ) -> Result<MetadataResponse> {
        let identifiers = self.index.resolve_study(partition, study_uid).await?;
        self.retrieve(identifiers, study_uid.to_string(), if_none_match)
            .await
    }

    /// Retrieve metadata for every current instance of a series.
    pub async fn retrieve_for_series(
        &self,
        partition: Option<&str>,
        study_uid: &str,
        series_uid: &str,
        if_none_match: Option<&str>,
    ) -> Result<MetadataResponse> {
        let identifiers = self
            .index
            .resolve_series(partition, study_uid, series_uid)
            .await?;
        self.retrieve(
            identifiers,
            format!("{study_uid}/{series_uid}"),
            if_none_match,
        )
        .await
    }

    async fn retrieve(
        &self,
        identifiers: Vec<VersionedInstanceIdentifier>,
        scope: String,
        if_none_match: Option<&str>,
    ) -> Result<MetadataResponse> {
        if identifiers.is_empty() {
            return Err(Error::ScopeNotFound(scope));
        }

        let etag = self.etags.etag(&identifiers);
        if if_none_match == Some(etag.as_str()) {
            debug!(scope = %scope, "etag matched, skipping metadata fetch");
            return Ok(MetadataResponse {
                etag,
                not_modified: true,
                instances: Vec::new(),
            });
        }

        let mut instances = Vec::with_capacity(identifiers.len());
        for identifier in identifiers {
            match self.store.fetch(&identifier).await? {
                Some(document) => instances.push(InstanceMetadata {
                    identifier,
                    document,
                }),
                None => {
                    warn!(scope = %scope, instance = %identifier, "metadata blob missing");
                    return Err(Error::IncompleteMetadata(scope));
                }
            }
        }

        info!(scope = %scope, count = instances.len(), "metadata retrieved");
        Ok(MetadataResponse {
            etag,
            not_modified: false,
            instances,
        })
    }
}
