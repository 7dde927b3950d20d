//! Default scope ETag generation.

use sha2::{Digest, Sha256};

use voxel_core::{EtagGenerator, VersionedInstanceIdentifier};

/// ETag generator keyed on the scope's resolved versions.
///
/// Any instance write in the scope changes a watermark and therefore the
/// tag, so a matching `If-None-Match` proves the cached metadata is still
/// current. The exact byte format is this implementation's concern only.
#[derive(Debug, Clone, Copy, Default)]
pub struct WatermarkEtagGenerator;

impl WatermarkEtagGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl EtagGenerator for WatermarkEtagGenerator {
    fn etag(&self, identifiers: &[VersionedInstanceIdentifier]) -> String {
        let mut hasher = Sha256::new();
        for id in identifiers {
            hasher.update(id.sop_uid.as_bytes());
            hasher.update(id.version.to_be_bytes());
        }
        let digest = hasher.finalize();
        format!("\"{}-{}\"", identifiers.len(), hex::encode(&digest[..16]))
    }
}
