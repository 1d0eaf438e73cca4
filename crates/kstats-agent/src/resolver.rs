//! Persistent volume claim label resolution
//!
//! A claim referenced by a pod volume is resolved to the volume it is bound
//! to, and that volume's storage descriptor is turned into labels. Results
//! are cached per pod volume, so the auxiliary API is only reached the first
//! time a volume is seen.

use crate::cache::VolumeLabelCache;
use kstats_core::{Error, Labels, Result, VolumeApi};
use std::sync::Arc;
use tracing::debug;

/// Resolves claim-backed volumes into storage labels
#[derive(Clone)]
pub struct MetadataResolver {
    api: Option<Arc<dyn VolumeApi>>,
    cache: Arc<VolumeLabelCache>,
}

impl MetadataResolver {
    /// Create a resolver. Without an API client enrichment is disabled and
    /// every resolution is a no-op.
    pub fn new(api: Option<Arc<dyn VolumeApi>>, cache: Arc<VolumeLabelCache>) -> Self {
        Self { api, cache }
    }

    pub fn is_enabled(&self) -> bool {
        self.api.is_some()
    }

    pub fn cache(&self) -> &Arc<VolumeLabelCache> {
        &self.cache
    }

    /// Merge the storage labels of `claim_name` in `namespace` into `out`.
    ///
    /// On error nothing is merged and the cache is left untouched.
    pub async fn resolve_volume_labels(
        &self,
        cache_key: &str,
        claim_name: &str,
        namespace: &str,
        out: &mut Labels,
    ) -> Result<()> {
        let api = match &self.api {
            Some(api) => api,
            None => return Ok(()),
        };

        let labels = match self.cache.get(cache_key).await {
            Some(labels) => labels,
            None => {
                let claim = api.persistent_volume_claim(namespace, claim_name).await?;
                let volume_name = claim.volume_name().ok_or_else(|| {
                    Error::resolution(format!(
                        "persistent volume claim {}/{} is not bound to a volume",
                        namespace, claim_name
                    ))
                })?;

                let volume = api.persistent_volume(volume_name).await?;
                let labels = volume.source().labels();
                debug!(
                    "Resolved claim {}/{} to volume {}: {}",
                    namespace,
                    claim_name,
                    volume_name,
                    labels.to_log_string()
                );

                self.cache.put(cache_key, labels).await
            }
        };

        out.merge(&labels);
        Ok(())
    }
}

impl std::fmt::Debug for MetadataResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataResolver")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
