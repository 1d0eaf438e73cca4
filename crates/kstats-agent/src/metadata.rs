//! Extra metadata labels derived from the pods metadata

use crate::cache::volume_cache_key;
use crate::resolver::MetadataResolver;
use kstats_core::labels;
use kstats_core::volumes::{
    TYPE_CONFIG_MAP, TYPE_DOWNWARD_API, TYPE_EMPTY_DIR, TYPE_HOST_PATH, TYPE_PERSISTENT_VOLUME_CLAIM, TYPE_SECRET,
};
use kstats_core::{Error, Labels, MetadataLabel, Pod, PodList, PodVolumeSource, Result};

/// Per-cycle view over the fetched pods metadata and the configured extra labels
#[derive(Debug)]
pub struct Metadata<'a> {
    extra_labels: &'a [MetadataLabel],
    pods: Option<&'a PodList>,
    resolver: &'a MetadataResolver,
}

impl<'a> Metadata<'a> {
    pub fn new(extra_labels: &'a [MetadataLabel], pods: Option<&'a PodList>, resolver: &'a MetadataResolver) -> Self {
        Self {
            extra_labels,
            pods,
            resolver,
        }
    }

    pub fn wants(&self, label: MetadataLabel) -> bool {
        self.extra_labels.contains(&label)
    }

    fn pod(&self, pod_uid: &str) -> Result<&'a Pod> {
        let pods = self
            .pods
            .ok_or_else(|| Error::resolution("pods metadata were not fetched"))?;
        pods.find_by_uid(pod_uid)
            .ok_or_else(|| Error::resolution(format!("pod {} not found in the fetched metadata", pod_uid)))
    }

    /// Add the configured container labels to `out`
    pub async fn set_container_labels(&self, pod_uid: &str, container_name: &str, out: &mut Labels) -> Result<()> {
        if !self.wants(MetadataLabel::ContainerId) {
            return Ok(());
        }

        let pod = self.pod(pod_uid)?;
        let raw = pod.container_id(container_name).ok_or_else(|| {
            Error::resolution(format!(
                "status for container {} not found in pod {}",
                container_name, pod_uid
            ))
        })?;

        out.insert(labels::CONTAINER_ID, strip_runtime_scheme(raw)?);
        Ok(())
    }

    /// Add the configured volume labels to `out`, resolving claims through
    /// the auxiliary API when one is configured
    pub async fn set_volume_labels(&self, pod_uid: &str, volume_name: &str, out: &mut Labels) -> Result<()> {
        if !self.wants(MetadataLabel::VolumeType) {
            return Ok(());
        }

        let pod = self.pod(pod_uid)?;
        let volume = pod.volume(volume_name).ok_or_else(|| {
            Error::resolution(format!("volume {} not found in pod {}", volume_name, pod_uid))
        })?;

        match volume.source() {
            PodVolumeSource::PersistentVolumeClaim { claim_name } => {
                out.insert(labels::VOLUME_TYPE, TYPE_PERSISTENT_VOLUME_CLAIM);
                out.insert(labels::PVC_NAME, claim_name.as_str());
                self.resolver
                    .resolve_volume_labels(
                        &volume_cache_key(pod_uid, volume_name),
                        &claim_name,
                        &pod.metadata.namespace,
                        out,
                    )
                    .await?;
            }
            PodVolumeSource::ConfigMap => out.insert(labels::VOLUME_TYPE, TYPE_CONFIG_MAP),
            PodVolumeSource::DownwardApi => out.insert(labels::VOLUME_TYPE, TYPE_DOWNWARD_API),
            PodVolumeSource::EmptyDir => out.insert(labels::VOLUME_TYPE, TYPE_EMPTY_DIR),
            PodVolumeSource::Secret => out.insert(labels::VOLUME_TYPE, TYPE_SECRET),
            PodVolumeSource::HostPath => out.insert(labels::VOLUME_TYPE, TYPE_HOST_PATH),
            PodVolumeSource::AwsElasticBlockStore(source) => source.add_labels(out),
            PodVolumeSource::GcePersistentDisk(source) => source.add_labels(out),
            PodVolumeSource::Glusterfs(source) => source.add_labels(out),
            PodVolumeSource::Unsupported => {}
        }

        Ok(())
    }
}

/// `containerd://abc` -> `abc`
fn strip_runtime_scheme(container_id: &str) -> Result<&str> {
    let id = container_id
        .split_once("://")
        .map(|(_, id)| id)
        .unwrap_or(container_id);

    if id.is_empty() {
        return Err(Error::resolution(format!("malformed container id {:?}", container_id)));
    }

    Ok(id)
}
