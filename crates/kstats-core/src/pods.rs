//! Workload metadata model
//!
//! Subset of the kubelet `/pods` response needed for extra metadata labels:
//! pod identity, the volume sources declared in the pod spec, and the
//! runtime ids reported in container statuses.

use crate::volumes::{AwsElasticBlockStoreSource, GcePersistentDiskSource, GlusterfsSource};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub uid: String,
}

impl ObjectMeta {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>, uid: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            uid: uid.into(),
        }
    }
}

/// The set of workload descriptors fetched for one cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PodList {
    #[serde(default)]
    pub items: Vec<Pod>,
}

impl PodList {
    pub fn new(items: Vec<Pod>) -> Self {
        Self { items }
    }

    /// Find a pod by UID
    pub fn find_by_uid(&self, uid: &str) -> Option<&Pod> {
        self.items.iter().find(|pod| pod.metadata.uid == uid)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pod {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: PodSpec,
    #[serde(default)]
    pub status: PodStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PodSpec {
    #[serde(default)]
    pub volumes: Vec<Volume>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodStatus {
    #[serde(default)]
    pub container_statuses: Vec<ContainerStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerStatus {
    pub name: String,
    #[serde(rename = "containerID")]
    pub container_id: Option<String>,
}

impl Pod {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>, uid: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta::new(name, namespace, uid),
            spec: PodSpec::default(),
            status: PodStatus::default(),
        }
    }

    pub fn with_volume(mut self, volume: Volume) -> Self {
        self.spec.volumes.push(volume);
        self
    }

    pub fn with_container(mut self, name: impl Into<String>, container_id: impl Into<String>) -> Self {
        self.status.container_statuses.push(ContainerStatus {
            name: name.into(),
            container_id: Some(container_id.into()),
        });
        self
    }

    /// Raw container id (including the runtime scheme) for a named container
    pub fn container_id(&self, container_name: &str) -> Option<&str> {
        self.status
            .container_statuses
            .iter()
            .find(|status| status.name == container_name)
            .and_then(|status| status.container_id.as_deref())
    }

    /// Declared volume by name
    pub fn volume(&self, volume_name: &str) -> Option<&Volume> {
        self.spec.volumes.iter().find(|volume| volume.name == volume_name)
    }
}

/// A pod spec volume: a name plus exactly one source on the wire
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub name: String,
    pub persistent_volume_claim: Option<ClaimSource>,
    pub config_map: Option<serde_json::Value>,
    #[serde(rename = "downwardAPI")]
    pub downward_api: Option<serde_json::Value>,
    pub empty_dir: Option<serde_json::Value>,
    pub secret: Option<serde_json::Value>,
    pub host_path: Option<serde_json::Value>,
    pub aws_elastic_block_store: Option<AwsElasticBlockStoreSource>,
    pub gce_persistent_disk: Option<GcePersistentDiskSource>,
    pub glusterfs: Option<GlusterfsSource>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimSource {
    pub claim_name: String,
}

/// Closed set of pod volume sources
#[derive(Debug, Clone, PartialEq)]
pub enum PodVolumeSource {
    PersistentVolumeClaim { claim_name: String },
    ConfigMap,
    DownwardApi,
    EmptyDir,
    Secret,
    HostPath,
    AwsElasticBlockStore(AwsElasticBlockStoreSource),
    GcePersistentDisk(GcePersistentDiskSource),
    Glusterfs(GlusterfsSource),
    Unsupported,
}

impl Volume {
    pub fn persistent_volume_claim(name: impl Into<String>, claim_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            persistent_volume_claim: Some(ClaimSource {
                claim_name: claim_name.into(),
            }),
            ..Default::default()
        }
    }

    pub fn empty_dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            empty_dir: Some(serde_json::json!({})),
            ..Default::default()
        }
    }

    pub fn source(&self) -> PodVolumeSource {
        if let Some(claim) = &self.persistent_volume_claim {
            PodVolumeSource::PersistentVolumeClaim {
                claim_name: claim.claim_name.clone(),
            }
        } else if self.config_map.is_some() {
            PodVolumeSource::ConfigMap
        } else if self.downward_api.is_some() {
            PodVolumeSource::DownwardApi
        } else if self.empty_dir.is_some() {
            PodVolumeSource::EmptyDir
        } else if self.secret.is_some() {
            PodVolumeSource::Secret
        } else if self.host_path.is_some() {
            PodVolumeSource::HostPath
        } else if let Some(s) = &self.aws_elastic_block_store {
            PodVolumeSource::AwsElasticBlockStore(s.clone())
        } else if let Some(s) = &self.gce_persistent_disk {
            PodVolumeSource::GcePersistentDisk(s.clone())
        } else if let Some(s) = &self.glusterfs {
            PodVolumeSource::Glusterfs(s.clone())
        } else {
            PodVolumeSource::Unsupported
        }
    }
}
