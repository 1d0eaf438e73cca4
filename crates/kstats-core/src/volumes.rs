//! Persistent volume model and provider-specific label extraction
//!
//! The auxiliary API returns claims and volumes in their Kubernetes JSON
//! form. A volume's backing storage is reduced to the closed
//! [`PersistentVolumeSource`] enum; each variant knows which labels it
//! contributes, so supporting a new storage backend means adding one variant
//! and one match arm.

use crate::labels::{self, Labels};
use crate::pods::ObjectMeta;
use serde::{Deserialize, Serialize};

/// Volume type label values
pub const TYPE_PERSISTENT_VOLUME_CLAIM: &str = "persistentVolumeClaim";
pub const TYPE_LOCAL: &str = "local";
pub const TYPE_AWS_EBS: &str = "awsElasticBlockStore";
pub const TYPE_GCE_PD: &str = "gcePersistentDisk";
pub const TYPE_GLUSTERFS: &str = "glusterfs";
pub const TYPE_CONFIG_MAP: &str = "configMap";
pub const TYPE_DOWNWARD_API: &str = "downwardAPI";
pub const TYPE_EMPTY_DIR: &str = "emptyDir";
pub const TYPE_SECRET: &str = "secret";
pub const TYPE_HOST_PATH: &str = "hostPath";

/// A named request for persistent storage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistentVolumeClaim {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: PersistentVolumeClaimSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistentVolumeClaimSpec {
    /// Name of the bound volume; empty or absent while the claim is pending
    pub volume_name: Option<String>,
}

impl PersistentVolumeClaim {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta::new(name, namespace, ""),
            spec: PersistentVolumeClaimSpec::default(),
        }
    }

    pub fn bound_to(mut self, volume_name: impl Into<String>) -> Self {
        self.spec.volume_name = Some(volume_name.into());
        self
    }

    /// The bound volume name, if the claim is bound
    pub fn volume_name(&self) -> Option<&str> {
        self.spec
            .volume_name
            .as_deref()
            .filter(|name| !name.is_empty())
    }
}

/// A cluster storage volume
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistentVolume {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: PersistentVolumeSpec,
}

/// Backing-storage descriptor as it appears on the wire: at most one field is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistentVolumeSpec {
    pub local: Option<LocalVolumeSource>,
    pub aws_elastic_block_store: Option<AwsElasticBlockStoreSource>,
    pub gce_persistent_disk: Option<GcePersistentDiskSource>,
    pub glusterfs: Option<GlusterfsSource>,
}

impl PersistentVolume {
    pub fn new(name: impl Into<String>, source: PersistentVolumeSource) -> Self {
        let mut spec = PersistentVolumeSpec::default();
        match source {
            PersistentVolumeSource::Local(s) => spec.local = Some(s),
            PersistentVolumeSource::AwsElasticBlockStore(s) => spec.aws_elastic_block_store = Some(s),
            PersistentVolumeSource::GcePersistentDisk(s) => spec.gce_persistent_disk = Some(s),
            PersistentVolumeSource::Glusterfs(s) => spec.glusterfs = Some(s),
            PersistentVolumeSource::Unsupported => {}
        }

        Self {
            metadata: ObjectMeta::new(name, "", ""),
            spec,
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn source(&self) -> PersistentVolumeSource {
        let spec = &self.spec;
        if let Some(s) = &spec.local {
            PersistentVolumeSource::Local(s.clone())
        } else if let Some(s) = &spec.aws_elastic_block_store {
            PersistentVolumeSource::AwsElasticBlockStore(s.clone())
        } else if let Some(s) = &spec.gce_persistent_disk {
            PersistentVolumeSource::GcePersistentDisk(s.clone())
        } else if let Some(s) = &spec.glusterfs {
            PersistentVolumeSource::Glusterfs(s.clone())
        } else {
            PersistentVolumeSource::Unsupported
        }
    }
}

/// Closed set of storage backends that contribute labels
#[derive(Debug, Clone, PartialEq)]
pub enum PersistentVolumeSource {
    Local(LocalVolumeSource),
    AwsElasticBlockStore(AwsElasticBlockStoreSource),
    GcePersistentDisk(GcePersistentDiskSource),
    Glusterfs(GlusterfsSource),
    Unsupported,
}

impl PersistentVolumeSource {
    /// Translate the volume's provenance-specific descriptor into labels
    pub fn labels(&self) -> Labels {
        let mut out = Labels::new();
        match self {
            PersistentVolumeSource::Local(_) => out.insert(labels::VOLUME_TYPE, TYPE_LOCAL),
            PersistentVolumeSource::AwsElasticBlockStore(s) => s.add_labels(&mut out),
            PersistentVolumeSource::GcePersistentDisk(s) => s.add_labels(&mut out),
            PersistentVolumeSource::Glusterfs(s) => s.add_labels(&mut out),
            PersistentVolumeSource::Unsupported => {}
        }
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalVolumeSource {
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsElasticBlockStoreSource {
    #[serde(rename = "volumeID")]
    pub volume_id: String,
    #[serde(default)]
    pub fs_type: String,
    #[serde(default)]
    pub partition: i32,
}

impl AwsElasticBlockStoreSource {
    pub fn add_labels(&self, out: &mut Labels) {
        out.insert(labels::VOLUME_TYPE, TYPE_AWS_EBS);
        out.insert(labels::AWS_VOLUME_ID, self.volume_id.as_str());
        out.insert(labels::FS_TYPE, self.fs_type.as_str());
        out.insert(labels::PARTITION, self.partition.to_string());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GcePersistentDiskSource {
    pub pd_name: String,
    #[serde(default)]
    pub fs_type: String,
    #[serde(default)]
    pub partition: i32,
}

impl GcePersistentDiskSource {
    pub fn add_labels(&self, out: &mut Labels) {
        out.insert(labels::VOLUME_TYPE, TYPE_GCE_PD);
        out.insert(labels::GCE_PD_NAME, self.pd_name.as_str());
        out.insert(labels::FS_TYPE, self.fs_type.as_str());
        out.insert(labels::PARTITION, self.partition.to_string());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlusterfsSource {
    #[serde(rename = "endpoints")]
    pub endpoints_name: String,
    pub path: String,
}

impl GlusterfsSource {
    pub fn add_labels(&self, out: &mut Labels) {
        out.insert(labels::VOLUME_TYPE, TYPE_GLUSTERFS);
        out.insert(labels::GLUSTERFS_ENDPOINTS_NAME, self.endpoints_name.as_str());
        out.insert(labels::GLUSTERFS_PATH, self.path.as_str());
    }
}
