//! Label schema for kstats
//!
//! Labels identify the origin of a metric (node, pod, container, volume) and
//! carry enrichment data resolved from workload metadata. Keys are unique and
//! iterate in sorted order, so two label sets built from the same inputs
//! always compare and serialize identically.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Node name resource label
pub const NODE_NAME: &str = "k8s.node.name";
/// Pod UID resource label
pub const POD_UID: &str = "k8s.pod.uid";
/// Pod name resource label
pub const POD_NAME: &str = "k8s.pod.name";
/// Namespace resource label
pub const NAMESPACE_NAME: &str = "k8s.namespace.name";
/// Container name resource label
pub const CONTAINER_NAME: &str = "k8s.container.name";
/// Container runtime id label (extra metadata)
pub const CONTAINER_ID: &str = "container.id";
/// Volume name resource label
pub const VOLUME_NAME: &str = "k8s.volume.name";
/// Volume type label (extra metadata)
pub const VOLUME_TYPE: &str = "k8s.volume.type";
/// Claim name label for persistent volume claims
pub const PVC_NAME: &str = "k8s.persistentvolumeclaim.name";

/// Provider-specific volume labels
pub const AWS_VOLUME_ID: &str = "aws.volume.id";
pub const FS_TYPE: &str = "fs.type";
pub const PARTITION: &str = "partition";
pub const GCE_PD_NAME: &str = "gce.pd.name";
pub const GLUSTERFS_ENDPOINTS_NAME: &str = "glusterfs.endpoints.name";
pub const GLUSTERFS_PATH: &str = "glusterfs.path";

/// Data point attribute names
pub const INTERFACE: &str = "interface";
pub const DIRECTION: &str = "direction";

/// An ordered set of label name/value pairs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Labels(BTreeMap<String, String>);

impl Labels {
    /// Create an empty label set
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a label, replacing any previous value for the key
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Merge another label set into this one.
    ///
    /// Additive: keys only present here are kept, colliding keys take the
    /// value from `other`.
    pub fn merge(&mut self, other: &Labels) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Render as `k=v,k=v` for log lines
    pub fn to_log_string(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl<K, V> FromIterator<(K, V)> for Labels
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
