//! Stats snapshot model
//!
//! Mirrors the kubelet summary API (`/stats/summary`). Every sample field is
//! optional because the kubelet omits whatever the container runtime does not
//! report; the translator emits a data point only for fields that are present.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point-in-time resource usage for a node and its pods.
///
/// Produced fresh by every collection cycle and discarded after translation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub node: NodeStats,
    #[serde(default)]
    pub pods: Vec<PodStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStats {
    pub node_name: String,
    pub start_time: Option<DateTime<Utc>>,
    pub cpu: Option<CpuStats>,
    pub memory: Option<MemoryStats>,
    pub network: Option<NetworkStats>,
    pub fs: Option<FsStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodReference {
    pub name: String,
    pub namespace: String,
    pub uid: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodStats {
    pub pod_ref: PodReference,
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub containers: Vec<ContainerStats>,
    pub cpu: Option<CpuStats>,
    pub memory: Option<MemoryStats>,
    pub network: Option<NetworkStats>,
    #[serde(default, rename = "volume")]
    pub volumes: Vec<VolumeStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerStats {
    pub name: String,
    pub start_time: Option<DateTime<Utc>>,
    pub cpu: Option<CpuStats>,
    pub memory: Option<MemoryStats>,
    pub rootfs: Option<FsStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuStats {
    pub time: Option<DateTime<Utc>>,
    pub usage_nano_cores: Option<u64>,
    pub usage_core_nano_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStats {
    pub time: Option<DateTime<Utc>>,
    pub available_bytes: Option<u64>,
    pub usage_bytes: Option<u64>,
    pub working_set_bytes: Option<u64>,
    pub rss_bytes: Option<u64>,
    pub page_faults: Option<u64>,
    pub major_page_faults: Option<u64>,
}

/// Network statistics.
///
/// The kubelet inlines the default interface at the top level and lists every
/// interface under `interfaces`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStats {
    pub time: Option<DateTime<Utc>>,
    pub name: Option<String>,
    pub rx_bytes: Option<u64>,
    pub rx_errors: Option<u64>,
    pub tx_bytes: Option<u64>,
    pub tx_errors: Option<u64>,
    #[serde(default)]
    pub interfaces: Vec<InterfaceStats>,
}

impl NetworkStats {
    /// All interfaces, falling back to the inlined default interface when the
    /// list is empty.
    pub fn all_interfaces(&self) -> Vec<InterfaceStats> {
        if !self.interfaces.is_empty() {
            return self.interfaces.clone();
        }

        match &self.name {
            Some(name) => vec![InterfaceStats {
                name: name.clone(),
                rx_bytes: self.rx_bytes,
                rx_errors: self.rx_errors,
                tx_bytes: self.tx_bytes,
                tx_errors: self.tx_errors,
            }],
            None => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceStats {
    pub name: String,
    pub rx_bytes: Option<u64>,
    pub rx_errors: Option<u64>,
    pub tx_bytes: Option<u64>,
    pub tx_errors: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FsStats {
    pub time: Option<DateTime<Utc>>,
    pub available_bytes: Option<u64>,
    pub capacity_bytes: Option<u64>,
    pub used_bytes: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeStats {
    pub name: String,
    pub time: Option<DateTime<Utc>>,
    pub available_bytes: Option<u64>,
    pub capacity_bytes: Option<u64>,
    pub used_bytes: Option<u64>,
    pub inodes: Option<u64>,
    pub inodes_free: Option<u64>,
    pub inodes_used: Option<u64>,
    pub pvc_ref: Option<PvcReference>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PvcReference {
    pub name: String,
    pub namespace: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUMMARY: &str = r#"{
        "node": {
            "nodeName": "node-1",
            "startTime": "2024-01-01T00:00:00Z",
            "cpu": {"time": "2024-01-01T00:10:00Z", "usageNanoCores": 250000000, "usageCoreNanoSeconds": 9000000000},
            "network": {"time": "2024-01-01T00:10:00Z", "name": "eth0", "rxBytes": 10, "txBytes": 20}
        },
        "pods": [{
            "podRef": {"name": "web-0", "namespace": "ns1", "uid": "uid-1"},
            "containers": [{"name": "app", "memory": {"workingSetBytes": 1024}}],
            "volume": [{"name": "data", "capacityBytes": 100, "pvcRef": {"name": "pvc-a", "namespace": "ns1"}}]
        }]
    }"#;

    #[test]
    fn test_decode_summary() {
        let snapshot: StatsSnapshot = serde_json::from_str(SUMMARY).unwrap();

        assert_eq!(snapshot.node.node_name, "node-1");
        assert_eq!(snapshot.node.cpu.as_ref().unwrap().usage_nano_cores, Some(250_000_000));
        assert_eq!(snapshot.pods.len(), 1);

        let pod = &snapshot.pods[0];
        assert_eq!(pod.pod_ref.uid, "uid-1");
        assert_eq!(pod.containers[0].memory.as_ref().unwrap().working_set_bytes, Some(1024));
        assert_eq!(pod.volumes[0].pvc_ref.as_ref().unwrap().name, "pvc-a");
    }

    #[test]
    fn test_default_interface_fallback() {
        let snapshot: StatsSnapshot = serde_json::from_str(SUMMARY).unwrap();
        let interfaces = snapshot.node.network.unwrap().all_interfaces();

        assert_eq!(interfaces.len(), 1);
        assert_eq!(interfaces[0].name, "eth0");
        assert_eq!(interfaces[0].tx_bytes, Some(20));
        assert_eq!(interfaces[0].rx_errors, None);
    }

    #[test]
    fn test_no_interfaces() {
        let network = NetworkStats::default();
        assert!(network.all_interfaces().is_empty());
    }
}
