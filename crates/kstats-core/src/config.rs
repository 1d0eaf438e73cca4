//! Configuration management for kstats
//!
//! Provides a unified configuration system that supports YAML files and
//! environment variable overrides on top of built-in defaults.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Service account token mounted into every pod
pub const SERVICE_ACCOUNT_TOKEN_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";
/// Cluster CA bundle mounted into every pod
pub const SERVICE_ACCOUNT_CA_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt";

/// Main configuration structure for kstats components
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Kubelet polling configuration
    pub receiver: ReceiverConfig,

    /// Auxiliary API configuration; volume claim enrichment is disabled when absent
    pub k8s_api: Option<EndpointConfig>,

    /// Downstream consumer configuration
    pub exporter: ExporterConfig,

    /// Self-observability configuration
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.receiver.validate()?;

        if let Some(ref k8s_api) = self.k8s_api {
            k8s_api.validate("k8s_api")?;
        }

        self.exporter.validate()?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            receiver: ReceiverConfig::default(),
            k8s_api: None,
            exporter: ExporterConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// How a client authenticates to its endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthType {
    /// Plain requests, no credentials
    None,
    /// Bearer token and CA bundle from the pod's service account
    ServiceAccount,
}

/// Connection settings shared by the kubelet and API server clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Base URL
    pub endpoint: String,

    /// Authentication mode
    pub auth_type: AuthType,

    /// Skip TLS certificate verification
    pub insecure_skip_verify: bool,

    /// Bearer token file (service account mode)
    pub token_path: PathBuf,

    /// CA bundle used to verify the endpoint (service account mode)
    pub ca_file: Option<PathBuf>,

    /// Per-request timeout in seconds
    pub request_timeout_seconds: u64,
}

impl EndpointConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    pub fn with_auth_type(mut self, auth_type: AuthType) -> Self {
        self.auth_type = auth_type;
        self
    }

    pub fn validate(&self, section: &str) -> Result<()> {
        if self.endpoint.is_empty() {
            return Err(crate::Error::config(format!("{}: endpoint cannot be empty", section)));
        }

        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(crate::Error::config(format!(
                "{}: endpoint must be an http(s) URL, got {}",
                section, self.endpoint
            )));
        }

        if self.request_timeout_seconds == 0 {
            return Err(crate::Error::config(format!("{}: request timeout must be > 0", section)));
        }

        Ok(())
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://kubernetes.default.svc".to_string(),
            auth_type: AuthType::ServiceAccount,
            insecure_skip_verify: false,
            token_path: PathBuf::from(SERVICE_ACCOUNT_TOKEN_PATH),
            ca_file: Some(PathBuf::from(SERVICE_ACCOUNT_CA_PATH)),
            request_timeout_seconds: 10,
        }
    }
}

/// Extra labels derived from pod metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetadataLabel {
    /// Container runtime id, added to container metrics
    #[serde(rename = "container.id")]
    ContainerId,
    /// Volume type (plus storage details), added to volume metrics
    #[serde(rename = "k8s.volume.type")]
    VolumeType,
}

impl MetadataLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataLabel::ContainerId => crate::labels::CONTAINER_ID,
            MetadataLabel::VolumeType => crate::labels::VOLUME_TYPE,
        }
    }
}

/// Groups of metrics that can be collected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricGroup {
    Node,
    Pod,
    Container,
    Volume,
}

/// Kubelet polling configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    /// Interval between collection cycles in seconds
    pub collection_interval_seconds: u64,

    /// Kubelet connection settings
    pub kubelet: EndpointConfig,

    /// Extra metadata labels to attach; enables the pods metadata fetch
    pub extra_metadata_labels: Vec<MetadataLabel>,

    /// Metric groups to emit
    pub metric_groups: Vec<MetricGroup>,
}

impl ReceiverConfig {
    pub fn validate(&self) -> Result<()> {
        if self.collection_interval_seconds == 0 {
            return Err(crate::Error::config("Collection interval must be > 0"));
        }

        if self.metric_groups.is_empty() {
            return Err(crate::Error::config("At least one metric group must be collected"));
        }

        self.kubelet.validate("receiver.kubelet")
    }

    /// Whether a cycle needs the pod metadata listing at all
    pub fn needs_pod_metadata(&self) -> bool {
        !self.extra_metadata_labels.is_empty()
    }
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            collection_interval_seconds: 10,
            kubelet: EndpointConfig {
                endpoint: "https://localhost:10250".to_string(),
                ..EndpointConfig::default()
            },
            extra_metadata_labels: Vec::new(),
            metric_groups: vec![MetricGroup::Container, MetricGroup::Pod, MetricGroup::Node],
        }
    }
}

/// Kind of downstream consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExporterKind {
    /// Log a summary of each batch
    Logging,
    /// POST each batch as JSON
    Http,
}

/// Downstream consumer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExporterConfig {
    pub kind: ExporterKind,

    /// Target URL for the http exporter
    pub endpoint: Option<String>,

    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl ExporterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.kind == ExporterKind::Http && self.endpoint.as_deref().unwrap_or("").is_empty() {
            return Err(crate::Error::config("http exporter requires an endpoint"));
        }

        if self.timeout_seconds == 0 {
            return Err(crate::Error::config("Exporter timeout must be > 0"));
        }

        Ok(())
    }
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            kind: ExporterKind::Logging,
            endpoint: None,
            timeout_seconds: 5,
        }
    }
}

/// Self-observability configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Serve receiver telemetry on /metrics
    pub enabled: bool,

    /// Bind address for the telemetry endpoint
    pub bind_addr: SocketAddr,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8888)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        config.validate().unwrap();

        assert_eq!(config.receiver.collection_interval_seconds, 10);
        assert_eq!(
            config.receiver.metric_groups,
            vec![MetricGroup::Container, MetricGroup::Pod, MetricGroup::Node]
        );
        assert!(!config.receiver.needs_pod_metadata());
    }

    #[test]
    fn test_validation_failures() {
        let mut config = Config::default();
        config.receiver.collection_interval_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.receiver.metric_groups.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.receiver.kubelet.endpoint = "localhost:10250".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.exporter.kind = ExporterKind::Http;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.k8s_api = Some(EndpointConfig::new(""));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_metadata_label_names() {
        let labels: Vec<MetadataLabel> =
            serde_yaml::from_str("[\"container.id\", \"k8s.volume.type\"]").unwrap();
        assert_eq!(labels, vec![MetadataLabel::ContainerId, MetadataLabel::VolumeType]);
        assert_eq!(MetadataLabel::VolumeType.as_str(), "k8s.volume.type");

        let unknown: std::result::Result<Vec<MetadataLabel>, _> = serde_yaml::from_str("[\"k8s.pod.ip\"]");
        assert!(unknown.is_err());
    }

    #[test]
    fn test_parse_yaml() {
        let config: Config = serde_yaml::from_str(
            r#"
receiver:
  collection_interval_seconds: 20
  kubelet:
    endpoint: "http://127.0.0.1:10255"
    auth_type: none
  extra_metadata_labels: ["container.id", "k8s.volume.type"]
  metric_groups: [node, volume]
k8s_api:
  endpoint: "https://10.0.0.1:6443"
"#,
        )
        .unwrap();
        config.validate().unwrap();

        assert_eq!(config.receiver.collection_interval_seconds, 20);
        assert_eq!(config.receiver.kubelet.auth_type, AuthType::None);
        assert!(config.receiver.needs_pod_metadata());
        assert_eq!(config.receiver.metric_groups, vec![MetricGroup::Node, MetricGroup::Volume]);

        let k8s_api = config.k8s_api.unwrap();
        assert_eq!(k8s_api.endpoint, "https://10.0.0.1:6443");
        assert_eq!(k8s_api.auth_type, AuthType::ServiceAccount);
    }
}
