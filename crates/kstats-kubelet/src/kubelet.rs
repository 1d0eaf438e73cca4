//! Kubelet client: `/stats/summary` and `/pods`

use crate::rest::RestClient;
use crate::Result;
use async_trait::async_trait;
use kstats_core::{EndpointConfig, MetadataProvider, PodList, StatsProvider, StatsSnapshot};
use tracing::{debug, info};

const STATS_SUMMARY_PATH: &str = "/stats/summary";
const PODS_PATH: &str = "/pods";

/// Client for the node-local kubelet API
#[derive(Debug, Clone)]
pub struct KubeletClient {
    rest: RestClient,
}

impl KubeletClient {
    pub fn new(config: &EndpointConfig) -> Result<Self> {
        info!("Creating kubelet client for endpoint: {}", config.endpoint);
        Ok(Self {
            rest: RestClient::new(config)?,
        })
    }
}

#[async_trait]
impl StatsProvider for KubeletClient {
    async fn stats_summary(&self) -> kstats_core::Result<StatsSnapshot> {
        let snapshot: StatsSnapshot = self.rest.get_json(STATS_SUMMARY_PATH).await?;
        debug!(
            "Fetched stats summary for node {} with {} pods",
            snapshot.node.node_name,
            snapshot.pods.len()
        );
        Ok(snapshot)
    }
}

#[async_trait]
impl MetadataProvider for KubeletClient {
    async fn pods(&self) -> kstats_core::Result<PodList> {
        let pods: PodList = self.rest.get_json(PODS_PATH).await?;
        debug!("Fetched metadata for {} pods", pods.items.len());
        Ok(pods)
    }
}
