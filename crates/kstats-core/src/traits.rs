//! Collaborator traits for the collection cycle
//!
//! Each external system the agent talks to is a trait object passed into the
//! receiver at construction time: the kubelet stats and pods endpoints, the
//! auxiliary API for claims and volumes, the downstream metrics consumer and
//! the observability sink.

use crate::{MetricsBatch, PersistentVolume, PersistentVolumeClaim, PodList, Result, StatsSnapshot};
use async_trait::async_trait;
use std::time::Duration;

/// Source of resource usage snapshots
#[async_trait]
pub trait StatsProvider: Send + Sync {
    /// Fetch the current stats summary.
    ///
    /// Transport or decode failures return `Error::Transport`; the caller does
    /// not retry within the cycle.
    async fn stats_summary(&self) -> Result<StatsSnapshot>;
}

/// Source of workload descriptors
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Fetch the pods currently running on the node
    async fn pods(&self) -> Result<PodList>;
}

/// Read-only lookups against the auxiliary API
#[async_trait]
pub trait VolumeApi: Send + Sync {
    /// Resolve a named claim in a namespace
    async fn persistent_volume_claim(&self, namespace: &str, name: &str) -> Result<PersistentVolumeClaim>;

    /// Resolve a cluster-scoped volume by name
    async fn persistent_volume(&self, name: &str) -> Result<PersistentVolume>;
}

/// Downstream consumer of translated metrics
#[async_trait]
pub trait MetricsConsumer: Send + Sync {
    /// Accept a batch. An error means the batch was rejected; it is not retried.
    async fn consume_metrics(&self, batch: MetricsBatch) -> Result<()>;
}

/// Stage of a collection cycle, used when reporting failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CycleStage {
    FetchStats,
    FetchMetadata,
    Translate,
    Emit,
}

impl CycleStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleStage::FetchStats => "fetch_stats",
            CycleStage::FetchMetadata => "fetch_metadata",
            CycleStage::Translate => "translate",
            CycleStage::Emit => "emit",
        }
    }
}

/// Fire-and-forget observability sink.
///
/// Implementations must not block; every method is called inline from the
/// collection cycle.
pub trait ObsReport: Send + Sync {
    /// A cycle aborted before emission
    fn cycle_failed(&self, stage: CycleStage, error: &crate::Error);

    /// Enrichment for one resource failed and its metrics were dropped
    fn resolution_failed(&self, error: &crate::Error);

    /// Emission finished; `error` is set when the consumer rejected the batch
    fn metrics_received(&self, data_points: usize, error: Option<&crate::Error>);

    /// Wall-clock time of a cycle, successful or not
    fn cycle_completed(&self, _elapsed: Duration) {}
}

/// Sink that discards every signal
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObsReport;

impl ObsReport for NoopObsReport {
    fn cycle_failed(&self, _stage: CycleStage, _error: &crate::Error) {}

    fn resolution_failed(&self, _error: &crate::Error) {}

    fn metrics_received(&self, _data_points: usize, _error: Option<&crate::Error>) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(CycleStage::FetchStats.as_str(), "fetch_stats");
        assert_eq!(CycleStage::FetchMetadata.as_str(), "fetch_metadata");
        assert_eq!(CycleStage::Translate.as_str(), "translate");
        assert_eq!(CycleStage::Emit.as_str(), "emit");
    }

    #[test]
    fn test_noop_obs_report() {
        let sink = NoopObsReport;
        sink.cycle_failed(CycleStage::FetchStats, &crate::Error::transport("down"));
        sink.metrics_received(10, None);
    }
}
