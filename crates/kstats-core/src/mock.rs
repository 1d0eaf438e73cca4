//! Mock collaborator implementations for testing and development
//!
//! Every mock counts its calls so tests can assert which endpoints a cycle
//! actually reached.

use crate::traits::{CycleStage, MetadataProvider, MetricsConsumer, ObsReport, StatsProvider, VolumeApi};
use crate::{Error, MetricsBatch, PersistentVolume, PersistentVolumeClaim, PodList, Result, StatsSnapshot};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

/// Mock stats endpoint returning a fixed snapshot, or failing on demand
#[derive(Debug, Clone)]
pub struct MockStatsProvider {
    snapshot: StatsSnapshot,
    failure: Option<String>,
    calls: Arc<AtomicUsize>,
}

impl MockStatsProvider {
    pub fn new(snapshot: StatsSnapshot) -> Self {
        Self {
            snapshot,
            failure: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A provider whose every call fails with a transport error
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            snapshot: StatsSnapshot::default(),
            failure: Some(message.into()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatsProvider for MockStatsProvider {
    async fn stats_summary(&self) -> Result<StatsSnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.failure {
            return Err(Error::transport(message.clone()));
        }
        Ok(self.snapshot.clone())
    }
}

/// Mock pods endpoint
#[derive(Debug, Clone)]
pub struct MockMetadataProvider {
    pods: PodList,
    failure: Option<String>,
    calls: Arc<AtomicUsize>,
}

impl MockMetadataProvider {
    pub fn new(pods: PodList) -> Self {
        Self {
            pods,
            failure: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            pods: PodList::default(),
            failure: Some(message.into()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataProvider for MockMetadataProvider {
    async fn pods(&self) -> Result<PodList> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(message) => Err(Error::transport(message.clone())),
            None => Ok(self.pods.clone()),
        }
    }
}

/// In-memory auxiliary API
#[derive(Debug, Clone, Default)]
pub struct MockVolumeApi {
    claims: Arc<RwLock<HashMap<(String, String), PersistentVolumeClaim>>>,
    volumes: Arc<RwLock<HashMap<String, PersistentVolume>>>,
    claim_calls: Arc<AtomicUsize>,
    volume_calls: Arc<AtomicUsize>,
}

impl MockVolumeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_claim(&self, claim: PersistentVolumeClaim) {
        let key = (claim.metadata.namespace.clone(), claim.metadata.name.clone());
        self.claims.write().await.insert(key, claim);
    }

    pub async fn add_volume(&self, volume: PersistentVolume) {
        self.volumes.write().await.insert(volume.name().to_string(), volume);
    }

    pub fn claim_calls(&self) -> usize {
        self.claim_calls.load(Ordering::SeqCst)
    }

    pub fn volume_calls(&self) -> usize {
        self.volume_calls.load(Ordering::SeqCst)
    }

    /// Total calls across both lookups
    pub fn calls(&self) -> usize {
        self.claim_calls() + self.volume_calls()
    }
}

#[async_trait]
impl VolumeApi for MockVolumeApi {
    async fn persistent_volume_claim(&self, namespace: &str, name: &str) -> Result<PersistentVolumeClaim> {
        self.claim_calls.fetch_add(1, Ordering::SeqCst);
        let claims = self.claims.read().await;
        claims
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| {
                Error::resolution(format!(
                    "persistentvolumeclaims \"{}\" not found in namespace \"{}\"",
                    name, namespace
                ))
            })
    }

    async fn persistent_volume(&self, name: &str) -> Result<PersistentVolume> {
        self.volume_calls.fetch_add(1, Ordering::SeqCst);
        let volumes = self.volumes.read().await;
        volumes
            .get(name)
            .cloned()
            .ok_or_else(|| Error::resolution(format!("persistentvolumes \"{}\" not found", name)))
    }
}

/// Consumer that records every accepted batch
#[derive(Debug, Clone, Default)]
pub struct MockConsumer {
    batches: Arc<RwLock<Vec<MetricsBatch>>>,
    reject: Option<String>,
    calls: Arc<AtomicUsize>,
}

impl MockConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A consumer that refuses every batch
    pub fn rejecting(message: impl Into<String>) -> Self {
        Self {
            reject: Some(message.into()),
            ..Default::default()
        }
    }

    pub async fn batches(&self) -> Vec<MetricsBatch> {
        self.batches.read().await.clone()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetricsConsumer for MockConsumer {
    async fn consume_metrics(&self, batch: MetricsBatch) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.reject {
            return Err(Error::consumer_rejection(message.clone()));
        }
        self.batches.write().await.push(batch);
        Ok(())
    }
}

/// Observability sink that remembers what it was told
#[derive(Debug, Clone, Default)]
pub struct RecordingObsReport {
    inner: Arc<Mutex<Recorded>>,
}

#[derive(Debug, Clone, Default)]
pub struct Recorded {
    pub cycle_failures: Vec<(CycleStage, String)>,
    pub resolution_failures: Vec<String>,
    pub accepted_points: usize,
    pub refused_points: usize,
    pub receive_ops: usize,
    pub cycles_completed: usize,
}

impl RecordingObsReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Recorded {
        self.inner.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl ObsReport for RecordingObsReport {
    fn cycle_failed(&self, stage: CycleStage, error: &Error) {
        if let Ok(mut recorded) = self.inner.lock() {
            recorded.cycle_failures.push((stage, error.to_string()));
        }
    }

    fn resolution_failed(&self, error: &Error) {
        if let Ok(mut recorded) = self.inner.lock() {
            recorded.resolution_failures.push(error.to_string());
        }
    }

    fn metrics_received(&self, data_points: usize, error: Option<&Error>) {
        if let Ok(mut recorded) = self.inner.lock() {
            recorded.receive_ops += 1;
            match error {
                Some(_) => recorded.refused_points += data_points,
                None => recorded.accepted_points += data_points,
            }
        }
    }

    fn cycle_completed(&self, _elapsed: std::time::Duration) {
        if let Ok(mut recorded) = self.inner.lock() {
            recorded.cycles_completed += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_volume_api() {
        let api = MockVolumeApi::new();
        api.add_claim(PersistentVolumeClaim::new("pvc-a", "ns1").bound_to("vol-1")).await;

        let claim = api.persistent_volume_claim("ns1", "pvc-a").await.unwrap();
        assert_eq!(claim.volume_name(), Some("vol-1"));

        let err = api.persistent_volume_claim("ns2", "pvc-a").await.unwrap_err();
        assert!(matches!(err, Error::Resolution(_)));

        let err = api.persistent_volume("vol-1").await.unwrap_err();
        assert!(matches!(err, Error::Resolution(_)));

        assert_eq!(api.claim_calls(), 2);
        assert_eq!(api.volume_calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_stats_provider() {
        let provider = MockStatsProvider::new(StatsSnapshot::default());
        assert!(provider.stats_summary().await.is_ok());

        let failing = MockStatsProvider::failing("connection refused");
        let err = failing.stats_summary().await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));

        assert_eq!(provider.calls(), 1);
        assert_eq!(failing.calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_consumer() {
        let consumer = MockConsumer::new();
        consumer.consume_metrics(MetricsBatch::new()).await.unwrap();
        assert_eq!(consumer.batches().await.len(), 1);

        let rejecting = MockConsumer::rejecting("queue full");
        assert!(rejecting.consume_metrics(MetricsBatch::new()).await.is_err());
        assert!(rejecting.batches().await.is_empty());
        assert_eq!(rejecting.calls(), 1);
    }

    #[test]
    fn test_recording_obs_report() {
        let sink = RecordingObsReport::new();
        sink.metrics_received(5, None);
        sink.metrics_received(3, Some(&Error::consumer_rejection("no")));
        sink.cycle_failed(CycleStage::FetchStats, &Error::transport("down"));

        let recorded = sink.snapshot();
        assert_eq!(recorded.accepted_points, 5);
        assert_eq!(recorded.refused_points, 3);
        assert_eq!(recorded.receive_ops, 2);
        assert_eq!(recorded.cycle_failures.len(), 1);
    }
}
