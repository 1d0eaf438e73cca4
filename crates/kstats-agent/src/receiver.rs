//! Collection cycle orchestration
//!
//! One cycle fetches the stats snapshot, fetches pod metadata when extra
//! labels are configured, translates (resolving volume labels as needed) and
//! hands the batch to the consumer. A failure before emission ends the cycle
//! without emitting anything.

use crate::cache::VolumeLabelCache;
use crate::metadata::Metadata;
use crate::resolver::MetadataResolver;
use crate::runner::Runnable;
use crate::translator::MetricTranslator;
use async_trait::async_trait;
use kstats_core::{
    CycleStage, Error, MetadataProvider, MetricsConsumer, NoopObsReport, ObsReport, ReceiverConfig, Result,
    StatsProvider, VolumeApi,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// The kubelet stats receiver: runs collection cycles against its collaborators
pub struct KubeletStatsReceiver {
    config: ReceiverConfig,
    stats: Arc<dyn StatsProvider>,
    metadata: Arc<dyn MetadataProvider>,
    consumer: Arc<dyn MetricsConsumer>,
    resolver: MetadataResolver,
    translator: MetricTranslator,
    obs: Arc<dyn ObsReport>,
    cancel: CancellationToken,
}

impl KubeletStatsReceiver {
    /// Run one collection cycle and return the number of data points emitted
    pub async fn run_cycle(&self) -> Result<usize> {
        let started = Instant::now();
        let result = self.collect().await;
        self.obs.cycle_completed(started.elapsed());
        result
    }

    async fn collect(&self) -> Result<usize> {
        let snapshot = self
            .stage(CycleStage::FetchStats, self.stats.stats_summary())
            .await?;

        let pods = if self.config.needs_pod_metadata() {
            Some(self.stage(CycleStage::FetchMetadata, self.metadata.pods()).await?)
        } else {
            None
        };

        let metadata = Metadata::new(&self.config.extra_metadata_labels, pods.as_ref(), &self.resolver);
        let batch = self
            .stage(CycleStage::Translate, async {
                Ok(self
                    .translator
                    .translate(&snapshot, &metadata, self.obs.as_ref())
                    .await)
            })
            .await?;

        let (metrics, points) = batch.metric_and_data_point_count();
        let emitted = self.stage(CycleStage::Emit, self.consumer.consume_metrics(batch)).await;
        self.obs.metrics_received(points, emitted.as_ref().err());

        match emitted {
            Ok(()) => {
                debug!("Emitted {} metrics with {} data points", metrics, points);
                Ok(points)
            }
            Err(e) => {
                warn!("Consumer refused {} data points: {}", points, e);
                Err(e)
            }
        }
    }

    /// Await one step of the cycle, aborting on cancellation. Failures before
    /// the emit step are reported as cycle failures here.
    async fn stage<T>(&self, stage: CycleStage, step: impl Future<Output = Result<T>>) -> Result<T> {
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                Err(Error::cancelled(format!("cycle cancelled during {}", stage.as_str())))
            }
            result = step => result,
        };

        if let Err(ref e) = result {
            if stage != CycleStage::Emit {
                warn!("Collection cycle aborted during {} ({}): {}", stage.as_str(), e.category(), e);
                self.obs.cycle_failed(stage, e);
            }
        }

        result
    }

    pub fn config(&self) -> &ReceiverConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<VolumeLabelCache> {
        self.resolver.cache()
    }
}

impl std::fmt::Debug for KubeletStatsReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeletStatsReceiver")
            .field("config", &self.config)
            .field("resolver", &self.resolver)
            .field("translator", &self.translator)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Runnable for KubeletStatsReceiver {
    async fn setup(&self) -> Result<()> {
        self.config.validate()?;
        info!(
            "Kubelet stats receiver ready: endpoint={}, groups={:?}, extra labels={:?}, volume enrichment={}",
            self.config.kubelet.endpoint,
            self.config.metric_groups,
            self.config.extra_metadata_labels,
            self.resolver.is_enabled()
        );
        Ok(())
    }

    async fn run(&self) -> Result<()> {
        self.run_cycle().await.map(|_| ())
    }
}

/// Builder for [`KubeletStatsReceiver`]
pub struct ReceiverBuilder {
    config: ReceiverConfig,
    stats: Option<Arc<dyn StatsProvider>>,
    metadata: Option<Arc<dyn MetadataProvider>>,
    consumer: Option<Arc<dyn MetricsConsumer>>,
    volume_api: Option<Arc<dyn VolumeApi>>,
    cache: Option<Arc<VolumeLabelCache>>,
    obs: Option<Arc<dyn ObsReport>>,
    cancel: Option<CancellationToken>,
}

impl ReceiverBuilder {
    pub fn new(config: ReceiverConfig) -> Self {
        Self {
            config,
            stats: None,
            metadata: None,
            consumer: None,
            volume_api: None,
            cache: None,
            obs: None,
            cancel: None,
        }
    }

    pub fn with_stats_provider(mut self, stats: Arc<dyn StatsProvider>) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn with_metadata_provider(mut self, metadata: Arc<dyn MetadataProvider>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_consumer(mut self, consumer: Arc<dyn MetricsConsumer>) -> Self {
        self.consumer = Some(consumer);
        self
    }

    /// Enable claim enrichment through the auxiliary API
    pub fn with_volume_api(mut self, api: Arc<dyn VolumeApi>) -> Self {
        self.volume_api = Some(api);
        self
    }

    /// Share a label cache with other receivers or tests
    pub fn with_cache(mut self, cache: Arc<VolumeLabelCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_obs_report(mut self, obs: Arc<dyn ObsReport>) -> Self {
        self.obs = Some(obs);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn build(self) -> Result<KubeletStatsReceiver> {
        let stats = self
            .stats
            .ok_or_else(|| Error::config("receiver requires a stats provider"))?;
        let metadata = self
            .metadata
            .ok_or_else(|| Error::config("receiver requires a metadata provider"))?;
        let consumer = self
            .consumer
            .ok_or_else(|| Error::config("receiver requires a metrics consumer"))?;

        let cache = self.cache.unwrap_or_default();
        let translator = MetricTranslator::new(self.config.metric_groups.clone());

        Ok(KubeletStatsReceiver {
            config: self.config,
            stats,
            metadata,
            consumer,
            resolver: MetadataResolver::new(self.volume_api, cache),
            translator,
            obs: self.obs.unwrap_or_else(|| Arc::new(NoopObsReport)),
            cancel: self.cancel.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kstats_core::labels;
    use kstats_core::mock::{MockConsumer, MockMetadataProvider, MockStatsProvider, MockVolumeApi, RecordingObsReport};
    use kstats_core::pods::Volume;
    use kstats_core::volumes::AwsElasticBlockStoreSource;
    use kstats_core::{
        MetadataLabel, MetricGroup, PersistentVolume, PersistentVolumeClaim, PersistentVolumeSource, Pod, PodList,
        ResourceContext, StatsSnapshot,
    };

    const SUMMARY: &str = r#"{
        "node": {"nodeName": "node-1", "memory": {"time": "2024-01-01T00:10:00Z", "usageBytes": 4096}},
        "pods": [{
            "podRef": {"name": "db-0", "namespace": "ns1", "uid": "uid-1"},
            "memory": {"time": "2024-01-01T00:10:00Z", "usageBytes": 1024},
            "containers": [{"name": "postgres", "memory": {"time": "2024-01-01T00:10:00Z", "workingSetBytes": 512}}],
            "volume": [{"name": "data", "time": "2024-01-01T00:10:00Z", "capacityBytes": 1000, "pvcRef": {"name": "pvc-a", "namespace": "ns1"}}]
        }]
    }"#;

    struct Fixture {
        stats: Arc<MockStatsProvider>,
        metadata: Arc<MockMetadataProvider>,
        api: Arc<MockVolumeApi>,
        consumer: Arc<MockConsumer>,
        obs: Arc<RecordingObsReport>,
        cache: Arc<VolumeLabelCache>,
    }

    impl Fixture {
        async fn new() -> Self {
            let snapshot: StatsSnapshot = serde_json::from_str(SUMMARY).unwrap();
            let pods = PodList::new(vec![Pod::new("db-0", "ns1", "uid-1")
                .with_container("postgres", "containerd://f00d")
                .with_volume(Volume::persistent_volume_claim("data", "pvc-a"))]);

            let api = Arc::new(MockVolumeApi::new());
            api.add_claim(PersistentVolumeClaim::new("pvc-a", "ns1").bound_to("vol-1")).await;
            api.add_volume(PersistentVolume::new(
                "vol-1",
                PersistentVolumeSource::AwsElasticBlockStore(AwsElasticBlockStoreSource {
                    volume_id: "vol-0abc".to_string(),
                    fs_type: "ext4".to_string(),
                    partition: 0,
                }),
            ))
            .await;

            Self {
                stats: Arc::new(MockStatsProvider::new(snapshot)),
                metadata: Arc::new(MockMetadataProvider::new(pods)),
                api,
                consumer: Arc::new(MockConsumer::new()),
                obs: Arc::new(RecordingObsReport::new()),
                cache: Arc::new(VolumeLabelCache::new()),
            }
        }

        fn config(extra_labels: Vec<MetadataLabel>) -> ReceiverConfig {
            ReceiverConfig {
                extra_metadata_labels: extra_labels,
                metric_groups: vec![
                    MetricGroup::Node,
                    MetricGroup::Pod,
                    MetricGroup::Container,
                    MetricGroup::Volume,
                ],
                ..ReceiverConfig::default()
            }
        }

        fn builder(&self, config: ReceiverConfig) -> ReceiverBuilder {
            ReceiverBuilder::new(config)
                .with_stats_provider(self.stats.clone())
                .with_metadata_provider(self.metadata.clone())
                .with_consumer(self.consumer.clone())
                .with_volume_api(self.api.clone())
                .with_cache(self.cache.clone())
                .with_obs_report(self.obs.clone())
        }

        fn receiver(&self, extra_labels: Vec<MetadataLabel>) -> KubeletStatsReceiver {
            self.builder(Self::config(extra_labels)).build().unwrap()
        }
    }

    #[tokio::test]
    async fn test_stats_fetch_failure_emits_nothing() {
        let fixture = Fixture::new().await;
        let receiver = fixture
            .builder(Fixture::config(vec![MetadataLabel::VolumeType]))
            .with_stats_provider(Arc::new(MockStatsProvider::failing("connection refused")))
            .build()
            .unwrap();

        let err = receiver.run_cycle().await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));

        assert_eq!(fixture.consumer.calls(), 0);
        assert_eq!(fixture.metadata.calls(), 0);
        let recorded = fixture.obs.snapshot();
        assert_eq!(recorded.cycle_failures.len(), 1);
        assert_eq!(recorded.cycle_failures[0].0, CycleStage::FetchStats);
        assert_eq!(recorded.receive_ops, 0);
        assert_eq!(recorded.cycles_completed, 1);
    }

    #[tokio::test]
    async fn test_metadata_fetch_failure_emits_nothing() {
        let fixture = Fixture::new().await;
        let receiver = fixture
            .builder(Fixture::config(vec![MetadataLabel::ContainerId]))
            .with_metadata_provider(Arc::new(MockMetadataProvider::failing("timeout")))
            .build()
            .unwrap();

        assert!(receiver.run_cycle().await.is_err());
        assert_eq!(fixture.consumer.calls(), 0);
        assert_eq!(fixture.obs.snapshot().cycle_failures[0].0, CycleStage::FetchMetadata);
    }

    #[tokio::test]
    async fn test_volume_claim_enrichment() {
        let fixture = Fixture::new().await;
        let receiver = fixture.receiver(vec![MetadataLabel::VolumeType]);

        receiver.run_cycle().await.unwrap();

        let batches = fixture.consumer.batches().await;
        assert_eq!(batches.len(), 1);
        let volume = batches[0]
            .resource_metrics
            .iter()
            .find(|rm| rm.context == ResourceContext::Volume)
            .unwrap();

        assert_eq!(volume.resource.get(labels::VOLUME_TYPE), Some("awsElasticBlockStore"));
        assert_eq!(volume.resource.get(labels::AWS_VOLUME_ID), Some("vol-0abc"));
        assert_eq!(volume.resource.get(labels::FS_TYPE), Some("ext4"));
        assert_eq!(volume.resource.get(labels::PVC_NAME), Some("pvc-a"));

        let cached = fixture.cache.get("uid-1/data").await.unwrap();
        assert_eq!(cached.get(labels::AWS_VOLUME_ID), Some("vol-0abc"));
        assert_eq!(fixture.api.calls(), 2);
    }

    #[tokio::test]
    async fn test_second_cycle_hits_cache() {
        let fixture = Fixture::new().await;
        let receiver = fixture.receiver(vec![MetadataLabel::VolumeType]);

        receiver.run_cycle().await.unwrap();
        receiver.run_cycle().await.unwrap();

        assert_eq!(fixture.api.claim_calls(), 1);
        assert_eq!(fixture.api.volume_calls(), 1);
        assert_eq!(fixture.consumer.calls(), 2);
    }

    #[tokio::test]
    async fn test_claim_not_found_drops_volume() {
        let fixture = Fixture::new().await;
        let api = Arc::new(MockVolumeApi::new());
        let receiver = fixture
            .builder(Fixture::config(vec![MetadataLabel::VolumeType]))
            .with_volume_api(api.clone())
            .build()
            .unwrap();

        let points = receiver.run_cycle().await.unwrap();

        let batches = fixture.consumer.batches().await;
        assert_eq!(batches.len(), 1);
        assert!(batches[0]
            .resource_metrics
            .iter()
            .all(|rm| rm.context != ResourceContext::Volume));
        assert!(batches[0]
            .resource_metrics
            .iter()
            .any(|rm| rm.context == ResourceContext::Pod));

        let recorded = fixture.obs.snapshot();
        assert_eq!(recorded.resolution_failures.len(), 1);
        assert!(recorded.cycle_failures.is_empty());
        assert_eq!(recorded.accepted_points, points);
        assert!(fixture.cache.is_empty().await);
        assert_eq!(api.claim_calls(), 1);
    }

    #[tokio::test]
    async fn test_extra_labels_disabled_skips_metadata() {
        let fixture = Fixture::new().await;
        let receiver = fixture.receiver(Vec::new());

        receiver.run_cycle().await.unwrap();

        assert_eq!(fixture.metadata.calls(), 0);
        assert_eq!(fixture.api.calls(), 0);
        assert_eq!(fixture.consumer.calls(), 1);

        let batches = fixture.consumer.batches().await;
        let volume = batches[0]
            .resource_metrics
            .iter()
            .find(|rm| rm.context == ResourceContext::Volume)
            .unwrap();
        assert!(!volume.resource.contains_key(labels::VOLUME_TYPE));
    }

    #[tokio::test]
    async fn test_cycles_are_idempotent() {
        let fixture = Fixture::new().await;
        let receiver = fixture.receiver(vec![MetadataLabel::ContainerId, MetadataLabel::VolumeType]);

        receiver.run_cycle().await.unwrap();
        receiver.run_cycle().await.unwrap();

        let batches = fixture.consumer.batches().await;
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0], batches[1]);
    }

    #[tokio::test]
    async fn test_cycles_without_timestamps_are_idempotent() {
        let fixture = Fixture::new().await;
        let snapshot: StatsSnapshot =
            serde_json::from_str(r#"{"node": {"nodeName": "node-1", "fs": {"capacityBytes": 20}}}"#).unwrap();
        let receiver = fixture
            .builder(Fixture::config(Vec::new()))
            .with_stats_provider(Arc::new(MockStatsProvider::new(snapshot)))
            .build()
            .unwrap();

        receiver.run_cycle().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        receiver.run_cycle().await.unwrap();

        let batches = fixture.consumer.batches().await;
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0], batches[1]);
    }

    #[tokio::test]
    async fn test_consumer_rejection_is_reported() {
        let fixture = Fixture::new().await;
        let receiver = fixture
            .builder(Fixture::config(Vec::new()))
            .with_consumer(Arc::new(MockConsumer::rejecting("queue full")))
            .build()
            .unwrap();

        let err = receiver.run_cycle().await.unwrap_err();
        assert!(matches!(err, Error::ConsumerRejection(_)));

        let recorded = fixture.obs.snapshot();
        assert_eq!(recorded.receive_ops, 1);
        assert!(recorded.refused_points > 0);
        assert_eq!(recorded.accepted_points, 0);
        assert!(recorded.cycle_failures.is_empty());
    }

    #[tokio::test]
    async fn test_accepted_points_recorded() {
        let fixture = Fixture::new().await;
        let receiver = fixture.receiver(Vec::new());

        let points = receiver.run_cycle().await.unwrap();

        let batches = fixture.consumer.batches().await;
        assert_eq!(points, batches[0].data_point_count());
        assert_eq!(fixture.obs.snapshot().accepted_points, points);
    }

    #[tokio::test]
    async fn test_cancelled_cycle_emits_nothing() {
        let fixture = Fixture::new().await;
        let cancel = CancellationToken::new();
        cancel.cancel();
        let receiver = fixture
            .builder(Fixture::config(Vec::new()))
            .with_cancellation(cancel)
            .build()
            .unwrap();

        let err = receiver.run_cycle().await.unwrap_err();
        assert!(matches!(err, Error::Cancelled(_)));
        assert_eq!(fixture.consumer.calls(), 0);
        assert_eq!(fixture.obs.snapshot().cycle_failures.len(), 1);
    }

    #[tokio::test]
    async fn test_receiver_debug_shows_config() {
        let fixture = Fixture::new().await;
        let receiver = fixture.receiver(Vec::new());

        let debug = format!("{:?}", receiver);
        assert!(debug.starts_with("KubeletStatsReceiver"));
        assert!(debug.contains("https://localhost:10250"));
    }

    #[tokio::test]
    async fn test_builder_requires_collaborators() {
        assert!(ReceiverBuilder::new(ReceiverConfig::default()).build().is_err());
    }

    #[tokio::test]
    async fn test_runnable_setup_validates_config() {
        let fixture = Fixture::new().await;
        let mut config = Fixture::config(Vec::new());
        config.collection_interval_seconds = 0;
        let receiver = fixture.builder(config).build().unwrap();

        assert!(receiver.setup().await.is_err());
    }
}
