//! Stats snapshot to metrics batch translation
//!
//! Each node, pod, container and volume sample becomes one
//! [`ResourceMetrics`] group. Groups are collected per resource context and
//! concatenated node first, then pods, containers and volumes, each in
//! snapshot order. A container or volume whose extra labels cannot be
//! resolved is dropped from the batch; everything else is still emitted.

use crate::metadata::Metadata;
use chrono::{DateTime, Utc};
use kstats_core::labels;
use kstats_core::stats::{ContainerStats, CpuStats, FsStats, MemoryStats, NetworkStats, PodStats, VolumeStats};
use kstats_core::{
    DataPoint, Labels, Metric, MetricGroup, MetricKind, MetricsBatch, ObsReport, PointValue, ResourceContext,
    ResourceMetrics, StatsSnapshot,
};
use tracing::{debug, warn};

const NODE_PREFIX: &str = "k8s.node.";
const POD_PREFIX: &str = "k8s.pod.";
const CONTAINER_PREFIX: &str = "container.";

/// Translates stats snapshots into metrics batches
#[derive(Debug, Clone)]
pub struct MetricTranslator {
    groups: Vec<MetricGroup>,
}

impl MetricTranslator {
    pub fn new(groups: Vec<MetricGroup>) -> Self {
        Self { groups }
    }

    fn collects(&self, group: MetricGroup) -> bool {
        self.groups.contains(&group)
    }

    /// Translate one snapshot. Samples without a timestamp are stamped with
    /// the start time of their resource, or the Unix epoch when that is
    /// unknown too, so the same snapshot always yields the same batch.
    pub async fn translate(
        &self,
        snapshot: &StatsSnapshot,
        metadata: &Metadata<'_>,
        obs: &dyn ObsReport,
    ) -> MetricsBatch {
        let mut nodes = Vec::new();
        let mut pods = Vec::new();
        let mut containers = Vec::new();
        let mut volumes = Vec::new();

        let node = &snapshot.node;
        if self.collects(MetricGroup::Node) {
            let resource = Labels::new().with(labels::NODE_NAME, node.node_name.as_str());
            let mut builder = ResourceBuilder::new(ResourceContext::Node, resource, node.start_time);
            builder.cpu(NODE_PREFIX, node.cpu.as_ref());
            builder.memory(NODE_PREFIX, node.memory.as_ref());
            builder.filesystem(NODE_PREFIX, node.fs.as_ref());
            builder.network(NODE_PREFIX, node.network.as_ref());
            nodes.extend(builder.finish());
        }

        for pod in &snapshot.pods {
            let pod_labels = pod_resource(pod);

            if self.collects(MetricGroup::Pod) {
                let mut builder =
                    ResourceBuilder::new(ResourceContext::Pod, pod_labels.clone(), pod.start_time);
                builder.cpu(POD_PREFIX, pod.cpu.as_ref());
                builder.memory(POD_PREFIX, pod.memory.as_ref());
                builder.network(POD_PREFIX, pod.network.as_ref());
                pods.extend(builder.finish());
            }

            if self.collects(MetricGroup::Container) {
                for container in &pod.containers {
                    if let Some(rm) = self.container(pod, container, &pod_labels, metadata, obs).await {
                        containers.push(rm);
                    }
                }
            }

            if self.collects(MetricGroup::Volume) {
                for volume in &pod.volumes {
                    if let Some(rm) = self.volume(pod, volume, &pod_labels, metadata, obs).await {
                        volumes.push(rm);
                    }
                }
            }
        }

        let batch = MetricsBatch {
            resource_metrics: nodes
                .into_iter()
                .chain(pods)
                .chain(containers)
                .chain(volumes)
                .collect(),
        };

        let (metrics, points) = batch.metric_and_data_point_count();
        debug!(
            "Translated snapshot of node {}: {} resources, {} metrics, {} data points",
            node.node_name,
            batch.resource_metrics.len(),
            metrics,
            points
        );

        batch
    }

    async fn container(
        &self,
        pod: &PodStats,
        container: &ContainerStats,
        pod_labels: &Labels,
        metadata: &Metadata<'_>,
        obs: &dyn ObsReport,
    ) -> Option<ResourceMetrics> {
        let mut resource = pod_labels.clone();
        resource.insert(labels::CONTAINER_NAME, container.name.as_str());

        if let Err(e) = metadata
            .set_container_labels(&pod.pod_ref.uid, &container.name, &mut resource)
            .await
        {
            warn!(
                "Dropping metrics for container {} of pod {}/{}: {}",
                container.name, pod.pod_ref.namespace, pod.pod_ref.name, e
            );
            obs.resolution_failed(&e);
            return None;
        }

        let mut builder = ResourceBuilder::new(ResourceContext::Container, resource, container.start_time);
        builder.cpu(CONTAINER_PREFIX, container.cpu.as_ref());
        builder.memory(CONTAINER_PREFIX, container.memory.as_ref());
        builder.filesystem(CONTAINER_PREFIX, container.rootfs.as_ref());
        builder.finish()
    }

    async fn volume(
        &self,
        pod: &PodStats,
        volume: &VolumeStats,
        pod_labels: &Labels,
        metadata: &Metadata<'_>,
        obs: &dyn ObsReport,
    ) -> Option<ResourceMetrics> {
        let mut resource = pod_labels.clone();
        resource.insert(labels::VOLUME_NAME, volume.name.as_str());
        if let Some(pvc) = &volume.pvc_ref {
            resource.insert(labels::PVC_NAME, pvc.name.as_str());
        }

        if let Err(e) = metadata
            .set_volume_labels(&pod.pod_ref.uid, &volume.name, &mut resource)
            .await
        {
            warn!(
                "Dropping metrics for volume {} of pod {}/{}: {}",
                volume.name, pod.pod_ref.namespace, pod.pod_ref.name, e
            );
            obs.resolution_failed(&e);
            return None;
        }

        // Volumes live as long as their pod
        let mut builder = ResourceBuilder::new(ResourceContext::Volume, resource, pod.start_time);
        builder.volume(volume);
        builder.finish()
    }
}

impl Default for MetricTranslator {
    fn default() -> Self {
        Self::new(vec![MetricGroup::Container, MetricGroup::Pod, MetricGroup::Node])
    }
}

fn pod_resource(pod: &PodStats) -> Labels {
    Labels::new()
        .with(labels::POD_UID, pod.pod_ref.uid.as_str())
        .with(labels::POD_NAME, pod.pod_ref.name.as_str())
        .with(labels::NAMESPACE_NAME, pod.pod_ref.namespace.as_str())
}

fn int(value: u64) -> PointValue {
    PointValue::Int(i64::try_from(value).unwrap_or(i64::MAX))
}

/// Accumulates the metrics of one resource
struct ResourceBuilder {
    rm: ResourceMetrics,
    fallback_time: DateTime<Utc>,
    start_time: Option<DateTime<Utc>>,
}

impl ResourceBuilder {
    fn new(context: ResourceContext, resource: Labels, start_time: Option<DateTime<Utc>>) -> Self {
        Self {
            rm: ResourceMetrics::new(context, resource),
            fallback_time: start_time.unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
            start_time,
        }
    }

    fn push(&mut self, metric: Metric) {
        if !metric.data_points.is_empty() {
            self.rm.metrics.push(metric);
        }
    }

    fn gauge(
        &mut self,
        name: String,
        description: &str,
        unit: &str,
        time: Option<DateTime<Utc>>,
        value: Option<PointValue>,
    ) {
        let mut metric = Metric::new(name, description, unit, MetricKind::Gauge);
        if let Some(value) = value {
            metric.data_points.push(DataPoint {
                start_time: None,
                time: time.unwrap_or(self.fallback_time),
                value,
                attributes: Labels::new(),
            });
        }
        self.push(metric);
    }

    fn cpu(&mut self, prefix: &str, cpu: Option<&CpuStats>) {
        let Some(cpu) = cpu else { return };

        self.gauge(
            format!("{}cpu.utilization", prefix),
            "CPU utilization",
            "1",
            cpu.time,
            cpu.usage_nano_cores.map(|v| PointValue::Double(v as f64 / 1e9)),
        );

        let mut metric = Metric::new(
            format!("{}cpu.time", prefix),
            "CPU time",
            "s",
            MetricKind::CumulativeSum,
        );
        if let Some(v) = cpu.usage_core_nano_seconds {
            metric.data_points.push(DataPoint {
                start_time: self.start_time,
                time: cpu.time.unwrap_or(self.fallback_time),
                value: PointValue::Double(v as f64 / 1e9),
                attributes: Labels::new(),
            });
        }
        self.push(metric);
    }

    fn memory(&mut self, prefix: &str, memory: Option<&MemoryStats>) {
        let Some(memory) = memory else { return };

        let gauges = [
            ("memory.available", "Memory available", "By", memory.available_bytes),
            ("memory.usage", "Memory usage", "By", memory.usage_bytes),
            ("memory.rss", "Memory rss", "By", memory.rss_bytes),
            ("memory.working_set", "Memory working_set", "By", memory.working_set_bytes),
            ("memory.page_faults", "Memory page_faults", "1", memory.page_faults),
            ("memory.major_page_faults", "Memory major_page_faults", "1", memory.major_page_faults),
        ];
        for (name, description, unit, value) in gauges {
            self.gauge(format!("{}{}", prefix, name), description, unit, memory.time, value.map(int));
        }
    }

    fn filesystem(&mut self, prefix: &str, fs: Option<&FsStats>) {
        let Some(fs) = fs else { return };

        let gauges = [
            ("filesystem.available", "Filesystem available", fs.available_bytes),
            ("filesystem.capacity", "Filesystem capacity", fs.capacity_bytes),
            ("filesystem.usage", "Filesystem usage", fs.used_bytes),
        ];
        for (name, description, value) in gauges {
            self.gauge(format!("{}{}", prefix, name), description, "By", fs.time, value.map(int));
        }
    }

    fn network(&mut self, prefix: &str, network: Option<&NetworkStats>) {
        let Some(network) = network else { return };
        let interfaces = network.all_interfaces();

        let mut io = Metric::new(
            format!("{}network.io", prefix),
            "Network IO",
            "By",
            MetricKind::CumulativeSum,
        );
        let mut errors = Metric::new(
            format!("{}network.errors", prefix),
            "Network errors",
            "1",
            MetricKind::CumulativeSum,
        );

        for iface in &interfaces {
            let directions = [
                ("receive", iface.rx_bytes, iface.rx_errors),
                ("transmit", iface.tx_bytes, iface.tx_errors),
            ];
            for (direction, bytes, errs) in directions {
                let attributes = Labels::new()
                    .with(labels::INTERFACE, iface.name.as_str())
                    .with(labels::DIRECTION, direction);

                if let Some(v) = bytes {
                    io.data_points.push(self.cumulative_point(network.time, int(v), attributes.clone()));
                }
                if let Some(v) = errs {
                    errors.data_points.push(self.cumulative_point(network.time, int(v), attributes));
                }
            }
        }

        self.push(io);
        self.push(errors);
    }

    fn volume(&mut self, volume: &VolumeStats) {
        let gauges = [
            ("k8s.volume.available", "The number of available bytes in the volume", "By", volume.available_bytes),
            ("k8s.volume.capacity", "The total capacity in bytes of the volume", "By", volume.capacity_bytes),
            ("k8s.volume.inodes", "The total inodes in the filesystem", "1", volume.inodes),
            ("k8s.volume.inodes.free", "The free inodes in the filesystem", "1", volume.inodes_free),
            ("k8s.volume.inodes.used", "The inodes used by the filesystem", "1", volume.inodes_used),
        ];
        for (name, description, unit, value) in gauges {
            self.gauge(name.to_string(), description, unit, volume.time, value.map(int));
        }
    }

    fn cumulative_point(&self, time: Option<DateTime<Utc>>, value: PointValue, attributes: Labels) -> DataPoint {
        DataPoint {
            start_time: self.start_time,
            time: time.unwrap_or(self.fallback_time),
            value,
            attributes,
        }
    }

    fn finish(self) -> Option<ResourceMetrics> {
        if self.rm.metrics.is_empty() {
            None
        } else {
            Some(self.rm)
        }
    }
}
