//! Normalized metrics representation handed to downstream consumers

use crate::Labels;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Output unit of one collection cycle.
///
/// Resource groups appear in the order the translator produced them: node,
/// then pod, container and volume groups, each in snapshot traversal order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsBatch {
    pub resource_metrics: Vec<ResourceMetrics>,
}

impl MetricsBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.resource_metrics.is_empty()
    }

    /// Number of metrics and data points in the batch
    pub fn metric_and_data_point_count(&self) -> (usize, usize) {
        self.resource_metrics.iter().fold((0, 0), |(metrics, points), rm| {
            (
                metrics + rm.metrics.len(),
                points + rm.metrics.iter().map(|m| m.data_points.len()).sum::<usize>(),
            )
        })
    }

    pub fn data_point_count(&self) -> usize {
        self.metric_and_data_point_count().1
    }
}

/// Resource context a group of metrics originates from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceContext {
    Node,
    Pod,
    Container,
    Volume,
}

impl ResourceContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceContext::Node => "node",
            ResourceContext::Pod => "pod",
            ResourceContext::Container => "container",
            ResourceContext::Volume => "volume",
        }
    }
}

/// Metrics sharing one resource identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceMetrics {
    pub context: ResourceContext,
    pub resource: Labels,
    pub metrics: Vec<Metric>,
}

impl ResourceMetrics {
    pub fn new(context: ResourceContext, resource: Labels) -> Self {
        Self {
            context,
            resource,
            metrics: Vec::new(),
        }
    }

    /// Find a metric by name
    pub fn metric(&self, name: &str) -> Option<&Metric> {
        self.metrics.iter().find(|m| m.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Gauge,
    CumulativeSum,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub description: String,
    pub unit: String,
    pub kind: MetricKind,
    pub data_points: Vec<DataPoint>,
}

impl Metric {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        unit: impl Into<String>,
        kind: MetricKind,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            unit: unit.into(),
            kind,
            data_points: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    /// Start of the accumulation window (cumulative metrics only)
    pub start_time: Option<DateTime<Utc>>,
    pub time: DateTime<Utc>,
    pub value: PointValue,
    #[serde(default, skip_serializing_if = "Labels::is_empty")]
    pub attributes: Labels,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointValue {
    Int(i64),
    Double(f64),
}
