//! # kstats-core
//!
//! Core types, traits, and utilities for kstats - a kubelet stats collection agent.
//!
//! This crate provides the foundational data structures and interfaces that are
//! shared across all other kstats components. It includes:
//!
//! - The stats snapshot and pod metadata models decoded from the kubelet
//! - Persistent volume claim/volume models and storage label extraction
//! - The normalized metrics batch handed to downstream consumers
//! - Collaborator traits (stats, metadata, auxiliary API, consumer, observability)
//! - Configuration schema and parsing utilities
//! - Error handling types and utilities

pub mod config;
pub mod error;
pub mod labels;
pub mod metrics;
pub mod mock;
pub mod pods;
pub mod stats;
pub mod traits;
pub mod volumes;

// Re-export commonly used types at the crate root
pub use crate::config::{AuthType, Config, EndpointConfig, MetadataLabel, MetricGroup, ReceiverConfig};
pub use error::{Error, Result};
pub use labels::Labels;
pub use metrics::{DataPoint, Metric, MetricKind, MetricsBatch, PointValue, ResourceContext, ResourceMetrics};
pub use pods::{Pod, PodList, PodVolumeSource, Volume};
pub use stats::StatsSnapshot;
pub use traits::{CycleStage, MetadataProvider, MetricsConsumer, NoopObsReport, ObsReport, StatsProvider, VolumeApi};
pub use volumes::{PersistentVolume, PersistentVolumeClaim, PersistentVolumeSource};
