//! # kstats-agent
//!
//! Kubelet stats collection agent (kstatsd daemon).
//!
//! This crate wires the collection cycle together: it polls the kubelet,
//! enriches samples with pod and volume metadata, translates them into a
//! metrics batch and forwards the batch to a consumer on a fixed interval.

pub mod cache;
pub mod config;
pub mod consumers;
pub mod metadata;
pub mod receiver;
pub mod resolver;
pub mod runner;
pub mod telemetry;
pub mod translator;

// Re-export commonly used types
pub use cache::VolumeLabelCache;
pub use crate::config::{AgentConfig, LoggingConfig};
pub use receiver::{KubeletStatsReceiver, ReceiverBuilder};
pub use resolver::MetadataResolver;
pub use runner::{IntervalRunner, Runnable};
pub use telemetry::ReceiverTelemetry;
pub use translator::MetricTranslator;

use kstats_core::{MetricsConsumer, ObsReport};
use kstats_kubelet::{ApiServerClient, KubeletClient};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

// Error handling
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Service error: {0}")]
    Service(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Core error: {0}")]
    Core(#[from] kstats_core::Error),

    #[error("Client error: {0}")]
    Client(#[from] kstats_kubelet::ClientError),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AgentError>;

/// Build a receiver talking to the kubelet (and the API server when
/// configured) described by `config`
pub fn build_receiver(
    config: &AgentConfig,
    consumer: Arc<dyn MetricsConsumer>,
    obs: Arc<dyn ObsReport>,
    cancel: CancellationToken,
) -> Result<KubeletStatsReceiver> {
    let kubelet = Arc::new(KubeletClient::new(&config.core.receiver.kubelet)?);

    let mut builder = ReceiverBuilder::new(config.core.receiver.clone())
        .with_stats_provider(kubelet.clone())
        .with_metadata_provider(kubelet)
        .with_consumer(consumer)
        .with_cache(Arc::new(VolumeLabelCache::new()))
        .with_obs_report(obs)
        .with_cancellation(cancel);

    if let Some(ref k8s_api) = config.core.k8s_api {
        builder = builder.with_volume_api(Arc::new(ApiServerClient::new(k8s_api)?));
    } else {
        tracing::info!("No API server configured, persistent volume claim enrichment disabled");
    }

    Ok(builder.build()?)
}

/// Initialize logging and tracing
pub fn init_logging(logging_config: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging_config.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(logging_config.show_target)
        .with_thread_ids(logging_config.show_thread_ids)
        .with_line_number(logging_config.show_line_numbers);

    let result = match logging_config.format.as_str() {
        "json" => subscriber.json().try_init(),
        _ => subscriber.try_init(),
    };

    result.map_err(|e| AgentError::Config(format!("Failed to initialize logging: {}", e)))
}
