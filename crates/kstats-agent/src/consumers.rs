//! Downstream metrics consumers

use async_trait::async_trait;
use kstats_core::config::{ExporterConfig, ExporterKind};
use kstats_core::{Error, MetricsBatch, MetricsConsumer, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Logs a summary line per batch and per resource group
#[derive(Debug, Default, Clone)]
pub struct LoggingConsumer;

impl LoggingConsumer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MetricsConsumer for LoggingConsumer {
    async fn consume_metrics(&self, batch: MetricsBatch) -> Result<()> {
        let (metrics, points) = batch.metric_and_data_point_count();
        info!(
            "Received metrics batch: {} resources, {} metrics, {} data points",
            batch.resource_metrics.len(),
            metrics,
            points
        );

        for rm in &batch.resource_metrics {
            debug!(
                "{} [{}]: {}",
                rm.context.as_str(),
                rm.resource.to_log_string(),
                rm.metrics
                    .iter()
                    .map(|m| m.name.as_str())
                    .collect::<Vec<_>>()
                    .join(",")
            );
        }

        Ok(())
    }
}

/// Writes each batch to stdout as pretty-printed JSON
#[derive(Debug, Default, Clone)]
pub struct StdoutConsumer;

#[async_trait]
impl MetricsConsumer for StdoutConsumer {
    async fn consume_metrics(&self, batch: MetricsBatch) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(&batch)?);
        Ok(())
    }
}

/// POSTs each batch as JSON to a fixed URL
#[derive(Debug, Clone)]
pub struct HttpConsumer {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpConsumer {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }
}

#[async_trait]
impl MetricsConsumer for HttpConsumer {
    async fn consume_metrics(&self, batch: MetricsBatch) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&batch)
            .send()
            .await
            .map_err(|e| Error::consumer_rejection(format!("POST {} failed: {}", self.endpoint, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::consumer_rejection(format!(
                "{} responded with {}",
                self.endpoint, status
            )));
        }

        debug!("Delivered {} data points to {}", batch.data_point_count(), self.endpoint);
        Ok(())
    }
}

/// Build the consumer described by the exporter configuration
pub fn build_consumer(config: &ExporterConfig) -> Result<Arc<dyn MetricsConsumer>> {
    match config.kind {
        ExporterKind::Logging => Ok(Arc::new(LoggingConsumer::new())),
        ExporterKind::Http => {
            let endpoint = config
                .endpoint
                .clone()
                .ok_or_else(|| Error::config("http exporter requires an endpoint"))?;
            info!("Exporting metrics to {}", endpoint);
            Ok(Arc::new(HttpConsumer::new(
                endpoint,
                Duration::from_secs(config.timeout_seconds),
            )?))
        }
    }
}
