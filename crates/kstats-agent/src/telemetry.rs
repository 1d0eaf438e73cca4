//! Receiver self-observability: prometheus counters and the /metrics endpoint

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use kstats_core::{CycleStage, Error, ObsReport};
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Prometheus-backed observability sink for the receiver
#[derive(Debug, Clone)]
pub struct ReceiverTelemetry {
    /// Data points accepted by the consumer
    pub accepted_points: IntCounter,

    /// Data points the consumer refused
    pub refused_points: IntCounter,

    /// Cycles aborted before emission, by stage
    pub cycle_failures: IntCounterVec,

    /// Resources dropped because their labels could not be resolved
    pub resolution_failures: IntCounter,

    /// Cycle wall-clock time
    pub cycle_duration: Histogram,
}

impl ReceiverTelemetry {
    pub fn new() -> prometheus::Result<Self> {
        Ok(Self {
            accepted_points: IntCounter::new(
                "kstats_receiver_accepted_metric_points_total",
                "Number of metric points successfully pushed to the consumer",
            )?,
            refused_points: IntCounter::new(
                "kstats_receiver_refused_metric_points_total",
                "Number of metric points refused by the consumer",
            )?,
            cycle_failures: IntCounterVec::new(
                Opts::new(
                    "kstats_receiver_cycle_failures_total",
                    "Number of collection cycles aborted before emission",
                ),
                &["stage"],
            )?,
            resolution_failures: IntCounter::new(
                "kstats_receiver_volume_resolution_failures_total",
                "Number of resources dropped because label enrichment failed",
            )?,
            cycle_duration: Histogram::with_opts(
                HistogramOpts::new(
                    "kstats_receiver_cycle_duration_seconds",
                    "Duration of collection cycles",
                )
                .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
            )?,
        })
    }

    /// Register all metrics with the given registry
    pub fn register(&self, registry: &Registry) -> prometheus::Result<()> {
        registry.register(Box::new(self.accepted_points.clone()))?;
        registry.register(Box::new(self.refused_points.clone()))?;
        registry.register(Box::new(self.cycle_failures.clone()))?;
        registry.register(Box::new(self.resolution_failures.clone()))?;
        registry.register(Box::new(self.cycle_duration.clone()))?;
        Ok(())
    }
}

impl ObsReport for ReceiverTelemetry {
    fn cycle_failed(&self, stage: CycleStage, _error: &Error) {
        self.cycle_failures.with_label_values(&[stage.as_str()]).inc();
    }

    fn resolution_failed(&self, _error: &Error) {
        self.resolution_failures.inc();
    }

    fn metrics_received(&self, data_points: usize, error: Option<&Error>) {
        let points = data_points as u64;
        match error {
            Some(_) => self.refused_points.inc_by(points),
            None => self.accepted_points.inc_by(points),
        }
    }

    fn cycle_completed(&self, elapsed: Duration) {
        self.cycle_duration.observe(elapsed.as_secs_f64());
    }
}

/// Serve `registry` on `/metrics` (plus `/health`) until `cancel` fires
pub async fn serve_telemetry(
    registry: Arc<Registry>,
    bind_addr: SocketAddr,
    cancel: CancellationToken,
) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind(bind_addr).await?;
    let local_addr = listener.local_addr()?;
    let app = telemetry_app(registry);

    info!("Serving receiver telemetry on {}", local_addr);

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await
        {
            warn!("Telemetry server error: {}", e);
        }
    });

    Ok((local_addr, handle))
}

fn telemetry_app(registry: Arc<Registry>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(registry)
}

async fn metrics_handler(State(registry): State<Arc<Registry>>) -> Response {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&registry.gather(), &mut buffer) {
        warn!("Failed to encode telemetry: {}", e);
        return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics").into_response();
    }

    match String::from_utf8(buffer) {
        Ok(text) => (StatusCode::OK, [("content-type", encoder.format_type().to_string())], text).into_response(),
        Err(e) => {
            warn!("Telemetry is not valid UTF-8: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics").into_response()
        }
    }
}

async fn health_handler() -> Response {
    (StatusCode::OK, "OK").into_response()
}
