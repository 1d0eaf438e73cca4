//! Main binary for the kubelet stats agent daemon (kstatsd)

use clap::{Parser, Subcommand};
use kstats_agent::consumers::{build_consumer, StdoutConsumer};
use kstats_agent::{build_receiver, init_logging, AgentConfig, IntervalRunner, ReceiverTelemetry, Result};
use kstats_core::NoopObsReport;
use prometheus::Registry;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "kstatsd")]
#[command(about = "Kubelet stats collection agent")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect on the configured interval until interrupted
    Run,
    /// Run a single collection cycle and print the batch as JSON
    Once,
    /// Generate default configuration
    Config {
        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate configuration
    Validate {
        /// Configuration file to validate
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run) | None => run(&cli).await,
        Some(Commands::Once) => once(&cli).await,
        Some(Commands::Config { ref output }) => generate_config(output.clone()),
        Some(Commands::Validate { ref config }) => validate_config(config.clone()),
    }
}

fn load_config(cli: &Cli) -> Result<AgentConfig> {
    let mut config = AgentConfig::load(cli.config.as_deref())?;

    // Apply CLI overrides
    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
        config.validate()?;
    }

    Ok(config)
}

async fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    init_logging(&config.logging)?;

    let cancel = CancellationToken::new();
    let telemetry = Arc::new(ReceiverTelemetry::new()?);

    if config.core.observability.enabled {
        let registry = Arc::new(Registry::new());
        telemetry.register(&registry)?;
        let (addr, _server) =
            kstats_agent::telemetry::serve_telemetry(registry, config.core.observability.bind_addr, cancel.clone())
                .await?;
        info!("Receiver telemetry available at http://{}/metrics", addr);
    }

    let consumer = build_consumer(&config.core.exporter)?;
    let receiver = Arc::new(build_receiver(&config, consumer, telemetry, cancel.clone())?);

    let period = Duration::from_secs(config.core.receiver.collection_interval_seconds);
    let handle = IntervalRunner::new(period, cancel.clone()).spawn(receiver);

    info!("kstatsd started, polling {}", config.core.receiver.kubelet.endpoint);

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C signal, shutting down");
    cancel.cancel();

    match handle.await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            error!("Collection loop failed: {}", e);
            Err(e.into())
        }
        Err(e) => Err(kstats_agent::AgentError::Service(format!("Collection task panicked: {}", e))),
    }
}

async fn once(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    init_logging(&config.logging)?;

    let receiver = build_receiver(
        &config,
        Arc::new(StdoutConsumer),
        Arc::new(NoopObsReport),
        CancellationToken::new(),
    )?;

    let points = receiver.run_cycle().await?;
    info!("Collected {} data points", points);
    Ok(())
}

fn generate_config(output: Option<PathBuf>) -> Result<()> {
    let config = AgentConfig::default();

    match output {
        Some(path) => {
            config.to_file(&path)?;
            println!("Configuration written to {}", path.display());
        }
        None => {
            let yaml = serde_yaml::to_string(&config)
                .map_err(|e| kstats_agent::AgentError::Config(format!("Failed to serialize config: {}", e)))?;
            print!("{}", yaml);
        }
    }

    Ok(())
}

fn validate_config(path: PathBuf) -> Result<()> {
    AgentConfig::load(Some(path.as_path()))?;
    println!("Configuration {} is valid", path.display());
    Ok(())
}
