use anyhow::Context;
use clap::Parser;
use kafka_bridge::kafka::RdkafkaDriver;
use kafka_bridge::metrics::InMemoryMetrics;
use kafka_bridge::telemetry::TelemetryHub;
use kafka_bridge::{Config, ProducerBridge};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "kafka-bridge")]
#[command(about = "Bridges structured JSON events from stdin to a Kafka topic", long_about = None)]
struct Args {
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    config: PathBuf,

    #[arg(short, long, help = "Enable JSON output for logs")]
    json_logs: bool,

    #[arg(short, long, help = "Verbose logging")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(args.json_logs, args.verbose);

    info!("Starting kafka-bridge");
    info!("Loading configuration from {:?}", args.config);

    let config = Config::from_file(&args.config).context("failed to load configuration")?;

    info!(
        name = %config.name,
        bootstrap_hosts = ?config.bridge.bootstrap_hosts,
        topic = config
            .bridge
            .producer
            .as_ref()
            .map(|p| p.topic.as_str())
            .unwrap_or("<unset>"),
        "Configuration summary"
    );

    let hub = TelemetryHub::new();
    let metrics = Arc::new(InMemoryMetrics::new());
    let driver = Arc::new(RdkafkaDriver::new(hub.clone()));
    let bridge = ProducerBridge::new(
        driver,
        hub,
        metrics.clone(),
        config.bridge.data_dir.clone(),
    );

    let instance = bridge.start(&config.name, &config.bridge).await?;
    info!(topic = %instance.topic(), "Bridge running, reading JSON events from stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                break;
            }
            line = lines.next_line() => match line? {
                Some(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<serde_json::Value>(line) {
                        Ok(event) => {
                            if let Err(e) = bridge.send(&instance, &event) {
                                warn!(error = %e, "Send refused");
                            }
                        }
                        Err(e) => warn!(error = %e, "Skipping non-JSON input line"),
                    }
                }
                None => {
                    info!("Input drained");
                    break;
                }
            }
        }
    }

    let report = bridge.stop(&instance).await;
    if !report.is_clean() {
        error!(failures = report.failures.len(), "Teardown reported failures");
    }

    for (metric, value) in metrics.snapshot() {
        info!(metric = %metric, value, "Final metric");
    }

    Ok(())
}

fn init_logging(json: bool, verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::new("kafka_bridge=debug,info")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("kafka_bridge=info,warn"))
    };

    let fmt_layer = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_span_list(false)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
