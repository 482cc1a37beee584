//! Single-item Wikidata topic query service.
//!
//! Loads the classifier artifact before binding; a missing or broken
//! model is fatal at startup, never a per-request error.

mod service;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use wdtopic_core::{EncoderConfig, ThresholdMode, validate_threshold};
use wdtopic_model::TopicModel;
use wdtopic_wikidata::{WikidataClient, WikidataConfig};

use service::AppState;

#[derive(Debug, Parser)]
#[command(name = "wdtopic-server", version, about = "Wikidata topic inference API")]
struct Args {
    /// Directory holding model.onnx, tokenizer.json, and labels.txt.
    #[arg(long, env = "WDTOPIC_MODEL_DIR")]
    model_dir: PathBuf,

    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = 8000, env = "WDTOPIC_PORT")]
    port: u16,

    /// Default score cutoff when a request supplies none.
    #[arg(long, default_value_t = 0.5)]
    threshold: f32,

    /// Keep scores equal to the threshold instead of dropping them.
    #[arg(long)]
    inclusive: bool,

    /// Only encode these properties (comma-separated, e.g. P31,P106).
    #[arg(long, value_delimiter = ',')]
    allow_properties: Option<Vec<String>>,

    /// Wikidata action API endpoint override.
    #[arg(long, env = "WDTOPIC_ENDPOINT")]
    endpoint: Option<String>,

    #[arg(long, env = "WDTOPIC_USER_AGENT")]
    user_agent: Option<String>,

    /// Upstream request timeout in seconds.
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    validate_threshold(args.threshold).context("invalid --threshold")?;

    // Load-before-serve: nothing binds until the artifact is usable.
    let model = TopicModel::load(&args.model_dir)
        .with_context(|| format!("failed to load topic model from {}", args.model_dir.display()))?;

    let mut config = WikidataConfig::default().with_timeout(Duration::from_secs(args.timeout_secs));
    if let Some(endpoint) = &args.endpoint {
        config = config.with_endpoint(endpoint.clone());
    }
    if let Some(user_agent) = &args.user_agent {
        config = config.with_user_agent(user_agent.clone());
    }
    let client = WikidataClient::new(config).context("failed to build wikidata client")?;

    let state = Arc::new(AppState {
        claims: Arc::new(client),
        scorer: Arc::new(model),
        encoder: EncoderConfig {
            property_allowlist: args
                .allow_properties
                .map(|props| props.into_iter().collect()),
        },
        default_threshold: args.threshold,
        threshold_mode: if args.inclusive {
            ThresholdMode::Inclusive
        } else {
            ThresholdMode::Exclusive
        },
    });

    let listener = TcpListener::bind((args.host.as_str(), args.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", args.host, args.port))?;
    info!(addr = %listener.local_addr()?, "serving wikidata topic api");

    axum::serve(listener, service::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutting down");
}
