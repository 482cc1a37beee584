//! Bulk Wikidata topic labeler.
//!
//! Reads a JSONL file of records carrying a `QID` field, appends the
//! predicted topics to each record, and writes them back out one per
//! line. Per-record failures are recorded on the record; only a missing
//! input file, an unusable model, or a bad threshold abort the run.

mod run;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use wdtopic_core::{EncoderConfig, ThresholdMode, validate_threshold};
use wdtopic_model::TopicModel;
use wdtopic_wikidata::{WikidataClient, WikidataConfig};

use run::RunOptions;

#[derive(Debug, Parser)]
#[command(name = "wdtopic", version, about = "Append predicted topics to a JSONL file of Wikidata QIDs")]
struct Args {
    /// Directory holding model.onnx, tokenizer.json, and labels.txt.
    #[arg(long, env = "WDTOPIC_MODEL_DIR")]
    model_dir: PathBuf,

    /// Input JSONL, one object per line with at minimum a "QID" field.
    #[arg(long)]
    input: PathBuf,

    /// Output JSONL with results appended to each record.
    #[arg(long)]
    output: PathBuf,

    /// Score cutoff; 0 lists the full model output.
    #[arg(long, default_value_t = 0.5)]
    threshold: f32,

    /// Keep scores equal to the threshold instead of dropping them.
    #[arg(long)]
    inclusive: bool,

    /// QIDs per API call (capped at 50).
    #[arg(long, default_value_t = 50)]
    batch_size: usize,

    /// Also append the full score listing and raw claims per record.
    #[arg(long)]
    debug: bool,

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

    let options = RunOptions {
        threshold: args.threshold,
        threshold_mode: if args.inclusive {
            ThresholdMode::Inclusive
        } else {
            ThresholdMode::Exclusive
        },
        batch_size: args.batch_size,
        debug: args.debug,
        encoder: EncoderConfig {
            property_allowlist: args
                .allow_properties
                .map(|props| props.into_iter().collect()),
        },
    };

    run::run(&args.input, &args.output, &options, &client, &model).await?;
    Ok(())
}
