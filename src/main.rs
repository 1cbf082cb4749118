//! Trace similarity analysis
//!
//! Usage:
//!   cargo run --release
//!   cargo run --release -- --config analysis.toml --no-plots
//!   cargo run --release -- --base-dir /data/run-42 --json

use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trace_similarity::config::AnalysisConfig;
use trace_similarity::report::SummaryReport;

/// Compare generated command traces against a reference trace
#[derive(Parser, Debug)]
#[command(name = "trace-similarity")]
#[command(about = "Statistical similarity between a reference trace and generated traces")]
struct Cli {
    /// TOML analysis config; falls back to TRACE_SIMILARITY_CONFIG, then the standard layout
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory the relative trace paths are resolved against
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Skip figure rendering
    #[arg(long)]
    no_plots: bool,

    /// Also print the summary as JSON
    #[arg(long)]
    json: bool,
}

fn main() {
    dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        error!("Analysis aborted: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::from_env(),
    };
    if let Some(base) = &cli.base_dir {
        config = config.with_base_dir(base);
    }
    if cli.no_plots {
        config.plot.enabled = false;
    }

    let results = trace_similarity::run(&config)?;

    if cli.json {
        println!("{}", SummaryReport::new(results).to_json()?);
    }
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trace_similarity=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
