//! wxfuse - offline fusion runner
//!
//! Reads a JSON array of readings (file or stdin), fuses it with the engine
//! and prints the per-cohort report as JSON on stdout.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};
use wxfuse_common::config::ConfigResolver;
use wxfuse_engine::{FusionEngine, Granularity, Reading};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Daily,
    Hourly,
}

impl From<Mode> for Granularity {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Daily => Granularity::Daily,
            Mode::Hourly => Granularity::Hourly,
        }
    }
}

/// Command-line arguments for wxfuse
#[derive(Parser, Debug)]
#[command(name = "wxfuse")]
#[command(about = "Fuse weather readings from several providers")]
#[command(version)]
struct Args {
    /// JSON file with an array of readings ("-" for stdin)
    input: PathBuf,

    /// Time bucket size
    #[arg(short, long, value_enum, default_value = "daily")]
    mode: Mode,

    /// Config file (TOML)
    #[arg(short, long, env = "WXFUSE_CONFIG")]
    config: Option<PathBuf>,

    /// Cohorts fused in parallel
    #[arg(short, long, default_value = "4")]
    workers: usize,

    /// Pretty-print the JSON report
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Tracing comes up first so config-loading diagnostics are visible;
    // the [logging] level replaces the filter afterwards unless RUST_LOG is set
    let env_filter = EnvFilter::try_from_default_env().ok();
    let filter_from_env = env_filter.is_some();
    let (filter, filter_handle) =
        reload::Layer::new(env_filter.unwrap_or_else(|| EnvFilter::new("info")));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        git_rev = env!("WXFUSE_GIT_REV"),
        built_at = env!("WXFUSE_BUILT_AT"),
        profile = env!("WXFUSE_PROFILE"),
        "Starting wxfuse"
    );

    let config = ConfigResolver::new(args.config.as_deref())
        .load()
        .context("Failed to load configuration")?;
    if !filter_from_env {
        filter_handle
            .reload(EnvFilter::new(&config.logging.level))
            .context("Failed to apply configured log level")?;
    }

    let readings = read_readings(&args.input)?;
    info!(
        readings = readings.len(),
        input = %args.input.display(),
        "Loaded readings"
    );

    let engine =
        Arc::new(FusionEngine::new(&config.fusion).context("Invalid fusion settings")?);
    let report = engine
        .fuse_concurrent(readings, args.mode.into(), args.workers)
        .await;

    let json = if args.pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    }
    .context("Failed to serialize report")?;
    println!("{}", json);

    Ok(())
}

fn read_readings(input: &Path) -> Result<Vec<Reading>> {
    let text = if input.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read readings from stdin")?;
        buf
    } else {
        std::fs::read_to_string(input)
            .with_context(|| format!("Failed to read {}", input.display()))?
    };

    serde_json::from_str(&text).context("Readings must be a JSON array of reading objects")
}
