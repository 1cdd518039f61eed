use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use ridgeflow_core::config::PipelineConfig;
use ridgeflow_core::ingestion::IngestMode;
use ridgeflow_core::pipelines::{all_pipelines, run_pipeline};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod loader;
mod render;

use render::OutputFormat;

#[derive(Parser, Debug)]
#[command(author, version, about = "Chart-ready tables from dated spreadsheet exports", long_about = None)]
struct Cli {
    /// Pipeline config file (falls back to RIDGEFLOW_CONFIG, then built-in defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Fail on the first batch containing malformed rows instead of skipping them
    #[arg(long, global = true)]
    strict: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Yearly sums per category, laid out as a centered stack
    StackedSum(RunArgs),
    /// Ridgeline density table: per-period histogram on a shared, zero-filled bin grid
    Density(DensityArgs),
    /// Mean of the density pipeline's primary measure per period
    MonthlyMeans(RunArgs),
    /// List the available pipelines
    Pipelines,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Input files or glob patterns (CSV, TSV or semicolon separated); stacked in order
    #[arg(short, long, required = true, num_args = 1..)]
    input: Vec<String>,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
    /// Write to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct DensityArgs {
    #[command(flatten)]
    run: RunArgs,
    /// Override density.bin_width from the config
    #[arg(long)]
    bin_width: Option<f64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;
    if cli.strict {
        config.ingest.mode = IngestMode::Strict;
    }

    match cli.command {
        Command::StackedSum(args) => execute("stacked_sum", &args, &config),
        Command::Density(args) => {
            if let Some(width) = args.bin_width {
                config.density.bin_width = width;
            }
            execute("ridgeline_density", &args.run, &config)
        }
        Command::MonthlyMeans(args) => execute("monthly_mean", &args, &config),
        Command::Pipelines => {
            for pipeline in all_pipelines() {
                println!("{:<20} {}", pipeline.code_identifier(), pipeline.description());
            }
            Ok(())
        }
    }
}

fn load_config(explicit: Option<&Path>) -> Result<PipelineConfig> {
    dotenvy::dotenv().ok();

    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => env::var_os("RIDGEFLOW_CONFIG").map(PathBuf::from),
    };

    match path {
        Some(path) => {
            let config = PipelineConfig::load(&path)
                .with_context(|| format!("failed to load config {}", path.display()))?;
            info!(path = %path.display(), "loaded pipeline config");
            Ok(config)
        }
        None => Ok(PipelineConfig::default()),
    }
}

fn execute(code: &str, args: &RunArgs, config: &PipelineConfig) -> Result<()> {
    let table = loader::load_inputs(&args.input)?;
    info!(source = %table.source, rows = table.height(), parser = table.parser, "loaded input");

    let output = run_pipeline(code, &table.df, config)
        .with_context(|| format!("pipeline {code} failed"))?;

    if !output.rejected.is_empty() {
        warn!(
            rejected = output.rejected.len(),
            first = %output.rejected[0],
            "malformed rows were skipped; rerun with --strict to fail instead"
        );
    }

    if output.rows.is_empty() {
        bail!("pipeline {code} produced no rows from {}; nothing to chart", table.source);
    }

    let mut writer = render::open_output(args.output.as_deref())?;
    render::write_rows(&output, args.format, &mut writer)?;
    writer.flush().context("failed to flush output")?;
    Ok(())
}
