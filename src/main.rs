use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use log::info;
use std::path::{Path, PathBuf};

mod cohort;
mod config;
mod detection;
mod error;
mod output;
mod patient;
mod pipeline;
mod windows;

use crate::cohort::MedianImputer;
use crate::config::Config;
use crate::pipeline::Pipeline;
use crate::windows::CohortKind;

#[derive(Parser)]
#[command(name = "aki-windows")]
#[command(about = "AKI onset labeling and observation-window preprocessing")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Configuration file path (JSON); defaults are used when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Number of worker threads (defaults to one per core)
    #[arg(short, long, global = true)]
    threads: Option<usize>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Detect AKI onset for every patient file and write the label table
    Label(CohortArgs),
    /// Build labeled 24h/48h/72h observation windows
    Windows(CohortArgs),
    /// Write descriptive statistics for every column of a cohort
    Summarize(CohortArgs),
}

#[derive(Args)]
struct CohortArgs {
    /// Directory of per-patient CSV files
    #[arg(short, long)]
    input: PathBuf,

    /// Output directory
    #[arg(short, long)]
    output: PathBuf,

    /// Treat the cohort as a test set (no exclusion of onsets inside windows)
    #[arg(long)]
    test: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to configure worker threads")?;
        info!("Using {} worker threads", threads);
    }

    // Load configuration
    let config = match &cli.config {
        Some(path) => {
            let config = Config::from_file(path)
                .with_context(|| format!("Failed to load configuration from {:?}", path))?;
            info!("Loaded configuration from {:?}", path);
            config
        }
        None => Config::default(),
    };

    let pipeline = Pipeline::new(config)?;

    match &cli.command {
        Command::Label(args) => run_label(&pipeline, args),
        Command::Windows(args) => run_windows(&pipeline, args),
        Command::Summarize(args) => run_summarize(&pipeline, args),
    }
}

fn prepare_output(dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {:?}", dir))
}

fn run_label(pipeline: &Pipeline, args: &CohortArgs) -> anyhow::Result<()> {
    let cohort = CohortKind::from_test_flag(args.test);
    let results = pipeline.label_directory(&args.input)?;

    prepare_output(&args.output)?;
    let path = args.output.join(format!("{}_aki_labels.csv", cohort.name()));
    output::save_onset_labels(&results, &path)?;

    Ok(())
}

fn run_windows(pipeline: &Pipeline, args: &CohortArgs) -> anyhow::Result<()> {
    let cohort = CohortKind::from_test_flag(args.test);
    let run = pipeline.build_windows(&args.input, cohort)?;

    prepare_output(&args.output)?;
    let imputer = MedianImputer::new(pipeline.config().imputation.empty_column_fill);
    for dataset in &run.datasets {
        output::save_window_dataset(dataset, &imputer, &args.output, cohort.name())?;
    }

    let summary_path = args.output.join(format!("{}_summary.json", cohort.name()));
    output::save_run_summary(&run.summary, &summary_path)?;
    info!("Results saved to {:?}", args.output);

    Ok(())
}

fn run_summarize(pipeline: &Pipeline, args: &CohortArgs) -> anyhow::Result<()> {
    let cohort = CohortKind::from_test_flag(args.test);
    let summaries = pipeline.summarize(&args.input)?;

    prepare_output(&args.output)?;
    let path = args.output.join(format!("{}_features.csv", cohort.name()));
    output::save_feature_summary(&summaries, &path)?;

    Ok(())
}
