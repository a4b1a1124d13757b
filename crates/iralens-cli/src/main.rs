mod display;
mod input;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use iralens_ai::OpenAiClient;
use iralens_archive::WaybackClient;
use iralens_core::AnalysisConfig;
use iralens_pipeline::{AttritionReport, Orchestrator};
use iralens_store::{OutputFormat, ResultSink, read_results, write_results};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::input::LoadOptions;

#[derive(Parser, Debug)]
#[command(
    name = "iralens",
    version,
    about = "Compare archived corporate websites before and after the Inflation Reduction Act"
)]
struct Cli {
    /// Log at debug level (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze every company in a PitchBook export.
    Run(RunArgs),
    /// Print the attrition table for an existing results file.
    Report {
        #[arg(long)]
        results: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// PitchBook CSV export.
    #[arg(long)]
    csv: PathBuf,

    /// Analyze a seeded random sample of this many companies.
    #[arg(long)]
    sample: Option<usize>,

    /// Results file (.csv or .parquet). Defaults to a timestamped CSV.
    #[arg(long)]
    output: Option<PathBuf>,

    /// JSON run configuration; missing keys take their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    workers: Option<usize>,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long)]
    model: Option<String>,

    #[arg(long, env = "OPENAI_BASE_URL")]
    openai_base_url: Option<String>,

    /// Numeric input column carried into the attrition report.
    #[arg(long, default_value = "Employees")]
    size_column: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    match cli.command {
        Command::Run(args) => run(args).await,
        Command::Report { results } => report(&results),
    }
}

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))
}

fn load_config(args: &RunArgs) -> anyhow::Result<AnalysisConfig> {
    let mut config = match &args.config {
        Some(path) => AnalysisConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => AnalysisConfig::default(),
    };
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if let Some(model) = &args.model {
        config.reasoning.model = model.clone();
    }
    if let Some(base) = &args.openai_base_url {
        config.reasoning.endpoint = base.clone();
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn default_output() -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    PathBuf::from(format!("ira_analysis_results_{stamp}.csv"))
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    // Everything fatal is checked before the first company is dispatched.
    let config = load_config(&args)?;
    let Some(api_key) = args.api_key.clone().filter(|k| !k.trim().is_empty()) else {
        bail!("OpenAI API key not found; pass --api-key or set OPENAI_API_KEY");
    };
    let output = args.output.clone().unwrap_or_else(default_output);
    OutputFormat::from_path(&output)?;

    let companies = input::load_companies(
        &args.csv,
        &LoadOptions {
            paths: config.candidate_paths.clone(),
            size_column: args.size_column.clone(),
            sample: args.sample,
        },
    )?;
    if companies.is_empty() {
        bail!("no usable companies in {}", args.csv.display());
    }

    let archive = WaybackClient::new(&config.archive).context("building archive client")?;
    let reasoning =
        OpenAiClient::new(&config.reasoning, api_key).context("building reasoning client")?;
    let sink = Arc::new(ResultSink::new());
    let orchestrator = Orchestrator::new(archive, reasoning, &config).with_sink(sink.clone());

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; finishing companies in flight");
            on_signal.cancel();
        }
    });

    let outcome = orchestrator.run(companies, cancel).await;

    // Rows already produced are written even when the run stops early.
    let rows = sink.snapshot();
    write_results(&output, &rows).with_context(|| format!("writing {}", output.display()))?;
    info!(path = %output.display(), rows = rows.len(), "results saved");

    let summary = outcome.context("company state machine violated")?;
    display::print_run_summary(&summary);
    display::print_attrition(&AttritionReport::from_rows(&rows));
    Ok(())
}

fn report(path: &Path) -> anyhow::Result<()> {
    let rows = read_results(path).with_context(|| format!("reading {}", path.display()))?;
    display::print_attrition(&AttritionReport::from_rows(&rows));
    Ok(())
}
