//! Folio CLI - Command line interface for portfolio simulations.
//!
//! Every command prints a JSON `ApiResponse` on stdout; logs go to stderr.

use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use folio_core::{
    narrative::{build_prompt, extract_narrative},
    portfolio::{analyze, max_drawdown_pct, run_trials, PortfolioAggregator, Scenario},
    simulation::{rng_from_seed, CancelToken},
    ApiResponse, EngineConfig, MarkerMatch,
};
use serde_json::{json, Value};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Folio CLI - Monte-Carlo portfolio simulation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate one portfolio value path
    Simulate {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Run many independent trials and summarise the outcomes
    Batch {
        #[command(flatten)]
        run: RunArgs,
        /// Number of trials (overrides config)
        #[arg(short = 'n', long)]
        trials: Option<usize>,
    },
    /// Compute metrics for a literal value series
    Metrics {
        /// Annualisation horizon in days
        #[arg(short, long)]
        days: usize,
        /// Portfolio values, oldest first
        #[arg(required = true, num_args = 1.., allow_negative_numbers = true)]
        values: Vec<f64>,
    },
    /// Print the narrative prompt for a simulated run
    Prompt {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Extract the narrative from a raw model response read on stdin
    Extract {
        /// Match <Start>/<Finish> regardless of ASCII case (overrides config)
        #[arg(long)]
        case_insensitive: bool,
        /// Config file (defaults to ~/.folio/config.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Scenario JSON file with cash, holdings, and history
    #[arg(short, long)]
    scenario: PathBuf,
    /// Valuation date (YYYY-MM-DD)
    #[arg(short, long)]
    as_of: NaiveDate,
    /// Days to simulate (overrides config)
    #[arg(short, long)]
    days: Option<usize>,
    /// RNG seed (overrides config)
    #[arg(long)]
    seed: Option<u64>,
    /// Config file (defaults to ~/.folio/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Abort after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
}

impl RunArgs {
    fn load(&self) -> Result<(EngineConfig, Scenario)> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::load_from_path(path),
            None => EngineConfig::load(),
        }
        .context("failed to load config")?;

        if let Some(days) = self.days {
            config.simulation.days = days;
        }
        if self.seed.is_some() {
            config.simulation.seed = self.seed;
        }

        let scenario = Scenario::load(&self.scenario)
            .with_context(|| format!("failed to load scenario {}", self.scenario.display()))?;
        Ok((config, scenario))
    }

    fn cancel_token(&self) -> CancelToken {
        match self.timeout_secs {
            Some(secs) => CancelToken::with_timeout(Duration::from_secs(secs)),
            None => CancelToken::new(),
        }
    }
}

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Simulate { run } => handle_simulate(&run),
        Commands::Batch { run, trials } => handle_batch(&run, trials),
        Commands::Metrics { days, values } => handle_metrics(days, &values),
        Commands::Prompt { run } => handle_prompt(&run),
        Commands::Extract {
            case_insensitive,
            config,
        } => handle_extract(case_insensitive, config),
    };

    let (output, ok) = match result {
        Ok(data) => (serde_json::to_string_pretty(&ApiResponse::ok(data)), true),
        Err(e) => {
            tracing::error!("{:#}", e);
            (
                serde_json::to_string_pretty(&ApiResponse::<()>::err(format!("{:#}", e))),
                false,
            )
        }
    };

    match output {
        Ok(text) => println!("{}", text),
        Err(e) => {
            eprintln!("failed to serialise response: {}", e);
            std::process::exit(2);
        }
    }
    if !ok {
        std::process::exit(1);
    }
}

fn simulate_once(run: &RunArgs, config: &EngineConfig, scenario: &Scenario) -> Result<Vec<f64>> {
    let portfolio = scenario.portfolio();
    let series = PortfolioAggregator::new(
        &portfolio,
        &scenario.history,
        run.as_of,
        config.simulation.days,
        config.calibration,
    )
    .with_cancel(run.cancel_token())
    .run(&mut rng_from_seed(config.simulation.seed))?;
    Ok(series)
}

fn handle_simulate(run: &RunArgs) -> Result<Value> {
    let (config, scenario) = run.load()?;
    let days = config.simulation.days;
    let series = simulate_once(run, &config, &scenario)?;

    let metrics = analyze(&series, days);
    Ok(json!({
        "as_of": run.as_of,
        "days": days,
        "series": series,
        "metrics": metrics,
        "max_drawdown_pct": max_drawdown_pct(&series),
    }))
}

fn handle_batch(run: &RunArgs, trials: Option<usize>) -> Result<Value> {
    let (config, scenario) = run.load()?;
    let portfolio = scenario.portfolio();
    let trials = trials.unwrap_or(config.simulation.trials);
    // A batch is always reproducible; draw a seed once when none was given
    let seed = config.simulation.seed.unwrap_or_else(rand::random);

    let aggregator = PortfolioAggregator::new(
        &portfolio,
        &scenario.history,
        run.as_of,
        config.simulation.days,
        config.calibration,
    )
    .with_cancel(run.cancel_token());

    let summary = run_trials(&aggregator, trials, seed)?;
    Ok(json!({
        "seed": seed,
        "summary": summary,
    }))
}

fn handle_metrics(days: usize, values: &[f64]) -> Result<Value> {
    Ok(json!({
        "metrics": analyze(values, days),
        "max_drawdown_pct": max_drawdown_pct(values),
    }))
}

fn handle_prompt(run: &RunArgs) -> Result<Value> {
    let (config, scenario) = run.load()?;
    let days = config.simulation.days;
    let series = simulate_once(run, &config, &scenario)?;

    let metrics = analyze(&series, days);
    Ok(json!({
        "prompt": build_prompt(&metrics, &scenario.holdings, days),
    }))
}

fn handle_extract(case_insensitive: bool, config: Option<PathBuf>) -> Result<Value> {
    let config = match config {
        Some(path) => EngineConfig::load_from_path(&path),
        None => EngineConfig::load(),
    }
    .context("failed to load config")?;

    let mut raw = String::new();
    std::io::stdin()
        .read_to_string(&mut raw)
        .context("failed to read response from stdin")?;

    let matching = if case_insensitive {
        MarkerMatch::CaseInsensitive
    } else {
        config.narrative.marker_match()
    };
    Ok(json!({
        "narrative": extract_narrative(&raw, matching),
    }))
}
