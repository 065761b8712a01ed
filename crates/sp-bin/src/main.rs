//! Siteplan entrypoint: read a problem JSON, run the H-SAGA engine with
//! the default evaluator stack, write the result bundle as canonical JSON.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use core_config::load_from;
use core_evaluate::{DispersionEvaluator, MemoEvaluator};
use core_model::ProblemSpec;
use core_quality::{ComplianceChecker, CompliancePenaltyEvaluator};
use core_solver::Orchestrator;

/// Memoization slots for the default evaluator stack.
const MEMO_CAPACITY: usize = 4096;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "siteplan", version, about = "Campus layout optimizer")]
struct Args {
    /// Problem specification (JSON).
    pub problem: PathBuf,
    /// Result bundle destination; stdout when omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Configuration file path (overrides discovery of `siteplan.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// Override the run seed from the problem file.
    #[arg(long)]
    pub seed: Option<u64>,
    /// Run the Monte-Carlo robustness analysis on the winner.
    #[arg(long)]
    pub robustness: bool,
    /// Suppress progress logging (errors still print).
    #[arg(short, long)]
    pub quiet: bool,
    /// Mirror logs into this file.
    #[arg(long = "log-file")]
    pub log_file: Option<PathBuf>,
}

fn configure_logging(args: &Args) -> Option<WorkerGuard> {
    let default_filter = if args.quiet { "error" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    match &args.log_file {
        Some(path) => {
            let file = std::fs::File::create(path).ok()?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            None
        }
    }
}

/// Sections missing from the problem JSON take their values from the
/// config file; sections present in the JSON win.
fn load_problem(args: &Args) -> Result<ProblemSpec> {
    let raw = fs::read_to_string(&args.problem)
        .with_context(|| format!("reading problem file {}", args.problem.display()))?;
    let mut value: serde_json::Value =
        serde_json::from_str(&raw).context("parsing problem JSON")?;

    let config = load_from(args.config.clone())?;
    if let Some(object) = value.as_object_mut() {
        let defaults = [
            ("sa", serde_json::to_value(&config.file.sa)?),
            ("ga", serde_json::to_value(&config.file.ga)?),
            ("adaptive", serde_json::to_value(&config.file.adaptive)?),
            ("road", serde_json::to_value(&config.file.road)?),
            ("quality", serde_json::to_value(&config.file.quality)?),
        ];
        for (key, default) in defaults {
            object.entry(key.to_string()).or_insert(default);
        }
    }
    let mut spec: ProblemSpec =
        serde_json::from_value(value).context("interpreting problem JSON")?;
    if let Some(seed) = args.seed {
        spec.rng_seed = Some(seed);
    }
    if args.robustness {
        spec.quality.assess_robustness = true;
    }
    Ok(spec)
}

fn run(args: Args) -> Result<()> {
    let spec = load_problem(&args)?;
    info!(
        target: "runtime.startup",
        problem = spec.problem_id.as_str(),
        buildings = spec.buildings.len(),
        gateways = spec.site.gateways.len(),
        seed = spec.rng_seed,
        "bootstrap_complete"
    );

    let checker = ComplianceChecker::new(spec.quality.compliance.clone(), spec.boundary_margin);
    let evaluator = Arc::new(MemoEvaluator::new(
        CompliancePenaltyEvaluator::new(DispersionEvaluator, checker, 1.0),
        MEMO_CAPACITY,
    ));

    let orchestrator = Orchestrator::new(spec, evaluator);
    let progress = orchestrator.subscribe();
    let forwarder = std::thread::spawn(move || {
        for event in progress.iter() {
            info!(
                target: "runtime.progress",
                phase = %event.phase,
                iteration = event.iteration,
                best = event.best_fitness,
                diversity = event.population_diversity,
                "progress"
            );
        }
    });

    let bundle = orchestrator.run()?;
    // the bus is gone with the orchestrator; the forwarder drains and exits
    let _ = forwarder.join();

    info!(
        target: "runtime",
        best_fitness = bundle.best_solution.fitness,
        front = bundle.pareto_front.len(),
        compliance = ?bundle.compliance.status,
        roads = bundle.road_network.roads.len(),
        cancelled = bundle.cancelled,
        "run_complete"
    );

    let json = bundle.to_canonical_json()?;
    match &args.output {
        Some(path) => fs::write(path, json.as_bytes())
            .with_context(|| format!("writing result to {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    let _log_guard = configure_logging(&args);
    if let Err(e) = run(args) {
        error!(target: "runtime", error = %format!("{e:#}"), "run_failed");
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
