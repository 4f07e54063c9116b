//! Dining Philosophers CLI
//!
//! Run one dinner with the given parameters, or the self-check scenarios.

use clap::Parser;
use philo_core::{Dinner, Params, SimError, Transcript};
use philo_env::TokioContext;
use philo_sim::report::{self, EXIT_FAULT, EXIT_INVALID_PARAMS, EXIT_OK, EXIT_SCENARIO_FAILED};
use philo_sim::shutdown::wait_for_stop_signal;
use philo_sim::{run_all, RunExport, ScenarioId, ScenarioResult, ScenarioRunner};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Dining philosophers simulation
#[derive(Parser, Debug)]
#[command(name = "philo")]
#[command(about = "Run a deadlock-free dining philosophers simulation", long_about = None)]
struct Args {
    /// Number of philosophers (and forks)
    #[arg(short, long, default_value = "5", allow_negative_numbers = true)]
    philosophers: i64,

    /// Time (ms) a philosopher survives without starting a meal
    #[arg(short = 'd', long, default_value = "200", allow_negative_numbers = true)]
    to_die: i64,

    /// Time (ms) spent eating
    #[arg(short = 'e', long, default_value = "20", allow_negative_numbers = true)]
    to_eat: i64,

    /// Time (ms) spent sleeping after a meal
    #[arg(short = 's', long, default_value = "80", allow_negative_numbers = true)]
    to_sleep: i64,

    /// Time (ms) spent thinking before getting hungry
    #[arg(short = 't', long, default_value = "80", allow_negative_numbers = true)]
    to_think: i64,

    /// Meals each philosopher must eat (0 = until a death or Ctrl-C)
    #[arg(short, long, default_value = "3", allow_negative_numbers = true)]
    must_eat: i64,

    /// Time (ms) tasks get to stop before they are aborted
    #[arg(long, default_value = "1000")]
    grace_ms: u64,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for scripting
    #[arg(long)]
    json: bool,

    /// Export parameters, outcome and transcript to a JSON file
    #[arg(long)]
    export: Option<String>,

    /// Scenario to run instead (banquet, starvation, no_deadlock, satisfied, all)
    #[arg(short = 'S', long)]
    scenario: Option<String>,
}

impl Args {
    fn params(&self) -> Params {
        Params {
            num_philos: self.philosophers,
            time_die: self.to_die,
            time_eat: self.to_eat,
            time_sleep: self.to_sleep,
            time_think: self.to_think,
            num_eat: self.must_eat,
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging; stdout stays clean for --json
    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    let grace = Duration::from_millis(args.grace_ms);
    let code = match &args.scenario {
        Some(name) => run_scenarios(name, grace, args.json).await,
        None => run_dinner(&args, grace).await,
    };
    std::process::exit(code);
}

async fn run_dinner(args: &Args, grace: Duration) -> i32 {
    let params = args.params();
    if !args.json {
        println!("{}", params);
    }

    let config = match params.validate() {
        Ok(config) => config,
        Err(e) => {
            error!("invalid parameters: {}", e);
            return EXIT_INVALID_PARAMS;
        }
    };

    let mut dinner = Dinner::new(config, TokioContext::shared()).with_grace(grace);
    let transcript = args.export.as_ref().map(|_| Arc::new(Transcript::new()));
    if let Some(transcript) = &transcript {
        dinner = dinner.with_transcript(transcript.clone());
    }

    let stop = async {
        match wait_for_stop_signal().await {
            Ok(()) => info!("stop signal received"),
            Err(e) => {
                warn!("could not listen for stop signals: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    let outcome = match dinner.spawn().join_until(stop).await {
        Ok(outcome) => outcome,
        Err(e @ SimError::TaskPanicked { .. }) => {
            error!("{}", e);
            return EXIT_FAULT;
        }
    };

    if let (Some(path), Some(transcript)) = (&args.export, &transcript) {
        let export = RunExport::new(params, &outcome, transcript.entries());
        match export.write_to_file(path) {
            Ok(()) => info!("Exported {} transcript entries to {}", export.transcript.len(), path),
            Err(e) => error!("Failed to write export: {:?}", e),
        }
    }

    if args.json {
        let export = philo_sim::OutcomeExport::from(&outcome);
        let summary = serde_json::json!({
            "params": params,
            "outcome": export,
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => error!("Failed to encode outcome: {}", e),
        }
    } else {
        println!("{}", report::render(&outcome));
    }

    report::exit_code(&outcome)
}

async fn run_scenarios(name: &str, grace: Duration, json: bool) -> i32 {
    let scenarios: Vec<ScenarioId> = if name == "all" {
        ScenarioId::all()
    } else {
        match name.parse() {
            Ok(scenario) => vec![scenario],
            Err(e) => {
                error!("{}", e);
                error!("Available scenarios: banquet, starvation, no_deadlock, satisfied, all");
                return EXIT_INVALID_PARAMS;
            }
        }
    };

    let runner = ScenarioRunner::new().with_grace(grace);
    let results = run_all(&runner, &scenarios).await;
    let failed: Vec<&ScenarioResult> = results.iter().filter(|r| !r.passed).collect();

    if json {
        let summary = serde_json::json!({
            "total": results.len(),
            "passed": results.len() - failed.len(),
            "failed": failed.len(),
            "results": results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "passed": r.passed,
                    "outcome": r.outcome.as_ref().map(philo_sim::OutcomeExport::from),
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => error!("Failed to encode results: {}", e),
        }
    } else {
        for result in &results {
            if result.passed {
                info!("✓ {} PASSED", result.scenario.name());
            } else {
                error!(
                    "✗ {} FAILED: {}",
                    result.scenario.name(),
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
        if failed.is_empty() {
            info!("All {} scenario(s) passed", results.len());
        } else {
            error!("{}/{} scenario(s) failed", failed.len(), results.len());
        }
    }

    if failed.is_empty() {
        EXIT_OK
    } else {
        EXIT_SCENARIO_FAILED
    }
}
