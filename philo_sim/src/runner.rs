//! Scenario runner - executes the self-check scenarios on the real clock.

use crate::scenarios::ScenarioId;

use philo_core::{Dinner, DinnerConfig, SimulationOutcome, TerminalReason, DEFAULT_GRACE};
use philo_env::TokioContext;
use std::time::Duration;
use tracing::{debug, info};

/// Table sizes the progress check cycles through.
const NO_DEADLOCK_SIZES: [i64; 4] = [2, 3, 5, 10];

/// Slack allowed past TimeDie before a reported death counts as late.
const DEATH_MARGIN: Duration = Duration::from_millis(50);

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Outcome of the last run the scenario performed
    pub outcome: Option<SimulationOutcome>,

    /// Failure message if any
    pub failure_reason: Option<String>,
}

impl ScenarioResult {
    fn check(scenario: ScenarioId, outcome: SimulationOutcome, failure: Option<String>) -> Self {
        Self {
            scenario,
            passed: failure.is_none(),
            outcome: Some(outcome),
            failure_reason: failure,
        }
    }

    fn failed(scenario: ScenarioId, reason: String) -> Self {
        Self {
            scenario,
            passed: false,
            outcome: None,
            failure_reason: Some(reason),
        }
    }
}

/// Runs self-check scenarios.
pub struct ScenarioRunner {
    /// Grace period handed to every dinner
    grace: Duration,

    /// How long the progress check waits between two tally snapshots
    window: Duration,
}

impl Default for ScenarioRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new() -> Self {
        Self {
            grace: DEFAULT_GRACE,
            window: Duration::from_millis(250),
        }
    }

    /// Sets the supervisor grace period.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Sets the progress check window.
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Runs a scenario and returns the result.
    pub async fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        info!("Starting scenario: {} ({})", scenario.name(), scenario.description());

        let config = match scenario.params().validate() {
            Ok(config) => config,
            Err(e) => return ScenarioResult::failed(scenario, e.to_string()),
        };

        match scenario {
            ScenarioId::Banquet => self.run_banquet(config).await,
            ScenarioId::Starvation => self.run_starvation(config).await,
            ScenarioId::NoDeadlock => self.run_no_deadlock(config).await,
            ScenarioId::Satisfied => self.run_satisfied(config).await,
        }
    }

    fn dinner(&self, config: DinnerConfig) -> Dinner<TokioContext> {
        Dinner::new(config, TokioContext::shared()).with_grace(self.grace)
    }

    /// Everyone eats exactly the target; the run ends by satisfaction.
    async fn run_banquet(&self, config: DinnerConfig) -> ScenarioResult {
        let scenario = ScenarioId::Banquet;
        let outcome = match self.dinner(config).run().await {
            Ok(outcome) => outcome,
            Err(e) => return ScenarioResult::failed(scenario, e.to_string()),
        };

        let target = config.meal_target().unwrap_or(0);
        let failure = if !outcome.is_all_satisfied() {
            Some(format!("expected all_satisfied, got {}", outcome.reason.as_label()))
        } else if outcome.meals.iter().any(|&m| m != target) {
            Some(format!("expected {} meals each, got {:?}", target, outcome.meals))
        } else {
            None
        };
        ScenarioResult::check(scenario, outcome, failure)
    }

    /// A meal longer than the deadline starves the neighbour.
    async fn run_starvation(&self, config: DinnerConfig) -> ScenarioResult {
        let scenario = ScenarioId::Starvation;
        let outcome = match self.dinner(config).run().await {
            Ok(outcome) => outcome,
            Err(e) => return ScenarioResult::failed(scenario, e.to_string()),
        };

        let deadline = config.time_die();
        let failure = match outcome.death() {
            None => Some(format!("expected a death, got {}", outcome.reason.as_label())),
            Some((_, at)) if at <= deadline => {
                Some(format!("death reported at {}ms, before the deadline", at.as_millis()))
            }
            Some((id, at)) if at > deadline + DEATH_MARGIN => Some(format!(
                "philosopher {} reported dead at {}ms, more than {}ms late",
                id,
                at.as_millis(),
                DEATH_MARGIN.as_millis()
            )),
            Some(_) => None,
        };
        ScenarioResult::check(scenario, outcome, failure)
    }

    /// Every tally grows between two snapshots, for each table size.
    async fn run_no_deadlock(&self, base: DinnerConfig) -> ScenarioResult {
        let scenario = ScenarioId::NoDeadlock;
        let mut last = None;

        for n in NO_DEADLOCK_SIZES {
            let mut params = base.to_params();
            params.num_philos = n;
            let config = match params.validate() {
                Ok(config) => config,
                Err(e) => return ScenarioResult::failed(scenario, e.to_string()),
            };

            let handle = self.dinner(config).spawn();
            tokio::time::sleep(self.window).await;
            let first = handle.snapshot();
            tokio::time::sleep(self.window).await;
            let second = handle.snapshot();
            debug!("no_deadlock n={}: {:?} -> {:?}", n, first, second);

            let ended_early = handle.is_finished();
            handle.stop();
            let outcome = match handle.join().await {
                Ok(outcome) => outcome,
                Err(e) => return ScenarioResult::failed(scenario, e.to_string()),
            };

            if ended_early {
                let reason = format!("n={}: run ended on its own with {}", n, outcome.reason.as_label());
                return ScenarioResult::check(scenario, outcome, Some(reason));
            }
            if let Some(stalled) = first.iter().zip(&second).position(|(a, b)| b <= a) {
                let reason = format!(
                    "n={}: philosopher {} stalled at {} meals",
                    n, stalled, second[stalled]
                );
                return ScenarioResult::check(scenario, outcome, Some(reason));
            }
            if outcome.reason != TerminalReason::Stopped {
                let reason = format!("n={}: expected stopped, got {}", n, outcome.reason.as_label());
                return ScenarioResult::check(scenario, outcome, Some(reason));
            }
            last = Some(outcome);
        }

        ScenarioResult {
            scenario,
            passed: true,
            outcome: last,
            failure_reason: None,
        }
    }

    /// The run ends on its own once everyone reached the target.
    async fn run_satisfied(&self, config: DinnerConfig) -> ScenarioResult {
        let scenario = ScenarioId::Satisfied;
        let outcome = match self.dinner(config).run().await {
            Ok(outcome) => outcome,
            Err(e) => return ScenarioResult::failed(scenario, e.to_string()),
        };

        let target = config.meal_target().unwrap_or(0);
        let failure = if !outcome.is_all_satisfied() {
            Some(format!("expected all_satisfied, got {}", outcome.reason.as_label()))
        } else if outcome.min_meals() < target {
            Some(format!("expected at least {} meals each, got {:?}", target, outcome.meals))
        } else {
            None
        };
        ScenarioResult::check(scenario, outcome, failure)
    }
}

/// Runs every scenario in order and collects the results.
pub async fn run_all(runner: &ScenarioRunner, scenarios: &[ScenarioId]) -> Vec<ScenarioResult> {
    let mut results = Vec::with_capacity(scenarios.len());
    for scenario in scenarios {
        results.push(runner.run(*scenario).await);
    }
    results
}
