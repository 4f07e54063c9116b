//! Human-readable summary of a finished run, and the process exit code it maps to.

use philo_core::{SimulationOutcome, TerminalReason};
use std::fmt::Write;

/// All philosophers satisfied, or the run was stopped.
pub const EXIT_OK: i32 = 0;
/// A philosopher died.
pub const EXIT_DIED: i32 = 1;
/// The parameters were rejected.
pub const EXIT_INVALID_PARAMS: i32 = 2;
/// Fork bookkeeping fault or a panicked task.
pub const EXIT_FAULT: i32 = 3;
/// At least one self-check scenario failed.
pub const EXIT_SCENARIO_FAILED: i32 = 4;

/// Maps an outcome to the process exit code.
pub fn exit_code(outcome: &SimulationOutcome) -> i32 {
    match outcome.reason {
        TerminalReason::AllSatisfied | TerminalReason::Stopped => EXIT_OK,
        TerminalReason::PhilosopherDied { .. } => EXIT_DIED,
        TerminalReason::Fault(_) => EXIT_FAULT,
    }
}

/// One headline plus a meal tally line per philosopher.
pub fn render(outcome: &SimulationOutcome) -> String {
    let mut out = String::new();
    let headline = match &outcome.reason {
        TerminalReason::AllSatisfied => "every philosopher is satisfied".to_string(),
        TerminalReason::PhilosopherDied { id, at } => {
            format!("philosopher {} died at {}ms", id, at.as_millis())
        }
        TerminalReason::Stopped => "dinner stopped".to_string(),
        TerminalReason::Fault(err) => format!("fork fault: {}", err),
    };
    let _ = writeln!(out, "{} after {}ms", headline, outcome.elapsed.as_millis());

    for (id, meals) in outcome.meals.iter().enumerate() {
        let _ = writeln!(out, "  philosopher {:>3}: {} meal(s)", id, meals);
    }
    let _ = write!(
        out,
        "  total: {} meal(s), fewest: {}",
        outcome.total_meals(),
        outcome.min_meals()
    );
    out
}
