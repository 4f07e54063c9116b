//! The single result of a run.

use crate::termination::TerminalReason;
use philo_env::PhilosopherId;
use std::time::Duration;

/// Terminal reason, meal tallies and elapsed time of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationOutcome {
    /// The first terminal event.
    pub reason: TerminalReason,

    /// Completed meals per philosopher, indexed by id.
    pub meals: Vec<u32>,

    /// Time from simulation start until every task had stopped.
    pub elapsed: Duration,
}

impl SimulationOutcome {
    pub fn is_all_satisfied(&self) -> bool {
        matches!(self.reason, TerminalReason::AllSatisfied)
    }

    /// The philosopher that died and when, if the run ended in a death.
    pub fn death(&self) -> Option<(PhilosopherId, Duration)> {
        match self.reason {
            TerminalReason::PhilosopherDied { id, at } => Some((id, at)),
            _ => None,
        }
    }

    /// Sum of all completed meals.
    pub fn total_meals(&self) -> u64 {
        self.meals.iter().map(|&m| u64::from(m)).sum()
    }

    /// Smallest meal tally at the table.
    pub fn min_meals(&self) -> u32 {
        self.meals.iter().copied().min().unwrap_or(0)
    }
}
