//! JSON exporter for a finished run.
//!
//! Writes the parameters, the outcome and the full activity transcript as
//! one pretty-printed document.

use philo_core::{Params, SimulationOutcome, TerminalReason, TranscriptEntry};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;

/// Outcome of a run in export form: durations in milliseconds, reason as a label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeExport {
    /// `all_satisfied`, `philosopher_died`, `stopped` or `fault`
    pub reason: String,

    /// Philosopher that died, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub died: Option<usize>,

    /// Time of death in ms since start, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub died_at_ms: Option<u64>,

    /// Violation message for a fault outcome
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fault: Option<String>,

    /// Completed meals per philosopher
    pub meals: Vec<u32>,

    /// Run duration in ms
    pub elapsed_ms: u64,
}

impl From<&SimulationOutcome> for OutcomeExport {
    fn from(outcome: &SimulationOutcome) -> Self {
        let death = outcome.death();
        let fault = match &outcome.reason {
            TerminalReason::Fault(err) => Some(err.to_string()),
            _ => None,
        };
        Self {
            reason: outcome.reason.as_label().to_string(),
            died: death.map(|(id, _)| id.index()),
            died_at_ms: death.map(|(_, at)| millis(at)),
            fault,
            meals: outcome.meals.clone(),
            elapsed_ms: millis(outcome.elapsed),
        }
    }
}

fn millis(d: std::time::Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Complete run export.
#[derive(Debug, Clone, Serialize)]
pub struct RunExport {
    /// Parameters the run was started with
    pub params: Params,

    /// How the run ended
    pub outcome: OutcomeExport,

    /// Every recorded activity, in order
    pub transcript: Vec<TranscriptEntry>,
}

impl RunExport {
    /// Creates a new export container.
    pub fn new(params: Params, outcome: &SimulationOutcome, transcript: Vec<TranscriptEntry>) -> Self {
        Self {
            params,
            outcome: OutcomeExport::from(outcome),
            transcript,
        }
    }

    /// Writes the export to a JSON file.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
