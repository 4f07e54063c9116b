//! Ordered activity log of a run.
//!
//! Entries are appended in the order the engine performs them: a fork is
//! logged as taken right after it is claimed and as put down right before it
//! is released, so replaying the log never shows a fork with two holders
//! unless the registry itself broke.

use philo_env::{ForkId, PhilosopherId};
use serde::Serialize;
use std::sync::Mutex;
use std::time::Duration;

/// What a philosopher did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "activity", content = "fork")]
pub enum Activity {
    TookFork(ForkId),
    PutDownFork(ForkId),
    Eating,
    Sleeping,
    Thinking,
    Satisfied,
    Died,
}

impl std::fmt::Display for Activity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Activity::TookFork(_) => f.write_str("has taken a fork"),
            Activity::PutDownFork(_) => f.write_str("has put down a fork"),
            Activity::Eating => f.write_str("is eating"),
            Activity::Sleeping => f.write_str("is sleeping"),
            Activity::Thinking => f.write_str("is thinking"),
            Activity::Satisfied => f.write_str("is satisfied"),
            Activity::Died => f.write_str("died"),
        }
    }
}

/// A single line of the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TranscriptEntry {
    /// Milliseconds since simulation start.
    pub at_ms: u64,
    pub philosopher: PhilosopherId,
    #[serde(flatten)]
    pub activity: Activity,
}

impl std::fmt::Display for TranscriptEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.at_ms, self.philosopher, self.activity)
    }
}

/// Append-only activity log shared by all tasks of a run.
#[derive(Debug, Default)]
pub struct Transcript {
    entries: Mutex<Vec<TranscriptEntry>>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, at: Duration, philosopher: PhilosopherId, activity: Activity) {
        let entry = TranscriptEntry {
            at_ms: u64::try_from(at.as_millis()).unwrap_or(u64::MAX),
            philosopher,
            activity,
        };
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(entry);
    }

    /// Copy of every entry so far, in order.
    pub fn entries(&self) -> Vec<TranscriptEntry> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Replays `entries` and returns the first entry at which a fork would
/// have two holders or be put down by a non-holder.
pub fn find_fork_conflict(entries: &[TranscriptEntry]) -> Option<TranscriptEntry> {
    use std::collections::HashMap;

    let mut holders: HashMap<ForkId, PhilosopherId> = HashMap::new();
    for entry in entries {
        match entry.activity {
            Activity::TookFork(fork) => {
                if holders.insert(fork, entry.philosopher).is_some() {
                    return Some(*entry);
                }
            }
            Activity::PutDownFork(fork) => {
                if holders.remove(&fork) != Some(entry.philosopher) {
                    return Some(*entry);
                }
            }
            _ => {}
        }
    }
    None
}
