//! Self-check scenarios for the dining philosophers engine.

use philo_core::Params;
use std::fmt;
use std::str::FromStr;

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// Five philosophers, generous deadline, three meals each
    Banquet,

    /// Two philosophers with a meal longer than the deadline
    Starvation,

    /// Progress check across several table sizes, no meal target
    NoDeadlock,

    /// Everyone reaches a small meal target
    Satisfied,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Banquet,
            ScenarioId::Starvation,
            ScenarioId::NoDeadlock,
            ScenarioId::Satisfied,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Banquet => "banquet",
            ScenarioId::Starvation => "starvation",
            ScenarioId::NoDeadlock => "no_deadlock",
            ScenarioId::Satisfied => "satisfied",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Banquet => "5/800/200/200/0/3: everyone eats exactly 3 meals, nobody dies",
            ScenarioId::Starvation => "2/50/200/50/0/0: a philosopher dies shortly after 50ms",
            ScenarioId::NoDeadlock => "N in {2,3,5,10}: every tally keeps growing until stopped",
            ScenarioId::Satisfied => "7 philosophers, 4 meals each: run ends once all are satisfied",
        }
    }

    /// Parameters the scenario runs with. `NoDeadlock` varies the table size
    /// per round; this is its base configuration.
    pub fn params(&self) -> Params {
        match self {
            ScenarioId::Banquet => Params {
                num_philos: 5,
                time_die: 800,
                time_eat: 200,
                time_sleep: 200,
                time_think: 0,
                num_eat: 3,
            },
            ScenarioId::Starvation => Params {
                num_philos: 2,
                time_die: 50,
                time_eat: 200,
                time_sleep: 50,
                time_think: 0,
                num_eat: 0,
            },
            ScenarioId::NoDeadlock => Params {
                num_philos: 5,
                time_die: 1_000,
                time_eat: 10,
                time_sleep: 10,
                time_think: 5,
                num_eat: 0,
            },
            ScenarioId::Satisfied => Params {
                num_philos: 7,
                time_die: 1_000,
                time_eat: 20,
                time_sleep: 20,
                time_think: 10,
                num_eat: 4,
            },
        }
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "banquet" => Ok(ScenarioId::Banquet),
            "starvation" => Ok(ScenarioId::Starvation),
            "no_deadlock" | "no-deadlock" => Ok(ScenarioId::NoDeadlock),
            "satisfied" => Ok(ScenarioId::Satisfied),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
