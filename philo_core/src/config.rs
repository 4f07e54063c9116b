//! Simulation parameters.
//!
//! Two layers:
//! - [`Params`]: raw values as they arrive from the command line, signed
//!   milliseconds, unchecked.
//! - [`DinnerConfig`]: the validated, typed configuration the engine runs
//!   on. The only way to get one from raw input is [`Params::validate`],
//!   so the engine itself never re-checks ranges.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw tunable values for a dining philosophers run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    /// Number of philosophers (and forks). Must be >= 2.
    pub num_philos: i64,

    /// Maximum time (ms) a philosopher may go without starting a meal.
    pub time_die: i64,

    /// Time (ms) spent eating while holding both forks.
    pub time_eat: i64,

    /// Time (ms) spent sleeping after a meal.
    pub time_sleep: i64,

    /// Time (ms) spent thinking before getting hungry; 0 means immediately.
    pub time_think: i64,

    /// Meals each philosopher must eat; 0 runs until a death or an external stop.
    pub num_eat: i64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            num_philos: 5,
            time_die: 200,
            time_eat: 20,
            time_sleep: 80,
            time_think: 80,
            num_eat: 3,
        }
    }
}

impl Params {
    /// Checks every field and produces the engine configuration.
    ///
    /// Fields are checked in declaration order and the first violation is
    /// returned.
    pub fn validate(&self) -> Result<DinnerConfig, ConfigError> {
        if self.num_philos < 2 {
            return Err(ConfigError::TooFewPhilosophers(self.num_philos));
        }
        if self.time_die <= 0 {
            return Err(ConfigError::TimeDie(self.time_die));
        }
        if self.time_eat <= 0 {
            return Err(ConfigError::TimeEat(self.time_eat));
        }
        if self.time_sleep <= 0 {
            return Err(ConfigError::TimeSleep(self.time_sleep));
        }
        if self.time_think < 0 {
            return Err(ConfigError::TimeThink(self.time_think));
        }
        if self.num_eat < 0 {
            return Err(ConfigError::NumEat(self.num_eat));
        }

        let num_philos =
            usize::try_from(self.num_philos).map_err(|_| ConfigError::TooFewPhilosophers(self.num_philos))?;
        let num_eat = u32::try_from(self.num_eat).map_err(|_| ConfigError::NumEat(self.num_eat))?;

        Ok(DinnerConfig {
            num_philos,
            time_die: millis(self.time_die),
            time_eat: millis(self.time_eat),
            time_sleep: millis(self.time_sleep),
            time_think: millis(self.time_think),
            num_eat,
        })
    }
}

impl std::fmt::Display for Params {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Philosophers: {}, Die: {}ms, Eat: {}ms, Sleep: {}ms, Think: {}ms, Eat Count: {}",
            self.num_philos, self.time_die, self.time_eat, self.time_sleep, self.time_think, self.num_eat
        )
    }
}

fn millis(ms: i64) -> Duration {
    Duration::from_millis(ms.unsigned_abs())
}

/// Validated configuration for a simulation run.
///
/// Invariants: `num_philos >= 2`, `time_die`, `time_eat` and `time_sleep`
/// are non-zero. `num_eat == 0` means no meal target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DinnerConfig {
    num_philos: usize,
    time_die: Duration,
    time_eat: Duration,
    time_sleep: Duration,
    time_think: Duration,
    num_eat: u32,
}

impl DinnerConfig {
    /// Builds a configuration from millisecond values, checking the same
    /// ranges as [`Params::validate`].
    pub fn new(
        num_philos: usize,
        time_die_ms: u64,
        time_eat_ms: u64,
        time_sleep_ms: u64,
        time_think_ms: u64,
        num_eat: u32,
    ) -> Result<Self, ConfigError> {
        Params {
            num_philos: i64::try_from(num_philos).unwrap_or(i64::MAX),
            time_die: clamp_ms(time_die_ms),
            time_eat: clamp_ms(time_eat_ms),
            time_sleep: clamp_ms(time_sleep_ms),
            time_think: clamp_ms(time_think_ms),
            num_eat: i64::from(num_eat),
        }
        .validate()
    }

    /// Number of philosophers, equal to the number of forks.
    pub fn num_philos(&self) -> usize {
        self.num_philos
    }

    pub fn time_die(&self) -> Duration {
        self.time_die
    }

    pub fn time_eat(&self) -> Duration {
        self.time_eat
    }

    pub fn time_sleep(&self) -> Duration {
        self.time_sleep
    }

    pub fn time_think(&self) -> Duration {
        self.time_think
    }

    /// Meal target; `None` when the run has no target.
    pub fn meal_target(&self) -> Option<u32> {
        (self.num_eat > 0).then_some(self.num_eat)
    }

    /// Interval between watchdog sweeps: a tenth of TimeDie, at most 5 ms,
    /// at least 1 ms.
    pub fn watchdog_interval(&self) -> Duration {
        (self.time_die / 10)
            .min(Duration::from_millis(5))
            .max(Duration::from_millis(1))
    }

    /// Converts back to raw parameters, for reporting.
    pub fn to_params(&self) -> Params {
        Params {
            num_philos: i64::try_from(self.num_philos).unwrap_or(i64::MAX),
            time_die: duration_ms(self.time_die),
            time_eat: duration_ms(self.time_eat),
            time_sleep: duration_ms(self.time_sleep),
            time_think: duration_ms(self.time_think),
            num_eat: i64::from(self.num_eat),
        }
    }
}

fn clamp_ms(ms: u64) -> i64 {
    i64::try_from(ms).unwrap_or(i64::MAX)
}

fn duration_ms(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_params_default_summary() {
        let params = Params::default();
        assert_eq!(
            params.to_string(),
            "Philosophers: 5, Die: 200ms, Eat: 20ms, Sleep: 80ms, Think: 80ms, Eat Count: 3"
        );
    }

    #[test]
    fn test_params_validate_valid() {
        let params = Params {
            num_philos: 5,
            time_die: 800,
            time_eat: 200,
            time_sleep: 200,
            time_think: 100,
            num_eat: 0,
        };
        let config = params.validate().unwrap();

        assert_eq!(config.num_philos(), 5);
        assert_eq!(config.time_die(), Duration::from_millis(800));
        assert_eq!(config.time_think(), Duration::from_millis(100));
        assert_eq!(config.meal_target(), None);
        assert_eq!(config.to_params(), params);
    }

    #[test]
    fn test_params_validate_invalid() {
        let base = Params {
            num_philos: 2,
            time_die: 1,
            time_eat: 1,
            time_sleep: 1,
            time_think: 0,
            num_eat: 0,
        };
        let cases = [
            (Params { num_philos: 1, ..base }, ConfigError::TooFewPhilosophers(1)),
            (Params { time_die: 0, ..base }, ConfigError::TimeDie(0)),
            (Params { time_eat: 0, ..base }, ConfigError::TimeEat(0)),
            (Params { time_sleep: 0, ..base }, ConfigError::TimeSleep(0)),
            (Params { time_think: -1, ..base }, ConfigError::TimeThink(-1)),
            (Params { num_eat: -1, ..base }, ConfigError::NumEat(-1)),
        ];

        for (params, expected) in cases {
            assert_eq!(params.validate(), Err(expected), "{params}");
        }
    }

    #[test]
    fn test_first_violation_wins() {
        let params = Params {
            num_philos: 0,
            time_die: 0,
            time_eat: 0,
            time_sleep: 0,
            time_think: 0,
            num_eat: -1,
        };
        assert_eq!(params.validate(), Err(ConfigError::TooFewPhilosophers(0)));
    }

    #[test]
    fn test_watchdog_interval_bounds() {
        let short = DinnerConfig::new(2, 5, 1, 1, 0, 0).unwrap();
        assert_eq!(short.watchdog_interval(), Duration::from_millis(1));

        let medium = DinnerConfig::new(2, 30, 1, 1, 0, 0).unwrap();
        assert_eq!(medium.watchdog_interval(), Duration::from_millis(3));

        let long = DinnerConfig::new(2, 800, 200, 200, 0, 3).unwrap();
        assert_eq!(long.watchdog_interval(), Duration::from_millis(5));
        assert_eq!(long.meal_target(), Some(3));
    }

    proptest! {
        #[test]
        fn prop_in_range_params_always_validate(
            n in 2i64..500,
            die in 1i64..100_000,
            eat in 1i64..100_000,
            sleep in 1i64..100_000,
            think in 0i64..100_000,
            meals in 0i64..1_000,
        ) {
            let params = Params { num_philos: n, time_die: die, time_eat: eat, time_sleep: sleep, time_think: think, num_eat: meals };
            let config = params.validate().unwrap();
            prop_assert_eq!(config.to_params(), params);
            prop_assert!(config.watchdog_interval() <= Duration::from_millis(5));
        }

        #[test]
        fn prop_non_positive_die_rejected(die in -10_000i64..=0) {
            let params = Params { time_die: die, ..Params::default() };
            prop_assert_eq!(params.validate(), Err(ConfigError::TimeDie(die)));
        }
    }
}
