/*!
Configuration of a run.

A [Config] gathers everything needed to search a network: the limits placed on schedules, the search strategy, the backends raced on each query, and the time allowed.

Options with bounds are [ConfigOption]s, and are checked by [Config::validate] before anything else happens.
Defaults follow the command line tool: `k = 1`, no activity caps, binary search, and every in-process engine.
An SMT solver depends on an external program, and so is only raced when configured.
*/

use std::{path::PathBuf, time::Duration};

mod config_option;
pub use config_option::ConfigOption;

use crate::{
    backends::{BackendConfig, CardEncoding, SatEngine},
    network::{Limits, ModelKind},
    search::Strategy,
    types::err::{self, ErrorKind},
};

/// The primary configuration structure.
#[derive(Clone, Debug)]
pub struct Config {
    /// The number of active sensors required to cover each point.
    pub coverage: ConfigOption<usize>,

    /// The continuous activity cap, if any.
    pub continuous: Option<ConfigOption<usize>>,

    /// The localized activity cap, if any.
    pub localized: Option<ConfigOption<usize>>,

    /// The kind of network read from input.
    pub model: ModelKind,

    pub strategy: Strategy,

    /// The degree of the polynomial fitted by a regression search.
    pub degree: ConfigOption<usize>,

    /// The least number of samples before a regression search fits a polynomial.
    pub min_points: ConfigOption<usize>,

    /// The backends raced on each query.
    pub backends: Vec<BackendConfig>,

    /// Race backends in threads of this process, rather than in worker processes.
    pub in_process: bool,

    /// The time allowed for the whole search, if limited.
    pub time_limit: Option<Duration>,

    /// The time given to losing backends to stop, after a race.
    pub grace: ConfigOption<Duration>,

    /// Keep, and display, the schedule of the optimum.
    pub get_model: bool,

    /// Check each schedule found against the network.
    pub verify: bool,

    /// A stem for files holding the formula of each query.
    pub dump: Option<PathBuf>,
}

impl Config {
    pub const DEFAULT_GRACE: Duration = Duration::from_millis(500);

    /// The configured limits of a schedule.
    pub fn limits(&self) -> Limits {
        Limits {
            coverage: self.coverage.value,
            continuous: self.continuous.as_ref().map(|option| option.value),
            localized: self.localized.as_ref().map(|option| option.value),
        }
    }

    /// A continuous activity cap of `cap`.
    pub fn continuous_option(cap: usize) -> ConfigOption<usize> {
        ConfigOption {
            name: "continuous",
            min: 1,
            max: usize::MAX,
            value: cap,
        }
    }

    /// A localized activity cap of `cap`.
    pub fn localized_option(cap: usize) -> ConfigOption<usize> {
        ConfigOption {
            name: "localized",
            min: 1,
            max: usize::MAX,
            value: cap,
        }
    }

    /// A backend for each of `engines`, with the given encoding.
    pub fn sat_backends(engines: &[SatEngine], encoding: CardEncoding) -> Vec<BackendConfig> {
        engines
            .iter()
            .map(|engine| BackendConfig::Sat {
                engine: *engine,
                encoding,
            })
            .collect()
    }

    /// The strategy to search with, taking regression parameters from the configuration.
    pub fn search_strategy(&self) -> Strategy {
        match self.strategy {
            Strategy::Regression { .. } => Strategy::Regression {
                degree: self.degree.value,
                min_points: self.min_points.value,
            },
            other => other,
        }
    }

    /// Checks each option is within its bounds, and the limits are coherent.
    pub fn validate(&self) -> Result<(), ErrorKind> {
        if !self.coverage.in_bounds() {
            return Err(err::ConfigurationError::Coverage(self.coverage.value).into());
        }
        if let Some(cap) = &self.continuous {
            if !cap.in_bounds() {
                return Err(err::ConfigurationError::ContinuousCap(cap.value).into());
            }
        }
        if let Some(cap) = &self.localized {
            if !cap.in_bounds() {
                return Err(err::ConfigurationError::LocalizedCap(cap.value).into());
            }
        }
        for option in [&self.degree, &self.min_points] {
            if !option.in_bounds() {
                return Err(err::ConfigurationError::OutOfBounds(option.name).into());
            }
        }
        if !self.grace.in_bounds() {
            return Err(err::ConfigurationError::OutOfBounds(self.grace.name).into());
        }
        if self.backends.is_empty() {
            return Err(err::ConfigurationError::NoBackends.into());
        }

        Ok(self.limits().validate()?)
    }
}

impl Default for Config {
    fn default() -> Self {
        let backends = Config::sat_backends(&[SatEngine::Splr, SatEngine::Varisat], CardEncoding::SeqCounter);

        Config {
            coverage: ConfigOption {
                name: "coverage",
                min: 1,
                max: usize::MAX,
                value: 1,
            },

            continuous: None,

            localized: None,

            model: ModelKind::Single,

            strategy: Strategy::Binary,

            degree: ConfigOption {
                name: "degree",
                min: 1,
                max: 32,
                value: Strategy::DEFAULT_DEGREE,
            },

            min_points: ConfigOption {
                name: "min_points",
                min: 2,
                max: usize::MAX,
                value: Strategy::DEFAULT_MIN_POINTS,
            },

            backends,

            in_process: false,

            time_limit: None,

            grace: ConfigOption {
                name: "grace",
                min: Duration::ZERO,
                max: Duration::from_secs(60),
                value: Config::DEFAULT_GRACE,
            },

            get_model: false,

            verify: false,

            dump: None,
        }
    }
}
