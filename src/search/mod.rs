/*!
Searches for the greatest feasible lifetime.

A search asks an [Oracle] whether a lifetime is feasible, and uses the answers to choose the next lifetime to ask about.
Feasibility is assumed to be monotone: if a lifetime is feasible, so is every shorter lifetime.

Three strategies are available:
- [Linear](Strategy::Linear): Ask about each lifetime from `1` upward, until one is infeasible or the upper bound is passed.
- [Binary](Strategy::Binary): Binary search, with an unknown upper bound found by doubling.
- [Regression](Strategy::Regression): Extrapolate from the resource left by schedules of feasible lifetimes, to jump toward the lifetime at which the resource runs out.

Every strategy returns `0` when a lifetime of `1` is infeasible.
If the oracle is unable to answer a query, the search stops with [ErrorKind::OracleTimeout].

The lifetimes asked about, and the answers, are kept in a [SolvedMap].
*/

use std::{str::FromStr, time::Instant};

use crate::{
    misc::log::targets::{self},
    reports::{Outcome, SearchReport},
    types::err::ErrorKind,
};

mod binary;
mod linear;
pub mod oracle;
pub mod polynomial;
mod regression;

pub use oracle::NetworkOracle;

/// The answer of an oracle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Probe {
    /// The lifetime is feasible, and the resource left by the schedule found, if requested.
    Feasible { resource: Option<i64> },

    Infeasible,

    /// The oracle was unable to answer.
    Undetermined,
}

/// Decides the feasibility of a lifetime.
pub trait Oracle {
    /// An upper bound on feasible lifetimes, if one is known.
    fn upper_bound(&self) -> Option<usize>;

    /// Whether `lifetime` is feasible, with the resource left by a schedule when `want_resource` is set.
    fn probe(&mut self, lifetime: usize, want_resource: bool) -> Result<Probe, ErrorKind>;
}

/// A search strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    Linear,
    Binary,

    /// Polynomial regression of the given degree, fitted once at least `min_points` samples are known.
    Regression { degree: usize, min_points: usize },
}

impl Strategy {
    pub const DEFAULT_DEGREE: usize = 10;
    pub const DEFAULT_MIN_POINTS: usize = 20;
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Linear => write!(f, "linear"),
            Self::Binary => write!(f, "binary"),
            Self::Regression { .. } => write!(f, "reglinear"),
        }
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear" => Ok(Self::Linear),
            "binary" => Ok(Self::Binary),
            "reglinear" | "regression" => Ok(Self::Regression {
                degree: Self::DEFAULT_DEGREE,
                min_points: Self::DEFAULT_MIN_POINTS,
            }),
            unknown => Err(format!("unknown search strategy '{unknown}'")),
        }
    }
}

/// Lifetimes asked about, with their feasibility, in the order asked.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SolvedMap {
    entries: Vec<(usize, bool)>,
}

impl SolvedMap {
    pub fn insert(&mut self, lifetime: usize, feasible: bool) {
        match self.entries.iter_mut().find(|(l, _)| *l == lifetime) {
            Some(entry) => entry.1 = feasible,
            None => self.entries.push((lifetime, feasible)),
        }
    }

    pub fn get(&self, lifetime: usize) -> Option<bool> {
        self.entries
            .iter()
            .find(|(l, _)| *l == lifetime)
            .map(|(_, feasible)| *feasible)
    }

    pub fn entries(&self) -> &[(usize, bool)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Display for SolvedMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut sorted = self.entries.clone();
        sorted.sort_unstable();
        let entries = sorted
            .iter()
            .map(|(l, feasible)| format!("({l}, {feasible})"))
            .collect::<Vec<_>>();
        write!(f, "[{}]", entries.join(", "))
    }
}

/// The state of a search, owned by the strategy being run.
pub(crate) struct Driver<'o> {
    oracle: &'o mut dyn Oracle,
    solved: SolvedMap,
    probes: usize,
    started: Instant,
}

impl<'o> Driver<'o> {
    fn new(oracle: &'o mut dyn Oracle) -> Self {
        Driver {
            oracle,
            solved: SolvedMap::default(),
            probes: 0,
            started: Instant::now(),
        }
    }

    fn upper_bound(&self) -> Option<usize> {
        self.oracle.upper_bound()
    }

    /// Asks the oracle about `lifetime`, failing if the oracle is unable to answer.
    fn ask(&mut self, lifetime: usize, want_resource: bool) -> Result<Probe, ErrorKind> {
        log::info!(target: targets::SEARCH, "i = {lifetime}");
        self.probes += 1;

        let probe = self.oracle.probe(lifetime, want_resource)?;
        let feasible = match probe {
            Probe::Feasible { .. } => true,
            Probe::Infeasible => false,
            Probe::Undetermined => {
                log::info!(target: targets::SEARCH, "No answer for {lifetime}");
                return Err(ErrorKind::OracleTimeout);
            }
        };
        self.solved.insert(lifetime, feasible);

        log::info!(target: targets::SEARCH, "elapsed time = {:.3}", self.started.elapsed().as_secs_f64());
        log::debug!(target: targets::SEARCH, "{}", self.solved);

        Ok(probe)
    }

    fn feasible(&mut self, lifetime: usize) -> Result<bool, ErrorKind> {
        Ok(matches!(self.ask(lifetime, false)?, Probe::Feasible { .. }))
    }
}

/// Searches for the greatest feasible lifetime with the given strategy.
///
/// A search stopped by an oracle unable to answer has a [timeout](Outcome::Timeout) outcome, while any other error is returned.
pub fn search(strategy: Strategy, oracle: &mut dyn Oracle) -> Result<SearchReport, ErrorKind> {
    let mut driver = Driver::new(oracle);

    log::info!(target: targets::SEARCH, "Searching with {strategy}, upper bound {:?}", driver.upper_bound());

    let found = match strategy {
        Strategy::Linear => linear::search(&mut driver),
        Strategy::Binary => binary::search(&mut driver),
        Strategy::Regression { degree, min_points } => regression::search(&mut driver, degree, min_points),
    };

    let outcome = match found {
        Ok(optimum) => Outcome::Optimum(optimum),
        Err(ErrorKind::OracleTimeout) => Outcome::Timeout,
        Err(e) => return Err(e),
    };

    Ok(SearchReport {
        outcome,
        solved: driver.solved,
        probes: driver.probes,
        elapsed: driver.started.elapsed(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Feasible exactly up to `optimum`, with a resource of one per lifetime unused.
    struct Threshold {
        optimum: usize,
        upper: Option<usize>,
    }

    impl Oracle for Threshold {
        fn upper_bound(&self) -> Option<usize> {
            self.upper
        }

        fn probe(&mut self, lifetime: usize, want_resource: bool) -> Result<Probe, ErrorKind> {
            match lifetime <= self.optimum {
                true => Ok(Probe::Feasible {
                    resource: want_resource.then_some(self.optimum as i64 - lifetime as i64),
                }),
                false => Ok(Probe::Infeasible),
            }
        }
    }

    struct Silent;

    impl Oracle for Silent {
        fn upper_bound(&self) -> Option<usize> {
            Some(10)
        }

        fn probe(&mut self, _: usize, _: bool) -> Result<Probe, ErrorKind> {
            Ok(Probe::Undetermined)
        }
    }

    #[test]
    fn strategies_agree() {
        let strategies = [
            Strategy::Linear,
            Strategy::Binary,
            Strategy::Regression {
                degree: 1,
                min_points: 3,
            },
        ];
        for strategy in strategies {
            for upper in [None, Some(40)] {
                for optimum in [0, 1, 2, 17, 40] {
                    let mut oracle = Threshold { optimum, upper };
                    let report = search(strategy, &mut oracle).unwrap();
                    assert_eq!(report.outcome, Outcome::Optimum(optimum), "{strategy} {upper:?}");
                }
            }
        }
    }

    #[test]
    fn timeout() {
        let report = search(Strategy::Binary, &mut Silent).unwrap();
        assert_eq!(report.outcome, Outcome::Timeout);
        assert!(report.solved.is_empty());
    }

    #[test]
    fn solved_map_order() {
        let mut solved = SolvedMap::default();
        solved.insert(8, false);
        solved.insert(4, true);
        solved.insert(8, true);
        assert_eq!(solved.entries(), &[(8, true), (4, true)]);
        assert_eq!(solved.get(4), Some(true));
        assert_eq!(solved.get(5), None);
        assert_eq!(solved.to_string(), "[(4, true), (8, true)]");
    }

    #[test]
    fn strategy_names() {
        assert_eq!("linear".parse::<Strategy>(), Ok(Strategy::Linear));
        assert!(matches!("reglinear".parse::<Strategy>(), Ok(Strategy::Regression { degree: 10, .. })));
        assert!("golden".parse::<Strategy>().is_err());
    }
}
