/*!
Reports regarding a solve, and a search.
*/

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{search::SolvedMap, structures::literal::Lit};

/// High-level reports regarding a solve.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Serialize, Deserialize)]
pub enum Report {
    /// The constraints given to a backend are satisfiable.
    Satisfiable,

    /// The constraints given to a backend are unsatisfiable.
    Unsatisfiable,

    /// Satisfiability of the constraints is unknown, for some reason.
    Unknown,
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Satisfiable => write!(f, "Satisfiable"),
            Self::Unsatisfiable => write!(f, "Unsatisfiable"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// A report together with a model, if one was requested and found.
///
/// An unknown verdict is never read as unsatisfiable.
#[derive(PartialEq, Eq, Clone, Debug, Serialize, Deserialize)]
pub enum Verdict {
    Satisfiable(Option<Vec<Lit>>),
    Unsatisfiable,
    Unknown,
}

impl Verdict {
    /// Whether the verdict settles satisfiability.
    pub fn is_definitive(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    pub fn report(&self) -> Report {
        match self {
            Self::Satisfiable(_) => Report::Satisfiable,
            Self::Unsatisfiable => Report::Unsatisfiable,
            Self::Unknown => Report::Unknown,
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.report().fmt(f)
    }
}

/// The verdict of some backend.
#[derive(PartialEq, Eq, Clone, Debug, Serialize, Deserialize)]
pub struct SolverResult {
    /// The name of the backend.
    pub backend: String,

    pub verdict: Verdict,
}

impl SolverResult {
    pub fn unknown(backend: impl Into<String>) -> Self {
        SolverResult {
            backend: backend.into(),
            verdict: Verdict::Unknown,
        }
    }
}

/// The outcome of a search for an optimal lifetime.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Outcome {
    /// The optimal lifetime, possibly zero.
    Optimum(usize),

    /// The time limit elapsed before the search completed.
    Timeout,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Optimum(0) => write!(f, "UNSAT"),
            Self::Optimum(lifetime) => write!(f, "SAT\nOPTIMUM: {lifetime}"),
            Self::Timeout => write!(f, "TIMEOUT"),
        }
    }
}

/// A summary of a completed search.
#[derive(Clone, Debug)]
pub struct SearchReport {
    pub outcome: Outcome,

    /// Each lifetime asked about, with its feasibility.
    pub solved: SolvedMap,

    /// The number of queries made.
    pub probes: usize,

    pub elapsed: Duration,
}

impl std::fmt::Display for SearchReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.outcome)?;
        write!(f, "ELAPSED TIME = {:.6}", self.elapsed.as_secs_f64())
    }
}
