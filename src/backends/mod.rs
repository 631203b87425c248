/*!
Decision procedures, behind a common capability surface.

A [Backend] is a single-shot adapter: variables are generated and constraints added, the backend is solved once, and a model (if any) is read back.
Nothing persists between queries.

The set of backends is closed, and fixed by a [BackendConfig]:
- [Sat](BackendConfig::Sat) backends expand every cardinality constraint into clauses, with a [CardEncoding], and hand the result to an in-process engine.
- [Smt](BackendConfig::Smt) backends write the constraints as linear integer arithmetic and ask an external solver.
- [Mip](BackendConfig::Mip) backends write the constraints as rows over binary columns and ask an external integer programming solver.

External solvers are run as child [processes](process).

A configuration doubles as a [BackendFactory], which is how the [portfolio](crate::portfolio) builds a fresh backend for each query.

# Cancellation

A [StopToken] is shared between a backend and whoever is waiting on it.
Backends check the token where the engine allows, and return [Report::Unknown] once stopped.
*/

use std::{
    io::Write,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use serde::{Deserialize, Serialize};

use crate::{
    misc::log::targets::{self},
    reports::{Report, SolverResult, Verdict},
    structures::{constraint::Constraint, formula::Formula, literal::Lit},
    types::err::{self, ErrorKind},
};

pub mod mip;
pub mod process;
pub mod sat;
pub mod smt;

pub use sat::{CardEncoding, SatEngine};

/// The capabilities required of a decision procedure.
pub trait Backend {
    /// A name for the backend, used in logs and results.
    fn name(&self) -> String;

    /// Generates `n` fresh variables, returned as positive literals.
    fn generate_vars(&mut self, n: usize) -> Vec<Lit>;

    /// Adds a disjunction of literals.
    ///
    /// Each literal must be over a variable generated by the backend.
    fn add_clause(&mut self, lits: &[Lit]) -> Result<(), ErrorKind>;

    /// Adds a constraint, with any reifier read as an implication.
    fn add_constraint(&mut self, constraint: &Constraint) -> Result<(), ErrorKind>;

    /// Adds a reified constraint together with its mirror, so the reifier is equivalent to the constraint.
    ///
    /// A constraint without a reifier is added as is.
    fn add_equivalence(&mut self, constraint: &Constraint) -> Result<(), ErrorKind> {
        self.add_constraint(constraint)?;
        if let Some(mirror) = constraint.mirrored() {
            self.add_constraint(&mirror)?;
        }
        Ok(())
    }

    /// Decides the constraints added.
    fn solve(&mut self, stop: &StopToken) -> Report;

    /// The value of each variable of `vars`, as a literal, after a satisfiable solve.
    fn model(&self, vars: &[Lit]) -> Option<Vec<Lit>>;

    /// Writes the constraints added, in the native language of the backend.
    fn dump(&self, out: &mut dyn Write) -> std::io::Result<()>;
}

/// A shared flag, requesting a backend stops.
#[derive(Clone, Debug, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    pub fn new() -> Self {
        StopToken::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A configuration of some backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendConfig {
    /// A clause based backend.
    Sat {
        engine: SatEngine,
        encoding: CardEncoding,
    },

    /// An external SMT solver, reading SMT-LIB 2 on stdin.
    Smt { command: String, args: Vec<String> },

    /// An external integer programming solver, with the command line of CBC.
    Mip { command: String },
}

impl BackendConfig {
    /// An external solver invoked as `z3 -in -smt2`.
    pub fn z3() -> Self {
        BackendConfig::Smt {
            command: "z3".to_string(),
            args: vec!["-in".to_string(), "-smt2".to_string()],
        }
    }

    /// An external solver invoked as `cbc`.
    pub fn cbc() -> Self {
        BackendConfig::Mip {
            command: "cbc".to_string(),
        }
    }
}

impl std::fmt::Display for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sat { engine, encoding } => write!(f, "{engine}+{encoding}"),
            Self::Smt { command, .. } => write!(f, "smt:{command}"),
            Self::Mip { command } => write!(f, "mip:{command}"),
        }
    }
}

/// Builds fresh backends.
pub trait BackendFactory: Send + Sync {
    fn name(&self) -> String;

    /// Checks the backend can be built, without building one.
    fn probe(&self) -> Result<(), ErrorKind>;

    fn build(&self) -> Result<Box<dyn Backend>, ErrorKind>;
}

impl BackendFactory for BackendConfig {
    fn name(&self) -> String {
        self.to_string()
    }

    fn probe(&self) -> Result<(), ErrorKind> {
        match self {
            Self::Sat { .. } => Ok(()),
            Self::Smt { command, .. } | Self::Mip { command } => process::probe(command),
        }
    }

    fn build(&self) -> Result<Box<dyn Backend>, ErrorKind> {
        match self {
            Self::Sat { engine, encoding } => Ok(Box::new(sat::SatBackend::new(*engine, *encoding))),
            Self::Smt { command, args } => Ok(Box::new(smt::SmtBackend::new(command, args))),
            Self::Mip { command } => Ok(Box::new(mip::MipBackend::new(command))),
        }
    }
}

/// Loads `formula` into a fresh backend from `factory` and solves.
///
/// `requested` are variables of the formula, and any model is returned in terms of the formula.
/// Failure to build or load the backend is an error, while failure of the engine is an unknown verdict.
pub fn solve_formula(
    factory: &dyn BackendFactory,
    formula: &Formula,
    requested: &[Lit],
    stop: &StopToken,
) -> Result<SolverResult, ErrorKind> {
    let name = factory.name();
    let mut backend = factory.build()?;
    let var_map = formula.load_into(backend.as_mut())?;

    log::debug!(target: targets::BACKEND, "{name} loaded");

    let verdict = match backend.solve(stop) {
        Report::Satisfiable => match requested.is_empty() {
            true => Verdict::Satisfiable(None),
            false => {
                let mapped = requested
                    .iter()
                    .map(|l| var_map.apply(*l))
                    .collect::<Result<Vec<_>, err::EncodingError>>()?;
                match backend.model(&mapped) {
                    None => Verdict::Satisfiable(None),
                    Some(model) => {
                        let recorded = requested
                            .iter()
                            .zip(model)
                            .map(|(var, value)| match value.is_positive() {
                                true => *var,
                                false => -*var,
                            })
                            .collect();
                        Verdict::Satisfiable(Some(recorded))
                    }
                }
            }
        },
        Report::Unsatisfiable => Verdict::Unsatisfiable,
        Report::Unknown => Verdict::Unknown,
    };

    log::debug!(target: targets::BACKEND, "{name}: {verdict}");

    Ok(SolverResult {
        backend: name,
        verdict,
    })
}
