/*!
Clause based backends.

Every constraint is reduced to the canonical at-most form and then expanded into clauses:
1. A constraint satisfied by every valuation is dropped, and one satisfied by no valuation becomes the empty clause (or, when reified, the negated reifier).
2. A reifier is folded into the constraint by widening its bound.
3. Weights above `bound + 1` are clamped to `bound + 1`, which preserves the satisfying valuations.
4. Weighted literals are repeated, so the constraint becomes a plain cardinality constraint.
5. The cardinality constraint is encoded with the configured [CardEncoding].

The resulting clauses are given to an in-process [SatEngine] on solve.
*/

use std::{io::Write, str::FromStr};

use serde::{Deserialize, Serialize};
use splr::Certificate;
use varisat::ExtendFormula;

use crate::{
    backends::{Backend, StopToken},
    misc::log::targets::{self},
    reports::Report,
    structures::{
        constraint::{AtMost, Constraint},
        literal::{valuation_from_model, Lit, Literal, Var, VAR_MAX},
    },
    types::err::{self, ErrorKind},
};

pub mod encodings;

/// In-process SAT engines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SatEngine {
    Splr,
    Varisat,
}

impl std::fmt::Display for SatEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Splr => write!(f, "splr"),
            Self::Varisat => write!(f, "varisat"),
        }
    }
}

impl FromStr for SatEngine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "splr" => Ok(Self::Splr),
            "varisat" => Ok(Self::Varisat),
            unknown => Err(format!("unknown SAT engine '{unknown}'")),
        }
    }
}

/// Clausal encodings of cardinality constraints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardEncoding {
    /// A sequential counter.
    SeqCounter,

    /// A totalizer, limited to the bound.
    Totalizer,
}

impl std::fmt::Display for CardEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SeqCounter => write!(f, "seqcounter"),
            Self::Totalizer => write!(f, "totalizer"),
        }
    }
}

impl FromStr for CardEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "seqcounter" => Ok(Self::SeqCounter),
            "totalizer" => Ok(Self::Totalizer),
            unknown => Err(format!("unknown encoding '{unknown}'")),
        }
    }
}

/// A clause based backend.
pub struct SatBackend {
    engine: SatEngine,
    encoding: CardEncoding,

    /// The most recently generated variable, including auxiliary variables.
    top: Var,

    clauses: Vec<Vec<Lit>>,

    /// The valuation found by a satisfiable solve, indexed by variable.
    valuation: Option<Vec<bool>>,
}

impl SatBackend {
    pub fn new(engine: SatEngine, encoding: CardEncoding) -> Self {
        SatBackend {
            engine,
            encoding,
            top: 0,
            clauses: Vec::default(),
            valuation: None,
        }
    }

    pub fn clauses(&self) -> &[Vec<Lit>] {
        &self.clauses
    }

    fn check(&self, literal: Lit) -> Result<(), err::EncodingError> {
        if literal == 0 || literal.var() > self.top {
            return Err(err::EncodingError::LiteralOutOfRange {
                literal,
                top: self.top,
            });
        }
        Ok(())
    }

    fn add_at_most(&mut self, at_most: AtMost) {
        if at_most.is_trivial() {
            return;
        }
        if at_most.is_unsatisfiable() {
            self.clauses.push(Vec::default());
            return;
        }

        let bound = at_most.bound as u64;
        let mut inputs = Vec::default();
        for (literal, weight) in at_most.lits.iter().zip(&at_most.weights) {
            let weight = std::cmp::min(*weight, bound + 1);
            for _ in 0..weight {
                inputs.push(*literal);
            }
        }

        let k = bound as usize;
        let clauses = match self.encoding {
            CardEncoding::SeqCounter => encodings::sequential_counter(&inputs, k, &mut self.top),
            CardEncoding::Totalizer => encodings::totalizer(&inputs, k, &mut self.top),
        };
        self.clauses.extend(clauses);
    }

    fn solve_splr(&self) -> (Report, Option<Vec<bool>>) {
        if self.clauses.is_empty() {
            return (Report::Satisfiable, Some(vec![false; self.top as usize + 1]));
        }
        match Certificate::try_from(self.clauses.clone()) {
            Ok(Certificate::SAT(model)) => (Report::Satisfiable, Some(valuation_from_model(&model))),
            Ok(Certificate::UNSAT) => (Report::Unsatisfiable, None),
            Err(e) if refutes(&e) => (Report::Unsatisfiable, None),
            Err(e) => {
                log::warn!(target: targets::BACKEND, "splr: {e:?}");
                (Report::Unknown, None)
            }
        }
    }

    fn solve_varisat(&self) -> (Report, Option<Vec<bool>>) {
        let mut solver = varisat::Solver::new();
        for clause in &self.clauses {
            let lits = clause
                .iter()
                .map(|l| varisat::Lit::from_dimacs(*l as isize))
                .collect::<Vec<_>>();
            solver.add_clause(&lits);
        }
        match solver.solve() {
            Ok(true) => {
                let model = solver
                    .model()
                    .unwrap_or_default()
                    .iter()
                    .map(|l| l.to_dimacs() as Lit)
                    .collect::<Vec<_>>();
                (Report::Satisfiable, Some(valuation_from_model(&model)))
            }
            Ok(false) => (Report::Unsatisfiable, None),
            Err(e) => {
                log::warn!(target: targets::BACKEND, "varisat: {e}");
                (Report::Unknown, None)
            }
        }
    }
}

/// Whether an error from splr is a refutation found while building or simplifying, rather than a failure.
fn refutes(e: &splr::SolverError) -> bool {
    matches!(
        e,
        splr::SolverError::EmptyClause | splr::SolverError::Inconsistent | splr::SolverError::RootLevelConflict(_)
    )
}

impl Backend for SatBackend {
    fn name(&self) -> String {
        format!("{}+{}", self.engine, self.encoding)
    }

    fn generate_vars(&mut self, n: usize) -> Vec<Lit> {
        let fresh = (self.top + 1..=self.top + n as Var)
            .map(|v| v as Lit)
            .collect();
        self.top += n as Var;
        fresh
    }

    fn add_clause(&mut self, lits: &[Lit]) -> Result<(), ErrorKind> {
        for literal in lits {
            self.check(*literal)?;
        }
        self.clauses.push(lits.to_vec());
        Ok(())
    }

    fn add_constraint(&mut self, constraint: &Constraint) -> Result<(), ErrorKind> {
        constraint.validate()?;
        for literal in constraint.lits.iter().chain(constraint.reifier.iter()) {
            self.check(*literal)?;
        }

        let at_most = constraint.canonical();
        match constraint.reifier {
            None => self.add_at_most(at_most),

            Some(r) if at_most.is_unsatisfiable() => self.clauses.push(vec![r.negate()]),

            Some(r) => self.add_at_most(at_most.reified(r)),
        }

        if self.top > VAR_MAX {
            return Err(ErrorKind::from(err::ConfigurationError::OutOfBounds("variables")));
        }
        Ok(())
    }

    fn solve(&mut self, stop: &StopToken) -> Report {
        if stop.is_stopped() {
            return Report::Unknown;
        }

        log::info!(target: targets::BACKEND,
            "{}: {} variables, {} clauses", self.name(), self.top, self.clauses.len());

        if self.clauses.iter().any(|clause| clause.is_empty()) {
            self.valuation = None;
            return Report::Unsatisfiable;
        }

        let (report, valuation) = match self.engine {
            SatEngine::Splr => self.solve_splr(),
            SatEngine::Varisat => self.solve_varisat(),
        };
        self.valuation = valuation;
        report
    }

    fn model(&self, vars: &[Lit]) -> Option<Vec<Lit>> {
        if vars.is_empty() {
            return None;
        }
        let valuation = self.valuation.as_ref()?;
        let model = vars
            .iter()
            .map(|v| {
                let value = valuation.get(v.var() as usize).copied().unwrap_or(false);
                Lit::new(v.var(), value)
            })
            .collect();
        Some(model)
    }

    fn dump(&self, out: &mut dyn Write) -> std::io::Result<()> {
        writeln!(out, "p cnf {} {}", self.top, self.clauses.len())?;
        for clause in &self.clauses {
            let lits = clause.iter().map(|l| l.to_string()).collect::<Vec<_>>();
            match lits.is_empty() {
                true => writeln!(out, "0")?,
                false => writeln!(out, "{} 0", lits.join(" "))?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structures::constraint::Relation;

    fn backends() -> Vec<SatBackend> {
        let mut all = Vec::default();
        for engine in [SatEngine::Splr, SatEngine::Varisat] {
            for encoding in [CardEncoding::SeqCounter, CardEncoding::Totalizer] {
                all.push(SatBackend::new(engine, encoding));
            }
        }
        all
    }

    /// Whether the constraints have a model with the first `n` variables fixed to `bits`, found by solving.
    fn solve_fixed(make: &dyn Fn(&mut SatBackend, &[Lit]), mut backend: SatBackend, n: usize, bits: u32) -> Report {
        let vars = backend.generate_vars(n);
        make(&mut backend, &vars);
        for (i, v) in vars.iter().enumerate() {
            let unit = match bits & (1 << i) != 0 {
                true => *v,
                false => -*v,
            };
            backend.add_clause(&[unit]).unwrap();
        }
        backend.solve(&StopToken::new())
    }

    #[test]
    fn weighted_at_least_by_enumeration() {
        let weights = vec![1, 1, 2, 3];
        let make = |backend: &mut SatBackend, vars: &[Lit]| {
            let c = Constraint::weighted(vars.to_vec(), weights.clone(), Relation::GreaterOrEqual, 3);
            backend.add_constraint(&c).unwrap();
        };

        for encoding in [CardEncoding::SeqCounter, CardEncoding::Totalizer] {
            for bits in 0..16_u32 {
                let sum: u64 = (0..4).filter(|i| bits & (1 << i) != 0).map(|i| weights[i]).sum();
                let expected = match sum >= 3 {
                    true => Report::Satisfiable,
                    false => Report::Unsatisfiable,
                };
                let backend = SatBackend::new(SatEngine::Varisat, encoding);
                assert_eq!(solve_fixed(&make, backend, 4, bits), expected, "{bits:b}");
            }
        }
    }

    #[test]
    fn reification_by_enumeration() {
        for bound in -1..=5 {
            let make = |backend: &mut SatBackend, vars: &[Lit]| {
                let c = Constraint::weighted(vars[..3].to_vec(), vec![2, 1, 1], Relation::LessOrEqual, bound)
                    .reified_by(vars[3]);
                backend.add_constraint(&c).unwrap();
            };
            for bits in 0..16_u32 {
                let sum: i64 = [2, 1, 1]
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| bits & (1 << i) != 0)
                    .map(|(_, w)| *w)
                    .sum();
                let r = bits & (1 << 3) != 0;
                let expected = match !r || sum <= bound {
                    true => Report::Satisfiable,
                    false => Report::Unsatisfiable,
                };
                let backend = SatBackend::new(SatEngine::Varisat, CardEncoding::SeqCounter);
                assert_eq!(solve_fixed(&make, backend, 4, bits), expected, "bound {bound}, {bits:b}");
            }
        }
    }

    #[test]
    fn equivalence_by_enumeration() {
        for bound in 0..=4 {
            let make = |backend: &mut SatBackend, vars: &[Lit]| {
                let c = Constraint::weighted(vars[..3].to_vec(), vec![1, 2, 1], Relation::GreaterOrEqual, bound)
                    .reified_by(vars[3]);
                backend.add_equivalence(&c).unwrap();
            };
            for bits in 0..16_u32 {
                let sum: i64 = [1, 2, 1]
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| bits & (1 << i) != 0)
                    .map(|(_, w)| *w)
                    .sum();
                let r = bits & (1 << 3) != 0;
                let expected = match r == (sum >= bound) {
                    true => Report::Satisfiable,
                    false => Report::Unsatisfiable,
                };
                for encoding in [CardEncoding::SeqCounter, CardEncoding::Totalizer] {
                    let backend = SatBackend::new(SatEngine::Varisat, encoding);
                    assert_eq!(solve_fixed(&make, backend, 4, bits), expected, "bound {bound}, {bits:b}");
                }
            }
        }
    }

    #[test]
    fn splr_refutations() {
        assert!(refutes(&splr::SolverError::EmptyClause));
        assert!(refutes(&splr::SolverError::Inconsistent));
        assert!(!refutes(&splr::SolverError::TimeOut));
        assert!(!refutes(&splr::SolverError::OutOfMemory));
    }

    #[test]
    fn trivial_and_impossible() {
        for mut backend in backends() {
            let vars = backend.generate_vars(2);
            let trivial = Constraint::new(vars.clone(), Relation::LessOrEqual, 2);
            backend.add_constraint(&trivial).unwrap();
            assert!(backend.clauses().is_empty());

            let impossible = Constraint::new(vars.clone(), Relation::Less, 0).reified_by(vars[0]);
            backend.add_constraint(&impossible).unwrap();
            assert_eq!(backend.clauses(), &[vec![-vars[0]]]);
            assert_eq!(backend.solve(&StopToken::new()), Report::Satisfiable);
            assert_eq!(backend.model(&[vars[0]]), Some(vec![-vars[0]]));

            backend.add_constraint(&Constraint::new(vars.clone(), Relation::Greater, 2)).unwrap();
            assert_eq!(backend.solve(&StopToken::new()), Report::Unsatisfiable);
        }
    }

    #[test]
    fn out_of_range() {
        let mut backend = SatBackend::new(SatEngine::Splr, CardEncoding::Totalizer);
        backend.generate_vars(1);
        assert!(backend.add_clause(&[2]).is_err());
        let c = Constraint::new(vec![1, -2], Relation::GreaterOrEqual, 1);
        assert!(backend.add_constraint(&c).is_err());
    }

    #[test]
    fn stopped_is_unknown() {
        let mut backend = SatBackend::new(SatEngine::Varisat, CardEncoding::SeqCounter);
        backend.generate_vars(1);
        let stop = StopToken::new();
        stop.stop();
        assert_eq!(backend.solve(&stop), Report::Unknown);
    }
}
