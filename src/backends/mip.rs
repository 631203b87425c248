/*!
An external mixed integer programming solver, reading CPLEX LP files.

Each variable `v` is a binary column `b{v}`, and each constraint becomes a single row.
A constraint is first reduced to its canonical at-most form, and a reifier is folded in by [widening](crate::structures::constraint::AtMost::reified) the bound, as a big-M row.
A negative literal `¬x` is written as `1 - x`, with the constant moved to the right hand side.

The solver is invoked in the manner of CBC, as `{command} {model}.lp solve solu {solution}`, and the solution file read back:
- The first line gives the status, with `Optimal` for a solution and `Infeasible` or `Integer infeasible` for none.
- Each following line gives the index, name, and value of a nonzero column.

Files are written to the temporary directory, and removed after the solve.
*/

use std::{
    collections::BTreeMap,
    io::Write,
    path::Path,
    process::Command,
    sync::atomic::{AtomicUsize, Ordering},
};

use crate::{
    backends::{process, Backend, StopToken},
    misc::log::targets::{self},
    reports::Report,
    structures::{
        constraint::{AtMost, Constraint},
        literal::{Lit, Literal, Var},
    },
    types::err::{self, ErrorKind},
};

/// Distinguishes the files of solves within this process.
static SOLVES: AtomicUsize = AtomicUsize::new(0);

/// A row `Σ coefficients[v] * b{v} <= rhs`.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Row {
    coefficients: BTreeMap<Var, i64>,
    rhs: i64,
}

impl Row {
    fn from_at_most(at_most: &AtMost) -> Self {
        let mut coefficients = BTreeMap::<Var, i64>::default();
        let mut rhs = at_most.bound;
        for (literal, weight) in at_most.lits.iter().zip(&at_most.weights) {
            let weight = *weight as i64;
            let entry = coefficients.entry(literal.var()).or_default();
            match literal.polarity() {
                true => *entry += weight,
                false => {
                    *entry -= weight;
                    rhs -= weight;
                }
            }
        }
        coefficients.retain(|_, c| *c != 0);
        Row { coefficients, rhs }
    }
}

impl std::fmt::Display for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, (var, c)) in self.coefficients.iter().enumerate() {
            match (i, *c < 0) {
                (0, false) => write!(f, "{c} b{var}")?,
                (0, true) => write!(f, "- {} b{var}", c.unsigned_abs())?,
                (_, false) => write!(f, " + {c} b{var}")?,
                (_, true) => write!(f, " - {} b{var}", c.unsigned_abs())?,
            }
        }
        write!(f, " <= {}", self.rhs)
    }
}

pub struct MipBackend {
    command: String,
    top: Var,
    rows: Vec<Row>,

    /// Set when some row has no columns and a negative right hand side.
    refuted: bool,

    valuation: Option<Vec<bool>>,
}

impl MipBackend {
    pub fn new(command: &str) -> Self {
        MipBackend {
            command: command.to_string(),
            top: 0,
            rows: Vec::default(),
            refuted: false,
            valuation: None,
        }
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

    fn add_row(&mut self, at_most: &AtMost) {
        let row = Row::from_at_most(at_most);
        match row.coefficients.is_empty() {
            true => {
                if row.rhs < 0 {
                    self.refuted = true;
                }
            }
            false => self.rows.push(row),
        }
    }

    /// The model, as an LP file.
    pub fn lp(&self) -> String {
        let mut lp = String::from("\\ wsn_lifetime\nMinimize\n obj:");
        if self.top > 0 {
            lp.push_str(" 0 b1");
        }
        lp.push_str("\nSubject To\n");
        for (i, row) in self.rows.iter().enumerate() {
            lp.push_str(&format!(" c{}: {row}\n", i + 1));
        }
        if self.top > 0 {
            lp.push_str("Binary\n");
            for v in 1..=self.top {
                lp.push_str(&format!(" b{v}\n"));
            }
        }
        lp.push_str("End\n");
        lp
    }

    fn run(&self, stop: &StopToken) -> Result<Option<String>, std::io::Error> {
        let stem = format!("wsn_lifetime-{}-{}", std::process::id(), SOLVES.fetch_add(1, Ordering::Relaxed));
        let model = std::env::temp_dir().join(format!("{stem}.lp"));
        let solution = std::env::temp_dir().join(format!("{stem}.sol"));

        let result = self.run_on(&model, &solution, stop);

        let _ = std::fs::remove_file(&model);
        let _ = std::fs::remove_file(&solution);
        result
    }

    fn run_on(&self, model: &Path, solution: &Path, stop: &StopToken) -> Result<Option<String>, std::io::Error> {
        std::fs::write(model, self.lp())?;

        let mut command = Command::new(&self.command);
        command.arg(model).args(["solve", "solu"]).arg(solution);

        match process::run(&mut command, &[], stop)? {
            None => Ok(None),
            Some(_) => match std::fs::read_to_string(solution) {
                Ok(read) => Ok(Some(read)),
                Err(e) => {
                    log::warn!(target: targets::BACKEND, "{}: no solution file: {e}", self.command);
                    Ok(Some(String::default()))
                }
            },
        }
    }
}

/// Reads a verdict, and any values, from a CBC solution file.
pub fn parse_solution(solution: &str, top: Var) -> (Report, Option<Vec<bool>>) {
    let mut lines = solution.lines().map(str::trim).filter(|l| !l.is_empty());
    let status = lines.next().unwrap_or_default();

    let report = if status.starts_with("Optimal") {
        Report::Satisfiable
    } else if status.starts_with("Infeasible") || status.starts_with("Integer infeasible") {
        Report::Unsatisfiable
    } else {
        Report::Unknown
    };
    if report != Report::Satisfiable {
        return (report, None);
    }

    // Columns which are not listed are zero.
    let mut valuation = vec![false; top as usize + 1];
    for line in lines {
        let mut tokens = line.split_whitespace().filter(|t| *t != "**");
        let (Some(_), Some(name), Some(value)) = (tokens.next(), tokens.next(), tokens.next()) else {
            continue;
        };
        let Some(var) = name.strip_prefix('b').and_then(|v| v.parse::<usize>().ok()) else {
            continue;
        };
        let Ok(value) = value.parse::<f64>() else {
            continue;
        };
        if let Some(slot) = valuation.get_mut(var) {
            *slot = value > 0.5;
        }
    }
    (report, Some(valuation))
}

impl Backend for MipBackend {
    fn name(&self) -> String {
        format!("mip:{}", self.command)
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
        // At most n - 1 of the negated literals.
        let at_most = AtMost {
            lits: lits.iter().map(|l| -*l).collect(),
            weights: vec![1; lits.len()],
            bound: lits.len() as i64 - 1,
        };
        self.add_row(&at_most);
        Ok(())
    }

    fn add_constraint(&mut self, constraint: &Constraint) -> Result<(), ErrorKind> {
        constraint.validate()?;
        for literal in constraint.lits.iter().chain(constraint.reifier.iter()) {
            self.check(*literal)?;
        }

        let at_most = match constraint.reifier {
            Some(r) => constraint.canonical().reified(r),
            None => constraint.canonical(),
        };
        if !at_most.is_trivial() {
            self.add_row(&at_most);
        }
        Ok(())
    }

    fn solve(&mut self, stop: &StopToken) -> Report {
        if stop.is_stopped() {
            return Report::Unknown;
        }
        if self.refuted {
            return Report::Unsatisfiable;
        }

        log::info!(target: targets::BACKEND,
            "{}: {} columns, {} rows", self.name(), self.top, self.rows.len());

        match self.run(stop) {
            Ok(Some(solution)) => {
                let (report, valuation) = parse_solution(&solution, self.top);
                self.valuation = valuation;
                report
            }
            Ok(None) => Report::Unknown,
            Err(e) => {
                log::warn!(target: targets::BACKEND, "{}: {e}", self.name());
                Report::Unknown
            }
        }
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
        out.write_all(self.lp().as_bytes())
    }
}
