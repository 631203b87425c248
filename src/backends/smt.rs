/*!
An external SMT solver, reading SMT-LIB 2.

Constraints are written as linear integer arithmetic over Boolean variables, with each variable `v` declared as `b{v}`.
A constraint becomes the sum of its canonical at-most terms, each `(ite l w 0)`, bounded above, and a reifier becomes an implication.

On solve the script is written to the stdin of the solver, and the verdict read from the first line of its stdout, followed by the values of every variable when satisfiable.
A satisfiable verdict without a value for every variable is taken to be unknown.
The solver is run as an external [process](crate::backends::process), and killed as soon as the stop token is set.
*/

use std::{io::Write, process::Command};

use crate::{
    backends::{process, Backend, StopToken},
    misc::log::targets::{self},
    reports::Report,
    structures::{
        constraint::Constraint,
        literal::{Lit, Literal, Var},
    },
    types::err::{self, ErrorKind},
};

pub struct SmtBackend {
    command: String,
    args: Vec<String>,
    top: Var,
    assertions: Vec<String>,
    valuation: Option<Vec<bool>>,
}

fn term(literal: Lit) -> String {
    match literal.polarity() {
        true => format!("b{}", literal.var()),
        false => format!("(not b{})", literal.var()),
    }
}

fn int(n: i64) -> String {
    match n < 0 {
        true => format!("(- {})", n.unsigned_abs()),
        false => n.to_string(),
    }
}

impl SmtBackend {
    pub fn new(command: &str, args: &[String]) -> Self {
        SmtBackend {
            command: command.to_string(),
            args: args.to_vec(),
            top: 0,
            assertions: Vec::default(),
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

    /// The complete script given to the solver.
    pub fn script(&self) -> String {
        let mut script = String::from("(set-logic QF_LIA)\n");
        for v in 1..=self.top {
            script.push_str(&format!("(declare-const b{v} Bool)\n"));
        }
        for assertion in &self.assertions {
            script.push_str(&format!("(assert {assertion})\n"));
        }
        script.push_str("(check-sat)\n");
        if self.top > 0 {
            let vars = (1..=self.top).map(|v| format!("b{v}")).collect::<Vec<_>>();
            script.push_str(&format!("(get-value ({}))\n", vars.join(" ")));
        }
        script.push_str("(exit)\n");
        script
    }

    fn run(&self, stop: &StopToken) -> Result<Option<String>, std::io::Error> {
        let mut command = Command::new(&self.command);
        command.args(&self.args);
        process::run(&mut command, self.script().as_bytes(), stop)
    }
}

/// Reads a verdict, and any values, from the output of a solver.
pub fn parse_output(output: &str, top: Var) -> (Report, Option<Vec<bool>>) {
    let mut lines = output.lines().map(str::trim).filter(|l| !l.is_empty());
    let report = match lines.next() {
        Some("sat") => Report::Satisfiable,
        Some("unsat") => Report::Unsatisfiable,
        _ => Report::Unknown,
    };
    if report != Report::Satisfiable {
        return (report, None);
    }

    let mut values: Vec<Option<bool>> = vec![None; top as usize + 1];
    let rest = lines.collect::<Vec<_>>().join(" ").replace(['(', ')'], " ");
    let mut tokens = rest.split_whitespace().peekable();
    while let Some(token) = tokens.next() {
        let Some(var) = token.strip_prefix('b').and_then(|v| v.parse::<usize>().ok()) else {
            continue;
        };
        let value = match tokens.peek() {
            Some(&"true") => true,
            Some(&"false") => false,
            _ => continue,
        };
        if let Some(slot) = values.get_mut(var) {
            *slot = Some(value);
        }
    }

    let valuation = std::iter::once(Some(false))
        .chain(values.into_iter().skip(1))
        .collect::<Option<Vec<_>>>();
    match valuation {
        Some(valuation) => (report, Some(valuation)),
        None => {
            log::warn!(target: targets::BACKEND, "sat without a value for each variable");
            (Report::Unknown, None)
        }
    }
}

impl Backend for SmtBackend {
    fn name(&self) -> String {
        format!("smt:{}", self.command)
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
        let assertion = match lits {
            [] => "false".to_string(),
            [literal] => term(*literal),
            _ => format!("(or {})", lits.iter().map(|l| term(*l)).collect::<Vec<_>>().join(" ")),
        };
        self.assertions.push(assertion);
        Ok(())
    }

    fn add_constraint(&mut self, constraint: &Constraint) -> Result<(), ErrorKind> {
        constraint.validate()?;
        for literal in constraint.lits.iter().chain(constraint.reifier.iter()) {
            self.check(*literal)?;
        }

        let at_most = constraint.canonical();
        if at_most.is_trivial() {
            return Ok(());
        }

        let terms = at_most
            .lits
            .iter()
            .zip(&at_most.weights)
            .map(|(l, w)| format!("(ite {} {w} 0)", term(*l)))
            .collect::<Vec<_>>();
        let sum = match terms.len() {
            0 => "0".to_string(),
            1 => terms[0].clone(),
            _ => format!("(+ {})", terms.join(" ")),
        };
        let bounded = format!("(<= {sum} {})", int(at_most.bound));

        let assertion = match constraint.reifier {
            Some(r) => format!("(=> {} {bounded})", term(r)),
            None => bounded,
        };
        self.assertions.push(assertion);
        Ok(())
    }

    fn solve(&mut self, stop: &StopToken) -> Report {
        if stop.is_stopped() {
            return Report::Unknown;
        }

        log::info!(target: targets::BACKEND,
            "{}: {} variables, {} assertions", self.name(), self.top, self.assertions.len());

        match self.run(stop) {
            Ok(Some(output)) => {
                let (report, valuation) = parse_output(&output, self.top);
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
        out.write_all(self.script().as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structures::constraint::Relation;

    #[test]
    fn script() {
        let mut backend = SmtBackend::new("z3", &[]);
        let vars = backend.generate_vars(3);
        backend.add_clause(&[vars[0], -vars[1]]).unwrap();
        let c = Constraint::new(vars[..2].to_vec(), Relation::GreaterOrEqual, 1).reified_by(vars[2]);
        backend.add_constraint(&c).unwrap();
        backend.add_constraint(&Constraint::new(vec![], Relation::Less, 0)).unwrap();

        let script = backend.script();
        assert!(script.contains("(declare-const b3 Bool)"));
        assert!(script.contains("(assert (or b1 (not b2)))"));
        assert!(script.contains("(assert (=> b3 (<= (+ (ite (not b1) 1 0) (ite (not b2) 1 0)) 1)))"));
        assert!(script.contains("(assert (<= 0 (- 1)))"));
        assert!(script.contains("(get-value (b1 b2 b3))"));
    }

    #[test]
    fn output() {
        let (report, valuation) = parse_output("sat\n((b1 true)\n (b2 false)\n (b3 true))\n", 3);
        assert_eq!(report, Report::Satisfiable);
        assert_eq!(valuation, Some(vec![false, true, false, true]));

        let (report, valuation) = parse_output("unsat\n(error \"model is not available\")\n", 3);
        assert_eq!(report, Report::Unsatisfiable);
        assert_eq!(valuation, None);

        assert_eq!(parse_output("", 1).0, Report::Unknown);
        assert_eq!(parse_output("timeout\n", 1).0, Report::Unknown);

        assert_eq!(parse_output("sat\n", 0), (Report::Satisfiable, Some(vec![false])));
    }

    #[test]
    fn sat_without_values() {
        assert_eq!(parse_output("sat\n", 2), (Report::Unknown, None));
        assert_eq!(parse_output("sat\n((b1 true))\n", 2), (Report::Unknown, None));
        assert_eq!(
            parse_output("sat\n(error \"line 9 column 10: model is not available\")\n", 1),
            (Report::Unknown, None)
        );
    }

    #[test]
    fn unavailable() {
        assert!(matches!(
            process::probe("wsn-lifetime-no-such-solver"),
            Err(ErrorKind::BackendUnavailable(_))
        ));
    }
}
