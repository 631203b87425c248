/*!
A recorded formula, for replay into any number of backends.

A [Formula] implements [Backend], and so an encoder writes to a formula exactly as it would write to a decision procedure.
Though, rather than deciding anything, a formula records each instruction as an [Item].

[Formula::load_into] replays the instructions into some other backend.
As backends generate their own variables (and some, such as clause based backends, generate auxiliary variables of their own), the variables of a formula and of a backend need not coincide.
So, replay returns a [VarMap] from the variables of the formula to those of the backend.

Formulas are serializable, which is how a formula reaches a [worker process](crate::portfolio::worker).

```rust
# use wsn_lifetime::backends::Backend;
# use wsn_lifetime::structures::formula::Formula;
# use wsn_lifetime::structures::constraint::{Constraint, Relation};
let mut formula = Formula::default();
let vars = formula.generate_vars(3);

assert!(formula.add_clause(&[vars[0], -vars[1]]).is_ok());
assert!(formula.add_constraint(&Constraint::new(vars.clone(), Relation::LessOrEqual, 1)).is_ok());
assert!(formula.add_clause(&[4]).is_err());
```
*/

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::{
    backends::{Backend, StopToken},
    reports::Report,
    structures::{
        constraint::Constraint,
        literal::{Lit, Literal, Var},
    },
    types::err::{self, ErrorKind},
};

/// An instruction, as given to a backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Item {
    /// The generation of some number of variables.
    Vars(usize),

    Clause(Vec<Lit>),

    Constraint(Constraint),
}

/// An ordered record of instructions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Formula {
    items: Vec<Item>,
    top: Var,
}

impl Formula {
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// The count of variables generated.
    pub fn var_count(&self) -> Var {
        self.top
    }

    /// The count of clauses and constraints.
    pub fn constraint_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| !matches!(item, Item::Vars(_)))
            .count()
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

    /// Replays the formula into `backend`.
    pub fn load_into(&self, backend: &mut dyn Backend) -> Result<VarMap, ErrorKind> {
        let mut map = VarMap::default();

        for item in &self.items {
            match item {
                Item::Vars(n) => map.extend(backend.generate_vars(*n)),

                Item::Clause(lits) => {
                    let mapped = map.apply_all(lits)?;
                    backend.add_clause(&mapped)?;
                }

                Item::Constraint(constraint) => {
                    let mut mapped = constraint.clone();
                    mapped.lits = map.apply_all(&constraint.lits)?;
                    mapped.reifier = match constraint.reifier {
                        Some(r) => Some(map.apply(r)?),
                        None => None,
                    };
                    backend.add_constraint(&mapped)?;
                }
            }
        }

        Ok(map)
    }

    /// Whether every clause and constraint holds on `valuation`.
    pub fn holds_on(&self, valuation: &[bool]) -> bool {
        self.items.iter().all(|item| match item {
            Item::Vars(_) => true,
            Item::Clause(lits) => lits.iter().any(|l| l.holds_on(valuation)),
            Item::Constraint(c) => c.holds_on(valuation),
        })
    }
}

impl Backend for Formula {
    fn name(&self) -> String {
        "formula".to_string()
    }

    fn generate_vars(&mut self, n: usize) -> Vec<Lit> {
        let fresh = (self.top + 1..=self.top + n as Var)
            .map(|v| v as Lit)
            .collect();
        self.top += n as Var;
        self.items.push(Item::Vars(n));
        fresh
    }

    fn add_clause(&mut self, lits: &[Lit]) -> Result<(), ErrorKind> {
        for literal in lits {
            self.check(*literal)?;
        }
        self.items.push(Item::Clause(lits.to_vec()));
        Ok(())
    }

    fn add_constraint(&mut self, constraint: &Constraint) -> Result<(), ErrorKind> {
        constraint.validate()?;
        for literal in constraint.lits.iter().chain(constraint.reifier.iter()) {
            self.check(*literal)?;
        }
        self.items.push(Item::Constraint(constraint.clone()));
        Ok(())
    }

    /// A formula only records, and never decides.
    fn solve(&mut self, _: &StopToken) -> Report {
        Report::Unknown
    }

    fn model(&self, _: &[Lit]) -> Option<Vec<Lit>> {
        None
    }

    fn dump(&self, out: &mut dyn Write) -> std::io::Result<()> {
        writeln!(out, "c {} variables", self.top)?;
        for item in &self.items {
            match item {
                Item::Vars(_) => {}
                Item::Clause(lits) => {
                    let lits = lits.iter().map(|l| l.to_string()).collect::<Vec<_>>();
                    writeln!(out, "{} 0", lits.join(" "))?;
                }
                Item::Constraint(c) => writeln!(out, "c {c}")?,
            }
        }
        Ok(())
    }
}

/// A map from the variables of a formula to the variables of some backend.
#[derive(Clone, Debug, Default)]
pub struct VarMap {
    /// The backend literal of each variable, with index `0` unused.
    map: Vec<Lit>,
}

impl VarMap {
    fn extend(&mut self, fresh: Vec<Lit>) {
        if self.map.is_empty() {
            self.map.push(0);
        }
        self.map.extend(fresh);
    }

    /// The backend literal corresponding to a formula literal.
    pub fn apply(&self, literal: Lit) -> Result<Lit, err::EncodingError> {
        match self.map.get(literal.var() as usize) {
            Some(&mapped) if literal != 0 && mapped != 0 => match literal.polarity() {
                true => Ok(mapped),
                false => Ok(mapped.negate()),
            },
            _ => Err(err::EncodingError::UnmappedLiteral(literal)),
        }
    }

    pub fn apply_all(&self, lits: &[Lit]) -> Result<Vec<Lit>, err::EncodingError> {
        lits.iter().map(|l| self.apply(*l)).collect()
    }
}
