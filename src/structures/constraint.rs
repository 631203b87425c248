/*!
Cardinality and pseudo-Boolean constraints, independent of any backend.

A [Constraint] bounds a weighted sum of literals (each literal counting its weight when true) relative to an integer, and may be *reified* by a literal.

Every backend reduces a constraint to the canonical [AtMost] form, through [Constraint::canonical]:
- `<= b` is native.
- `< b` becomes `<= b - 1`.
- `>= b` becomes `<= Σw - b` over the negated literals.
- `> b` becomes `<= Σw - b - 1` over the negated literals.

As the reduction is shared, the numeric semantics of a constraint (in particular, at boundary bounds) are the same whichever backend answers a query.

# Reification

A reifier `r` asks for `r ⇒ constraint`, and nothing more.
For a backend without implication the at-most form is widened by [AtMost::reified]: `r` is added with weight `Σw - b` and the bound becomes `Σw`.
Then, with `r` true the original bound is required, while with `r` false the constraint is trivially satisfied.

The converse, `¬r ⇒ ¬constraint`, is the [mirror](Constraint::mirrored) of a constraint and must be added separately.

```rust
# use wsn_lifetime::structures::constraint::{Constraint, Relation};
let c = Constraint::weighted(vec![1, 2, 3], vec![1, 2, 3], Relation::GreaterOrEqual, 4);
let at_most = c.canonical();

assert_eq!(at_most.lits, vec![-1, -2, -3]);
assert_eq!(at_most.bound, 2);
```
*/

use serde::{Deserialize, Serialize};

use crate::{
    structures::literal::{Lit, Literal},
    types::err::ConfigurationError,
};

/// A relational operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relation {
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

impl Relation {
    /// The relation which holds exactly when `self` does not.
    pub fn converse(&self) -> Self {
        match self {
            Self::Less => Self::GreaterOrEqual,
            Self::LessOrEqual => Self::Greater,
            Self::Greater => Self::LessOrEqual,
            Self::GreaterOrEqual => Self::Less,
        }
    }

    /// Whether `lhs` stands in the relation to `rhs`.
    pub fn compare(&self, lhs: i64, rhs: i64) -> bool {
        match self {
            Self::Less => lhs < rhs,
            Self::LessOrEqual => lhs <= rhs,
            Self::Greater => lhs > rhs,
            Self::GreaterOrEqual => lhs >= rhs,
        }
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Less => write!(f, "<"),
            Self::LessOrEqual => write!(f, "<="),
            Self::Greater => write!(f, ">"),
            Self::GreaterOrEqual => write!(f, ">="),
        }
    }
}

/// A (possibly weighted, possibly reified) cardinality constraint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    /// Literals on the left hand side.
    pub lits: Vec<Lit>,

    /// Weights of the literals, or a weight of one for each literal if absent.
    pub weights: Option<Vec<u64>>,

    pub relation: Relation,

    /// The right hand side.
    pub bound: i64,

    /// A literal which, when true, requires the constraint to hold.
    pub reifier: Option<Lit>,
}

impl Constraint {
    /// A constraint with a weight of one on each literal.
    pub fn new(lits: Vec<Lit>, relation: Relation, bound: i64) -> Self {
        Constraint {
            lits,
            weights: None,
            relation,
            bound,
            reifier: None,
        }
    }

    pub fn weighted(lits: Vec<Lit>, weights: Vec<u64>, relation: Relation, bound: i64) -> Self {
        Constraint {
            lits,
            weights: Some(weights),
            relation,
            bound,
            reifier: None,
        }
    }

    /// The same constraint, required only when `reifier` is true.
    pub fn reified_by(mut self, reifier: Lit) -> Self {
        self.reifier = Some(reifier);
        self
    }

    /// Checks the invariants of a constraint.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if let Some(weights) = &self.weights {
            if weights.len() != self.lits.len() {
                return Err(ConfigurationError::WeightCount {
                    literals: self.lits.len(),
                    weights: weights.len(),
                });
            }
        }
        if self.lits.contains(&0) || self.reifier == Some(0) {
            return Err(ConfigurationError::ZeroLiteral);
        }
        Ok(())
    }

    /// The weight of the literal at `index`.
    pub fn weight(&self, index: usize) -> u64 {
        match &self.weights {
            Some(weights) => weights[index],
            None => 1,
        }
    }

    /// The weights of the constraint, with implicit weights made explicit.
    pub fn weight_vec(&self) -> Vec<u64> {
        match &self.weights {
            Some(weights) => weights.clone(),
            None => vec![1; self.lits.len()],
        }
    }

    /// The sum of all weights.
    pub fn total_weight(&self) -> i64 {
        (0..self.lits.len()).map(|i| self.weight(i) as i64).sum()
    }

    /// The constraint in canonical at-most form, setting aside any reifier.
    pub fn canonical(&self) -> AtMost {
        let weights = self.weight_vec();
        let total = self.total_weight();
        let negated = || self.lits.iter().map(|l| l.negate()).collect::<Vec<_>>();

        match self.relation {
            Relation::LessOrEqual => AtMost {
                lits: self.lits.clone(),
                weights,
                bound: self.bound,
            },
            Relation::Less => AtMost {
                lits: self.lits.clone(),
                weights,
                bound: self.bound - 1,
            },
            Relation::GreaterOrEqual => AtMost {
                lits: negated(),
                weights,
                bound: total - self.bound,
            },
            Relation::Greater => AtMost {
                lits: negated(),
                weights,
                bound: total - self.bound - 1,
            },
        }
    }

    /// The converse of a reified constraint, for the negated reifier.
    ///
    /// Adding both a constraint and its mirror binds the reifier to the constraint in both directions.
    /// Returns None if the constraint has no reifier.
    pub fn mirrored(&self) -> Option<Constraint> {
        let reifier = self.reifier?;
        Some(Constraint {
            lits: self.lits.clone(),
            weights: self.weights.clone(),
            relation: self.relation.converse(),
            bound: self.bound,
            reifier: Some(reifier.negate()),
        })
    }

    /// The weighted sum of the literals true on `valuation`.
    pub fn sum_on(&self, valuation: &[bool]) -> i64 {
        self.lits
            .iter()
            .enumerate()
            .filter(|(_, l)| l.holds_on(valuation))
            .map(|(i, _)| self.weight(i) as i64)
            .sum()
    }

    /// Whether the relation holds on `valuation`, setting aside any reifier.
    pub fn relation_holds_on(&self, valuation: &[bool]) -> bool {
        self.relation.compare(self.sum_on(valuation), self.bound)
    }

    /// Whether the constraint, including any reifier, is satisfied by `valuation`.
    pub fn holds_on(&self, valuation: &[bool]) -> bool {
        match self.reifier {
            Some(r) if !r.holds_on(valuation) => true,
            _ => self.relation_holds_on(valuation),
        }
    }
}

impl std::fmt::Display for Constraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(r) = self.reifier {
            write!(f, "{r} => ")?;
        }
        let terms = self
            .lits
            .iter()
            .enumerate()
            .map(|(i, l)| format!("{}*{l}", self.weight(i)))
            .collect::<Vec<_>>();
        write!(f, "{} {} {}", terms.join(" + "), self.relation, self.bound)
    }
}

/// A constraint in canonical form: `Σ weights[i] * lits[i] <= bound`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AtMost {
    pub lits: Vec<Lit>,
    pub weights: Vec<u64>,
    pub bound: i64,
}

impl AtMost {
    /// The sum of all weights.
    pub fn total(&self) -> i64 {
        self.weights.iter().map(|w| *w as i64).sum()
    }

    /// Satisfied by every valuation.
    pub fn is_trivial(&self) -> bool {
        self.bound >= self.total()
    }

    /// Satisfied by no valuation.
    pub fn is_unsatisfiable(&self) -> bool {
        self.bound < 0
    }

    /// Widens the constraint so it is required only when `reifier` is true.
    ///
    /// The reifier is added with weight `Σw - bound`, and the bound becomes `Σw`.
    pub fn reified(mut self, reifier: Lit) -> AtMost {
        let total = self.total();
        if self.bound >= total {
            return self;
        }
        self.lits.push(reifier);
        self.weights.push((total - self.bound) as u64);
        self.bound = total;
        self
    }

    pub fn holds_on(&self, valuation: &[bool]) -> bool {
        let sum: i64 = self
            .lits
            .iter()
            .zip(&self.weights)
            .filter(|(l, _)| l.holds_on(valuation))
            .map(|(_, w)| *w as i64)
            .sum();
        sum <= self.bound
    }
}
