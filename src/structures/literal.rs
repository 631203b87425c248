/*!
Literals, as signed integers.

A literal names a variable (aka. an 'atom') together with a polarity.
As in DIMACS, a positive integer is a variable and a negative integer the negation of a variable.

Variables are numbered densely from `1`, in the order they are generated by a [backend](crate::backends::Backend).
The numbering is the only identity a backend needs, and is specific to the backend which generated it.

```rust
# use wsn_lifetime::structures::literal::{Lit, Literal};
let literal: Lit = Lit::new(7, false);

assert_eq!(literal, -7);
assert_eq!(literal.var(), 7);
assert!(!literal.polarity());
assert_eq!(literal.negate(), 7);
```
*/

/// A variable.
pub type Var = u32;

/// The representation of a literal as a signed integer.
pub type Lit = i32;

/// The maximum instance of a variable, limited by the representation of literals.
pub const VAR_MAX: Var = i32::MAX.unsigned_abs();

/// Methods for reading a literal as a variable paired with a polarity.
pub trait Literal {
    /// A literal, specified by pairing a variable with a boolean.
    fn new(var: Var, polarity: bool) -> Self;

    /// The negation of the literal.
    fn negate(&self) -> Self;

    /// The variable of the literal.
    fn var(&self) -> Var;

    /// The polarity of the literal.
    fn polarity(&self) -> bool;

    /// Whether the literal is satisfied by a valuation, indexed by variable.
    ///
    /// Variables outside of the valuation are read as false.
    fn holds_on(&self, valuation: &[bool]) -> bool;
}

impl Literal for Lit {
    fn new(var: Var, polarity: bool) -> Self {
        match polarity {
            true => var as Lit,
            false => -(var as Lit),
        }
    }

    fn negate(&self) -> Self {
        -self
    }

    fn var(&self) -> Var {
        self.unsigned_abs()
    }

    fn polarity(&self) -> bool {
        self.is_positive()
    }

    fn holds_on(&self, valuation: &[bool]) -> bool {
        let value = valuation.get(self.var() as usize).copied().unwrap_or(false);
        value == self.polarity()
    }
}

/// A valuation indexed by variable, read from a list of signed literals.
///
/// Index `0` is unused.
pub fn valuation_from_model(model: &[Lit]) -> Vec<bool> {
    let top = model.iter().map(|l| l.var()).max().unwrap_or(0);
    let mut valuation = vec![false; top as usize + 1];
    for literal in model {
        valuation[literal.var() as usize] = literal.polarity();
    }
    valuation
}
