/*!
Clausal encodings of `x_1 + … + x_n <= k`.

Each encoding takes the inputs (with repetition, for weighted literals) and the bound, draws auxiliary variables from the counter `top`, and returns the clauses.
The caller is expected to have dealt with trivial constraints, so `k < n`.

- [sequential_counter]: Sinz's sequential counter, with `O(n·k)` clauses and auxiliary variables.
- [totalizer]: A totalizer with node outputs capped at `k + 1`.

Both encodings only require that the count of true inputs is at most `k`, and so auxiliary variables are free to take any value consistent with the count.
*/

use crate::structures::literal::{Lit, Var};

fn fresh(top: &mut Var) -> Lit {
    *top += 1;
    *top as Lit
}

/// A sequential counter.
///
/// Register `s[i][j]` holds when at least `j + 1` of the first `i + 1` inputs are true.
pub fn sequential_counter(inputs: &[Lit], k: usize, top: &mut Var) -> Vec<Vec<Lit>> {
    if k == 0 {
        return inputs.iter().map(|x| vec![-x]).collect();
    }
    let n = inputs.len();
    if n <= k {
        return Vec::default();
    }

    let mut clauses = Vec::default();
    let registers: Vec<Vec<Lit>> = (0..n - 1)
        .map(|_| (0..k).map(|_| fresh(top)).collect())
        .collect();

    let x = inputs[0];
    let s = &registers[0];
    clauses.push(vec![-x, s[0]]);
    for r in &s[1..] {
        clauses.push(vec![-r]);
    }

    for i in 1..n - 1 {
        let x = inputs[i];
        let (prev, s) = (&registers[i - 1], &registers[i]);

        clauses.push(vec![-x, s[0]]);
        for j in 0..k {
            clauses.push(vec![-prev[j], s[j]]);
        }
        for j in 1..k {
            clauses.push(vec![-x, -prev[j - 1], s[j]]);
        }
        clauses.push(vec![-x, -prev[k - 1]]);
    }

    clauses.push(vec![-inputs[n - 1], -registers[n - 2][k - 1]]);

    clauses
}

/// A totalizer, limited to counting up to `k + 1`.
pub fn totalizer(inputs: &[Lit], k: usize, top: &mut Var) -> Vec<Vec<Lit>> {
    if k == 0 {
        return inputs.iter().map(|x| vec![-x]).collect();
    }
    if inputs.len() <= k {
        return Vec::default();
    }

    let mut clauses = Vec::default();
    let outputs = totalize(inputs, k + 1, top, &mut clauses);
    if let Some(overflow) = outputs.get(k) {
        clauses.push(vec![-overflow]);
    }
    clauses
}

/// Unary outputs of a node, where output `i` holds when at least `i + 1` inputs below the node are true.
fn totalize(inputs: &[Lit], cap: usize, top: &mut Var, clauses: &mut Vec<Vec<Lit>>) -> Vec<Lit> {
    if inputs.len() == 1 {
        return inputs.to_vec();
    }

    let (left, right) = inputs.split_at(inputs.len() / 2);
    let a = totalize(left, cap, top, clauses);
    let b = totalize(right, cap, top, clauses);

    let width = std::cmp::min(a.len() + b.len(), cap);
    let o: Vec<Lit> = (0..width).map(|_| fresh(top)).collect();

    for i in 0..=a.len() {
        for j in 0..=b.len() {
            if i + j == 0 {
                continue;
            }
            let sum = std::cmp::min(i + j, width);
            let mut clause = Vec::with_capacity(3);
            if i > 0 {
                clause.push(-a[i - 1]);
            }
            if j > 0 {
                clause.push(-b[j - 1]);
            }
            clause.push(o[sum - 1]);
            clauses.push(clause);
        }
    }

    o
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structures::literal::Literal;

    /// Whether the clauses are satisfiable with the inputs fixed by `valuation`, by enumeration of auxiliary variables.
    fn extends(clauses: &[Vec<Lit>], inputs: Var, top: Var, valuation: &[bool]) -> bool {
        let aux = (top - inputs) as usize;
        (0..(1_u64 << aux)).any(|bits| {
            let mut full = valuation.to_vec();
            for i in 0..aux {
                full.push(bits & (1 << i) != 0);
            }
            clauses.iter().all(|c| c.iter().any(|l| l.holds_on(&full)))
        })
    }

    fn check(encoding: fn(&[Lit], usize, &mut Var) -> Vec<Vec<Lit>>) {
        for n in 1..=5_u32 {
            for k in 0..=n as usize {
                let inputs: Vec<Lit> = (1..=n as Lit).collect();
                let mut top = n;
                let clauses = encoding(&inputs, k, &mut top);

                for bits in 0..(1_u32 << n) {
                    let mut valuation = vec![false];
                    valuation.extend((0..n).map(|i| bits & (1 << i) != 0));
                    let count = bits.count_ones() as usize;
                    assert_eq!(
                        extends(&clauses, n, top, &valuation),
                        count <= k,
                        "n {n}, k {k}, bits {bits:b}"
                    );
                }
            }
        }
    }

    #[test]
    fn sequential_counter_exact() {
        check(sequential_counter);
    }

    #[test]
    fn totalizer_exact() {
        check(totalizer);
    }

    #[test]
    fn repeated_inputs_count_twice() {
        let mut top = 2;
        let clauses = sequential_counter(&[1, 1, 2], 2, &mut top);
        assert!(!extends(&clauses, 2, top, &[false, true, true]));
        assert!(extends(&clauses, 2, top, &[false, true, false]));
        assert!(extends(&clauses, 2, top, &[false, false, true]));
    }
}
