/*!
Least-squares polynomials, and their real roots.

A polynomial is fitted over a normalized abscissa: each `x` is shifted by the mean and scaled into `[-1, 1]`, which keeps the normal equations of higher degree fits reasonably conditioned.
The normal equations are solved by Gaussian elimination with partial pivoting.

Roots are isolated by scanning an interval for changes of sign, and each change is refined by bisection.
*/

/// A pivot smaller than this is taken to be zero.
const SINGULAR: f64 = 1e-12;

/// The number of subintervals scanned for a change of sign.
const SCAN_STEPS: usize = 2048;

const BISECTIONS: usize = 64;

/// A polynomial in `(x - shift) / scale`.
#[derive(Clone, Debug, PartialEq)]
pub struct Polynomial {
    /// Coefficients, from the constant term up.
    coefficients: Vec<f64>,
    shift: f64,
    scale: f64,
}

impl Polynomial {
    /// The least-squares polynomial of the given degree through the points `(xs[i], ys[i])`.
    ///
    /// None if there are too few points for the degree, or the system is singular.
    pub fn fit(xs: &[f64], ys: &[f64], degree: usize) -> Option<Self> {
        let n = degree + 1;
        if xs.len() != ys.len() || xs.len() < n {
            return None;
        }

        let shift = xs.iter().sum::<f64>() / xs.len() as f64;
        let spread = xs.iter().map(|x| (x - shift).abs()).fold(0.0, f64::max);
        let scale = match spread > 0.0 {
            true => spread,
            false => 1.0,
        };

        // Normal equations, as an augmented matrix.
        let mut matrix = vec![vec![0.0; n + 1]; n];
        for (x, y) in xs.iter().zip(ys) {
            let t = (x - shift) / scale;
            let powers = (0..=2 * degree).scan(1.0, |p, _| {
                let current = *p;
                *p *= t;
                Some(current)
            });
            let powers = powers.collect::<Vec<_>>();
            for (row, entries) in matrix.iter_mut().enumerate() {
                for (column, entry) in entries.iter_mut().take(n).enumerate() {
                    *entry += powers[row + column];
                }
                entries[n] += powers[row] * y;
            }
        }

        let coefficients = solve(matrix)?;
        Some(Polynomial {
            coefficients,
            shift,
            scale,
        })
    }

    pub fn eval(&self, x: f64) -> f64 {
        let t = (x - self.shift) / self.scale;
        self.coefficients.iter().rev().fold(0.0, |acc, c| acc * t + c)
    }

    /// The least root strictly between `lo` and `hi`, if one is found.
    pub fn least_root_between(&self, lo: f64, hi: f64) -> Option<f64> {
        if !(lo < hi) {
            return None;
        }
        let step = (hi - lo) / SCAN_STEPS as f64;

        let mut a = lo;
        let mut fa = self.eval(a);
        for i in 1..=SCAN_STEPS {
            let b = match i == SCAN_STEPS {
                true => hi,
                false => lo + step * i as f64,
            };
            let fb = self.eval(b);
            if !fb.is_finite() {
                return None;
            }

            if fb == 0.0 && b < hi {
                return Some(b);
            }
            if fa.signum() != fb.signum() && fa != 0.0 {
                return Some(self.bisect(a, b, fa));
            }

            a = b;
            fa = fb;
        }
        None
    }

    fn bisect(&self, mut a: f64, mut b: f64, mut fa: f64) -> f64 {
        for _ in 0..BISECTIONS {
            let mid = (a + b) / 2.0;
            let fm = self.eval(mid);
            if fm == 0.0 {
                return mid;
            }
            match fm.signum() == fa.signum() {
                true => {
                    a = mid;
                    fa = fm;
                }
                false => b = mid,
            }
        }
        (a + b) / 2.0
    }
}

/// Solves an augmented system by Gaussian elimination with partial pivoting.
fn solve(mut matrix: Vec<Vec<f64>>) -> Option<Vec<f64>> {
    let n = matrix.len();

    for column in 0..n {
        let pivot = (column..n).max_by(|a, b| matrix[*a][column].abs().total_cmp(&matrix[*b][column].abs()))?;
        if matrix[pivot][column].abs() < SINGULAR {
            return None;
        }
        matrix.swap(column, pivot);

        for row in column + 1..n {
            let factor = matrix[row][column] / matrix[column][column];
            if factor == 0.0 {
                continue;
            }
            for k in column..=n {
                matrix[row][k] -= factor * matrix[column][k];
            }
        }
    }

    let mut solution = vec![0.0; n];
    for row in (0..n).rev() {
        let known: f64 = (row + 1..n).map(|k| matrix[row][k] * solution[k]).sum();
        solution[row] = (matrix[row][n] - known) / matrix[row][row];
    }

    match solution.iter().all(|c| c.is_finite()) {
        true => Some(solution),
        false => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line() {
        let xs = (1..=10).map(|x| x as f64).collect::<Vec<_>>();
        let ys = xs.iter().map(|x| 100.0 - 2.0 * x).collect::<Vec<_>>();
        let line = Polynomial::fit(&xs, &ys, 1).unwrap();

        assert!((line.eval(20.0) - 60.0).abs() < 1e-6);
        let root = line.least_root_between(10.0, 200.0).unwrap();
        assert!((root - 50.0).abs() < 1e-6);
        assert!(line.least_root_between(60.0, 200.0).is_none());
    }

    #[test]
    fn quadratic_least_root() {
        // (x - 30)(x - 70)
        let xs = (0..25).map(|x| x as f64 * 4.0).collect::<Vec<_>>();
        let ys = xs.iter().map(|x| (x - 30.0) * (x - 70.0)).collect::<Vec<_>>();
        let quadratic = Polynomial::fit(&xs, &ys, 2).unwrap();

        let root = quadratic.least_root_between(1.0, 100.0).unwrap();
        assert!((root - 30.0).abs() < 1e-6);
        let root = quadratic.least_root_between(31.0, 100.0).unwrap();
        assert!((root - 70.0).abs() < 1e-6);
    }

    #[test]
    fn too_few_points() {
        assert!(Polynomial::fit(&[1.0, 2.0], &[1.0, 2.0], 2).is_none());
        assert!(Polynomial::fit(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0], 2).is_none());
    }

    #[test]
    fn high_degree_on_noisy_line() {
        let xs = (1..=20).map(|x| x as f64).collect::<Vec<_>>();
        let ys = xs
            .iter()
            .enumerate()
            .map(|(i, x)| 500.0 - 5.0 * x + if i % 2 == 0 { 0.5 } else { -0.5 })
            .collect::<Vec<_>>();
        assert!(Polynomial::fit(&xs, &ys, 10).is_some());
    }
}
