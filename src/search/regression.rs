/*!
Regression guided search.

The search keeps the greatest lifetime known to be feasible and the least known to be infeasible, and every lifetime asked about lies strictly between the two.
So, the search ends once the two are adjacent, whatever the quality of the regression.

Each feasible lifetime gives a sample: the lifetime, paired with the resource left by the schedule found.
Once enough samples are known a polynomial is fitted, and the least root between the current lifetime and the least infeasible lifetime estimates where the resource runs out.
The next lifetime then hops toward the root:
- 80% of the distance, when the current lifetime is below 60% of the root.
- 50% of the distance, when below 80% of the root.
- `2`, otherwise.

Hops are at least `2`, and a hop of `2` is also taken when no fit or root is found.
After an infeasible lifetime the search retreats to the midpoint of the greatest feasible lifetime and the infeasible lifetime.
*/

use crate::{
    misc::log::targets,
    search::{polynomial::Polynomial, Driver, Probe},
    types::err::ErrorKind,
};

/// The least hop.
const HOP: usize = 2;

#[derive(Default)]
struct Samples {
    lifetimes: Vec<f64>,
    resources: Vec<f64>,
}

impl Samples {
    fn push(&mut self, lifetime: usize, resource: Option<i64>) {
        if let Some(resource) = resource {
            log::info!(target: targets::SEARCH, "resource = {resource}");
            self.lifetimes.push(lifetime as f64);
            self.resources.push(resource as f64);
        }
    }

    fn len(&self) -> usize {
        self.lifetimes.len()
    }
}

pub(super) fn search(driver: &mut Driver, degree: usize, min_points: usize) -> Result<usize, ErrorKind> {
    let mut samples = Samples::default();
    let mut maximum_sat = 0;

    let mut minimum_unsat = match driver.upper_bound() {
        Some(upper) => upper + 1,
        None => {
            let mut lifetime = 1;
            loop {
                match driver.ask(lifetime, true)? {
                    Probe::Feasible { resource } => {
                        maximum_sat = lifetime;
                        samples.push(lifetime, resource);
                        lifetime <<= 1;
                    }
                    _ => break lifetime,
                }
            }
        }
    };

    let required = std::cmp::max(degree + 1, min_points);
    let mut lifetime = maximum_sat + 1;

    loop {
        if maximum_sat + 1 >= minimum_unsat {
            return Ok(maximum_sat);
        }

        if lifetime <= maximum_sat {
            lifetime = maximum_sat + 1;
        } else if lifetime >= minimum_unsat {
            lifetime = minimum_unsat - 1;
        }

        match driver.ask(lifetime, true)? {
            Probe::Feasible { resource } => {
                maximum_sat = lifetime;
                samples.push(lifetime, resource);

                if samples.len() < required {
                    lifetime += HOP;
                    continue;
                }

                let root = Polynomial::fit(&samples.lifetimes, &samples.resources, degree)
                    .and_then(|p| p.least_root_between(lifetime as f64, minimum_unsat as f64));

                match root {
                    Some(root) => {
                        let next = hop(lifetime, root);
                        log::info!(target: targets::SEARCH, "intersection: {root:.3} -> {next}");
                        lifetime = next;
                    }
                    None => {
                        log::info!(target: targets::SEARCH, "No regression");
                        lifetime += HOP;
                    }
                }
            }

            _ => {
                minimum_unsat = std::cmp::min(minimum_unsat, lifetime);
                lifetime = (maximum_sat + lifetime) / 2;
            }
        }
    }
}

/// The next lifetime, hopping from `lifetime` toward `root`.
fn hop(lifetime: usize, root: f64) -> usize {
    let current = lifetime as f64;
    let distance = root - current;
    let jump = if current < root * 0.6 {
        (distance * 0.8) as usize
    } else if current < root * 0.8 {
        (distance * 0.5) as usize
    } else {
        HOP
    };
    lifetime + std::cmp::max(HOP, jump)
}
