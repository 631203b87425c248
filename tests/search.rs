use rand::Rng;

use wsn_lifetime::{
    reports::Outcome,
    search::{self, Oracle, Probe, Strategy},
    types::err::ErrorKind,
};

/// Feasible exactly up to `optimum`, with a resource left which decreases with the lifetime.
struct Monotone {
    optimum: usize,
    upper: Option<usize>,

    /// Resource per slot of lifetime.
    rate: i64,

    /// A deterministic wobble added to the resource.
    wobble: i64,
}

impl Monotone {
    fn exact(optimum: usize, upper: Option<usize>) -> Self {
        Monotone {
            optimum,
            upper,
            rate: 1,
            wobble: 0,
        }
    }
}

impl Oracle for Monotone {
    fn upper_bound(&self) -> Option<usize> {
        self.upper
    }

    fn probe(&mut self, lifetime: usize, want_resource: bool) -> Result<Probe, ErrorKind> {
        assert!(lifetime >= 1);
        if let Some(upper) = self.upper {
            assert!(lifetime <= upper, "asked about {lifetime}, above the upper bound {upper}");
        }

        match lifetime <= self.optimum {
            true => {
                let left = (self.optimum - lifetime) as i64 * self.rate;
                let wobble = match lifetime % 3 {
                    0 => self.wobble,
                    1 => -self.wobble,
                    _ => 0,
                };
                Ok(Probe::Feasible {
                    resource: want_resource.then_some(left + wobble),
                })
            }
            false => Ok(Probe::Infeasible),
        }
    }
}

fn optimum(strategy: Strategy, oracle: &mut dyn Oracle) -> Outcome {
    search::search(strategy, oracle).expect("search failed").outcome
}

mod equivalence {
    use super::*;

    #[test]
    fn linear_binary() {
        for l in 1..=50 {
            for upper in [None, Some(50), Some(l)] {
                let linear = optimum(Strategy::Linear, &mut Monotone::exact(l, upper));
                let binary = optimum(Strategy::Binary, &mut Monotone::exact(l, upper));
                assert_eq!(linear, Outcome::Optimum(l));
                assert_eq!(linear, binary, "optimum {l}, upper bound {upper:?}");
            }
        }
    }

    #[test]
    fn regression_binary_random() {
        let mut rng = rand::rng();

        for _ in 0..32 {
            let l = rng.random_range(0..=400);
            let upper = match rng.random_bool(0.5) {
                true => Some(l + rng.random_range(0..=200)),
                false => None,
            };
            let rate = rng.random_range(1..=7);
            let wobble = rng.random_range(0..=25);

            let strategy = Strategy::Regression {
                degree: rng.random_range(1..=4),
                min_points: rng.random_range(2..=12),
            };

            let mut oracle = Monotone {
                optimum: l,
                upper,
                rate,
                wobble,
            };
            let regression = search::search(strategy, &mut oracle).expect("search failed");

            let binary = optimum(Strategy::Binary, &mut Monotone::exact(l, upper));
            assert_eq!(regression.outcome, binary, "{strategy:?}, optimum {l}, upper bound {upper:?}");

            // Each lifetime is asked about at most once.
            let mut asked = regression.solved.entries().iter().map(|(l, _)| *l).collect::<Vec<_>>();
            asked.sort_unstable();
            asked.dedup();
            assert_eq!(asked.len(), regression.probes);
        }
    }

    #[test]
    fn regression_default_parameters() {
        for l in [0, 1, 19, 20, 21, 250] {
            let strategy = "reglinear".parse::<Strategy>().unwrap();
            let mut oracle = Monotone {
                optimum: l,
                upper: Some(300),
                rate: 3,
                wobble: 1,
            };
            assert_eq!(optimum(strategy, &mut oracle), Outcome::Optimum(l));
        }
    }
}

mod resource {
    use super::*;

    /// Counts queries for a resource.
    struct Counting {
        inner: Monotone,
        with_resource: usize,
    }

    impl Oracle for Counting {
        fn upper_bound(&self) -> Option<usize> {
            self.inner.upper_bound()
        }

        fn probe(&mut self, lifetime: usize, want_resource: bool) -> Result<Probe, ErrorKind> {
            if want_resource {
                self.with_resource += 1;
            }
            self.inner.probe(lifetime, want_resource)
        }
    }

    #[test]
    fn only_regression_asks() {
        for strategy in [Strategy::Linear, Strategy::Binary] {
            let mut oracle = Counting {
                inner: Monotone::exact(12, Some(30)),
                with_resource: 0,
            };
            optimum(strategy, &mut oracle);
            assert_eq!(oracle.with_resource, 0);
        }

        let mut oracle = Counting {
            inner: Monotone::exact(12, Some(30)),
            with_resource: 0,
        };
        optimum(Strategy::Regression { degree: 1, min_points: 2 }, &mut oracle);
        assert!(oracle.with_resource > 0);
    }
}

mod undetermined {
    use super::*;

    /// Answers up to some number of queries, and then never again.
    struct Tired {
        answers: usize,
    }

    impl Oracle for Tired {
        fn upper_bound(&self) -> Option<usize> {
            None
        }

        fn probe(&mut self, _: usize, _: bool) -> Result<Probe, ErrorKind> {
            match self.answers.checked_sub(1) {
                Some(left) => {
                    self.answers = left;
                    Ok(Probe::Feasible { resource: Some(100) })
                }
                None => Ok(Probe::Undetermined),
            }
        }
    }

    #[test]
    fn timeout_is_not_unsat() {
        for strategy in [Strategy::Linear, Strategy::Binary, Strategy::Regression { degree: 1, min_points: 2 }] {
            let report = search::search(strategy, &mut Tired { answers: 3 }).unwrap();
            assert_eq!(report.outcome, Outcome::Timeout);
            assert_eq!(report.solved.len(), 3);
            assert!(report.solved.entries().iter().all(|(_, feasible)| *feasible));
        }
    }
}
