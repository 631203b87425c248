use serde::{Deserialize, Serialize};

use crate::{
    backends::Backend,
    misc::log::targets::{self},
    network::{windows, Limits, Network, Point, Violation},
    structures::{
        constraint::{Constraint, Relation},
        schedule::{Schedule, SchedulingVars},
    },
    types::err::{self, ErrorKind},
};

/// A sensor with a total power budget.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoweredSensor {
    pub x: f64,
    pub y: f64,
    pub power: u64,
}

/// A level at which an active sensor runs, drawing `power` each slot to cover points within `range`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    pub power: u64,
    pub range: u64,
}

/// A network of sensors which run at one of a number of power levels.
///
/// At each slot a sensor is in exactly one state: idle, or active at some level.
/// Whether a sensor covers a point at a slot is fixed by a helper variable, equivalent to the range of the chosen level reaching the point.
pub struct MultiLevel {
    limits: Limits,
    sensors: Vec<PoweredSensor>,

    /// Levels, by increasing power.
    levels: Vec<Level>,

    /// Whether each point is critical.
    critical: Vec<bool>,

    /// The distance from each sensor to each point, rounded up.
    distances: Vec<Vec<u64>>,
}

impl MultiLevel {
    pub fn new(
        sensors: Vec<PoweredSensor>,
        points: &[Point],
        mut levels: Vec<Level>,
        limits: Limits,
    ) -> Result<Self, ErrorKind> {
        limits.validate()?;
        if levels.is_empty() {
            return Err(err::ConfigurationError::NoLevels.into());
        }
        if levels.iter().any(|level| level.power == 0) {
            return Err(err::ConfigurationError::ZeroPowerLevel.into());
        }
        levels.sort_by_key(|level| level.power);

        let distances = sensors
            .iter()
            .map(|s| points.iter().map(|p| p.distance_to(s.x, s.y).ceil() as u64).collect())
            .collect();

        Ok(MultiLevel {
            limits,
            sensors,
            levels,
            critical: points.iter().map(|p| p.critical).collect(),
            distances,
        })
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    fn points(&self) -> usize {
        self.critical.len()
    }

    /// Whether `sensor` covers `point` at `slot` of a schedule.
    fn covers(&self, schedule: &Schedule, sensor: usize, point: usize, slot: usize) -> bool {
        match schedule.level(sensor, slot) {
            Some(level) => self.levels[level].range >= std::cmp::max(1, self.distances[sensor][point]),
            None => false,
        }
    }
}

impl Network for MultiLevel {
    fn limits(&self) -> &Limits {
        &self.limits
    }

    fn upper_bound(&self) -> Option<usize> {
        let least = self.levels.first()?.power;
        let slots: u64 = self.sensors.iter().map(|s| s.power.div_ceil(least)).sum();
        let k = self.limits.coverage as u64;
        match k {
            0 => None,
            _ => Some(slots.div_ceil(k) as usize),
        }
    }

    fn resource_used(&self, schedule: &Schedule) -> i64 {
        let total: u64 = self.sensors.iter().map(|s| s.power).sum();
        let mut drawn = 0;
        for sensor in 0..schedule.sensors() {
            for slot in 0..schedule.slots() {
                if let Some(level) = schedule.level(sensor, slot) {
                    drawn += self.levels[level].power;
                }
            }
        }
        total as i64 - drawn as i64
    }

    fn encode(&self, lifetime: usize, backend: &mut dyn Backend) -> Result<SchedulingVars, ErrorKind> {
        self.limits.validate()?;

        let sensors = self.sensors.len();
        let points = self.points();
        let levels = self.levels.len();

        let lits = backend.generate_vars(sensors * lifetime * levels);
        let vars = SchedulingVars::new(sensors, lifetime, levels, lits)
            .ok_or(err::ConfigurationError::OutOfBounds("scheduling variables"))?;
        let idle = backend.generate_vars(sensors * lifetime);

        for sensor in 0..sensors {
            for slot in 0..lifetime {
                let mut states = vec![idle[sensor * lifetime + slot]];
                states.extend_from_slice(vars.levels_of(sensor, slot));
                backend.add_constraint(&Constraint::new(states.clone(), Relation::LessOrEqual, 1))?;
                backend.add_constraint(&Constraint::new(states, Relation::GreaterOrEqual, 1))?;
            }
        }

        let powers = self.levels.iter().map(|l| l.power).collect::<Vec<_>>();
        for (sensor, details) in self.sensors.iter().enumerate() {
            let mut lits = Vec::with_capacity(lifetime * levels);
            let mut weights = Vec::with_capacity(lifetime * levels);
            for slot in 0..lifetime {
                lits.extend_from_slice(vars.levels_of(sensor, slot));
                weights.extend_from_slice(&powers);
            }
            let budget = Constraint::weighted(lits, weights, Relation::LessOrEqual, details.power as i64);
            backend.add_constraint(&budget)?;
        }

        let ranges = self.levels.iter().map(|l| l.range).collect::<Vec<_>>();
        let helpers = backend.generate_vars(sensors * points * lifetime);
        let helper = |sensor: usize, point: usize, slot: usize| helpers[(sensor * points + point) * lifetime + slot];

        for sensor in 0..sensors {
            for point in 0..points {
                // An idle sensor covers nothing, not even a point at no distance.
                let distance = std::cmp::max(1, self.distances[sensor][point]) as i64;
                for slot in 0..lifetime {
                    let reach = Constraint::weighted(
                        vars.levels_of(sensor, slot).to_vec(),
                        ranges.clone(),
                        Relation::GreaterOrEqual,
                        distance,
                    )
                    .reified_by(helper(sensor, point, slot));
                    backend.add_equivalence(&reach)?;
                }
            }
        }

        for point in 0..points {
            for slot in 0..lifetime {
                let lits = (0..sensors).map(|s| helper(s, point, slot)).collect();
                let coverage = Constraint::new(lits, Relation::GreaterOrEqual, self.limits.coverage as i64);
                backend.add_constraint(&coverage)?;
            }
        }

        if let Some(e) = self.limits.continuous {
            for sensor in 0..sensors {
                for window in windows(lifetime, e) {
                    let lits = window
                        .flat_map(|t| vars.levels_of(sensor, t).to_vec())
                        .collect();
                    backend.add_constraint(&Constraint::new(lits, Relation::LessOrEqual, e as i64))?;
                }
            }
        }

        if let Some(m) = self.limits.localized {
            for sensor in 0..sensors {
                for point in (0..points).filter(|p| self.critical[*p]) {
                    for window in windows(lifetime, m) {
                        let lits = window.map(|t| helper(sensor, point, t)).collect();
                        backend.add_constraint(&Constraint::new(lits, Relation::LessOrEqual, m as i64))?;
                    }
                }
            }
        }

        log::debug!(target: targets::ENCODER,
            "Encoded {sensors} sensors at {levels} levels over {lifetime} slots");

        Ok(vars)
    }

    fn verify(&self, schedule: &Schedule, lifetime: usize) -> Result<(), Violation> {
        let sensors = self.sensors.len();
        let shape = Violation::Shape {
            sensors,
            slots: lifetime,
        };
        if schedule.sensors() != sensors || schedule.slots() != lifetime {
            return Err(shape);
        }
        for sensor in 0..sensors {
            for slot in 0..lifetime {
                if schedule.level(sensor, slot).is_some_and(|l| l >= self.levels.len()) {
                    return Err(shape);
                }
            }
        }

        for (sensor, details) in self.sensors.iter().enumerate() {
            let used: u64 = (0..lifetime)
                .filter_map(|t| schedule.level(sensor, t))
                .map(|l| self.levels[l].power)
                .sum();
            log::trace!(target: targets::VERIFY, "Budget of sensor #{sensor}: {used} <= {}", details.power);
            if used > details.power {
                return Err(Violation::Budget {
                    sensor,
                    used,
                    budget: details.power,
                });
            }
        }

        for point in 0..self.points() {
            for slot in 0..lifetime {
                let covering = (0..sensors)
                    .filter(|s| self.covers(schedule, *s, point, slot))
                    .count();
                if covering < self.limits.coverage {
                    return Err(Violation::Coverage {
                        point,
                        slot,
                        covering,
                    });
                }
            }
        }

        if let Some(e) = self.limits.continuous {
            for sensor in 0..sensors {
                for window in windows(lifetime, e) {
                    let start = window.start;
                    if window.filter(|t| schedule.is_on(sensor, *t)).count() > e {
                        return Err(Violation::Continuous { sensor, start });
                    }
                }
            }
        }

        if let Some(m) = self.limits.localized {
            for sensor in 0..sensors {
                for point in (0..self.points()).filter(|p| self.critical[*p]) {
                    for window in windows(lifetime, m) {
                        let start = window.start;
                        let active = window
                            .filter(|t| self.covers(schedule, sensor, point, *t))
                            .count();
                        if active > m {
                            return Err(Violation::Localized { sensor, start });
                        }
                    }
                }
            }
        }

        Ok(())
    }

    fn display(&self, schedule: &Schedule) -> String {
        let mut table = String::default();
        for sensor in 0..schedule.sensors() {
            table.push_str(&format!("Sensor #{sensor}:\t"));
            for slot in 0..schedule.slots() {
                match schedule.level(sensor, slot) {
                    Some(level) => table.push_str(&format!("{}@{}\t", slot + 1, level + 1)),
                    None => table.push('\t'),
                }
            }
            table.push('\n');
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network(limits: Limits) -> MultiLevel {
        let sensors = vec![
            PoweredSensor {
                x: 0.0,
                y: 0.0,
                power: 6,
            },
            PoweredSensor {
                x: 4.0,
                y: 0.0,
                power: 4,
            },
        ];
        let points = [
            Point {
                x: 2.0,
                y: 0.0,
                critical: false,
            },
            Point {
                x: 0.0,
                y: 2.5,
                critical: true,
            },
        ];
        let levels = vec![Level { power: 2, range: 5 }, Level { power: 1, range: 2 }];
        MultiLevel::new(sensors, &points, levels, limits).unwrap()
    }

    #[test]
    fn levels_sorted_and_bounds() {
        let network = network(Limits::default());
        assert_eq!(network.levels()[0], Level { power: 1, range: 2 });
        assert_eq!(network.distances, vec![vec![2, 3], vec![2, 5]]);
        assert_eq!(network.upper_bound(), Some(10));
    }

    #[test]
    fn verification() {
        let network = network(Limits::default());
        let mut schedule = Schedule::new(2, 2);
        schedule.set(0, 0, Some(1));
        schedule.set(0, 1, Some(1));
        assert_eq!(network.verify(&schedule, 2), Ok(()));
        assert_eq!(network.resource_used(&schedule), 6);

        schedule.set(0, 1, Some(0));
        assert_eq!(
            network.verify(&schedule, 2),
            Err(Violation::Coverage {
                point: 1,
                slot: 1,
                covering: 0
            })
        );
        schedule.set(1, 1, Some(1));
        assert!(network.verify(&schedule, 2).is_ok());

        let mut greedy = Schedule::new(2, 4);
        for slot in 0..4 {
            greedy.set(0, slot, Some(1));
        }
        assert!(matches!(network.verify(&greedy, 4), Err(Violation::Budget { sensor: 0, .. })));
    }

    #[test]
    fn localized_over_critical_coverage() {
        let limits = Limits {
            coverage: 1,
            continuous: None,
            localized: Some(1),
        };
        let network = network(limits);
        let mut schedule = Schedule::new(2, 2);
        schedule.set(0, 0, Some(1));
        schedule.set(0, 1, Some(1));
        assert_eq!(
            network.verify(&schedule, 2),
            Err(Violation::Localized { sensor: 0, start: 0 })
        );
    }

    #[test]
    fn no_levels() {
        let result = MultiLevel::new(Vec::default(), &[], Vec::default(), Limits::default());
        assert!(matches!(
            result,
            Err(ErrorKind::Configuration(err::ConfigurationError::NoLevels))
        ));
    }
}
