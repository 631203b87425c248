use serde::{Deserialize, Serialize};

use crate::{
    backends::Backend,
    misc::log::targets::{self},
    network::{windows, Limits, Network, Violation},
    structures::{
        constraint::{Constraint, Relation},
        schedule::{Schedule, SchedulingVars},
    },
    types::err::{self, ErrorKind},
};

/// The energy available to a sensor, in the units of [consumption].
pub const MAX_ENERGY: f64 = 500.0;

/// The power drawn by an active sensor of the given range, for the ranges of known hardware.
pub fn consumption(range: u32) -> Option<f64> {
    match range {
        120 => Some(17.4),
        109 => Some(16.5),
        92 => Some(15.2),
        75 => Some(13.9),
        58 => Some(12.5),
        41 => Some(11.2),
        25 => Some(9.9),
        7 => Some(8.5),
        _ => None,
    }
}

/// A sensor with a fixed range.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub x: f64,
    pub y: f64,
    pub range: u32,

    /// The number of slots the sensor may be active, derived from the range if absent.
    #[serde(default)]
    pub budget: Option<u64>,
}

impl Sensor {
    pub fn budget(&self) -> Result<u64, err::ConfigurationError> {
        match self.budget {
            Some(budget) => Ok(budget),
            None => match consumption(self.range) {
                Some(power) => Ok((MAX_ENERGY / power).floor() as u64),
                None => Err(err::ConfigurationError::UnknownRange(self.range)),
            },
        }
    }
}

/// A point to be observed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,

    #[serde(default)]
    pub critical: bool,
}

impl Point {
    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        ((self.x - x).powi(2) + (self.y - y).powi(2)).sqrt()
    }
}

/// A network of sensors which are either on or off.
pub struct SingleLevel {
    limits: Limits,
    budgets: Vec<u64>,

    /// The sensors covering each point.
    covering: Vec<Vec<usize>>,

    /// Whether each sensor covers some critical point.
    critical: Vec<bool>,
}

impl SingleLevel {
    pub fn new(sensors: &[Sensor], points: &[Point], limits: Limits) -> Result<Self, ErrorKind> {
        limits.validate()?;

        let budgets = sensors
            .iter()
            .map(|s| s.budget())
            .collect::<Result<Vec<_>, _>>()?;

        let covering: Vec<Vec<usize>> = points
            .iter()
            .map(|p| {
                (0..sensors.len())
                    .filter(|i| p.distance_to(sensors[*i].x, sensors[*i].y) <= sensors[*i].range as f64)
                    .collect()
            })
            .collect();

        let mut critical = vec![false; sensors.len()];
        for (point, covering) in points.iter().zip(&covering) {
            if point.critical {
                for sensor in covering {
                    critical[*sensor] = true;
                }
            }
        }

        Ok(SingleLevel {
            limits,
            budgets,
            covering,
            critical,
        })
    }

    /// The sensors covering each point.
    pub fn covering(&self) -> &[Vec<usize>] {
        &self.covering
    }
}

impl Network for SingleLevel {
    fn limits(&self) -> &Limits {
        &self.limits
    }

    fn upper_bound(&self) -> Option<usize> {
        let total: u64 = self.budgets.iter().sum();
        let k = self.limits.coverage as u64;
        total.checked_add(k.checked_sub(1)?)?.checked_div(k).map(|b| b as usize)
    }

    fn resource_used(&self, schedule: &Schedule) -> i64 {
        let total: u64 = self.budgets.iter().sum();
        total as i64 - schedule.on_count() as i64
    }

    fn encode(&self, lifetime: usize, backend: &mut dyn Backend) -> Result<SchedulingVars, ErrorKind> {
        self.limits.validate()?;

        let sensors = self.budgets.len();
        let lits = backend.generate_vars(sensors * lifetime);
        let vars = SchedulingVars::new(sensors, lifetime, 1, lits)
            .ok_or(err::ConfigurationError::OutOfBounds("scheduling variables"))?;

        let row = |sensor: usize, slots: std::ops::Range<usize>| {
            slots.map(|t| vars.get(sensor, t, 0)).collect::<Vec<_>>()
        };

        for (sensor, budget) in self.budgets.iter().enumerate() {
            let budget = Constraint::new(row(sensor, 0..lifetime), Relation::LessOrEqual, *budget as i64);
            backend.add_constraint(&budget)?;
        }

        for covering in &self.covering {
            for slot in 0..lifetime {
                let lits = covering.iter().map(|s| vars.get(*s, slot, 0)).collect();
                let coverage = Constraint::new(lits, Relation::GreaterOrEqual, self.limits.coverage as i64);
                backend.add_constraint(&coverage)?;
            }
        }

        if let Some(e) = self.limits.continuous {
            for sensor in 0..sensors {
                for window in windows(lifetime, e) {
                    let cap = Constraint::new(row(sensor, window), Relation::LessOrEqual, e as i64);
                    backend.add_constraint(&cap)?;
                }
            }
        }

        if let Some(m) = self.limits.localized {
            for sensor in (0..sensors).filter(|s| self.critical[*s]) {
                for window in windows(lifetime, m) {
                    let cap = Constraint::new(row(sensor, window), Relation::LessOrEqual, m as i64);
                    backend.add_constraint(&cap)?;
                }
            }
        }

        log::debug!(target: targets::ENCODER, "Encoded {sensors} sensors over {lifetime} slots");

        Ok(vars)
    }

    fn verify(&self, schedule: &Schedule, lifetime: usize) -> Result<(), Violation> {
        let sensors = self.budgets.len();
        if schedule.sensors() != sensors || schedule.slots() != lifetime {
            return Err(Violation::Shape {
                sensors,
                slots: lifetime,
            });
        }

        for (sensor, budget) in self.budgets.iter().enumerate() {
            let used = (0..lifetime).filter(|t| schedule.is_on(sensor, *t)).count() as u64;
            log::trace!(target: targets::VERIFY, "Budget of sensor #{sensor}: {used} <= {budget}");
            if used > *budget {
                return Err(Violation::Budget {
                    sensor,
                    used,
                    budget: *budget,
                });
            }
        }

        for (point, covering) in self.covering.iter().enumerate() {
            for slot in 0..lifetime {
                let count = covering.iter().filter(|s| schedule.is_on(**s, slot)).count();
                if count < self.limits.coverage {
                    return Err(Violation::Coverage {
                        point,
                        slot,
                        covering: count,
                    });
                }
            }
        }

        let active = |sensor: usize, window: std::ops::Range<usize>| {
            window.filter(|t| schedule.is_on(sensor, *t)).count()
        };

        if let Some(e) = self.limits.continuous {
            for sensor in 0..sensors {
                for window in windows(lifetime, e) {
                    let start = window.start;
                    if active(sensor, window) > e {
                        return Err(Violation::Continuous { sensor, start });
                    }
                }
            }
        }

        if let Some(m) = self.limits.localized {
            for sensor in (0..sensors).filter(|s| self.critical[*s]) {
                for window in windows(lifetime, m) {
                    let start = window.start;
                    if active(sensor, window) > m {
                        return Err(Violation::Localized { sensor, start });
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
                match schedule.is_on(sensor, slot) {
                    true => table.push_str(&format!("{}\t", slot + 1)),
                    false => table.push('\t'),
                }
            }
            table.push('\n');
        }
        table
    }
}
