/*!
Wireless sensor networks, and their encoding as constraints.

A network is a collection of sensors with limited energy, and a collection of points which should be observed.
A schedule of lifetime `L` decides, for each of `L` time slots, which sensors are active, such that:
1. No sensor exceeds its budget over the lifetime.
2. At each slot, each point is covered by at least `k` active sensors.
3. With a continuous activity cap `e`, no sensor is active for more than `e` of any `e + 1` consecutive slots.
4. With a localized activity cap `m`, the same holds with `m` in place of `e`, though only for sensors observing some critical point.

Two kinds of network are supported:
- [SingleLevel] networks, where a sensor is simply on or off, and has a fixed range.
- [MultiLevel] networks, where an active sensor runs at one of a number of power levels, each with a range.

The [Network] trait is the interface used by a [search](crate::search) for the greatest lifetime with a schedule.
Networks are read from JSON files by [load].
*/

use std::{ops::Range, str::FromStr};

use crate::{
    backends::Backend,
    structures::schedule::{Schedule, SchedulingVars},
    types::err::{self, ErrorKind},
};

mod input;
pub use input::{load, parse};

mod multi_level;
pub use multi_level::{Level, MultiLevel, PoweredSensor};

mod single_level;
pub use single_level::{Point, Sensor, SingleLevel};

/// The interface to a network, as used by a search.
pub trait Network: Send + Sync {
    fn limits(&self) -> &Limits;

    /// An upper bound on the lifetime of any schedule, if one is known.
    fn upper_bound(&self) -> Option<usize>;

    /// The budget of the network left unused by `schedule`.
    fn resource_used(&self, schedule: &Schedule) -> i64;

    /// Encodes the existence of a schedule of `lifetime` slots to `backend`.
    ///
    /// The limits of the network are checked before any variable or constraint is given to the backend.
    fn encode(&self, lifetime: usize, backend: &mut dyn Backend) -> Result<SchedulingVars, ErrorKind>;

    /// Checks `schedule` is a schedule of `lifetime` slots.
    fn verify(&self, schedule: &Schedule, lifetime: usize) -> Result<(), Violation>;

    /// A table of the slots at which each sensor is active.
    fn display(&self, schedule: &Schedule) -> String;
}

/// Limits on coverage and activity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
    /// The number of active sensors required to cover each point, `k`.
    pub coverage: usize,

    /// The continuous activity cap, `e`.
    pub continuous: Option<usize>,

    /// The localized activity cap, `m`.
    pub localized: Option<usize>,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            coverage: 1,
            continuous: None,
            localized: None,
        }
    }
}

impl Limits {
    pub fn validate(&self) -> Result<(), err::ConfigurationError> {
        if self.coverage < 1 {
            return Err(err::ConfigurationError::Coverage(self.coverage));
        }
        if let Some(e) = self.continuous {
            if e < 1 {
                return Err(err::ConfigurationError::ContinuousCap(e));
            }
        }
        if let Some(m) = self.localized {
            if m < 1 {
                return Err(err::ConfigurationError::LocalizedCap(m));
            }
            if let Some(e) = self.continuous {
                if m >= e {
                    return Err(err::ConfigurationError::CapOrder {
                        localized: m,
                        continuous: e,
                    });
                }
            }
        }
        Ok(())
    }
}

/// The windows of `cap + 1` consecutive slots within `lifetime` slots.
///
/// No window extends past the lifetime.
pub fn windows(lifetime: usize, cap: usize) -> impl Iterator<Item = Range<usize>> {
    (0..lifetime.saturating_sub(cap)).map(move |start| start..start + cap + 1)
}

/// A constraint violated by a schedule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Violation {
    /// The schedule does not have the shape of the network and lifetime.
    Shape { sensors: usize, slots: usize },

    /// A sensor draws more than its budget.
    Budget { sensor: usize, used: u64, budget: u64 },

    /// A point is covered by too few sensors at some slot.
    Coverage {
        point: usize,
        slot: usize,
        covering: usize,
    },

    /// A sensor is active too often in the window starting at `start`.
    Continuous { sensor: usize, start: usize },

    /// A sensor observing a critical point is active too often in the window starting at `start`.
    Localized { sensor: usize, start: usize },
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shape { sensors, slots } => {
                write!(f, "expected a schedule of {sensors} sensors over {slots} slots")
            }
            Self::Budget {
                sensor,
                used,
                budget,
            } => write!(f, "sensor #{sensor} draws {used} of a budget of {budget}"),
            Self::Coverage {
                point,
                slot,
                covering,
            } => write!(f, "point #{point} is covered by {covering} sensors at slot {slot}"),
            Self::Continuous { sensor, start } => {
                write!(f, "continuous activity cap exceeded by sensor #{sensor} from slot {start}")
            }
            Self::Localized { sensor, start } => {
                write!(f, "localized activity cap exceeded by sensor #{sensor} from slot {start}")
            }
        }
    }
}

/// The kind of network described by an input file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelKind {
    /// Sensors are on or off, with a fixed range.
    Single,

    /// Sensors run at one of a number of power levels.
    Multi,
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single => write!(f, "single"),
            Self::Multi => write!(f, "multi"),
        }
    }
}

impl FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single" | "1" => Ok(Self::Single),
            "multi" | "2" => Ok(Self::Multi),
            unknown => Err(format!("unknown model '{unknown}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_bounds() {
        assert_eq!(windows(6, 2).collect::<Vec<_>>(), vec![0..3, 1..4, 2..5, 3..6]);
        assert_eq!(windows(3, 2).collect::<Vec<_>>(), vec![0..3]);
        assert_eq!(windows(2, 2).count(), 0);
    }

    #[test]
    fn limit_validation() {
        let mut limits = Limits::default();
        assert!(limits.validate().is_ok());

        limits.coverage = 0;
        assert_eq!(limits.validate(), Err(err::ConfigurationError::Coverage(0)));

        limits.coverage = 1;
        limits.continuous = Some(0);
        assert_eq!(limits.validate(), Err(err::ConfigurationError::ContinuousCap(0)));

        limits.continuous = Some(2);
        limits.localized = Some(2);
        assert_eq!(
            limits.validate(),
            Err(err::ConfigurationError::CapOrder {
                localized: 2,
                continuous: 2
            })
        );

        limits.localized = Some(1);
        assert!(limits.validate().is_ok());

        limits.continuous = None;
        limits.localized = Some(0);
        assert_eq!(limits.validate(), Err(err::ConfigurationError::LocalizedCap(0)));
    }
}
