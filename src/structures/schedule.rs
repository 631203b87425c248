/*!
Schedules, and the literals which encode them.

A schedule fixes, for each sensor and each time slot, whether the sensor is active and, when sensors have power levels, at which level.

[SchedulingVars] are the literals of a schedule in an encoding, created fresh for each query.
[Schedule] is a schedule read back from a model, in the same shape.
*/

use crate::structures::literal::{Lit, Literal};

/// A literal for each sensor, slot and level.
///
/// Single-level networks have exactly one level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchedulingVars {
    sensors: usize,
    slots: usize,
    levels: usize,
    lits: Vec<Lit>,
}

impl SchedulingVars {
    /// Literals laid out by sensor, then slot, then level.
    ///
    /// Returns None if the count of literals does not match the dimensions.
    pub fn new(sensors: usize, slots: usize, levels: usize, lits: Vec<Lit>) -> Option<Self> {
        match lits.len() == sensors * slots * levels {
            true => Some(SchedulingVars {
                sensors,
                slots,
                levels,
                lits,
            }),
            false => None,
        }
    }

    pub fn get(&self, sensor: usize, slot: usize, level: usize) -> Lit {
        self.lits[(sensor * self.slots + slot) * self.levels + level]
    }

    /// Literals for each level of a sensor at a slot.
    pub fn levels_of(&self, sensor: usize, slot: usize) -> &[Lit] {
        let start = (sensor * self.slots + slot) * self.levels;
        &self.lits[start..start + self.levels]
    }

    /// Every literal, in layout order.
    pub fn all(&self) -> &[Lit] {
        &self.lits
    }

    pub fn sensors(&self) -> usize {
        self.sensors
    }

    pub fn slots(&self) -> usize {
        self.slots
    }

    /// Reads a schedule from a valuation indexed by variable.
    ///
    /// Where more than one level holds, the first is taken.
    pub fn read(&self, valuation: &[bool]) -> Schedule {
        let mut schedule = Schedule::new(self.sensors, self.slots);
        for sensor in 0..self.sensors {
            for slot in 0..self.slots {
                let level = self
                    .levels_of(sensor, slot)
                    .iter()
                    .position(|l| l.holds_on(valuation));
                schedule.set(sensor, slot, level);
            }
        }
        schedule
    }
}

/// For each sensor and slot, the level at which the sensor is active, if any.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Schedule {
    slots: usize,
    states: Vec<Vec<Option<usize>>>,
}

impl Schedule {
    /// A schedule with every sensor inactive.
    pub fn new(sensors: usize, slots: usize) -> Self {
        Schedule {
            slots,
            states: vec![vec![None; slots]; sensors],
        }
    }

    /// A single-level schedule, from rows of activity.
    pub fn from_activity(rows: &[Vec<bool>]) -> Self {
        let slots = rows.first().map(|row| row.len()).unwrap_or(0);
        let states = rows
            .iter()
            .map(|row| row.iter().map(|on| on.then_some(0)).collect())
            .collect();
        Schedule { slots, states }
    }

    pub fn sensors(&self) -> usize {
        self.states.len()
    }

    pub fn slots(&self) -> usize {
        self.slots
    }

    pub fn level(&self, sensor: usize, slot: usize) -> Option<usize> {
        self.states[sensor][slot]
    }

    pub fn is_on(&self, sensor: usize, slot: usize) -> bool {
        self.states[sensor][slot].is_some()
    }

    pub fn set(&mut self, sensor: usize, slot: usize, level: Option<usize>) {
        self.states[sensor][slot] = level;
    }

    /// The count of active (sensor, slot) pairs.
    pub fn on_count(&self) -> usize {
        self.states.iter().flatten().filter(|s| s.is_some()).count()
    }
}

impl std::fmt::Display for Schedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (sensor, row) in self.states.iter().enumerate() {
            let row = row
                .iter()
                .map(|state| match state {
                    None => "0".to_string(),
                    Some(level) => (level + 1).to_string(),
                })
                .collect::<Vec<_>>();
            writeln!(f, "s{sensor}: {}", row.join(" "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout() {
        let vars = SchedulingVars::new(2, 3, 2, (1..=12).collect()).unwrap();
        assert_eq!(vars.get(0, 0, 0), 1);
        assert_eq!(vars.get(0, 1, 1), 4);
        assert_eq!(vars.get(1, 2, 1), 12);
        assert_eq!(vars.levels_of(1, 0), &[7, 8]);
        assert!(SchedulingVars::new(2, 3, 2, vec![1]).is_none());
    }

    #[test]
    fn read_back() {
        let vars = SchedulingVars::new(1, 2, 2, vec![1, 2, 3, 4]).unwrap();
        let valuation = vec![false, false, true, false, false];
        let schedule = vars.read(&valuation);
        assert_eq!(schedule.level(0, 0), Some(1));
        assert_eq!(schedule.level(0, 1), None);
        assert_eq!(schedule.on_count(), 1);
        assert_eq!(schedule.to_string(), "s0: 2 0\n");
    }
}
