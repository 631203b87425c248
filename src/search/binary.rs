/*!
Binary search over `[1, upper]`.

Without a known upper bound, lifetimes `1, 2, 4, …` are asked about until one is infeasible, and the search continues between the last feasible and first infeasible lifetime.
*/

use crate::{misc::log::targets, search::Driver, types::err::ErrorKind};

pub(super) fn search(driver: &mut Driver) -> Result<usize, ErrorKind> {
    let (mut lower, mut upper) = match driver.upper_bound() {
        Some(upper) => (1, upper),
        None => bracket(driver)?,
    };

    while lower < upper {
        let mid = (lower + upper) / 2;
        match driver.feasible(mid)? {
            true => lower = mid + 1,
            false => upper = mid - 1,
        }
    }

    if lower > upper {
        return Ok(upper);
    }

    // The interval has collapsed to a single lifetime.
    let feasible = match driver.solved.get(lower) {
        Some(feasible) => feasible,
        None => driver.feasible(lower)?,
    };
    match feasible {
        true => Ok(lower),
        false => Ok(lower - 1),
    }
}

/// Doubles a lifetime until infeasible, returning the interval which must contain the greatest feasible lifetime.
fn bracket(driver: &mut Driver) -> Result<(usize, usize), ErrorKind> {
    let mut lifetime = 1;
    while driver.feasible(lifetime)? {
        lifetime <<= 1;
    }
    let interval = (lifetime / 2 + 1, lifetime - 1);
    log::debug!(target: targets::SEARCH, "Bracketed by {interval:?}");
    Ok(interval)
}
