use crate::{search::Driver, types::err::ErrorKind};

/// Asks about each lifetime from `1` upward, returning the lifetime before the first infeasible lifetime.
///
/// A feasible upper bound is returned without asking about the lifetime after.
pub(super) fn search(driver: &mut Driver) -> Result<usize, ErrorKind> {
    let upper = driver.upper_bound();
    let mut lifetime = 1;
    loop {
        if upper.is_some_and(|upper| lifetime > upper) {
            return Ok(lifetime - 1);
        }
        if !driver.feasible(lifetime)? {
            return Ok(lifetime - 1);
        }
        lifetime += 1;
    }
}
