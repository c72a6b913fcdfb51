//! Random number generation context.
//!
//! Every stochastic function in this crate takes the generator as an explicit `&mut R` argument.
//! Only the outermost entry points fall back to a default generator, which is shared by all
//! entry points on the same thread and is reseeded whenever a seed is passed. Without a seed the
//! default generator simply continues its stream, so repeated calls differ.

use rand::SeedableRng;
use rand::rngs::StdRng;
use std::cell::RefCell;

use crate::errors::{Result, SimulationError};

pub type SimulationRng = StdRng;

thread_local! {
    static DEFAULT_RNG: RefCell<SimulationRng> = RefCell::new(SimulationRng::from_os_rng());
}

/// Create a fresh, seeded generator.
pub fn seeded_rng(seed: u64) -> SimulationRng {
    SimulationRng::seed_from_u64(seed)
}

/// Run `f` with the default generator, reseeding it first if `seed` is given.
///
/// Fails with a `SamplingError` when called from within `f` of an enclosing call, since the
/// default generator is then already borrowed.
pub fn with_default_rng<T>(
    seed: Option<u64>,
    f: impl FnOnce(&mut SimulationRng) -> Result<T>,
) -> Result<T> {
    DEFAULT_RNG.with(|cell| {
        let mut rng = cell.try_borrow_mut().map_err(|_| {
            SimulationError::SamplingError(
                "default generator is already in use, pass an explicit generator".to_string(),
            )
        })?;
        if let Some(seed) = seed {
            log::debug!("Reseeding default generator with {seed}.");
            *rng = seeded_rng(seed);
        }
        f(&mut rng)
    })
}
