//! Seeded random number generation
//!
//! Every sampling routine in the crate draws from a thread-local generator so
//! that a single call to [`seed`] makes a run reproducible.

use std::cell::RefCell;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use crate::config::Config;

thread_local! {
    static GENERATOR: RefCell<StdRng> = RefCell::new(StdRng::seed_from_u64(Config::default().seed));
}

/// Reseed the generator of the current thread
pub fn seed(seed: u64) {
    debug!(seed, "reseeding generator");
    GENERATOR.with(|g| *g.borrow_mut() = StdRng::seed_from_u64(seed));
}

/// Run `f` with exclusive access to the current thread's generator
pub fn with_rng<T>(f: impl FnOnce(&mut StdRng) -> T) -> T {
    GENERATOR.with(|g| f(&mut g.borrow_mut()))
}
