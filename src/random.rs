//! Random number generation for distribution sampling.
//!
//! # Reproducibility
//!
//! For reproducible experiments, use [`create_rng`] with a fixed seed.
//! The underlying algorithm (SmallRng) is deterministic for a given seed
//! on the same platform.

use rand::distr::Open01;
use rand::{Rng, RngCore};

/// Creates a fast, seeded random number generator.
///
/// Uses `SmallRng` (Xoshiro256++) for high performance.
/// The sequence is deterministic for a given seed on the same platform.
///
/// # Examples
/// ```
/// use u_cubature::random::create_rng;
/// use rand::Rng;
/// let mut rng = create_rng(42);
/// let x: f64 = rng.random();
/// assert!(x >= 0.0 && x < 1.0);
/// ```
pub fn create_rng(seed: u64) -> rand::rngs::SmallRng {
    use rand::SeedableRng;
    rand::rngs::SmallRng::seed_from_u64(seed)
}

/// Draws a uniform deviate on the open interval `(0, 1)`.
///
/// Inverse-CDF sampling needs the open interval so that unbounded
/// quantile functions never see `0` or `1`.
pub fn open_unit(rng: &mut dyn RngCore) -> f64 {
    rng.sample(Open01)
}

// ============================================================================
// Tests
// ============================================================================
