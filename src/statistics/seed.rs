//! Counter-based seeding for reproducible parallel sampling.
//!
//! Each unit of work (a segment/shift pair) gets its own RNG stream derived
//! from a base seed and a counter, so the draws a unit sees do not depend on
//! which thread ran it or in what order.

use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Counter-based RNG seed generation using SplitMix64.
///
/// This is a stateless PRF that generates deterministic, well-distributed
/// seeds from a base seed and counter. Using this instead of simple addition
/// avoids sequential correlation between neighbouring units.
///
/// # Arguments
///
/// * `base_seed` - Base random seed
/// * `counter` - Unit counter (0, 1, 2, ...)
#[inline]
pub fn counter_rng_seed(base_seed: u64, counter: u64) -> u64 {
    // SplitMix64: https://xoshiro.di.unimi.it/splitmix64.c
    let mut z = base_seed.wrapping_add(counter.wrapping_mul(0x9e3779b97f4a7c15));
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}

/// Seeded generator for unit `(outer, inner)`, e.g. `(segment, shift)`.
pub fn unit_rng(base_seed: u64, outer: u64, inner: u64) -> Xoshiro256PlusPlus {
    let outer_seed = counter_rng_seed(base_seed, outer);
    Xoshiro256PlusPlus::seed_from_u64(counter_rng_seed(outer_seed, inner))
}
