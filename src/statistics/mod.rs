//! Numerical and statistical building blocks.
//!
//! This module provides the small numerical toolkit the rest of the crate
//! is built on:
//! - Deterministic counter-based seeding for per-unit RNG streams
//! - Adaptive Simpson quadrature for cosmological integrals
//! - Bracketing root finding for inverting distance-redshift relations
//! - Importance-sampling moments and effective sample size

mod importance;
mod quadrature;
mod roots;
mod seed;

pub use importance::{effective_sample_size, WeightMoments};
pub use quadrature::{integrate, IntegrationError};
pub use roots::{find_root, RootError};
pub use seed::{counter_rng_seed, unit_rng};
