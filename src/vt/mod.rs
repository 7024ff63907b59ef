//! Sensitive volume-time estimation.
//!
//! This module provides:
//! - [`Cosmology`] and the flat ΛCDM model used for distance conversions
//! - [`calculate_astrophysical_volume`] for the injected volume
//! - [`VolumeTimeIntegral`], the importance-sampled VT estimator

mod cosmology;
mod integral;
mod volume;

pub use cosmology::{Cosmology, CosmologyError, FlatLambdaCdm};
pub use integral::{RecoveredParameters, VolumeTimeIntegral, VtError, VtEstimate};
pub use volume::{calculate_astrophysical_volume, solid_angle};
