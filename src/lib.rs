//! # timeslide-vt
//!
//! Background synthesis and sensitivity estimation for gravitational-wave
//! searches.
//!
//! This crate provides the two numerical cores of a search pipeline:
//! - **Timeslides**: coincident science segments are cyclically shifted per
//!   detector to manufacture background with far more livetime than the raw
//!   data, and simulated signals are injected into a parallel copy with full
//!   bookkeeping of times, shifts and per-detector SNR.
//! - **Volume-time**: recovered injections are importance-reweighted to any
//!   target population to estimate the sensitive VT, its standard deviation
//!   and the effective sample size.
//!
//! ## Quick Start
//!
//! ```ignore
//! use timeslide_vt::{FlatLambdaCdm, PriorDict, RecoveredParameters, VolumeTimeIntegral};
//!
//! let cosmology = FlatLambdaCdm::planck15();
//! let vt = VolumeTimeIntegral::new(source, recovered, n_injections, livetime, &cosmology)?;
//! let estimate = vt.calculate_vt(Some(&target))?;
//! println!("VT = {:.3e} ± {:.3e}", estimate.volume_time, estimate.std);
//! ```
//!
//! Waveform generation, antenna projection and SNR computation are
//! capabilities behind traits ([`WaveformGenerator`], [`Projector`],
//! [`SnrCalculator`]); simple reference implementations are included.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
mod config;
mod constants;
mod thread_pool;
mod types;

// Functional modules
pub mod archive;
pub mod injection;
pub mod output;
pub mod segments;
pub mod shifts;
pub mod statistics;
pub mod timeslide;
pub mod vt;

// Re-exports for public API
pub use config::{Config, ConfigError};
pub use constants::{FULL_SKY, PI_OVER_TWO, SECONDS_PER_YEAR, YEARS_PER_SECOND};
pub use injection::{
    schedule, InjectionRecord, InjectionSampler, Prior, PriorDict, Projector, SnrCalculator,
    WaveformGenerator,
};
pub use segments::{coincident_segments, SegmentSet, SegmentSource};
pub use shifts::{plan_slide_count, required_shift_count, ShiftError, ShiftSet};
pub use thread_pool::{PoolError, WorkerPool};
pub use timeslide::{PipelineError, PipelineSummary, TimeslideGenerator, TimeslideSynthesizer};
pub use types::{Parameters, Segment, Shift, Tensor3, TimeSeries, Vec3};
pub use vt::{
    calculate_astrophysical_volume, Cosmology, FlatLambdaCdm, RecoveredParameters,
    VolumeTimeIntegral, VtError, VtEstimate,
};
