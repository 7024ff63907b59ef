//! Injection scheduling, population priors and waveform realisation.
//!
//! This module provides:
//! - [`schedule`] and [`jitter_times`] for non-overlapping injection grids
//! - [`Prior`] / [`PriorDict`] and the named [`populations`]
//! - [`InjectionSampler`], which draws one parameter set per grid slot
//! - the external capabilities [`WaveformGenerator`], [`Projector`] and
//!   [`SnrCalculator`] with simple reference implementations

pub mod populations;
mod priors;
mod projection;
mod sampler;
mod schedule;
mod snr;
mod waveform;

pub use priors::{Prior, PriorDict, PriorError};
pub use projection::{Detector, DetectorProjector, Projector};
pub use sampler::{
    InjectionError, InjectionRecord, InjectionSampler, InjectionSettings, SampledInjections,
    GEOCENT_TIME,
};
pub use schedule::{jitter_times, schedule, ScheduleError};
pub use snr::{SnrCalculator, SnrError, WhiteNoiseSnr};
pub use waveform::{Polarizations, SineGaussian, WaveformError, WaveformGenerator};
