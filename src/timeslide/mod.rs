//! Timeslide synthesis.
//!
//! This module provides:
//! - [`TimeslideSynthesizer`], which crops shifted background and adds
//!   injections on a shared time base
//! - [`StrainSource`] with bounded-retry reads
//! - [`TimeslideGenerator`], the segment-by-segment pipeline

mod pipeline;
mod strain;
mod synthesizer;

pub use pipeline::{
    PipelineError, PipelineSummary, TimeslideGenerator, BACKGROUND_DIR, INJECTION_DIR,
};
pub use strain::{
    fetch_segment, fetch_with_retry, DataError, InMemoryStrain, RetryPolicy, StrainSource,
};
pub use synthesizer::{inject_waveform, Timeslide, TimeslideSynthesizer};
