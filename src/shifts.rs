//! Timeslide shift enumeration and shift-count planning.
//!
//! Two questions are answered here:
//!
//! 1. **Which shifts?** [`ShiftSet::cartesian`] enumerates per-detector offset
//!    multiples. A detector with increment zero is never shifted.
//! 2. **How many shifts?** [`required_shift_count`] finds the smallest number
//!    of slides `N` whose cumulative livetime reaches a target `Tb`, given
//!    that slide `i` sacrifices `i·δ` seconds of data at the segment edge:
//!
//! ```text
//! L(N) = Σ_{i=1}^{N} (T − i·δ) = N·T − δ·N(N+1)/2  ≥  Tb
//! ```
//!
//! The quadratic is solved in closed form and then corrected by exact
//! evaluation of `L(N)` on both sides, so the returned `N` is always minimal.
//!
//! The pipeline crops every slide of a segment to `len − N·δ` so that all
//! slides share one length. [`plan_slide_count`] accounts for that cropping
//! and for the Cartesian shift count, and is what a target livetime uses.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Segment, Shift};

/// Errors from shift enumeration and planning.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShiftError {
    /// The shift increment is zero, negative or not finite.
    #[error("shift increment must be a positive finite number, got {0}")]
    InvalidIncrement(f64),
    /// The target livetime is not finite.
    #[error("target livetime must be finite, got {0}")]
    InvalidTarget(f64),
    /// No number of slides reaches the target livetime.
    #[error(
        "target livetime {target}s is infeasible: {total}s of data with {increment}s increments \
         yields at most {max_livetime}s"
    )]
    InfeasibleLivetime {
        /// Requested livetime.
        target: f64,
        /// Total segment duration available.
        total: f64,
        /// Shift increment.
        increment: f64,
        /// Largest livetime any number of slides can produce.
        max_livetime: f64,
    },
    /// The sample rate is zero, negative or not finite.
    #[error("sample rate must be a positive finite number, got {0}")]
    InvalidSampleRate(f64),
    /// Increments were malformed or produced no non-zero-lag shift.
    #[error("invalid shift increments: {0}")]
    InvalidIncrements(String),
}

/// Cumulative livetime of `n` slides over `total` seconds with increment `delta`.
#[inline]
pub fn livetime_for(total: f64, delta: f64, n: u64) -> f64 {
    let n = n as f64;
    n * total - delta * n * (n + 1.0) / 2.0
}

/// Smallest `N ≥ 1` with `Σ_{i=1}^{N} (T − i·δ) ≥ Tb`, where `T` is the
/// summed duration of `segments`.
///
/// A target at or below `T − δ` (including non-positive targets) needs a
/// single slide. A negative discriminant, or a root interval that contains no
/// integer, is reported as [`ShiftError::InfeasibleLivetime`].
pub fn required_shift_count(
    segments: &[Segment],
    target_livetime: f64,
    increment: f64,
) -> Result<u64, ShiftError> {
    if !increment.is_finite() || increment <= 0.0 {
        return Err(ShiftError::InvalidIncrement(increment));
    }
    if !target_livetime.is_finite() {
        return Err(ShiftError::InvalidTarget(target_livetime));
    }

    let total: f64 = segments.iter().map(Segment::duration).sum();
    let delta = increment;
    let lt = |n: u64| livetime_for(total, delta, n);

    if target_livetime <= lt(1) {
        return Ok(1);
    }

    let infeasible = || ShiftError::InfeasibleLivetime {
        target: target_livetime,
        total,
        increment,
        max_livetime: max_livetime(total, delta),
    };

    let b = total - delta / 2.0;
    let disc = b * b - 2.0 * delta * target_livetime;
    if disc < 0.0 {
        return Err(infeasible());
    }
    let sqrt_disc = disc.sqrt();
    let lower_root = (b - sqrt_disc) / delta;
    let upper_root = (b + sqrt_disc) / delta;

    let mut n = lower_root.ceil().max(1.0) as u64;
    // rounding in the closed form can land one off either way
    while n > 1 && lt(n - 1) >= target_livetime {
        n -= 1;
    }
    let limit = upper_root.floor().max(1.0) as u64 + 1;
    while lt(n) < target_livetime {
        n += 1;
        if n > limit {
            return Err(infeasible());
        }
    }
    debug!(
        "{} slides reach {}s of livetime from {}s of data (increment {}s)",
        n, target_livetime, total, increment
    );
    Ok(n)
}

/// Peak of `L(N)` over positive integers.
fn max_livetime(total: f64, delta: f64) -> f64 {
    let vertex = ((total - delta / 2.0) / delta).max(1.0);
    let lo = vertex.floor().max(1.0) as u64;
    livetime_for(total, delta, lo).max(livetime_for(total, delta, lo + 1))
}

/// Number of shifts [`ShiftSet::cartesian`] yields for `n_slides`:
/// `(n_slides + 1)^m − 1` for `m` detectors with a non-zero increment.
pub fn cartesian_len(increments: &[f64], n_slides: usize) -> usize {
    let shifted = increments.iter().filter(|d| **d > 0.0).count() as u32;
    if shifted == 0 {
        return 0;
    }
    (n_slides + 1).saturating_pow(shifted) - 1
}

/// Length of each slide of `segment` once cropped by `max_shift`, on the
/// `sample_rate` grid, or `None` when less than one sample remains.
pub fn cropped_length(segment: &Segment, max_shift: f64, sample_rate: f64) -> Option<f64> {
    let n_samples = ((segment.duration() - max_shift) * sample_rate).round();
    (n_samples >= 1.0).then(|| n_samples / sample_rate)
}

/// Background livetime written for `n_slides` slides of `increments`.
///
/// Every shift of a segment is cropped to the same [`cropped_length`], so
/// this is `cartesian_len · Σ_k cropped_length(k)`. Segments shorter than
/// the maximum shift contribute nothing.
pub fn written_livetime(
    segments: &[Segment],
    increments: &[f64],
    n_slides: usize,
    sample_rate: f64,
) -> f64 {
    let max_shift = increments.iter().copied().fold(0.0, f64::max) * n_slides as f64;
    let per_shift: f64 = segments
        .iter()
        .filter_map(|s| cropped_length(s, max_shift, sample_rate))
        .sum();
    cartesian_len(increments, n_slides) as f64 * per_shift
}

/// Smallest slide count whose [`written_livetime`] reaches `target_livetime`.
///
/// Unlike [`required_shift_count`] this counts each segment separately with
/// its cropped length, and multiplies by the number of Cartesian shifts. The
/// search ends once the maximum shift covers the longest segment.
pub fn plan_slide_count(
    segments: &[Segment],
    target_livetime: f64,
    increments: &[f64],
    sample_rate: f64,
) -> Result<usize, ShiftError> {
    if !target_livetime.is_finite() {
        return Err(ShiftError::InvalidTarget(target_livetime));
    }
    if !sample_rate.is_finite() || sample_rate <= 0.0 {
        return Err(ShiftError::InvalidSampleRate(sample_rate));
    }
    let delta = increments.iter().copied().fold(0.0, f64::max);
    if !delta.is_finite() || delta <= 0.0 {
        return Err(ShiftError::InvalidIncrement(delta));
    }
    let longest = segments.iter().map(Segment::duration).fold(0.0, f64::max);
    let last = ((longest / delta).ceil() as usize).max(1);

    let mut best = 0.0f64;
    for n in 1..=last {
        let livetime = written_livetime(segments, increments, n, sample_rate);
        if livetime >= target_livetime {
            let max_shift = delta * n as f64;
            let dropped = segments
                .iter()
                .filter(|s| cropped_length(s, max_shift, sample_rate).is_none())
                .count();
            if dropped > 0 {
                warn!(
                    "{} of {} segments are too short for a {}s maximum shift",
                    dropped,
                    segments.len(),
                    max_shift
                );
            }
            debug!(
                "{} slides write {}s of livetime for a {}s target",
                n, livetime, target_livetime
            );
            return Ok(n);
        }
        best = best.max(livetime);
    }
    Err(ShiftError::InfeasibleLivetime {
        target: target_livetime,
        total: segments.iter().map(Segment::duration).sum(),
        increment: delta,
        max_livetime: best,
    })
}

/// An ordered collection of shifts sharing one maximum offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftSet {
    shifts: Vec<Shift>,
    max_shift: f64,
}

impl ShiftSet {
    /// Enumerate offset multiples `0..=n_slides` for every detector with a
    /// non-zero increment, skipping the zero-lag combination.
    ///
    /// With one shifted detector this yields exactly `n_slides` shifts
    /// `k·δ, k = 1..=n_slides`. Shifts are ordered lexicographically by
    /// multiple, first detector slowest.
    pub fn cartesian(increments: &[f64], n_slides: usize) -> Result<ShiftSet, ShiftError> {
        if n_slides == 0 {
            return Err(ShiftError::InvalidIncrements(
                "n_slides must be at least 1".to_string(),
            ));
        }
        if let Some(bad) = increments.iter().find(|d| !d.is_finite() || **d < 0.0) {
            return Err(ShiftError::InvalidIncrements(format!(
                "increments must be finite and non-negative, got {}",
                bad
            )));
        }
        let shifted: Vec<usize> = increments
            .iter()
            .enumerate()
            .filter(|(_, d)| **d > 0.0)
            .map(|(i, _)| i)
            .collect();
        if shifted.is_empty() {
            return Err(ShiftError::InvalidIncrements(
                "at least one detector must have a non-zero increment".to_string(),
            ));
        }

        let mut shifts = Vec::new();
        let mut multiples = vec![0usize; shifted.len()];
        loop {
            // odometer increment, last shifted detector fastest
            let mut pos = shifted.len();
            loop {
                if pos == 0 {
                    let max_shift = increments.iter().copied().fold(0.0, f64::max) * n_slides as f64;
                    return Ok(ShiftSet { shifts, max_shift });
                }
                pos -= 1;
                if multiples[pos] < n_slides {
                    multiples[pos] += 1;
                    for m in multiples.iter_mut().skip(pos + 1) {
                        *m = 0;
                    }
                    break;
                }
            }
            let mut offsets = vec![0.0; increments.len()];
            for (slot, &det) in shifted.iter().enumerate() {
                offsets[det] = increments[det] * multiples[slot] as f64;
            }
            shifts.push(Shift::new(offsets));
        }
    }

    /// Shifts in enumeration order.
    pub fn shifts(&self) -> &[Shift] {
        &self.shifts
    }

    /// Number of shifts.
    pub fn len(&self) -> usize {
        self.shifts.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.shifts.is_empty()
    }

    /// Largest offset any slide may apply, `max(increment) · n_slides`.
    ///
    /// Every slide of a segment is cropped to `duration − max_shift` so all
    /// slides share one length.
    pub fn max_shift(&self) -> f64 {
        self.max_shift
    }
}
