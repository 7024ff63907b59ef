//! Type aliases and common types.

use std::collections::BTreeMap;
use std::fmt;

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

/// 3x3 detector or polarization tensor.
pub type Tensor3 = Matrix3<f64>;

/// Cartesian 3-vector in the Earth-fixed frame (meters for positions).
pub type Vec3 = Vector3<f64>;

/// A single draw of named source parameters.
///
/// Ordered so that serialized parameter tables have a stable column order.
pub type Parameters = BTreeMap<String, f64>;

/// GPS-time interval `[start, stop)` in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Segment start (GPS seconds).
    pub start: f64,
    /// Segment stop (GPS seconds), always greater than `start`.
    pub stop: f64,
}

impl Segment {
    /// Build a segment, returning `None` unless `stop > start` and both are finite.
    pub fn new(start: f64, stop: f64) -> Option<Self> {
        if start.is_finite() && stop.is_finite() && stop > start {
            Some(Self { start, stop })
        } else {
            None
        }
    }

    /// Length of the segment in seconds.
    #[inline]
    pub fn duration(&self) -> f64 {
        self.stop - self.start
    }

    /// Whether `t` falls inside `[start, stop)`.
    #[inline]
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t < self.stop
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.stop)
    }
}

/// Per-detector time offsets (seconds) defining one timeslide.
///
/// Offsets are ordered like the channel list they are applied to. An offset
/// of zero leaves that detector's data unshifted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shift {
    /// Offset in seconds for each detector.
    pub offsets: Vec<f64>,
}

impl Shift {
    /// Wrap a vector of offsets.
    pub fn new(offsets: Vec<f64>) -> Self {
        Self { offsets }
    }

    /// Largest offset across detectors.
    pub fn max_offset(&self) -> f64 {
        self.offsets.iter().copied().fold(0.0, f64::max)
    }

    /// Number of detectors covered by this shift.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Whether the shift covers no detectors.
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Offset of the first detector, which anchors the shared time base.
    pub fn reference_offset(&self) -> f64 {
        self.offsets.first().copied().unwrap_or(0.0)
    }
}

/// Directory name of the shift, e.g. `dt-0-1.5`.
impl fmt::Display for Shift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dt")?;
        for offset in &self.offsets {
            write!(f, "-{}", offset)?;
        }
        Ok(())
    }
}

/// Evenly sampled, single-channel time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    /// GPS time of the first sample.
    pub t0: f64,
    /// Samples per second.
    pub sample_rate: f64,
    /// Sample values.
    pub values: Vec<f64>,
}

impl TimeSeries {
    /// Create a time series.
    pub fn new(t0: f64, sample_rate: f64, values: Vec<f64>) -> Self {
        Self {
            t0,
            sample_rate,
            values,
        }
    }

    /// Duration covered, in seconds.
    pub fn duration(&self) -> f64 {
        self.values.len() as f64 / self.sample_rate
    }

    /// GPS time just past the last sample.
    pub fn end(&self) -> f64 {
        self.t0 + self.duration()
    }

    /// Copy out `n_samples` samples starting at GPS time `start`.
    ///
    /// Returns `None` if the requested window is not fully covered.
    pub fn crop(&self, start: f64, n_samples: usize) -> Option<&[f64]> {
        let offset = (start - self.t0) * self.sample_rate;
        // allow sub-sample float error in the requested start
        if offset < -1e-6 {
            return None;
        }
        let first = offset.round() as usize;
        let last = first.checked_add(n_samples)?;
        self.values.get(first..last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_requires_positive_length() {
        assert!(Segment::new(0.0, 10.0).is_some());
        assert!(Segment::new(10.0, 10.0).is_none());
        assert!(Segment::new(10.0, 5.0).is_none());
        assert!(Segment::new(f64::NAN, 5.0).is_none());
    }

    #[test]
    fn test_shift_display() {
        let shift = Shift::new(vec![0.0, 1.5]);
        assert_eq!(shift.to_string(), "dt-0-1.5");
        assert_eq!(shift.max_offset(), 1.5);
    }

    #[test]
    fn test_crop_bounds() {
        let ts = TimeSeries::new(100.0, 4.0, (0..40).map(|x| x as f64).collect());
        assert_eq!(ts.duration(), 10.0);
        assert_eq!(ts.crop(101.0, 4).unwrap(), &[4.0, 5.0, 6.0, 7.0]);
        assert!(ts.crop(99.0, 4).is_none());
        assert!(ts.crop(109.5, 4).is_none());
    }
}
