//! Science-quality segment lists.
//!
//! A [`SegmentSet`] is a sorted, non-overlapping list of [`Segment`]s.
//! Segment lists for several detectors are combined by intersection to find
//! coincident data, filtered by minimum length, and optionally chunked so a
//! single very long segment does not have to be held in memory at once.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Segment;

/// Errors raised while building or querying segment lists.
#[derive(Debug, Error)]
pub enum SegmentError {
    /// Query range was empty or reversed.
    #[error("invalid query range [{start}, {stop})")]
    InvalidRange {
        /// Requested start.
        start: f64,
        /// Requested stop.
        stop: f64,
    },
    /// Chunk length must be positive.
    #[error("chunk length must be positive, got {0}")]
    InvalidChunkLength(f64),
    /// The segment source could not answer the query.
    #[error("segment query for flag '{flag}' failed: {reason}")]
    QueryFailed {
        /// State flag being queried.
        flag: String,
        /// Human-readable failure reason.
        reason: String,
    },
}

/// Sorted, coalesced list of segments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentSet {
    segments: Vec<Segment>,
}

impl SegmentSet {
    /// Build a set from arbitrary segments, sorting and merging overlaps.
    pub fn new(mut segments: Vec<Segment>) -> Self {
        segments.sort_by(|a, b| a.start.total_cmp(&b.start));
        let mut merged: Vec<Segment> = Vec::with_capacity(segments.len());
        for seg in segments {
            match merged.last_mut() {
                Some(last) if seg.start <= last.stop => {
                    last.stop = last.stop.max(seg.stop);
                }
                _ => merged.push(seg),
            }
        }
        Self { segments: merged }
    }

    /// Set containing a single segment.
    pub fn single(segment: Segment) -> Self {
        Self {
            segments: vec![segment],
        }
    }

    /// Segments in time order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Sum of segment durations.
    pub fn total_livetime(&self) -> f64 {
        self.segments.iter().map(Segment::duration).sum()
    }

    /// Intersection with another set (two-pointer sweep).
    pub fn intersection(&self, other: &SegmentSet) -> SegmentSet {
        let mut out = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.segments.len() && j < other.segments.len() {
            let a = self.segments[i];
            let b = other.segments[j];
            if let Some(seg) = Segment::new(a.start.max(b.start), a.stop.min(b.stop)) {
                out.push(seg);
            }
            if a.stop < b.stop {
                i += 1;
            } else {
                j += 1;
            }
        }
        SegmentSet { segments: out }
    }

    /// Keep only segments at least `min_length` seconds long.
    pub fn filter_min_length(&self, min_length: f64) -> SegmentSet {
        SegmentSet {
            segments: self
                .segments
                .iter()
                .copied()
                .filter(|s| s.duration() >= min_length)
                .collect(),
        }
    }

    /// Split every segment into pieces no longer than `chunk_length`.
    ///
    /// The final piece of each segment keeps whatever remainder is left.
    pub fn chunk(&self, chunk_length: f64) -> Result<SegmentSet, SegmentError> {
        if !(chunk_length > 0.0) || !chunk_length.is_finite() {
            return Err(SegmentError::InvalidChunkLength(chunk_length));
        }
        let mut out = Vec::new();
        for seg in &self.segments {
            let mut start = seg.start;
            while let Some(piece) = Segment::new(start, (start + chunk_length).min(seg.stop)) {
                out.push(piece);
                start = piece.stop;
            }
        }
        Ok(SegmentSet { segments: out })
    }
}

impl FromIterator<Segment> for SegmentSet {
    fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
        SegmentSet::new(iter.into_iter().collect())
    }
}

/// Capability returning active segments for a named state flag.
pub trait SegmentSource {
    /// Active segments of `flag` within `[start, stop)`.
    fn query(&self, flag: &str, start: f64, stop: f64) -> Result<SegmentSet, SegmentError>;
}

/// Segment source backed by a fixed table of flags.
#[derive(Debug, Clone, Default)]
pub struct StaticSegments {
    flags: Vec<(String, SegmentSet)>,
}

impl StaticSegments {
    /// Empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the active segments of a flag.
    pub fn with_flag(mut self, flag: impl Into<String>, segments: SegmentSet) -> Self {
        self.flags.push((flag.into(), segments));
        self
    }
}

impl SegmentSource for StaticSegments {
    fn query(&self, flag: &str, start: f64, stop: f64) -> Result<SegmentSet, SegmentError> {
        let window = Segment::new(start, stop).ok_or(SegmentError::InvalidRange { start, stop })?;
        let (_, segments) = self
            .flags
            .iter()
            .find(|(name, _)| name == flag)
            .ok_or_else(|| SegmentError::QueryFailed {
                flag: flag.to_string(),
                reason: "unknown flag".to_string(),
            })?;
        Ok(segments.intersection(&SegmentSet::single(window)))
    }
}

/// Coincident segments across `flags` in `[start, stop)`.
///
/// With no flags the whole range is treated as one segment. Segments shorter
/// than `min_length` (when given) are dropped.
pub fn coincident_segments<S: SegmentSource + ?Sized>(
    source: &S,
    flags: &[String],
    start: f64,
    stop: f64,
    min_length: Option<f64>,
) -> Result<SegmentSet, SegmentError> {
    let window = Segment::new(start, stop).ok_or(SegmentError::InvalidRange { start, stop })?;
    let mut coincident = SegmentSet::single(window);
    for flag in flags {
        let active = source.query(flag, start, stop)?;
        debug!("flag {} has {} active segments", flag, active.len());
        coincident = coincident.intersection(&active);
    }
    if let Some(min_length) = min_length {
        coincident = coincident.filter_min_length(min_length);
    }
    info!(
        "found {} coincident segments totalling {}s",
        coincident.len(),
        coincident.total_livetime()
    );
    Ok(coincident)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(a: f64, b: f64) -> Segment {
        Segment::new(a, b).unwrap()
    }

    #[test]
    fn test_new_merges_overlaps() {
        let set = SegmentSet::new(vec![seg(10.0, 20.0), seg(0.0, 5.0), seg(15.0, 30.0)]);
        assert_eq!(set.segments(), &[seg(0.0, 5.0), seg(10.0, 30.0)]);
        assert_eq!(set.total_livetime(), 25.0);
    }

    #[test]
    fn test_intersection() {
        let a = SegmentSet::new(vec![seg(0.0, 10.0), seg(20.0, 30.0)]);
        let b = SegmentSet::new(vec![seg(5.0, 25.0)]);
        let both = a.intersection(&b);
        assert_eq!(both.segments(), &[seg(5.0, 10.0), seg(20.0, 25.0)]);
    }

    #[test]
    fn test_touching_segments_do_not_intersect() {
        let a = SegmentSet::single(seg(0.0, 10.0));
        let b = SegmentSet::single(seg(10.0, 20.0));
        assert!(a.intersection(&b).is_empty());
    }

    #[test]
    fn test_chunk_keeps_remainder() {
        let set = SegmentSet::single(seg(0.0, 25.0));
        let chunks = set.chunk(10.0).unwrap();
        assert_eq!(
            chunks.segments(),
            &[seg(0.0, 10.0), seg(10.0, 20.0), seg(20.0, 25.0)]
        );
        assert!(set.chunk(0.0).is_err());
    }

    #[test]
    fn test_coincident_segments() {
        let source = StaticSegments::new()
            .with_flag("H1:DATA", SegmentSet::new(vec![seg(0.0, 100.0), seg(200.0, 260.0)]))
            .with_flag("L1:DATA", SegmentSet::new(vec![seg(50.0, 250.0)]));
        let flags = vec!["H1:DATA".to_string(), "L1:DATA".to_string()];
        let set = coincident_segments(&source, &flags, 0.0, 300.0, Some(40.0)).unwrap();
        assert_eq!(set.segments(), &[seg(50.0, 100.0), seg(200.0, 250.0)]);

        let set = coincident_segments(&source, &flags, 0.0, 300.0, Some(60.0)).unwrap();
        assert!(set.is_empty());

        let whole = coincident_segments(&source, &[], 0.0, 300.0, None).unwrap();
        assert_eq!(whole.segments(), &[seg(0.0, 300.0)]);
    }
}
