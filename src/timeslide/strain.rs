//! Strain data access with bounded retries.

use std::collections::HashMap;
use std::thread;
use std::time::Duration;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::TimeSeries;

/// Errors raised while reading strain data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    /// Data for the window could not be read (possibly transient).
    #[error("data for {channel} in [{start}, {stop}) unavailable: {reason}")]
    Unavailable {
        /// Channel requested.
        channel: String,
        /// Window start.
        start: f64,
        /// Window stop.
        stop: f64,
        /// Reason reported by the source.
        reason: String,
    },
    /// Every retry failed.
    #[error(
        "giving up on {channel} in [{start}, {stop}) after {attempts} attempts: {last_error}"
    )]
    RetriesExhausted {
        /// Channel requested.
        channel: String,
        /// Window start.
        start: f64,
        /// Window stop.
        stop: f64,
        /// Attempts made.
        attempts: u32,
        /// Message of the final failure.
        last_error: String,
    },
    /// Data is stored at a different sample rate than requested.
    #[error("{channel} is sampled at {found} Hz, requested {expected} Hz")]
    SampleRateMismatch {
        /// Channel requested.
        channel: String,
        /// Requested rate.
        expected: f64,
        /// Stored rate.
        found: f64,
    },
    /// A shifted window reaches past the fetched data.
    #[error("{channel} has no data for {n_samples} samples from {start}")]
    ShortData {
        /// Channel being cropped.
        channel: String,
        /// Window start.
        start: f64,
        /// Samples requested.
        n_samples: usize,
    },
}

impl DataError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, DataError::Unavailable { .. })
    }
}

/// Capability returning strain for a channel over a GPS window.
pub trait StrainSource: Send + Sync {
    /// Strain of `channel` over `[start, stop)` at `sample_rate`.
    fn fetch(
        &self,
        channel: &str,
        start: f64,
        stop: f64,
        sample_rate: f64,
    ) -> Result<TimeSeries, DataError>;
}

/// Strain held in memory, one series per channel.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStrain {
    channels: HashMap<String, TimeSeries>,
}

impl InMemoryStrain {
    /// Empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a channel's data.
    pub fn with_channel(mut self, channel: impl Into<String>, data: TimeSeries) -> Self {
        self.channels.insert(channel.into(), data);
        self
    }
}

impl StrainSource for InMemoryStrain {
    fn fetch(
        &self,
        channel: &str,
        start: f64,
        stop: f64,
        sample_rate: f64,
    ) -> Result<TimeSeries, DataError> {
        let unavailable = |reason: &str| DataError::Unavailable {
            channel: channel.to_string(),
            start,
            stop,
            reason: reason.to_string(),
        };
        let series = self
            .channels
            .get(channel)
            .ok_or_else(|| unavailable("unknown channel"))?;
        if series.sample_rate != sample_rate {
            return Err(DataError::SampleRateMismatch {
                channel: channel.to_string(),
                expected: sample_rate,
                found: series.sample_rate,
            });
        }
        let n_samples = ((stop - start) * sample_rate).round() as usize;
        let values = series
            .crop(start, n_samples)
            .ok_or_else(|| unavailable("window not covered"))?;
        Ok(TimeSeries::new(start, sample_rate, values.to_vec()))
    }
}

/// Bounded retry with linearly growing backoff.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub attempts: u32,
    /// Sleep before the second attempt; attempt `k` waits `k − 1` times this.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

/// Fetch one channel, retrying transient failures per `policy`.
pub fn fetch_with_retry<S: StrainSource + ?Sized>(
    source: &S,
    channel: &str,
    start: f64,
    stop: f64,
    sample_rate: f64,
    policy: &RetryPolicy,
) -> Result<TimeSeries, DataError> {
    let attempts = policy.attempts.max(1);
    let mut last_error = None;
    for attempt in 1..=attempts {
        if attempt > 1 {
            thread::sleep(policy.backoff * (attempt - 1));
        }
        match source.fetch(channel, start, stop, sample_rate) {
            Ok(series) => {
                debug!("fetched {} [{}, {}) on attempt {}", channel, start, stop, attempt);
                return Ok(series);
            }
            Err(e) if e.is_transient() => {
                warn!(
                    "attempt {}/{} for {} [{}, {}) failed: {}",
                    attempt, attempts, channel, start, stop, e
                );
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }
    Err(DataError::RetriesExhausted {
        channel: channel.to_string(),
        start,
        stop,
        attempts,
        last_error: last_error.map(|e| e.to_string()).unwrap_or_default(),
    })
}

/// Fetch every channel of a segment, in channel order.
pub fn fetch_segment<S: StrainSource + ?Sized>(
    source: &S,
    channels: &[String],
    start: f64,
    stop: f64,
    sample_rate: f64,
    policy: &RetryPolicy,
) -> Result<Vec<TimeSeries>, DataError> {
    channels
        .iter()
        .map(|c| fetch_with_retry(source, c, start, stop, sample_rate, policy))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Flaky {
        failures: u32,
        calls: AtomicU32,
    }

    impl StrainSource for Flaky {
        fn fetch(&self, channel: &str, start: f64, stop: f64, sr: f64) -> Result<TimeSeries, DataError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(DataError::Unavailable {
                    channel: channel.to_string(),
                    start,
                    stop,
                    reason: "frame missing".into(),
                });
            }
            Ok(TimeSeries::new(start, sr, vec![0.0; ((stop - start) * sr) as usize]))
        }
    }

    fn quick() -> RetryPolicy {
        RetryPolicy {
            attempts: 3,
            backoff: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_retry_recovers() {
        let src = Flaky {
            failures: 2,
            calls: AtomicU32::new(0),
        };
        let ts = fetch_with_retry(&src, "H1:STRAIN", 0.0, 4.0, 2.0, &quick()).unwrap();
        assert_eq!(ts.values.len(), 8);
        assert_eq!(src.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_retry_exhausted_names_channel() {
        let src = Flaky {
            failures: 10,
            calls: AtomicU32::new(0),
        };
        let err = fetch_with_retry(&src, "L1:STRAIN", 0.0, 4.0, 2.0, &quick()).unwrap_err();
        match err {
            DataError::RetriesExhausted {
                channel, attempts, ..
            } => {
                assert_eq!(channel, "L1:STRAIN");
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_in_memory_crop_and_rate_check() {
        let src = InMemoryStrain::new()
            .with_channel("H1:STRAIN", TimeSeries::new(0.0, 2.0, (0..20).map(f64::from).collect()));
        let ts = src.fetch("H1:STRAIN", 2.0, 4.0, 2.0).unwrap();
        assert_eq!(ts.values, vec![4.0, 5.0, 6.0, 7.0]);
        assert!(matches!(
            src.fetch("H1:STRAIN", 0.0, 1.0, 4.0),
            Err(DataError::SampleRateMismatch { .. })
        ));
        assert!(src.fetch("H1:STRAIN", 8.0, 12.0, 2.0).is_err());
    }
}
