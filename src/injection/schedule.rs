//! Injection-time grids.
//!
//! Injections are laid on a regular grid inside a segment so that no two
//! waveform windows overlap. Jitter may perturb each slot, but never by more
//! than half the dead time between windows.

use rand::Rng;
use thiserror::Error;

/// Errors raised while scheduling injections.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScheduleError {
    /// A duration, spacing or buffer was negative or not finite.
    #[error("{name} must be finite and non-negative, got {value}")]
    InvalidArgument {
        /// Argument name.
        name: &'static str,
        /// Offending value.
        value: f64,
    },
    /// Waveform duration plus spacing gives a zero period.
    #[error("injection period (duration + spacing) must be positive")]
    ZeroPeriod,
    /// Jitter would let neighbouring windows overlap.
    #[error("jitter {jitter} exceeds half the spacing ({spacing} / 2)")]
    JitterTooLarge {
        /// Requested jitter.
        jitter: f64,
        /// Spacing between windows.
        spacing: f64,
    },
}

fn non_negative(name: &'static str, value: f64) -> Result<f64, ScheduleError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ScheduleError::InvalidArgument { name, value })
    }
}

/// Injection times for the segment `[start, stop)`.
///
/// Times start at `start + buffer + waveform_duration / 2` and advance by
/// `waveform_duration + spacing` while they stay below
/// `stop - buffer - waveform_duration / 2`. Every window
/// `[t - duration / 2, t + duration / 2]` lies inside the segment. A segment
/// too short for a single window yields an empty grid.
pub fn schedule(
    start: f64,
    stop: f64,
    spacing: f64,
    buffer: f64,
    waveform_duration: f64,
) -> Result<Vec<f64>, ScheduleError> {
    let spacing = non_negative("spacing", spacing)?;
    let buffer = non_negative("buffer", buffer)?;
    let duration = non_negative("waveform_duration", waveform_duration)?;
    if !start.is_finite() || !stop.is_finite() {
        return Err(ScheduleError::InvalidArgument {
            name: "segment bounds",
            value: if start.is_finite() { stop } else { start },
        });
    }

    let effective_buffer = buffer + duration / 2.0;
    let period = duration + spacing;
    if period <= 0.0 {
        return Err(ScheduleError::ZeroPeriod);
    }

    let first = start + effective_buffer;
    let last = stop - effective_buffer;
    if last <= first {
        return Ok(Vec::new());
    }
    // index arithmetic rather than accumulation keeps steps exact
    let n = ((last - first) / period).ceil() as usize;
    Ok((0..n)
        .map(|i| first + i as f64 * period)
        .filter(|&t| t < last)
        .collect())
}

/// Perturb each time uniformly within `±jitter`, then clamp it so its
/// window `[t - waveform_duration / 2, t + waveform_duration / 2]` stays
/// inside `[start, stop]`.
///
/// `jitter` must not exceed `spacing / 2`, which keeps jittered windows
/// disjoint. Clamping only moves the outermost windows inwards.
pub fn jitter_times<R: Rng + ?Sized>(
    times: &mut [f64],
    start: f64,
    stop: f64,
    spacing: f64,
    jitter: f64,
    waveform_duration: f64,
    rng: &mut R,
) -> Result<(), ScheduleError> {
    let jitter = non_negative("jitter", jitter)?;
    let half = non_negative("waveform_duration", waveform_duration)? / 2.0;
    if jitter > spacing / 2.0 {
        return Err(ScheduleError::JitterTooLarge { jitter, spacing });
    }
    if jitter == 0.0 || times.is_empty() {
        return Ok(());
    }
    let (lo, hi) = (start + half, stop - half);
    if !(lo <= hi) {
        return Err(ScheduleError::InvalidArgument {
            name: "segment bounds",
            value: stop - start,
        });
    }
    for t in times.iter_mut() {
        *t = (*t + rng.random_range(-jitter..=jitter)).clamp(lo, hi);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn test_grid_layout() {
        let times = schedule(0.0, 100.0, 2.0, 1.0, 8.0).unwrap();
        // first = 0 + 1 + 4, period = 10, last = 95
        assert_eq!(times, vec![5.0, 15.0, 25.0, 35.0, 45.0, 55.0, 65.0, 75.0, 85.0]);
    }

    #[test]
    fn test_short_segment_is_empty() {
        assert!(schedule(0.0, 9.0, 2.0, 1.0, 8.0).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_bad_arguments() {
        assert!(schedule(0.0, 100.0, -1.0, 0.0, 8.0).is_err());
        assert_eq!(
            schedule(0.0, 100.0, 0.0, 0.0, 0.0),
            Err(ScheduleError::ZeroPeriod)
        );
    }

    #[test]
    fn test_jitter_bound_enforced() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        let mut times = vec![10.0, 20.0];
        assert!(matches!(
            jitter_times(&mut times, 0.0, 30.0, 2.0, 1.5, 1.0, &mut rng),
            Err(ScheduleError::JitterTooLarge { .. })
        ));
        jitter_times(&mut times, 0.0, 30.0, 2.0, 1.0, 1.0, &mut rng).unwrap();
        assert!((times[0] - 10.0).abs() <= 1.0);
        assert!((times[1] - 20.0).abs() <= 1.0);
    }

    #[test]
    fn test_jitter_clamps_edge_windows() {
        // no buffer: the first and last windows touch the segment edges
        let (start, stop, spacing, duration) = (0.0, 100.0, 2.0, 8.0);
        for seed in 0..32 {
            let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
            let mut times = schedule(start, stop, spacing, 0.0, duration).unwrap();
            jitter_times(&mut times, start, stop, spacing, 1.0, duration, &mut rng).unwrap();
            assert!(times.iter().all(|t| t - duration / 2.0 >= start));
            assert!(times.iter().all(|t| t + duration / 2.0 <= stop));
        }
    }
}
