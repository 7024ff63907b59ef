//! Shifted background and injected timeslides for one segment.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::types::{Shift, TimeSeries};

use super::strain::DataError;

/// One shifted realisation of a segment across all detectors.
///
/// `data[k]` holds channel `k` on the shared time base
/// `t0 + i / sample_rate`; every channel has the same length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeslide {
    /// Shift applied to produce this slide.
    pub shift: Shift,
    /// Start of the shared time base (the unshifted segment start).
    pub t0: f64,
    /// Samples per second.
    pub sample_rate: f64,
    /// Channel names, in detector order.
    pub channels: Vec<String>,
    /// Samples per channel.
    pub data: Vec<Vec<f64>>,
}

impl Timeslide {
    /// Samples per channel.
    pub fn n_samples(&self) -> usize {
        self.data.first().map_or(0, Vec::len)
    }

    /// Length of the slide in seconds.
    pub fn duration(&self) -> f64 {
        self.n_samples() as f64 / self.sample_rate
    }

    /// Samples of `channel`.
    pub fn channel(&self, channel: &str) -> Option<&[f64]> {
        self.channels
            .iter()
            .position(|c| c == channel)
            .map(|i| self.data[i].as_slice())
    }
}

/// Add `response`, centred on `center_time`, into `data` in place.
///
/// `data[i]` sits at `t0 + i / sample_rate`. Samples of the response that
/// fall outside `data` are dropped. Returns the number of samples touched.
pub fn inject_waveform(
    data: &mut [f64],
    t0: f64,
    sample_rate: f64,
    response: &[f64],
    center_time: f64,
) -> usize {
    let half = (response.len() / 2) as i64;
    let start = ((center_time - t0) * sample_rate).round() as i64 - half;
    let mut touched = 0;
    for (j, h) in response.iter().enumerate() {
        let i = start + j as i64;
        if i < 0 {
            continue;
        }
        match data.get_mut(i as usize) {
            Some(x) => {
                *x += h;
                touched += 1;
            }
            None => break,
        }
    }
    touched
}

/// Crops shifted background and adds injections for one segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeslideSynthesizer {
    /// Samples per second.
    pub sample_rate: f64,
    /// Length of every slide in seconds (`segment length − max shift`).
    pub duration: f64,
}

impl TimeslideSynthesizer {
    /// Synthesizer producing slides of `duration` seconds.
    pub fn new(sample_rate: f64, duration: f64) -> Self {
        Self {
            sample_rate,
            duration,
        }
    }

    /// Samples per channel in every slide.
    pub fn n_samples(&self) -> usize {
        (self.duration * self.sample_rate).round() as usize
    }

    /// Background slide: channel `k` is read from `segment_start + shift_k`
    /// for `duration` seconds and placed on the time base starting at
    /// `segment_start`.
    pub fn background(
        &self,
        strain: &[TimeSeries],
        channels: &[String],
        segment_start: f64,
        shift: &Shift,
    ) -> Result<Timeslide, DataError> {
        let n_samples = self.n_samples();
        let data = channels
            .iter()
            .zip(strain)
            .zip(&shift.offsets)
            .map(|((channel, series), offset)| {
                let start = segment_start + offset;
                series
                    .crop(start, n_samples)
                    .map(<[f64]>::to_vec)
                    .ok_or_else(|| DataError::ShortData {
                        channel: channel.clone(),
                        start,
                        n_samples,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if data.len() != channels.len() {
            return Err(DataError::Unavailable {
                channel: channels.get(data.len()).cloned().unwrap_or_default(),
                start: segment_start,
                stop: segment_start + self.duration,
                reason: format!(
                    "{} channels, {} series, {} offsets",
                    channels.len(),
                    strain.len(),
                    shift.len()
                ),
            });
        }
        debug!("cropped {} channels for {}", channels.len(), shift);
        Ok(Timeslide {
            shift: shift.clone(),
            t0: segment_start,
            sample_rate: self.sample_rate,
            channels: channels.to_vec(),
            data,
        })
    }

    /// Copy of `background` with each injection's per-detector responses
    /// added at its time.
    ///
    /// `responses[j][k]` is injection `j`'s strain in detector `k`, centred on
    /// `times[j]`.
    pub fn inject(&self, background: &Timeslide, responses: &[Vec<Vec<f64>>], times: &[f64]) -> Timeslide {
        let mut injected = background.clone();
        for (per_detector, &t) in responses.iter().zip(times) {
            for (data, response) in injected.data.iter_mut().zip(per_detector) {
                inject_waveform(data, background.t0, background.sample_rate, response, t);
            }
        }
        injected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strain() -> Vec<TimeSeries> {
        vec![
            TimeSeries::new(0.0, 1.0, (0..20).map(f64::from).collect()),
            TimeSeries::new(0.0, 1.0, (100..120).map(f64::from).collect()),
        ]
    }

    fn channels() -> Vec<String> {
        vec!["H1:STRAIN".into(), "L1:STRAIN".into()]
    }

    #[test]
    fn test_background_reads_shifted_windows() {
        let synth = TimeslideSynthesizer::new(1.0, 10.0);
        let ts = synth
            .background(&strain(), &channels(), 0.0, &Shift::new(vec![0.0, 3.0]))
            .unwrap();
        assert_eq!(ts.t0, 0.0);
        assert_eq!(ts.data[0], (0..10).map(f64::from).collect::<Vec<_>>());
        assert_eq!(ts.data[1], (103..113).map(f64::from).collect::<Vec<_>>());
    }

    #[test]
    fn test_background_past_end_is_short_data() {
        let synth = TimeslideSynthesizer::new(1.0, 10.0);
        let err = synth
            .background(&strain(), &channels(), 0.0, &Shift::new(vec![0.0, 11.0]))
            .unwrap_err();
        assert!(matches!(err, DataError::ShortData { .. }));
    }

    #[test]
    fn test_inject_waveform_clips_edges() {
        let mut data = vec![1.0; 5];
        let touched = inject_waveform(&mut data, 0.0, 1.0, &[1.0, 1.0, 1.0, 1.0], 0.0);
        assert_eq!(touched, 2);
        assert_eq!(data, vec![2.0, 2.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_inject_is_additive() {
        let synth = TimeslideSynthesizer::new(1.0, 10.0);
        let bg = synth
            .background(&strain(), &channels(), 0.0, &Shift::new(vec![0.0, 2.0]))
            .unwrap();
        let responses = vec![vec![vec![0.5, 0.5], vec![-1.0, -1.0]]];
        let inj = synth.inject(&bg, &responses, &[5.0]);
        for k in 0..2 {
            for (i, (a, b)) in inj.data[k].iter().zip(&bg.data[k]).enumerate() {
                let expected = if i == 4 || i == 5 { responses[0][k][0] } else { 0.0 };
                assert_eq!(a - b, expected);
            }
        }
    }
}
