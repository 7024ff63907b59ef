//! Waveform generation capability.
//!
//! Real pipelines call into an external approximant library; the
//! [`WaveformGenerator`] trait is the seam. [`SineGaussian`] is a simple
//! analytic burst used for tests and offline runs.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Parameters;

/// Errors raised while generating or projecting waveforms.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WaveformError {
    /// A required parameter was not supplied.
    #[error("waveform parameter '{0}' missing")]
    MissingParameter(String),
    /// A parameter was outside the model's domain.
    #[error("waveform parameter '{key}' = {value} is out of range")]
    InvalidParameter {
        /// Parameter name.
        key: String,
        /// Offending value.
        value: f64,
    },
    /// Plus and cross polarisations differ in length.
    #[error("polarisations differ in length ({plus} vs {cross})")]
    LengthMismatch {
        /// Plus length.
        plus: usize,
        /// Cross length.
        cross: usize,
    },
    /// Detector name not known to the projector.
    #[error("unknown detector '{0}'")]
    UnknownDetector(String),
}

/// Plus and cross polarisations sampled on a common grid, centred on the
/// coalescence (or peak) time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polarizations {
    /// Plus polarisation.
    pub plus: Vec<f64>,
    /// Cross polarisation.
    pub cross: Vec<f64>,
}

impl Polarizations {
    /// Pair two polarisations, checking their lengths agree.
    pub fn new(plus: Vec<f64>, cross: Vec<f64>) -> Result<Self, WaveformError> {
        if plus.len() != cross.len() {
            return Err(WaveformError::LengthMismatch {
                plus: plus.len(),
                cross: cross.len(),
            });
        }
        Ok(Self { plus, cross })
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.plus.len()
    }

    /// Whether the waveform is empty.
    pub fn is_empty(&self) -> bool {
        self.plus.is_empty()
    }
}

/// Capability producing polarisations from source parameters.
pub trait WaveformGenerator: Send + Sync {
    /// Sample rate of generated waveforms in Hz.
    fn sample_rate(&self) -> f64;

    /// Waveform length in seconds.
    fn duration(&self) -> f64;

    /// Generate the polarisations for one parameter set.
    fn generate(&self, params: &Parameters) -> Result<Polarizations, WaveformError>;

    /// Number of samples per waveform.
    fn n_samples(&self) -> usize {
        (self.duration() * self.sample_rate()).round() as usize
    }
}

fn param(params: &Parameters, key: &str) -> Result<f64, WaveformError> {
    params
        .get(key)
        .copied()
        .ok_or_else(|| WaveformError::MissingParameter(key.to_string()))
}

/// Sine-Gaussian burst with Gaussian envelope `exp(-(t/τ)²)`,
/// `τ = Q / (√2 π f0)`.
///
/// Reads `frequency`, `quality` and `hrss`; `theta_jn` (default 0) sets the
/// plus/cross ellipticity. Amplitude is normalised so that the
/// root-sum-square strain of the plus polarisation equals `hrss` for a
/// face-on source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SineGaussian {
    /// Sample rate in Hz.
    pub sample_rate: f64,
    /// Waveform length in seconds.
    pub duration: f64,
}

impl SineGaussian {
    /// New generator.
    pub fn new(sample_rate: f64, duration: f64) -> Self {
        Self {
            sample_rate,
            duration,
        }
    }
}

impl WaveformGenerator for SineGaussian {
    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn generate(&self, params: &Parameters) -> Result<Polarizations, WaveformError> {
        let f0 = param(params, "frequency")?;
        let q = param(params, "quality")?;
        let hrss = param(params, "hrss")?;
        let iota = params.get("theta_jn").copied().unwrap_or(0.0);
        for (key, value) in [("frequency", f0), ("quality", q)] {
            if !(value > 0.0) || !value.is_finite() {
                return Err(WaveformError::InvalidParameter {
                    key: key.to_string(),
                    value,
                });
            }
        }

        let tau = q / (2.0_f64.sqrt() * PI * f0);
        // ∫ exp(-2 t²/τ²) sin²(2π f0 t) dt ≈ τ √(π/2) / 2 for Q ≫ 1
        let norm = (tau * (PI / 2.0).sqrt() / 2.0).sqrt();
        let amplitude = hrss / norm;
        let plus_amp = amplitude * (1.0 + iota.cos().powi(2)) / 2.0;
        let cross_amp = amplitude * iota.cos();

        let n = self.n_samples();
        let centre = n as f64 / 2.0;
        let (plus, cross) = (0..n)
            .map(|i| {
                let t = (i as f64 - centre) / self.sample_rate;
                let envelope = (-(t / tau).powi(2)).exp();
                let phase = 2.0 * PI * f0 * t;
                (
                    plus_amp * envelope * phase.sin(),
                    cross_amp * envelope * phase.cos(),
                )
            })
            .unzip();
        Ok(Polarizations { plus, cross })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> Parameters {
        [("frequency", 100.0), ("quality", 9.0), ("hrss", 1e-21)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    #[test]
    fn test_sine_gaussian_shape() {
        let gen = SineGaussian::new(2048.0, 1.0);
        let pol = gen.generate(&params()).unwrap();
        assert_eq!(pol.len(), 2048);
        // envelope peaks in the middle and decays at the edges
        let peak = pol.cross[1024].abs();
        assert!(peak > 0.0);
        assert!(pol.cross[0].abs() < peak * 1e-6);
    }

    #[test]
    fn test_hrss_normalisation() {
        let gen = SineGaussian::new(4096.0, 1.0);
        let pol = gen.generate(&params()).unwrap();
        let hrss = (pol.plus.iter().map(|h| h * h).sum::<f64>() / 4096.0).sqrt();
        assert!((hrss - 1e-21).abs() / 1e-21 < 0.05, "hrss = {hrss:e}");
    }

    #[test]
    fn test_missing_parameter() {
        let gen = SineGaussian::new(1024.0, 1.0);
        let mut p = params();
        p.remove("quality");
        assert_eq!(
            gen.generate(&p),
            Err(WaveformError::MissingParameter("quality".to_string()))
        );
    }
}
