//! Signal-to-noise ratio of projected waveforms.

use thiserror::Error;

/// Errors computing an SNR.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SnrError {
    /// The background carries no usable noise estimate.
    #[error("background has no usable noise variance ({variance})")]
    DegenerateBackground { variance: f64 },

    /// The calculator produced an SNR that cannot be recorded.
    #[error("non-finite SNR: {0}")]
    NonFinite(f64),
}

/// Capability computing the optimal SNR of a response against local noise.
pub trait SnrCalculator: Send + Sync {
    /// SNR of `response` given the detector's `background` around it.
    fn snr(&self, response: &[f64], background: &[f64], sample_rate: f64)
        -> Result<f64, SnrError>;
}

/// SNR assuming white noise with the background's sample variance.
///
/// `snr² = Σ h² / σ²`. A background with zero, empty or non-finite variance
/// is an error.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WhiteNoiseSnr;

impl SnrCalculator for WhiteNoiseSnr {
    fn snr(
        &self,
        response: &[f64],
        background: &[f64],
        _sample_rate: f64,
    ) -> Result<f64, SnrError> {
        let n = background.len() as f64;
        let mean = background.iter().sum::<f64>() / n;
        let var = background.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        if !(var > 0.0 && var.is_finite()) {
            return Err(SnrError::DegenerateBackground { variance: var });
        }
        let power: f64 = response.iter().map(|h| h * h).sum();
        let snr = (power / var).sqrt();
        if !snr.is_finite() {
            return Err(SnrError::NonFinite(snr));
        }
        Ok(snr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snr_scales_linearly() {
        let background: Vec<f64> = (0..1000).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let h = vec![0.5; 16];
        let snr = WhiteNoiseSnr.snr(&h, &background, 1024.0).unwrap();
        assert!((snr - 2.0).abs() < 1e-12);
        let h2: Vec<f64> = h.iter().map(|x| 3.0 * x).collect();
        assert!((WhiteNoiseSnr.snr(&h2, &background, 1024.0).unwrap() - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_signal_has_zero_snr() {
        assert_eq!(WhiteNoiseSnr.snr(&[0.0; 4], &[1.0, -1.0], 1.0), Ok(0.0));
    }

    #[test]
    fn test_flat_background_is_an_error() {
        assert!(matches!(
            WhiteNoiseSnr.snr(&[1.0], &[2.0, 2.0], 1.0),
            Err(SnrError::DegenerateBackground { .. })
        ));
        assert!(matches!(
            WhiteNoiseSnr.snr(&[0.0], &[0.0; 64], 1.0),
            Err(SnrError::DegenerateBackground { .. })
        ));
        assert!(WhiteNoiseSnr.snr(&[1.0], &[], 1.0).is_err());
        assert!(WhiteNoiseSnr.snr(&[1.0], &[f64::NAN, 1.0], 1.0).is_err());
    }
}
