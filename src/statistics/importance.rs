//! Importance-sampling moments.
//!
//! The VT estimator only needs the first two raw moments of the weights, so
//! they are accumulated in one pass and kept together with the sample count.

/// Running sums of importance weights.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WeightMoments {
    /// Number of weights accumulated.
    pub count: usize,
    /// Σ w_i.
    pub sum: f64,
    /// Σ w_i².
    pub sum_sq: f64,
}

impl WeightMoments {
    /// Accumulate moments from a slice of weights.
    pub fn from_weights(weights: &[f64]) -> Self {
        weights.iter().fold(Self::default(), |mut acc, &w| {
            acc.push(w);
            acc
        })
    }

    /// Add one weight.
    #[inline]
    pub fn push(&mut self, w: f64) {
        self.count += 1;
        self.sum += w;
        self.sum_sq += w * w;
    }

    /// Mean of the weights over `n` trials (not over `count`).
    ///
    /// Trials that produced no weight contribute zero, which is how recovery
    /// efficiency enters the Monte-Carlo mean.
    pub fn mean_over(&self, n: usize) -> f64 {
        self.sum / n as f64
    }

    /// Variance of that mean: `Σw²/n² − μ²/n`.
    pub fn variance_of_mean(&self, n: usize) -> f64 {
        let n = n as f64;
        let mu = self.sum / n;
        self.sum_sq / (n * n) - mu * mu / n
    }
}

/// Kish effective sample size `(Σw)² / Σw²`.
///
/// Returns 0 for an empty or all-zero weight set.
pub fn effective_sample_size(weights: &[f64]) -> f64 {
    let m = WeightMoments::from_weights(weights);
    if m.sum_sq == 0.0 {
        return 0.0;
    }
    m.sum * m.sum / m.sum_sq
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_weights() {
        let w = vec![1.0; 100];
        let m = WeightMoments::from_weights(&w);
        assert_eq!(m.count, 100);
        assert_eq!(m.mean_over(10_000), 0.01);
        let var = m.variance_of_mean(10_000);
        assert!((var - 9.9e-7).abs() < 1e-15);
        assert!((effective_sample_size(&w) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_dominated_weights_have_small_ess() {
        let mut w = vec![1e-3; 99];
        w.push(100.0);
        assert!(effective_sample_size(&w) < 1.1);
    }

    #[test]
    fn test_empty() {
        assert_eq!(effective_sample_size(&[]), 0.0);
    }
}
