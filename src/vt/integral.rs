//! Importance-sampled volume-time integral.
//!
//! Recovered injections are treated as draws from the source population.
//! Reweighting them by `target / source` densities estimates the VT that a
//! different population would produce, without re-running the injection
//! campaign.

use std::collections::BTreeMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{PI_OVER_TWO, YEARS_PER_SECOND};
use crate::injection::{PriorDict, PriorError};
use crate::statistics::{effective_sample_size, WeightMoments};
use crate::types::Parameters;

use super::cosmology::{Cosmology, CosmologyError};
use super::volume::calculate_astrophysical_volume;

/// Relative size below which a negative variance is treated as rounding.
const VARIANCE_CLAMP_RTOL: f64 = 1e-12;

/// Errors raised while setting up or evaluating a VT integral.
#[derive(Debug, Error)]
pub enum VtError {
    /// `n_injections` was zero.
    #[error("number of injections must be positive")]
    NoInjections,
    /// More rows were recovered than injections were made.
    #[error("{recovered} recovered injections exceed the {n_injections} performed")]
    TooManyRecovered {
        /// Rows in the recovered table.
        recovered: usize,
        /// Injections performed.
        n_injections: usize,
    },
    /// Livetime was negative or not finite.
    #[error("livetime must be finite and non-negative, got {0}s")]
    InvalidLivetime(f64),
    /// Recovered-parameter columns differ in length.
    #[error("column '{key}' has {found} rows, expected {expected}")]
    RaggedColumns {
        /// Offending column.
        key: String,
        /// Expected row count.
        expected: usize,
        /// Actual row count.
        found: usize,
    },
    /// The source prior lacks the bounds needed for the volume.
    #[error("source prior has no bounded '{0}' parameter")]
    MissingBounds(String),
    /// An importance weight was NaN or infinite.
    #[error("weight of recovered sample {index} is not finite ({value})")]
    NonFiniteWeight {
        /// Row index in the recovered table.
        index: usize,
        /// Offending weight.
        value: f64,
    },
    /// The variance estimate was negative beyond rounding.
    #[error("variance estimate is negative ({variance:e}) beyond rounding tolerance")]
    NegativeVariance {
        /// Raw variance before clamping.
        variance: f64,
    },
    /// Density evaluation failed.
    #[error(transparent)]
    Prior(#[from] PriorError),
    /// Volume computation failed.
    #[error(transparent)]
    Cosmology(#[from] CosmologyError),
}

/// Column table of recovered injection parameters.
///
/// Every column has the same number of rows; row `i` across all columns is
/// one recovered injection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecoveredParameters {
    columns: BTreeMap<String, Vec<f64>>,
    n_rows: usize,
}

impl RecoveredParameters {
    /// Build a table, checking that all columns have equal length.
    pub fn new(columns: BTreeMap<String, Vec<f64>>) -> Result<Self, VtError> {
        let n_rows = columns.values().next().map_or(0, Vec::len);
        for (key, col) in &columns {
            if col.len() != n_rows {
                return Err(VtError::RaggedColumns {
                    key: key.clone(),
                    expected: n_rows,
                    found: col.len(),
                });
            }
        }
        Ok(Self { columns, n_rows })
    }

    /// Build a table from row-wise parameter sets.
    ///
    /// Rows must all carry the same keys.
    pub fn from_rows(rows: &[Parameters]) -> Result<Self, VtError> {
        let mut columns: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for row in rows {
            for (key, value) in row {
                columns.entry(key.clone()).or_default().push(*value);
            }
        }
        Self::new(columns)
    }

    /// Number of recovered injections.
    pub fn len(&self) -> usize {
        self.n_rows
    }

    /// Whether nothing was recovered.
    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    /// Column for `key`.
    pub fn column(&self, key: &str) -> Option<&[f64]> {
        self.columns.get(key).map(Vec::as_slice)
    }

    /// Row `index` as a parameter set.
    pub fn row(&self, index: usize) -> Option<Parameters> {
        if index >= self.n_rows {
            return None;
        }
        Some(
            self.columns
                .iter()
                .map(|(k, col)| (k.clone(), col[index]))
                .collect(),
        )
    }

    /// Iterate over rows.
    pub fn rows(&self) -> impl Iterator<Item = Parameters> + '_ {
        (0..self.n_rows).filter_map(move |i| self.row(i))
    }
}

/// Result of one VT evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VtEstimate {
    /// Volume-time in Mpc³·yr.
    pub volume_time: f64,
    /// Standard deviation of the estimate.
    pub std: f64,
    /// Effective number of samples, `VT² / variance`.
    pub n_eff: f64,
    /// Whether a slightly negative variance was clamped to zero.
    pub variance_clamped: bool,
}

/// VT integral over a fixed set of recovered injections.
pub struct VolumeTimeIntegral<'a> {
    source: PriorDict,
    recovered: RecoveredParameters,
    n_injections: usize,
    livetime: f64,
    volume: f64,
    cosmology: &'a dyn Cosmology,
}

impl<'a> VolumeTimeIntegral<'a> {
    /// Set up the integral and compute the astrophysical volume of `source`.
    ///
    /// The distance range comes from the source's `luminosity_distance`
    /// prior, or its `redshift` prior converted through `cosmology`. Without
    /// a `dec` prior the full sky is assumed.
    pub fn new(
        source: PriorDict,
        recovered: RecoveredParameters,
        n_injections: usize,
        livetime: f64,
        cosmology: &'a dyn Cosmology,
    ) -> Result<Self, VtError> {
        if n_injections == 0 {
            return Err(VtError::NoInjections);
        }
        if recovered.len() > n_injections {
            return Err(VtError::TooManyRecovered {
                recovered: recovered.len(),
                n_injections,
            });
        }
        if !livetime.is_finite() || livetime < 0.0 {
            return Err(VtError::InvalidLivetime(livetime));
        }

        let (dl_min, dl_max) = distance_bounds(&source, cosmology)?;
        let (dec_min, dec_max) = source
            .bounds("dec")
            .unwrap_or((-PI_OVER_TWO, PI_OVER_TWO));
        let volume = calculate_astrophysical_volume(dl_min, dl_max, dec_min, dec_max, cosmology)?;
        debug!(
            "VT integral over {} recovered of {} injections, livetime {}s, volume {:.4e} Mpc^3",
            recovered.len(),
            n_injections,
            livetime,
            volume
        );

        Ok(Self {
            source,
            recovered,
            n_injections,
            livetime,
            volume,
            cosmology,
        })
    }

    /// Override the astrophysical volume (Mpc³).
    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = volume;
        self
    }

    /// Astrophysical volume in Mpc³.
    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Cosmology the volume was computed with.
    pub fn cosmology(&self) -> &dyn Cosmology {
        self.cosmology
    }

    /// Recovered injections.
    pub fn recovered(&self) -> &RecoveredParameters {
        &self.recovered
    }

    /// `livetime · volume` in Mpc³·yr.
    pub fn v0(&self) -> f64 {
        self.livetime * YEARS_PER_SECOND * self.volume
    }

    /// Importance weights `target / source` for each recovered row.
    ///
    /// With no target the source is used and every weight is exactly 1.
    pub fn weights(&self, target: Option<&PriorDict>) -> Result<Vec<f64>, VtError> {
        let Some(target) = target else {
            return Ok(vec![1.0; self.recovered.len()]);
        };
        let mut weights = Vec::with_capacity(self.recovered.len());
        for (index, row) in self.recovered.rows().enumerate() {
            let log_w = target.log_density(&row)? - self.source.log_density(&row)?;
            let value = log_w.exp();
            if !value.is_finite() {
                return Err(VtError::NonFiniteWeight { index, value });
            }
            weights.push(value);
        }
        Ok(weights)
    }

    /// VT, its standard deviation and the effective sample size.
    pub fn calculate_vt(&self, target: Option<&PriorDict>) -> Result<VtEstimate, VtError> {
        let weights = self.weights(target)?;
        let moments = WeightMoments::from_weights(&weights);
        let n = self.n_injections;

        let v0 = self.v0();
        let mu = moments.mean_over(n);
        let volume_time = mu * v0;

        let raw = moments.variance_of_mean(n) * v0 * v0;
        let scale = (moments.sum_sq / (n as f64).powi(2)) * v0 * v0;
        let (variance, variance_clamped) = if raw >= 0.0 {
            (raw, false)
        } else if -raw <= VARIANCE_CLAMP_RTOL * scale {
            warn!("clamping variance {:e} to zero", raw);
            (0.0, true)
        } else {
            return Err(VtError::NegativeVariance { variance: raw });
        };

        let n_eff = if volume_time == 0.0 {
            0.0
        } else if variance == 0.0 {
            f64::INFINITY
        } else {
            volume_time * volume_time / variance
        };
        debug!(
            "VT = {:.4e} +/- {:.4e}, n_eff = {:.1} (Kish {:.1})",
            volume_time,
            variance.sqrt(),
            n_eff,
            effective_sample_size(&weights)
        );

        Ok(VtEstimate {
            volume_time,
            std: variance.sqrt(),
            n_eff,
            variance_clamped,
        })
    }
}

fn distance_bounds(source: &PriorDict, cosmology: &dyn Cosmology) -> Result<(f64, f64), VtError> {
    if let Some(bounds) = source.bounds("luminosity_distance") {
        return Ok(bounds);
    }
    let (z_min, z_max) = source
        .bounds("redshift")
        .ok_or_else(|| VtError::MissingBounds("luminosity_distance".to_string()))?;
    Ok((
        cosmology.luminosity_distance(z_min)?,
        cosmology.luminosity_distance(z_max)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::SECONDS_PER_YEAR;
    use crate::injection::Prior;
    use crate::vt::FlatLambdaCdm;

    fn source() -> PriorDict {
        let mut prior = PriorDict::new();
        prior
            .insert("luminosity_distance", Prior::uniform(0.0, 100.0))
            .unwrap()
            .insert("mass_1", Prior::uniform(10.0, 50.0))
            .unwrap();
        prior
    }

    fn recovered(n: usize) -> RecoveredParameters {
        let rows: Vec<Parameters> = (0..n)
            .map(|i| {
                let mut p = Parameters::new();
                p.insert("luminosity_distance".into(), 1.0 + i as f64 % 90.0);
                p.insert("mass_1".into(), 10.0 + (i % 40) as f64);
                p
            })
            .collect();
        RecoveredParameters::from_rows(&rows).unwrap()
    }

    #[test]
    fn test_ragged_columns_rejected() {
        let mut cols = BTreeMap::new();
        cols.insert("a".to_string(), vec![1.0, 2.0]);
        cols.insert("b".to_string(), vec![1.0]);
        assert!(matches!(
            RecoveredParameters::new(cols),
            Err(VtError::RaggedColumns { .. })
        ));
    }

    #[test]
    fn test_zero_injections_is_error() {
        let cosmo = FlatLambdaCdm::planck15();
        let err = VolumeTimeIntegral::new(source(), recovered(0), 0, 1.0, &cosmo);
        assert!(matches!(err, Err(VtError::NoInjections)));
    }

    #[test]
    fn test_identity_target_gives_unit_weights() {
        let cosmo = FlatLambdaCdm::planck15();
        let vt = VolumeTimeIntegral::new(source(), recovered(50), 1000, SECONDS_PER_YEAR, &cosmo)
            .unwrap();
        let src = source();
        let weights = vt.weights(Some(&src)).unwrap();
        assert!(weights.iter().all(|w| (w - 1.0).abs() < 1e-12));
        assert_eq!(vt.weights(None).unwrap(), vec![1.0; 50]);
    }

    #[test]
    fn test_concrete_scenario() {
        let cosmo = FlatLambdaCdm::planck15();
        let vt = VolumeTimeIntegral::new(source(), recovered(100), 10_000, SECONDS_PER_YEAR, &cosmo)
            .unwrap()
            .with_volume(1.0);
        let est = vt.calculate_vt(None).unwrap();
        assert!((est.volume_time - 0.01).abs() < 1e-15);
        assert!((est.std * est.std - 9.9e-7).abs() < 1e-15);
        assert!((est.n_eff - 0.0001 / 9.9e-7).abs() < 1e-6);
        assert!(!est.variance_clamped);
    }

    #[test]
    fn test_all_recovered_clamps_variance() {
        let cosmo = FlatLambdaCdm::planck15();
        let vt = VolumeTimeIntegral::new(source(), recovered(10), 10, SECONDS_PER_YEAR, &cosmo)
            .unwrap()
            .with_volume(1.0);
        let est = vt.calculate_vt(None).unwrap();
        assert!((est.volume_time - 1.0).abs() < 1e-12);
        assert_eq!(est.std, 0.0);
        assert!(est.n_eff.is_infinite());
    }

    #[test]
    fn test_nothing_recovered() {
        let cosmo = FlatLambdaCdm::planck15();
        let vt = VolumeTimeIntegral::new(source(), recovered(0), 10, SECONDS_PER_YEAR, &cosmo)
            .unwrap();
        let est = vt.calculate_vt(None).unwrap();
        assert_eq!(est.volume_time, 0.0);
        assert_eq!(est.n_eff, 0.0);
    }

    #[test]
    fn test_target_outside_source_support() {
        let cosmo = FlatLambdaCdm::planck15();
        let vt = VolumeTimeIntegral::new(source(), recovered(20), 100, SECONDS_PER_YEAR, &cosmo)
            .unwrap();
        let mut narrow = PriorDict::new();
        narrow
            .insert("luminosity_distance", Prior::uniform(0.0, 100.0))
            .unwrap()
            .insert("mass_1", Prior::uniform(10.0, 20.0))
            .unwrap();
        let weights = vt.weights(Some(&narrow)).unwrap();
        // rows with mass_1 > 20 get zero weight, the rest get 4
        assert!(weights.iter().all(|w| *w == 0.0 || (w - 4.0).abs() < 1e-9));
        assert!(weights.iter().any(|w| *w == 0.0));
    }
}
