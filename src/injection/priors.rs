//! Source-population priors.
//!
//! A [`PriorDict`] is an ordered set of named one-dimensional [`Prior`]s. It
//! can draw joint parameter sets (with rejection on [`Prior::Constraint`]
//! entries) and evaluate the joint log density, which is what the VT
//! estimator needs for importance weights.
//!
//! Each variant implements the same small protocol: `sample`, `log_density`
//! and `bounds`. Conditional priors read earlier parameters of the same draw,
//! so entries are sampled in insertion order.

use std::f64::consts::PI;

use rand::Rng;
use rand_distr::{Distribution, LogNormal, Normal};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Parameters;
use crate::vt::{Cosmology, CosmologyError};

/// Rejection-sampling attempts before a constraint is declared unsatisfiable.
const MAX_CONSTRAINT_ATTEMPTS: usize = 100_000;

/// Grid size used when tabulating cosmology-dependent densities.
const INTERPOLATION_POINTS: usize = 1000;

/// Errors from building, sampling or evaluating priors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PriorError {
    /// A prior's parameters are invalid (e.g. `minimum >= maximum`).
    #[error("invalid prior '{key}': {reason}")]
    InvalidPrior {
        /// Parameter name.
        key: String,
        /// Description of the problem.
        reason: String,
    },
    /// A parameter needed for evaluation or conditioning is absent.
    #[error("missing parameter '{0}'")]
    MissingParameter(String),
    /// Constraints rejected every draw.
    #[error("constraints rejected {attempts} consecutive draws")]
    ConstraintUnsatisfiable {
        /// Number of attempts made.
        attempts: usize,
    },
    /// The conditioning parameter leaves no room above the lower bound.
    #[error("'{condition}' = {cap} leaves an empty support above {minimum}")]
    EmptySupport {
        /// Conditioning parameter.
        condition: String,
        /// Its drawn value.
        cap: f64,
        /// Lower bound of the conditional prior.
        minimum: f64,
    },
    /// Tabulating a cosmological density failed.
    #[error(transparent)]
    Cosmology(#[from] CosmologyError),
}

/// A one-dimensional prior distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Prior {
    /// Uniform on `[minimum, maximum]`.
    Uniform {
        /// Lower bound.
        minimum: f64,
        /// Upper bound.
        maximum: f64,
    },
    /// `p(x) ∝ x^alpha` on `[minimum, maximum]`.
    PowerLaw {
        /// Spectral index.
        alpha: f64,
        /// Lower bound (positive).
        minimum: f64,
        /// Upper bound.
        maximum: f64,
    },
    /// Normal distribution.
    Gaussian {
        /// Mean.
        mu: f64,
        /// Standard deviation.
        sigma: f64,
    },
    /// Log-normal distribution with underlying normal `(mu, sigma)`.
    LogNormal {
        /// Mean of `ln x`.
        mu: f64,
        /// Standard deviation of `ln x`.
        sigma: f64,
    },
    /// `p(x) ∝ cos x`, e.g. declination.
    Cosine {
        /// Lower bound.
        minimum: f64,
        /// Upper bound.
        maximum: f64,
    },
    /// `p(x) ∝ sin x`, e.g. inclination.
    Sine {
        /// Lower bound.
        minimum: f64,
        /// Upper bound.
        maximum: f64,
    },
    /// Fixed value.
    Constant {
        /// The value every draw takes.
        value: f64,
    },
    /// Not sampled; rejects draws whose (possibly derived) value falls
    /// outside `[minimum, maximum]`.
    Constraint {
        /// Lower bound.
        minimum: f64,
        /// Upper bound.
        maximum: f64,
    },
    /// Tabulated density with linear interpolation.
    Interpolated {
        /// Strictly increasing abscissae.
        xs: Vec<f64>,
        /// Normalised density at `xs`.
        pdf: Vec<f64>,
        /// Cumulative distribution at `xs` (0 to 1).
        cdf: Vec<f64>,
    },
    /// Power law whose upper bound is capped by another parameter of the
    /// same draw, e.g. `mass_2 <= mass_1`.
    ConditionalPowerLaw {
        /// Spectral index.
        alpha: f64,
        /// Lower bound.
        minimum: f64,
        /// Upper bound before conditioning.
        maximum: f64,
        /// Parameter whose value caps `maximum`.
        condition: String,
    },
}

impl Prior {
    /// Uniform prior.
    pub fn uniform(minimum: f64, maximum: f64) -> Self {
        Prior::Uniform { minimum, maximum }
    }

    /// Power-law prior.
    pub fn power_law(alpha: f64, minimum: f64, maximum: f64) -> Self {
        Prior::PowerLaw {
            alpha,
            minimum,
            maximum,
        }
    }

    /// Cosine prior over the full declination range.
    pub fn cosine() -> Self {
        Prior::Cosine {
            minimum: -PI / 2.0,
            maximum: PI / 2.0,
        }
    }

    /// Sine prior over `[0, π]`.
    pub fn sine() -> Self {
        Prior::Sine {
            minimum: 0.0,
            maximum: PI,
        }
    }

    /// Tabulate an unnormalised density `f` on `[minimum, maximum]`.
    pub fn interpolated<F>(f: F, minimum: f64, maximum: f64, points: usize) -> Result<Self, PriorError>
    where
        F: Fn(f64) -> Result<f64, PriorError>,
    {
        let points = points.max(2);
        let step = (maximum - minimum) / (points - 1) as f64;
        let xs: Vec<f64> = (0..points).map(|i| minimum + step * i as f64).collect();
        let raw = xs.iter().map(|&x| f(x)).collect::<Result<Vec<f64>, _>>()?;

        let mut cdf = Vec::with_capacity(points);
        cdf.push(0.0);
        for i in 1..points {
            let area = 0.5 * (raw[i] + raw[i - 1]) * (xs[i] - xs[i - 1]);
            cdf.push(cdf[i - 1] + area);
        }
        let norm = cdf[points - 1];
        if !(norm > 0.0 && norm.is_finite()) {
            return Err(PriorError::InvalidPrior {
                key: "interpolated".to_string(),
                reason: format!("density integrates to {norm}"),
            });
        }
        let pdf = raw.iter().map(|p| p / norm).collect();
        let cdf = cdf.iter().map(|c| c / norm).collect();
        Ok(Prior::Interpolated { xs, pdf, cdf })
    }

    /// Redshift prior uniform in comoving volume and source-frame time,
    /// `p(z) ∝ dV_c/dz / (1 + z)`.
    pub fn uniform_source_frame(
        minimum: f64,
        maximum: f64,
        cosmology: &dyn Cosmology,
    ) -> Result<Self, PriorError> {
        Self::interpolated(
            |z| Ok(cosmology.differential_comoving_volume(z)? / (1.0 + z)),
            minimum,
            maximum,
            INTERPOLATION_POINTS,
        )
    }

    /// Redshift prior uniform in comoving volume, `p(z) ∝ dV_c/dz`.
    pub fn uniform_comoving_volume(
        minimum: f64,
        maximum: f64,
        cosmology: &dyn Cosmology,
    ) -> Result<Self, PriorError> {
        Self::interpolated(
            |z| Ok(cosmology.differential_comoving_volume(z)?),
            minimum,
            maximum,
            INTERPOLATION_POINTS,
        )
    }

    /// Check that the parameters describe a proper distribution.
    pub fn validate(&self, key: &str) -> Result<(), PriorError> {
        let invalid = |reason: String| PriorError::InvalidPrior {
            key: key.to_string(),
            reason,
        };
        let check_range = |minimum: f64, maximum: f64| {
            if minimum.is_finite() && maximum.is_finite() && minimum < maximum {
                Ok(())
            } else {
                Err(invalid(format!("range [{minimum}, {maximum}] is empty or not finite")))
            }
        };
        match self {
            Prior::Uniform { minimum, maximum }
            | Prior::Constraint { minimum, maximum } => check_range(*minimum, *maximum),
            Prior::Cosine { minimum, maximum } => {
                check_range(*minimum, *maximum)?;
                if *minimum < -PI / 2.0 || *maximum > PI / 2.0 {
                    return Err(invalid("cosine prior must lie within [-pi/2, pi/2]".to_string()));
                }
                Ok(())
            }
            Prior::Sine { minimum, maximum } => {
                check_range(*minimum, *maximum)?;
                if *minimum < 0.0 || *maximum > PI {
                    return Err(invalid("sine prior must lie within [0, pi]".to_string()));
                }
                Ok(())
            }
            Prior::PowerLaw {
                minimum, maximum, ..
            }
            | Prior::ConditionalPowerLaw {
                minimum, maximum, ..
            } => {
                check_range(*minimum, *maximum)?;
                if *minimum <= 0.0 {
                    return Err(invalid("power law requires a positive minimum".to_string()));
                }
                Ok(())
            }
            Prior::Gaussian { mu, sigma } | Prior::LogNormal { mu, sigma } => {
                if mu.is_finite() && sigma.is_finite() && *sigma > 0.0 {
                    Ok(())
                } else {
                    Err(invalid(format!("mu = {mu}, sigma = {sigma}")))
                }
            }
            Prior::Constant { value } => {
                if value.is_finite() {
                    Ok(())
                } else {
                    Err(invalid(format!("constant {value} is not finite")))
                }
            }
            Prior::Interpolated { xs, pdf, cdf } => {
                if xs.len() < 2 || xs.len() != pdf.len() || xs.len() != cdf.len() {
                    return Err(invalid("table columns must be equal length >= 2".to_string()));
                }
                if xs.windows(2).any(|w| w[1] <= w[0]) {
                    return Err(invalid("abscissae must be strictly increasing".to_string()));
                }
                Ok(())
            }
        }
    }

    /// Support of the prior, if bounded.
    pub fn bounds(&self) -> Option<(f64, f64)> {
        match self {
            Prior::Uniform { minimum, maximum }
            | Prior::PowerLaw {
                minimum, maximum, ..
            }
            | Prior::Cosine { minimum, maximum }
            | Prior::Sine { minimum, maximum }
            | Prior::Constraint { minimum, maximum }
            | Prior::ConditionalPowerLaw {
                minimum, maximum, ..
            } => Some((*minimum, *maximum)),
            Prior::Constant { value } => Some((*value, *value)),
            Prior::Interpolated { xs, .. } => Some((xs[0], xs[xs.len() - 1])),
            Prior::Gaussian { .. } => None,
            Prior::LogNormal { .. } => Some((0.0, f64::INFINITY)),
        }
    }

    /// Draw one value. Returns `None` for constraints, which are never sampled.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        drawn: &Parameters,
    ) -> Result<Option<f64>, PriorError> {
        let u: f64 = rng.random();
        let value = match self {
            Prior::Uniform { minimum, maximum } => minimum + u * (maximum - minimum),
            Prior::PowerLaw {
                alpha,
                minimum,
                maximum,
            } => power_law_quantile(u, *alpha, *minimum, *maximum),
            Prior::ConditionalPowerLaw {
                alpha,
                minimum,
                maximum,
                condition,
            } => {
                let cap = conditional_maximum(*maximum, condition, drawn)?;
                if cap <= *minimum {
                    return Err(PriorError::EmptySupport {
                        condition: condition.clone(),
                        cap,
                        minimum: *minimum,
                    });
                }
                power_law_quantile(u, *alpha, *minimum, cap)
            }
            Prior::Gaussian { mu, sigma } => sample_normal(rng, *mu, *sigma)?,
            Prior::LogNormal { mu, sigma } => {
                let dist = LogNormal::new(*mu, *sigma).map_err(|e| PriorError::InvalidPrior {
                    key: "log_normal".to_string(),
                    reason: e.to_string(),
                })?;
                dist.sample(rng)
            }
            Prior::Cosine { minimum, maximum } => {
                let (lo, hi) = (minimum.sin(), maximum.sin());
                (lo + u * (hi - lo)).clamp(-1.0, 1.0).asin()
            }
            Prior::Sine { minimum, maximum } => {
                let (lo, hi) = (minimum.cos(), maximum.cos());
                (lo - u * (lo - hi)).clamp(-1.0, 1.0).acos()
            }
            Prior::Constant { value } => *value,
            Prior::Constraint { .. } => return Ok(None),
            Prior::Interpolated { xs, cdf, .. } => interpolate_inverse(u, xs, cdf),
        };
        Ok(Some(value))
    }

    /// Natural log of the density at `x` (`-inf` outside the support).
    ///
    /// Constraints and constants contribute 0 inside their support.
    pub fn log_density(&self, x: f64, drawn: &Parameters) -> Result<f64, PriorError> {
        let inside = |lo: f64, hi: f64| x >= lo && x <= hi;
        let lp = match self {
            Prior::Uniform { minimum, maximum } => {
                if inside(*minimum, *maximum) {
                    -(maximum - minimum).ln()
                } else {
                    f64::NEG_INFINITY
                }
            }
            Prior::PowerLaw {
                alpha,
                minimum,
                maximum,
            } => power_law_log_pdf(x, *alpha, *minimum, *maximum),
            Prior::ConditionalPowerLaw {
                alpha,
                minimum,
                maximum,
                condition,
            } => {
                let cap = conditional_maximum(*maximum, condition, drawn)?;
                power_law_log_pdf(x, *alpha, *minimum, cap)
            }
            Prior::Gaussian { mu, sigma } => {
                let z = (x - mu) / sigma;
                -0.5 * z * z - (sigma * (2.0 * PI).sqrt()).ln()
            }
            Prior::LogNormal { mu, sigma } => {
                if x <= 0.0 {
                    f64::NEG_INFINITY
                } else {
                    let z = (x.ln() - mu) / sigma;
                    -0.5 * z * z - (x * sigma * (2.0 * PI).sqrt()).ln()
                }
            }
            Prior::Cosine { minimum, maximum } => {
                if inside(*minimum, *maximum) {
                    (x.cos() / (maximum.sin() - minimum.sin())).ln()
                } else {
                    f64::NEG_INFINITY
                }
            }
            Prior::Sine { minimum, maximum } => {
                if inside(*minimum, *maximum) {
                    (x.sin() / (minimum.cos() - maximum.cos())).ln()
                } else {
                    f64::NEG_INFINITY
                }
            }
            Prior::Constant { value } => {
                if x == *value {
                    0.0
                } else {
                    f64::NEG_INFINITY
                }
            }
            Prior::Constraint { minimum, maximum } => {
                if inside(*minimum, *maximum) {
                    0.0
                } else {
                    f64::NEG_INFINITY
                }
            }
            Prior::Interpolated { xs, pdf, .. } => interpolate(x, xs, pdf)
                .map(f64::ln)
                .unwrap_or(f64::NEG_INFINITY),
        };
        Ok(lp)
    }
}

fn conditional_maximum(maximum: f64, condition: &str, drawn: &Parameters) -> Result<f64, PriorError> {
    drawn
        .get(condition)
        .map(|cap| cap.min(maximum))
        .ok_or_else(|| PriorError::MissingParameter(condition.to_string()))
}

fn sample_normal<R: Rng + ?Sized>(rng: &mut R, mu: f64, sigma: f64) -> Result<f64, PriorError> {
    let dist = Normal::new(mu, sigma).map_err(|e| PriorError::InvalidPrior {
        key: "gaussian".to_string(),
        reason: e.to_string(),
    })?;
    Ok(dist.sample(rng))
}

fn power_law_quantile(u: f64, alpha: f64, minimum: f64, maximum: f64) -> f64 {
    if (alpha + 1.0).abs() < 1e-12 {
        minimum * (maximum / minimum).powf(u)
    } else {
        let a1 = alpha + 1.0;
        let lo = minimum.powf(a1);
        let hi = maximum.powf(a1);
        (lo + u * (hi - lo)).powf(1.0 / a1)
    }
}

fn power_law_log_pdf(x: f64, alpha: f64, minimum: f64, maximum: f64) -> f64 {
    if x < minimum || x > maximum || maximum <= minimum {
        return f64::NEG_INFINITY;
    }
    if (alpha + 1.0).abs() < 1e-12 {
        -(x * (maximum / minimum).ln()).ln()
    } else {
        let a1 = alpha + 1.0;
        let norm = a1 / (maximum.powf(a1) - minimum.powf(a1));
        norm.ln() + alpha * x.ln()
    }
}

fn interpolate(x: f64, xs: &[f64], ys: &[f64]) -> Option<f64> {
    if x < xs[0] || x > xs[xs.len() - 1] {
        return None;
    }
    let i = xs.partition_point(|&v| v <= x).clamp(1, xs.len() - 1);
    let (x0, x1) = (xs[i - 1], xs[i]);
    let t = (x - x0) / (x1 - x0);
    Some(ys[i - 1] + t * (ys[i] - ys[i - 1]))
}

fn interpolate_inverse(u: f64, xs: &[f64], cdf: &[f64]) -> f64 {
    let i = cdf.partition_point(|&c| c < u).clamp(1, cdf.len() - 1);
    let (c0, c1) = (cdf[i - 1], cdf[i]);
    if c1 <= c0 {
        return xs[i];
    }
    let t = (u - c0) / (c1 - c0);
    xs[i - 1] + t * (xs[i] - xs[i - 1])
}

/// Parameters derived from sampled ones before constraints are checked.
fn derived_parameters(params: &Parameters) -> Parameters {
    let mut out = params.clone();
    if let (Some(m1), Some(m2)) = (params.get("mass_1"), params.get("mass_2")) {
        out.entry("mass_ratio".to_string()).or_insert(m2 / m1);
    }
    out
}

/// Ordered collection of named priors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriorDict {
    entries: Vec<(String, Prior)>,
}

impl PriorDict {
    /// Empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace `key`, validating the prior first.
    ///
    /// Replacing keeps the key's original position in the sampling order.
    pub fn insert(&mut self, key: impl Into<String>, prior: Prior) -> Result<&mut Self, PriorError> {
        let key = key.into();
        prior.validate(&key)?;
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = prior,
            None => self.entries.push((key, prior)),
        }
        Ok(self)
    }

    /// Merge all entries of `other` into `self`.
    pub fn extend(&mut self, other: PriorDict) -> Result<&mut Self, PriorError> {
        for (key, prior) in other.entries {
            self.insert(key, prior)?;
        }
        Ok(self)
    }

    /// Prior for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&Prior> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, p)| p)
    }

    /// Whether `key` has a prior.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Parameter names in sampling order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Support of `key`'s prior.
    pub fn bounds(&self, key: &str) -> Option<(f64, f64)> {
        self.get(key).and_then(Prior::bounds)
    }

    /// Number of priors, constraints included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the dictionary is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Draw one joint parameter set.
    ///
    /// Draws violating a constraint, or leaving a conditional prior with an
    /// empty support, are discarded and redrawn; the number of discarded
    /// draws is returned alongside the accepted parameters.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<(Parameters, u64), PriorError> {
        let mut rejected = 0u64;
        'draw: for _ in 0..MAX_CONSTRAINT_ATTEMPTS {
            let mut params = Parameters::new();
            for (key, prior) in &self.entries {
                match prior.sample(rng, &params) {
                    Ok(Some(value)) => {
                        params.insert(key.clone(), value);
                    }
                    Ok(None) => {}
                    Err(PriorError::EmptySupport { .. }) => {
                        rejected += 1;
                        continue 'draw;
                    }
                    Err(e) => return Err(e),
                }
            }
            if self.satisfies_constraints(&params) {
                return Ok((params, rejected));
            }
            rejected += 1;
        }
        Err(PriorError::ConstraintUnsatisfiable {
            attempts: MAX_CONSTRAINT_ATTEMPTS,
        })
    }

    /// Draw `n` joint parameter sets, returning them with the total number
    /// of rejected draws.
    pub fn sample_n<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        n: usize,
    ) -> Result<(Vec<Parameters>, u64), PriorError> {
        let mut out = Vec::with_capacity(n);
        let mut rejected = 0;
        for _ in 0..n {
            let (params, r) = self.sample(rng)?;
            rejected += r;
            out.push(params);
        }
        Ok((out, rejected))
    }

    fn satisfies_constraints(&self, params: &Parameters) -> bool {
        let has_constraints = self
            .entries
            .iter()
            .any(|(_, p)| matches!(p, Prior::Constraint { .. }));
        if !has_constraints {
            return true;
        }
        let derived = derived_parameters(params);
        self.entries.iter().all(|(key, prior)| match prior {
            Prior::Constraint { minimum, maximum } => derived
                .get(key)
                .map(|v| *v >= *minimum && *v <= *maximum)
                .unwrap_or(false),
            _ => true,
        })
    }

    /// Joint log density of `params` (constraints act as indicators).
    ///
    /// Constant priors whose key is absent from `params` are skipped; any
    /// other missing key is an error.
    pub fn log_density(&self, params: &Parameters) -> Result<f64, PriorError> {
        let derived = derived_parameters(params);
        let mut total = 0.0;
        for (key, prior) in &self.entries {
            let value = match derived.get(key) {
                Some(v) => *v,
                None if matches!(prior, Prior::Constant { .. }) => continue,
                None => return Err(PriorError::MissingParameter(key.clone())),
            };
            total += prior.log_density(value, &derived)?;
            if total == f64::NEG_INFINITY {
                break;
            }
        }
        Ok(total)
    }

    /// Joint density of `params`.
    pub fn prob(&self, params: &Parameters) -> Result<f64, PriorError> {
        self.log_density(params).map(f64::exp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn rng() -> Xoshiro256PlusPlus {
        Xoshiro256PlusPlus::seed_from_u64(7)
    }

    #[test]
    fn test_uniform_sampling_in_bounds() {
        let prior = Prior::uniform(-3.0, 5.0);
        let mut rng = rng();
        let empty = Parameters::new();
        let samples: Vec<f64> = (0..10_000)
            .map(|_| prior.sample(&mut rng, &empty).unwrap().unwrap())
            .collect();
        assert!(samples.iter().all(|x| (-3.0..=5.0).contains(x)));
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        let std_err = (64.0_f64 / 12.0 / 10_000.0).sqrt();
        assert!((mean - 1.0).abs() < 4.0 * std_err);
    }

    #[test]
    fn test_cosine_and_sine_support() {
        let mut rng = rng();
        let empty = Parameters::new();
        for _ in 0..1000 {
            let dec = Prior::cosine().sample(&mut rng, &empty).unwrap().unwrap();
            assert!(dec.abs() <= PI / 2.0);
            let inc = Prior::sine().sample(&mut rng, &empty).unwrap().unwrap();
            assert!((0.0..=PI).contains(&inc));
        }
    }

    #[test]
    fn test_densities_normalise() {
        let empty = Parameters::new();
        for prior in [
            Prior::uniform(0.0, 2.0),
            Prior::power_law(-2.35, 5.0, 100.0),
            Prior::power_law(-1.0, 1.0, 10.0),
            Prior::cosine(),
            Prior::sine(),
        ] {
            let (lo, hi) = prior.bounds().unwrap();
            let integral = crate::statistics::integrate(
                |x| prior.log_density(x, &empty).unwrap().exp(),
                lo,
                hi,
                1e-9,
            )
            .unwrap();
            assert!((integral - 1.0).abs() < 1e-6, "{prior:?} -> {integral}");
        }
    }

    #[test]
    fn test_log_normal_positive() {
        let prior = Prior::LogNormal { mu: 1.0, sigma: 0.5 };
        let mut rng = rng();
        let empty = Parameters::new();
        for _ in 0..1000 {
            assert!(prior.sample(&mut rng, &empty).unwrap().unwrap() > 0.0);
        }
        assert_eq!(prior.log_density(-1.0, &empty).unwrap(), f64::NEG_INFINITY);
    }

    #[test]
    fn test_conditional_power_law_respects_condition() {
        let mut dict = PriorDict::new();
        dict.insert("mass_1", Prior::uniform(5.0, 100.0)).unwrap();
        dict.insert(
            "mass_2",
            Prior::ConditionalPowerLaw {
                alpha: 1.0,
                minimum: 5.0,
                maximum: 100.0,
                condition: "mass_1".to_string(),
            },
        )
        .unwrap();
        let mut rng = rng();
        for _ in 0..1000 {
            let (p, rejected) = dict.sample(&mut rng).unwrap();
            assert_eq!(rejected, 0);
            assert!(p["mass_2"] <= p["mass_1"]);
        }
    }

    #[test]
    fn test_empty_conditional_support_is_rejected() {
        let mut dict = PriorDict::new();
        dict.insert("mass_1", Prior::uniform(5.0, 20.0)).unwrap();
        dict.insert(
            "mass_2",
            Prior::ConditionalPowerLaw {
                alpha: 0.0,
                minimum: 10.0,
                maximum: 50.0,
                condition: "mass_1".to_string(),
            },
        )
        .unwrap();
        let mut rng = rng();
        let (draws, rejected) = dict.sample_n(&mut rng, 600).unwrap();
        // a third of mass_1 draws fall below the mass_2 minimum
        assert!(rejected > 200 && rejected < 400, "rejected = {rejected}");
        for p in &draws {
            assert!(p["mass_1"] > 10.0);
            assert!(p["mass_2"] >= 10.0 && p["mass_2"] <= p["mass_1"]);
            assert!(dict.log_density(p).unwrap().is_finite());
        }

        let low: Parameters = [("mass_1".to_string(), 8.0)].into_iter().collect();
        let conditional = dict.get("mass_2").unwrap();
        assert!(matches!(
            conditional.sample(&mut rng, &low),
            Err(PriorError::EmptySupport { cap, .. }) if cap == 8.0
        ));
        assert_eq!(conditional.log_density(10.0, &low).unwrap(), f64::NEG_INFINITY);
    }

    #[test]
    fn test_constraint_rejection_counts() {
        let mut dict = PriorDict::new();
        dict.insert("mass_1", Prior::uniform(5.0, 100.0)).unwrap();
        dict.insert("mass_2", Prior::uniform(5.0, 100.0)).unwrap();
        dict.insert("mass_ratio", Prior::Constraint { minimum: 0.0, maximum: 1.0 })
            .unwrap();
        let mut rng = rng();
        let (draws, rejected) = dict.sample_n(&mut rng, 2000).unwrap();
        assert!(draws.iter().all(|p| p["mass_2"] <= p["mass_1"]));
        assert!(!draws[0].contains_key("mass_ratio"));
        // about half of the unconstrained draws are rejected
        assert!(rejected > 1500 && rejected < 2500, "rejected = {rejected}");
    }

    #[test]
    fn test_log_density_missing_key() {
        let mut dict = PriorDict::new();
        dict.insert("ra", Prior::uniform(0.0, 2.0 * PI)).unwrap();
        dict.insert("psi", Prior::Constant { value: 0.0 }).unwrap();
        let mut p = Parameters::new();
        p.insert("ra".to_string(), 1.0);
        let lp = dict.log_density(&p).unwrap();
        assert!((lp + (2.0 * PI).ln()).abs() < 1e-12);
        assert_eq!(
            dict.log_density(&Parameters::new()),
            Err(PriorError::MissingParameter("ra".to_string()))
        );
    }

    #[test]
    fn test_invalid_prior_rejected() {
        let mut dict = PriorDict::new();
        assert!(dict.insert("x", Prior::uniform(1.0, 1.0)).is_err());
        assert!(dict.insert("x", Prior::Gaussian { mu: 0.0, sigma: 0.0 }).is_err());
        assert!(dict.insert("x", Prior::power_law(2.0, 0.0, 1.0)).is_err());
        assert!(dict.is_empty());
    }

    #[test]
    fn test_interpolated_matches_uniform() {
        let prior = Prior::interpolated(|_| Ok(1.0), 0.0, 4.0, 50).unwrap();
        let empty = Parameters::new();
        assert!((prior.log_density(2.0, &empty).unwrap().exp() - 0.25).abs() < 1e-12);
        let mut rng = rng();
        for _ in 0..100 {
            let x = prior.sample(&mut rng, &empty).unwrap().unwrap();
            assert!((0.0..=4.0).contains(&x));
        }
    }
}
