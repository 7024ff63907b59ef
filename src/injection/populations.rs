//! Named source populations.
//!
//! Ready-made [`PriorDict`]s for the binary black hole populations commonly
//! injected into timeslides. Every constructor takes the cosmology explicitly
//! because redshift priors are tabulated from it.

use std::f64::consts::PI;

use crate::vt::Cosmology;

use super::priors::{Prior, PriorDict, PriorError};

/// Uniform sky position, inclination and phase.
pub fn uniform_extrinsic() -> Result<PriorDict, PriorError> {
    let mut prior = PriorDict::new();
    prior
        .insert("dec", Prior::cosine())?
        .insert("ra", Prior::uniform(0.0, 2.0 * PI))?
        .insert("theta_jn", Prior::sine())?
        .insert("phase", Prior::uniform(0.0, 2.0 * PI))?;
    Ok(prior)
}

/// Isotropic, uniform-magnitude spins and uniform polarization angle.
pub fn uniform_spin() -> Result<PriorDict, PriorError> {
    let mut prior = PriorDict::new();
    prior
        .insert("psi", Prior::uniform(0.0, PI))?
        .insert("a_1", Prior::uniform(0.0, 0.998))?
        .insert("a_2", Prior::uniform(0.0, 0.998))?
        .insert("tilt_1", Prior::sine())?
        .insert("tilt_2", Prior::sine())?
        .insert("phi_12", Prior::uniform(0.0, 2.0 * PI))?
        .insert("phi_jl", Prior::uniform(0.0, 2.0 * PI))?;
    Ok(prior)
}

fn zero_spins(prior: &mut PriorDict) -> Result<(), PriorError> {
    for key in ["a_1", "a_2", "tilt_1", "tilt_2", "phi_12", "phi_jl"] {
        prior.insert(key, Prior::Constant { value: 0.0 })?;
    }
    Ok(())
}

/// Non-spinning binary black holes, detector-frame masses uniform in
/// `[5, 100]` M☉ with `mass_2 <= mass_1`, redshift uniform in source frame
/// up to 0.5.
pub fn nonspin_bbh(cosmology: &dyn Cosmology) -> Result<PriorDict, PriorError> {
    let mut prior = uniform_extrinsic()?;
    prior
        .insert("mass_1", Prior::uniform(5.0, 100.0))?
        .insert("mass_2", Prior::uniform(5.0, 100.0))?
        .insert(
            "mass_ratio",
            Prior::Constraint {
                minimum: 0.0,
                maximum: 1.0,
            },
        )?
        .insert("redshift", Prior::uniform_source_frame(0.0, 0.5, cosmology)?)?
        .insert("psi", Prior::Constant { value: 0.0 })?;
    zero_spins(&mut prior)?;
    Ok(prior)
}

/// Like [`nonspin_bbh`] but with uniform spin magnitudes and isotropic tilts.
pub fn spin_bbh(cosmology: &dyn Cosmology) -> Result<PriorDict, PriorError> {
    let mut prior = nonspin_bbh(cosmology)?;
    prior
        .insert("a_1", Prior::uniform(0.0, 0.998))?
        .insert("a_2", Prior::uniform(0.0, 0.998))?
        .insert("tilt_1", Prior::sine())?
        .insert("tilt_2", Prior::sine())?;
    Ok(prior)
}

/// Population used for pipeline searches at the end of the third observing
/// run: power-law primary mass, conditional secondary, redshift uniform in
/// comoving volume up to 2. Masses are source-frame.
pub fn end_o3_ratesandpops(cosmology: &dyn Cosmology) -> Result<PriorDict, PriorError> {
    let mut prior = uniform_extrinsic()?;
    prior
        .insert("mass_1", Prior::power_law(-2.35, 5.0, 100.0))?
        .insert(
            "mass_2",
            Prior::ConditionalPowerLaw {
                alpha: 1.0,
                minimum: 5.0,
                maximum: 100.0,
                condition: "mass_1".to_string(),
            },
        )?
        .insert(
            "redshift",
            Prior::uniform_comoving_volume(0.0, 2.0, cosmology)?,
        )?;
    prior.extend(uniform_spin()?)?;
    Ok(prior)
}

/// Gaussian component masses around `(m1, m2)` with common width `sigma`.
pub fn gaussian_masses(
    m1: f64,
    m2: f64,
    sigma: f64,
    cosmology: &dyn Cosmology,
) -> Result<PriorDict, PriorError> {
    let mut prior = PriorDict::new();
    prior
        .insert("mass_1", Prior::Gaussian { mu: m1, sigma })?
        .insert("mass_2", Prior::Gaussian { mu: m2, sigma })?
        .insert("redshift", Prior::uniform_source_frame(0.0, 2.0, cosmology)?)?
        .insert("dec", Prior::cosine())?
        .insert("ra", Prior::uniform(0.0, 2.0 * PI))?;
    Ok(prior)
}

/// Underlying normal `(mu, sigma)` of a log-normal with the given mean and
/// standard deviation.
pub fn log_normal_params(mean: f64, std: f64) -> (f64, f64) {
    let sigma = ((std / mean).powi(2) + 1.0).ln().sqrt();
    let mu = 2.0 * (mean / (mean * mean + std * std).powf(0.25)).ln();
    (mu, sigma)
}

/// Log-normal component masses with means `(m1, m2)` and common standard
/// deviation `sigma`, mass ratio constrained to `[0.02, 1]`.
pub fn log_normal_masses(
    m1: f64,
    m2: f64,
    sigma: f64,
    cosmology: &dyn Cosmology,
) -> Result<PriorDict, PriorError> {
    let (mu1, sigma1) = log_normal_params(m1, sigma);
    let (mu2, sigma2) = log_normal_params(m2, sigma);
    let mut prior = PriorDict::new();
    prior
        .insert("mass_1", Prior::LogNormal { mu: mu1, sigma: sigma1 })?
        .insert("mass_2", Prior::LogNormal { mu: mu2, sigma: sigma2 })?
        .insert(
            "mass_ratio",
            Prior::Constraint {
                minimum: 0.02,
                maximum: 1.0,
            },
        )?
        .insert("redshift", Prior::uniform_source_frame(0.0, 2.0, cosmology)?)?
        .insert("dec", Prior::cosine())?
        .insert("ra", Prior::uniform(0.0, 2.0 * PI))?;
    Ok(prior)
}
