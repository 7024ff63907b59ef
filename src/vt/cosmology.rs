//! Background cosmology for distance and volume conversions.
//!
//! The estimator never reaches for a global default: a [`Cosmology`] value is
//! passed explicitly to every volume, prior and VT computation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{PLANCK15_H0, PLANCK15_OMEGA_M, SPEED_OF_LIGHT_KM_S};
use crate::statistics::{find_root, integrate, IntegrationError, RootError};

/// Absolute tolerance on dimensionless distance integrals.
const DISTANCE_TOL: f64 = 1e-12;

/// Largest redshift searched when inverting the distance relation.
const MAX_REDSHIFT: f64 = 1e4;

/// Errors from cosmological conversions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CosmologyError {
    /// Redshift was negative or not finite.
    #[error("redshift must be finite and non-negative, got {0}")]
    InvalidRedshift(f64),
    /// Distance was negative or not finite.
    #[error("luminosity distance must be finite and non-negative, got {0} Mpc")]
    InvalidDistance(f64),
    /// Cosmological parameters are unphysical.
    #[error("invalid cosmological parameters: {0}")]
    InvalidParameters(String),
    /// Numerical integration failed.
    #[error(transparent)]
    Integration(#[from] IntegrationError),
    /// Redshift inversion failed.
    #[error(transparent)]
    Root(#[from] RootError),
}

/// Distance-redshift and volume relations of a cosmological model.
///
/// Distances are in Mpc, volumes in Mpc³.
pub trait Cosmology: Send + Sync {
    /// Line-of-sight comoving distance to redshift `z`.
    fn comoving_distance(&self, z: f64) -> Result<f64, CosmologyError>;

    /// Dimensionless Hubble rate `E(z) = H(z)/H0`.
    fn efunc(&self, z: f64) -> f64;

    /// Hubble distance `c / H0`.
    fn hubble_distance(&self) -> f64;

    /// Luminosity distance `(1 + z) · D_C(z)`.
    fn luminosity_distance(&self, z: f64) -> Result<f64, CosmologyError> {
        Ok((1.0 + z) * self.comoving_distance(z)?)
    }

    /// Differential comoving volume `dV_c / dz / dΩ` in Mpc³ per steradian.
    fn differential_comoving_volume(&self, z: f64) -> Result<f64, CosmologyError> {
        let dc = self.comoving_distance(z)?;
        Ok(self.hubble_distance() * dc * dc / self.efunc(z))
    }

    /// Redshift at which the luminosity distance equals `dl`.
    fn z_at_luminosity_distance(&self, dl: f64) -> Result<f64, CosmologyError> {
        if !dl.is_finite() || dl < 0.0 {
            return Err(CosmologyError::InvalidDistance(dl));
        }
        if dl == 0.0 {
            return Ok(0.0);
        }
        // grow the bracket until it straddles the target
        let mut upper = 1.0;
        while self.luminosity_distance(upper)? < dl {
            upper *= 2.0;
            if upper > MAX_REDSHIFT {
                return Err(CosmologyError::InvalidDistance(dl));
            }
        }
        let z = find_root(
            |z| self.luminosity_distance(z).map(|d| d - dl).unwrap_or(f64::NAN),
            0.0,
            upper,
            1e-12,
        )?;
        Ok(z)
    }
}

/// Spatially flat ΛCDM cosmology (matter + dark energy).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlatLambdaCdm {
    /// Hubble constant in km/s/Mpc.
    pub h0: f64,
    /// Matter density parameter today.
    pub omega_m: f64,
}

impl FlatLambdaCdm {
    /// Build a flat ΛCDM model, validating the parameters.
    pub fn new(h0: f64, omega_m: f64) -> Result<Self, CosmologyError> {
        if !(h0.is_finite() && h0 > 0.0) {
            return Err(CosmologyError::InvalidParameters(format!("H0 = {h0}")));
        }
        if !(0.0..=1.0).contains(&omega_m) {
            return Err(CosmologyError::InvalidParameters(format!(
                "Omega_m = {omega_m}"
            )));
        }
        Ok(Self { h0, omega_m })
    }

    /// Planck 2015 parameters (flat, radiation neglected).
    pub fn planck15() -> Self {
        Self {
            h0: PLANCK15_H0,
            omega_m: PLANCK15_OMEGA_M,
        }
    }

    /// Dark-energy density parameter `1 − Ωm`.
    pub fn omega_lambda(&self) -> f64 {
        1.0 - self.omega_m
    }
}

impl Default for FlatLambdaCdm {
    fn default() -> Self {
        Self::planck15()
    }
}

impl Cosmology for FlatLambdaCdm {
    fn comoving_distance(&self, z: f64) -> Result<f64, CosmologyError> {
        if !z.is_finite() || z < 0.0 {
            return Err(CosmologyError::InvalidRedshift(z));
        }
        let chi = integrate(|x| 1.0 / self.efunc(x), 0.0, z, DISTANCE_TOL)?;
        Ok(self.hubble_distance() * chi)
    }

    fn efunc(&self, z: f64) -> f64 {
        let zp1 = 1.0 + z;
        (self.omega_m * zp1 * zp1 * zp1 + self.omega_lambda()).sqrt()
    }

    fn hubble_distance(&self) -> f64 {
        SPEED_OF_LIGHT_KM_S / self.h0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_redshift_hubble_law() {
        let cosmo = FlatLambdaCdm::planck15();
        let z = 1e-4;
        let dl = cosmo.luminosity_distance(z).unwrap();
        let hubble = cosmo.hubble_distance() * z;
        assert!((dl - hubble).abs() / hubble < 1e-3);
    }

    #[test]
    fn test_known_distance() {
        // Planck15 luminosity distance at z = 0.1 is ~ 460 Mpc
        let dl = FlatLambdaCdm::planck15().luminosity_distance(0.1).unwrap();
        assert!((dl - 460.0).abs() < 5.0, "dl = {dl}");
    }

    #[test]
    fn test_inverse_round_trip() {
        let cosmo = FlatLambdaCdm::planck15();
        for &z in &[0.01, 0.2, 1.5] {
            let dl = cosmo.luminosity_distance(z).unwrap();
            let back = cosmo.z_at_luminosity_distance(dl).unwrap();
            assert!((back - z).abs() < 1e-8, "z = {z}, back = {back}");
        }
    }

    #[test]
    fn test_rejects_bad_inputs() {
        let cosmo = FlatLambdaCdm::planck15();
        assert!(cosmo.comoving_distance(-1.0).is_err());
        assert!(cosmo.z_at_luminosity_distance(-5.0).is_err());
        assert!(FlatLambdaCdm::new(0.0, 0.3).is_err());
        assert!(FlatLambdaCdm::new(70.0, 1.5).is_err());
    }
}
