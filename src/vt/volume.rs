//! Astrophysical volume covered by an injection campaign.

use std::cell::RefCell;

use log::debug;

use crate::constants::PI_OVER_TWO;
use crate::statistics::integrate;

use super::cosmology::{Cosmology, CosmologyError};

/// Absolute tolerance of the volume quadrature, in Hubble volumes.
const VOLUME_TOL: f64 = 1e-12;

/// Solid angle of the declination band `[dec_min, dec_max]` in steradians.
///
/// `Ω = −2π (cos θ_max − cos θ_min)` with colatitude `θ = π/2 − dec`.
pub fn solid_angle(dec_min: f64, dec_max: f64) -> f64 {
    let theta_max = PI_OVER_TWO - dec_min;
    let theta_min = PI_OVER_TWO - dec_max;
    -2.0 * std::f64::consts::PI * (theta_max.cos() - theta_min.cos())
}

/// Time-dilated comoving volume in Mpc³ between two luminosity distances
/// (Mpc) and two declinations (radians).
///
/// The integrand is `dV_c/dz / (1 + z)`, so the result is the volume in
/// which a constant source-frame rate produces detector-frame events.
pub fn calculate_astrophysical_volume(
    dl_min: f64,
    dl_max: f64,
    dec_min: f64,
    dec_max: f64,
    cosmology: &dyn Cosmology,
) -> Result<f64, CosmologyError> {
    if !(dl_max >= dl_min) {
        return Err(CosmologyError::InvalidDistance(dl_max));
    }
    if !(-PI_OVER_TWO..=PI_OVER_TWO).contains(&dec_min)
        || !(-PI_OVER_TWO..=PI_OVER_TWO).contains(&dec_max)
        || dec_max < dec_min
    {
        return Err(CosmologyError::InvalidParameters(format!(
            "declination range [{dec_min}, {dec_max}]"
        )));
    }

    let z_min = cosmology.z_at_luminosity_distance(dl_min)?;
    let z_max = cosmology.z_at_luminosity_distance(dl_max)?;
    let omega = solid_angle(dec_min, dec_max);

    // quadrature works in units of the Hubble volume to keep the tolerance
    // meaningful
    let scale = cosmology.hubble_distance().powi(3);
    let failure = RefCell::new(None);
    let integral = integrate(
        |z| match cosmology.differential_comoving_volume(z) {
            Ok(dv) => dv / scale / (1.0 + z),
            Err(e) => {
                failure.borrow_mut().get_or_insert(e);
                f64::NAN
            }
        },
        z_min,
        z_max,
        VOLUME_TOL,
    );
    if let Some(e) = failure.into_inner() {
        return Err(e);
    }
    let volume = integral? * scale * omega;
    debug!(
        "volume for z in [{:.4}, {:.4}] over {:.3} sr: {:.4e} Mpc^3",
        z_min, z_max, omega, volume
    );
    Ok(volume)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::FULL_SKY;
    use crate::vt::FlatLambdaCdm;

    #[test]
    fn test_full_sky_solid_angle() {
        let omega = solid_angle(-PI_OVER_TWO, PI_OVER_TWO);
        assert!((omega - FULL_SKY).abs() < 1e-12);
        let north = solid_angle(0.0, PI_OVER_TWO);
        assert!((north - FULL_SKY / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_low_redshift_matches_euclidean_sphere() {
        let cosmo = FlatLambdaCdm::planck15();
        let dl = 10.0;
        let v = calculate_astrophysical_volume(0.0, dl, -PI_OVER_TWO, PI_OVER_TWO, &cosmo)
            .unwrap();
        let euclid = 4.0 / 3.0 * std::f64::consts::PI * dl.powi(3);
        assert!((v - euclid).abs() / euclid < 1e-2, "v = {v}, euclid = {euclid}");
    }

    #[test]
    fn test_empty_shell_is_zero() {
        let cosmo = FlatLambdaCdm::planck15();
        let v = calculate_astrophysical_volume(100.0, 100.0, -PI_OVER_TWO, PI_OVER_TWO, &cosmo)
            .unwrap();
        assert!(v.abs() < 1e-6);
    }

    #[test]
    fn test_rejects_bad_ranges() {
        let cosmo = FlatLambdaCdm::planck15();
        assert!(calculate_astrophysical_volume(100.0, 10.0, -1.0, 1.0, &cosmo).is_err());
        assert!(calculate_astrophysical_volume(0.0, 10.0, 1.0, -1.0, &cosmo).is_err());
        assert!(calculate_astrophysical_volume(0.0, 10.0, -2.0, 1.0, &cosmo).is_err());
    }
}
