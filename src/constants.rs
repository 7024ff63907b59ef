//! Physical and bookkeeping constants.

use std::f64::consts::PI;

/// Seconds in a (365-day) year, used to express livetime in years.
pub const SECONDS_PER_YEAR: f64 = 60.0 * 60.0 * 24.0 * 365.0;

/// Years per second of livetime.
pub const YEARS_PER_SECOND: f64 = 1.0 / SECONDS_PER_YEAR;

/// Speed of light in m/s.
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Speed of light in km/s (for Hubble distances).
pub const SPEED_OF_LIGHT_KM_S: f64 = SPEED_OF_LIGHT / 1000.0;

/// Half of pi, the declination of the celestial poles.
pub const PI_OVER_TWO: f64 = PI / 2.0;

/// Solid angle of the full sky in steradians.
pub const FULL_SKY: f64 = 4.0 * PI;

/// Planck 2015 Hubble constant (km/s/Mpc).
pub const PLANCK15_H0: f64 = 67.74;

/// Planck 2015 matter density parameter.
pub const PLANCK15_OMEGA_M: f64 = 0.3075;
