//! Projection of polarisations onto interferometers.
//!
//! Each detector is described by its response tensor `D = (x xᵀ − y yᵀ) / 2`
//! built from the unit arm vectors, and its vertex position on the Earth.
//! The observed strain is `F₊ h₊ + Fₓ hₓ`, delayed by the light travel time
//! from the geocentre to the vertex.

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::constants::SPEED_OF_LIGHT;
use crate::types::{Tensor3, Vec3};

use super::waveform::{Polarizations, WaveformError};

/// Interferometer geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detector {
    /// Short name, e.g. `H1`.
    pub name: String,
    /// Vertex position in Earth-fixed coordinates (m).
    pub vertex: Vec3,
    /// Response tensor.
    pub tensor: Tensor3,
}

impl Detector {
    /// Build a detector from its vertex and arm directions.
    pub fn from_arms(name: impl Into<String>, vertex: Vec3, x_arm: Vec3, y_arm: Vec3) -> Self {
        let x = x_arm.normalize();
        let y = y_arm.normalize();
        let tensor = 0.5 * (x * x.transpose() - y * y.transpose());
        Self {
            name: name.into(),
            vertex,
            tensor,
        }
    }

    /// LIGO Hanford.
    pub fn h1() -> Self {
        Self::from_arms(
            "H1",
            Vector3::new(-2.16141492636e6, -3.83469517889e6, 4.60035022664e6),
            Vector3::new(-0.22389266154, 0.79983062746, 0.55690487831),
            Vector3::new(-0.91397818574, 0.02609403989, -0.40492342125),
        )
    }

    /// LIGO Livingston.
    pub fn l1() -> Self {
        Self::from_arms(
            "L1",
            Vector3::new(-7.42760447238e4, -5.49628371971e6, 3.22425701744e6),
            Vector3::new(-0.95457412153, -0.14158077340, -0.26218911324),
            Vector3::new(0.29774156894, -0.48791033647, -0.82054461286),
        )
    }

    /// Virgo.
    pub fn v1() -> Self {
        Self::from_arms(
            "V1",
            Vector3::new(4.54637409900e6, 8.42989697626e5, 4.37857696241e6),
            Vector3::new(-0.70045821479, 0.20848948619, 0.68256166277),
            Vector3::new(-0.05379255368, -0.96908180549, 0.24080451708),
        )
    }

    /// Look up a known detector by name (case-insensitive).
    pub fn by_name(name: &str) -> Result<Self, WaveformError> {
        match name.to_ascii_uppercase().as_str() {
            "H1" => Ok(Self::h1()),
            "L1" => Ok(Self::l1()),
            "V1" => Ok(Self::v1()),
            _ => Err(WaveformError::UnknownDetector(name.to_string())),
        }
    }

    /// Antenna pattern `(F₊, Fₓ)` for a source at `(ra, dec)` with
    /// polarisation angle `psi`.
    ///
    /// `ra` is used directly as the Earth-fixed longitude.
    pub fn antenna_pattern(&self, ra: f64, dec: f64, psi: f64) -> (f64, f64) {
        let (plus, cross) = polarization_tensors(ra, dec, psi);
        (
            self.tensor.component_mul(&plus).sum(),
            self.tensor.component_mul(&cross).sum(),
        )
    }

    /// Arrival delay relative to the geocentre in seconds.
    pub fn time_delay(&self, ra: f64, dec: f64) -> f64 {
        let theta = std::f64::consts::FRAC_PI_2 - dec;
        let omega = Vector3::new(theta.sin() * ra.cos(), theta.sin() * ra.sin(), theta.cos());
        -omega.dot(&self.vertex) / SPEED_OF_LIGHT
    }
}

fn polarization_tensors(phi: f64, dec: f64, psi: f64) -> (Matrix3<f64>, Matrix3<f64>) {
    let theta = std::f64::consts::FRAC_PI_2 - dec;
    let u = Vector3::new(phi.cos() * theta.cos(), theta.cos() * phi.sin(), -theta.sin());
    let v = Vector3::new(-phi.sin(), phi.cos(), 0.0);
    let m = -u * psi.sin() - v * psi.cos();
    let n = -u * psi.cos() + v * psi.sin();
    let plus = m * m.transpose() - n * n.transpose();
    let cross = m * n.transpose() + n * m.transpose();
    (plus, cross)
}

/// Capability projecting polarisations onto a detector network.
pub trait Projector: Send + Sync {
    /// Detectors, in channel order.
    fn detectors(&self) -> &[Detector];

    /// Observed strain in each detector, same length as the polarisations.
    fn project(
        &self,
        dec: f64,
        psi: f64,
        ra: f64,
        polarizations: &Polarizations,
    ) -> Result<Vec<Vec<f64>>, WaveformError>;
}

/// Tensor projector with integer-sample geometric delays.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorProjector {
    detectors: Vec<Detector>,
    sample_rate: f64,
}

impl DetectorProjector {
    /// Projector for the given detectors at `sample_rate`.
    pub fn new(detectors: Vec<Detector>, sample_rate: f64) -> Self {
        Self {
            detectors,
            sample_rate,
        }
    }

    /// Projector for detectors named by channel prefixes like `H1:STRAIN`.
    pub fn from_channels(channels: &[String], sample_rate: f64) -> Result<Self, WaveformError> {
        let detectors = channels
            .iter()
            .map(|c| Detector::by_name(c.split(':').next().unwrap_or(c)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(detectors, sample_rate))
    }
}

impl Projector for DetectorProjector {
    fn detectors(&self) -> &[Detector] {
        &self.detectors
    }

    fn project(
        &self,
        dec: f64,
        psi: f64,
        ra: f64,
        polarizations: &Polarizations,
    ) -> Result<Vec<Vec<f64>>, WaveformError> {
        if polarizations.plus.len() != polarizations.cross.len() {
            return Err(WaveformError::LengthMismatch {
                plus: polarizations.plus.len(),
                cross: polarizations.cross.len(),
            });
        }
        let n = polarizations.len();
        Ok(self
            .detectors
            .iter()
            .map(|det| {
                let (fp, fc) = det.antenna_pattern(ra, dec, psi);
                let shift = (det.time_delay(ra, dec) * self.sample_rate).round() as i64;
                (0..n as i64)
                    .map(|i| {
                        let j = i - shift;
                        if j < 0 || j >= n as i64 {
                            0.0
                        } else {
                            let j = j as usize;
                            fp * polarizations.plus[j] + fc * polarizations.cross[j]
                        }
                    })
                    .collect()
            })
            .collect())
    }
}
