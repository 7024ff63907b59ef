//! Per-segment injection sampling and realisation.

use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Parameters;
use crate::vt::{Cosmology, CosmologyError};

use super::priors::{PriorDict, PriorError};
use super::projection::Projector;
use super::schedule::{jitter_times, schedule, ScheduleError};
use super::snr::{SnrCalculator, SnrError};
use super::waveform::{WaveformError, WaveformGenerator};

/// Key holding the injection time.
pub const GEOCENT_TIME: &str = "geocent_time";

/// Errors raised while sampling or realising injections.
#[derive(Debug, Error)]
pub enum InjectionError {
    /// Grid construction failed.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    /// Prior sampling failed.
    #[error(transparent)]
    Prior(#[from] PriorError),
    /// Distance conversion failed.
    #[error(transparent)]
    Cosmology(#[from] CosmologyError),
    /// Waveform generation or projection failed.
    #[error(transparent)]
    Waveform(#[from] WaveformError),
    /// The SNR of an injection could not be computed.
    #[error("SNR in {detector}: {source}")]
    Snr {
        /// Detector whose SNR failed.
        detector: String,
        /// Underlying error.
        #[source]
        source: SnrError,
    },
    /// Sampled parameters lack a key the projection needs.
    #[error("sampled parameters have no '{0}'")]
    MissingParameter(&'static str),
    /// Number of background channels differs from the detector count.
    #[error("{backgrounds} background channels for {detectors} detectors")]
    ChannelMismatch {
        /// Background channels passed.
        backgrounds: usize,
        /// Detectors in the projector.
        detectors: usize,
    },
}

/// Injection grid settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InjectionSettings {
    /// Dead time between consecutive waveform windows (s).
    pub spacing: f64,
    /// Margin kept free at both segment edges (s).
    pub buffer: f64,
    /// Maximum uniform perturbation of each slot (s), at most `spacing / 2`.
    pub jitter: f64,
    /// Length of each waveform (s).
    pub waveform_duration: f64,
}

/// Parameter sets drawn for one stretch of data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampledInjections {
    /// One parameter set per scheduled time, including `geocent_time`.
    pub parameters: Vec<Parameters>,
    /// Draws rejected by prior constraints.
    pub n_rejected: u64,
}

/// Draws injection times and source parameters for a segment.
pub struct InjectionSampler<'a> {
    prior: &'a PriorDict,
    cosmology: &'a dyn Cosmology,
    settings: InjectionSettings,
}

impl<'a> InjectionSampler<'a> {
    /// Sampler over `prior` with the given grid settings.
    pub fn new(
        prior: &'a PriorDict,
        cosmology: &'a dyn Cosmology,
        settings: InjectionSettings,
    ) -> Self {
        Self {
            prior,
            cosmology,
            settings,
        }
    }

    /// Grid settings.
    pub fn settings(&self) -> &InjectionSettings {
        &self.settings
    }

    /// Sample injections for `[start, start + duration)`.
    ///
    /// Each scheduled (and jittered) time gets one independent draw from the
    /// prior. If the prior samples `redshift` but not `luminosity_distance`,
    /// the distance is filled in from the cosmology.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        start: f64,
        duration: f64,
        rng: &mut R,
    ) -> Result<SampledInjections, InjectionError> {
        let s = &self.settings;
        let stop = start + duration;
        let mut times = schedule(start, stop, s.spacing, s.buffer, s.waveform_duration)?;
        jitter_times(
            &mut times,
            start,
            stop,
            s.spacing,
            s.jitter,
            s.waveform_duration,
            rng,
        )?;

        let mut out = SampledInjections {
            parameters: Vec::with_capacity(times.len()),
            n_rejected: 0,
        };
        for t in times {
            let (mut params, rejected) = self.prior.sample(rng)?;
            out.n_rejected += rejected;
            if !params.contains_key("luminosity_distance") {
                if let Some(&z) = params.get("redshift") {
                    let dl = self.cosmology.luminosity_distance(z)?;
                    params.insert("luminosity_distance".to_string(), dl);
                }
            }
            params.insert(GEOCENT_TIME.to_string(), t);
            out.parameters.push(params);
        }
        debug!(
            "sampled {} injections in [{}, {}) with {} rejected draws",
            out.parameters.len(),
            start,
            start + duration,
            out.n_rejected
        );
        Ok(out)
    }
}

/// One realised injection: parameters, per-detector SNRs and responses.
#[derive(Debug, Clone, PartialEq)]
pub struct InjectionRecord {
    /// Source parameters plus `geocent_time` and `<ifo>_snr` entries.
    pub parameters: Parameters,
    /// Projected strain per detector, in detector order.
    pub responses: Vec<Vec<f64>>,
}

impl InjectionRecord {
    /// Generate, project and score one parameter set.
    ///
    /// `backgrounds` holds each detector's data used as the noise reference
    /// for the SNR. SNRs are recorded for every injection; nothing is
    /// discarded for being too quiet.
    pub fn realise(
        parameters: Parameters,
        generator: &dyn WaveformGenerator,
        projector: &dyn Projector,
        snr: &dyn SnrCalculator,
        backgrounds: &[&[f64]],
    ) -> Result<Self, InjectionError> {
        let detectors = projector.detectors();
        if backgrounds.len() != detectors.len() {
            return Err(InjectionError::ChannelMismatch {
                backgrounds: backgrounds.len(),
                detectors: detectors.len(),
            });
        }
        let get = |key: &'static str| {
            parameters
                .get(key)
                .copied()
                .ok_or(InjectionError::MissingParameter(key))
        };
        let (dec, psi, ra) = (get("dec")?, get("psi")?, get("ra")?);

        let polarizations = generator.generate(&parameters)?;
        let responses = projector.project(dec, psi, ra, &polarizations)?;

        let mut parameters = parameters;
        for ((det, response), background) in detectors.iter().zip(&responses).zip(backgrounds) {
            let value = snr
                .snr(response, background, generator.sample_rate())
                .and_then(|v| if v.is_finite() { Ok(v) } else { Err(SnrError::NonFinite(v)) })
                .map_err(|source| InjectionError::Snr {
                    detector: det.name.clone(),
                    source,
                })?;
            parameters.insert(format!("{}_snr", det.name), value);
        }
        Ok(Self {
            parameters,
            responses,
        })
    }

    /// Injection time.
    pub fn geocent_time(&self) -> Option<f64> {
        self.parameters.get(GEOCENT_TIME).copied()
    }

    /// SNR recorded for detector `ifo`.
    pub fn snr(&self, ifo: &str) -> Option<f64> {
        self.parameters.get(&format!("{ifo}_snr")).copied()
    }
}
