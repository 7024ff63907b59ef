//! Configuration for timeslide generation.
//!
//! Values are layered: [`Config::default`], then an optional JSON file
//! ([`Config::from_json_file`]), then `TSVT_*` environment overrides
//! ([`Config::from_env`]). Call [`Config::validate`] before use.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::injection::InjectionSettings;
use crate::timeslide::RetryPolicy;
use crate::vt::FlatLambdaCdm;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read config {}: {source}", path.display())]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The configuration file is not valid JSON for [`Config`].
    #[error("cannot parse config {}: {source}", path.display())]
    Parse {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Configuration options for [`TimeslideGenerator`](crate::TimeslideGenerator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// GPS start of the analysis period.
    pub start: f64,

    /// GPS stop of the analysis period.
    pub stop: f64,

    /// Strain channels, one per detector (e.g. `H1:GDS-CALIB_STRAIN`).
    pub channels: Vec<String>,

    /// State flags whose coincident active segments are analysed. Empty
    /// means the whole `[start, stop)` range.
    pub state_flags: Vec<String>,

    /// Drop coincident segments shorter than this (seconds).
    pub min_segment_length: Option<f64>,

    /// Split segments longer than this into chunks (seconds).
    pub chunk_length: Option<f64>,

    /// Shift increment per channel (seconds); 0 never shifts that channel.
    pub shifts: Vec<f64>,

    /// Number of slides per shifted channel (default: 10).
    pub n_slides: usize,

    /// If set, `n_slides` is replaced by the smallest slide count whose
    /// cumulative livetime reaches this many seconds.
    pub target_livetime: Option<f64>,

    /// Output sample rate in Hz (default: 2048).
    pub sample_rate: f64,

    /// Dead time between injection windows in seconds (default: 16).
    pub spacing: f64,

    /// Uniform jitter applied to injection times, at most `spacing / 2`
    /// (default: 0).
    pub jitter: f64,

    /// Margin kept free of injections at segment edges (default: 0).
    pub buffer: f64,

    /// Length of each injected waveform in seconds (default: 8).
    pub waveform_duration: f64,

    /// Regenerate shifts whose output already exists (default: false).
    pub force_generation: bool,

    /// Base seed; each (segment, shift) derives its own stream from it.
    pub seed: u64,

    /// Worker threads; 0 uses every logical CPU (default: 0).
    pub workers: usize,

    /// Retry policy for strain reads.
    pub retry: RetryPolicy,

    /// Cosmology used for distances and volumes (default: Planck15).
    pub cosmology: FlatLambdaCdm,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            start: 0.0,
            stop: 4096.0,
            channels: vec![
                "H1:GDS-CALIB_STRAIN".to_string(),
                "L1:GDS-CALIB_STRAIN".to_string(),
            ],
            state_flags: Vec::new(),
            min_segment_length: None,
            chunk_length: None,
            shifts: vec![0.0, 1.0],
            n_slides: 10,
            target_livetime: None,
            sample_rate: 2048.0,
            spacing: 16.0,
            jitter: 0.0,
            buffer: 0.0,
            waveform_duration: 8.0,
            force_generation: false,
            seed: 0,
            workers: 0,
            retry: RetryPolicy::default(),
            cosmology: FlatLambdaCdm::planck15(),
        }
    }
}

impl Config {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `TSVT_*` environment overrides.
    ///
    /// Unparseable values are ignored. List-valued keys (`TSVT_CHANNELS`,
    /// `TSVT_STATE_FLAGS`, `TSVT_SHIFTS`) are comma-separated.
    pub fn from_env(mut self) -> Self {
        if let Some(v) = parse_f64_env("TSVT_START") {
            self.start = v;
        }
        if let Some(v) = parse_f64_env("TSVT_STOP") {
            self.stop = v;
        }
        if let Some(v) = parse_list_env("TSVT_CHANNELS") {
            self.channels = v;
        }
        if let Some(v) = parse_list_env("TSVT_STATE_FLAGS") {
            self.state_flags = v;
        }
        if let Some(v) = parse_f64_env("TSVT_MIN_SEGMENT_LENGTH") {
            self.min_segment_length = Some(v);
        }
        if let Some(v) = parse_f64_env("TSVT_CHUNK_LENGTH") {
            self.chunk_length = Some(v);
        }
        if let Some(v) = parse_list_env("TSVT_SHIFTS")
            .and_then(|items| items.iter().map(|s| s.parse().ok()).collect())
        {
            self.shifts = v;
        }
        if let Some(v) = parse_usize_env("TSVT_N_SLIDES") {
            self.n_slides = v;
        }
        if let Some(v) = parse_f64_env("TSVT_TARGET_LIVETIME") {
            self.target_livetime = Some(v);
        }
        if let Some(v) = parse_f64_env("TSVT_SAMPLE_RATE") {
            self.sample_rate = v;
        }
        if let Some(v) = parse_f64_env("TSVT_SPACING") {
            self.spacing = v;
        }
        if let Some(v) = parse_f64_env("TSVT_JITTER") {
            self.jitter = v;
        }
        if let Some(v) = parse_f64_env("TSVT_BUFFER") {
            self.buffer = v;
        }
        if let Some(v) = parse_f64_env("TSVT_WAVEFORM_DURATION") {
            self.waveform_duration = v;
        }
        if let Some(v) = parse_bool_env("TSVT_FORCE_GENERATION") {
            self.force_generation = v;
        }
        if let Some(v) = parse_u64_env("TSVT_SEED") {
            self.seed = v;
        }
        if let Some(v) = parse_usize_env("TSVT_WORKERS") {
            self.workers = v;
        }
        if let Some(v) = parse_u64_env("TSVT_RETRY_ATTEMPTS") {
            self.retry.attempts = v.min(u32::MAX as u64) as u32;
        }
        if let Some(v) = parse_f64_env("TSVT_RETRY_BACKOFF_SECS") {
            if let Ok(d) = Duration::try_from_secs_f64(v) {
                self.retry.backoff = d;
            }
        }
        self
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));
        if !(self.stop > self.start) {
            return invalid(format!("stop {} must exceed start {}", self.stop, self.start));
        }
        if self.channels.is_empty() {
            return invalid("at least one channel is required".to_string());
        }
        if self.shifts.len() != self.channels.len() {
            return invalid(format!(
                "{} shifts given for {} channels",
                self.shifts.len(),
                self.channels.len()
            ));
        }
        if self.n_slides == 0 && self.target_livetime.is_none() {
            return invalid("n_slides must be at least 1".to_string());
        }
        if !(self.sample_rate > 0.0) || !self.sample_rate.is_finite() {
            return invalid(format!("sample_rate must be positive, got {}", self.sample_rate));
        }
        if !(self.waveform_duration > 0.0) || !self.waveform_duration.is_finite() {
            return invalid(format!(
                "waveform_duration must be positive, got {}",
                self.waveform_duration
            ));
        }
        for (name, value) in [
            ("spacing", self.spacing),
            ("buffer", self.buffer),
            ("jitter", self.jitter),
        ] {
            if !(value >= 0.0) || !value.is_finite() {
                return invalid(format!("{name} must be non-negative, got {value}"));
            }
        }
        if self.jitter > self.spacing / 2.0 {
            return invalid(format!(
                "jitter {} exceeds half the spacing {}",
                self.jitter, self.spacing
            ));
        }
        for (name, value) in [
            ("min_segment_length", self.min_segment_length),
            ("chunk_length", self.chunk_length),
            ("target_livetime", self.target_livetime),
        ] {
            if let Some(v) = value {
                if !(v > 0.0) || !v.is_finite() {
                    return invalid(format!("{name} must be positive, got {v}"));
                }
            }
        }
        Ok(())
    }

    /// Injection grid settings.
    pub fn injection_settings(&self) -> InjectionSettings {
        InjectionSettings {
            spacing: self.spacing,
            buffer: self.buffer,
            jitter: self.jitter,
            waveform_duration: self.waveform_duration,
        }
    }
}

fn parse_usize_env(key: &str) -> Option<usize> {
    env::var(key).ok()?.parse().ok()
}

fn parse_u64_env(key: &str) -> Option<u64> {
    env::var(key).ok()?.parse().ok()
}

fn parse_f64_env(key: &str) -> Option<f64> {
    env::var(key).ok()?.parse().ok()
}

fn parse_bool_env(key: &str) -> Option<bool> {
    match env::var(key).ok()?.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

fn parse_list_env(key: &str) -> Option<Vec<String>> {
    let raw = env::var(key).ok()?;
    Some(
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    )
}
