//! End-to-end timeslide generation.
//!
//! For each coincident segment the generator crops every pending shift of
//! the background, samples and projects injections, and writes the
//! background archive, the injected archive and the parameter table. The
//! next segment's strain is fetched while the current one is processed;
//! all shifts of a segment finish before the next segment starts, so at most
//! one segment's data (plus the prefetched one) is held in memory.

use std::fs;
use std::path::Path;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::archive::{output_exists, write_timeseries, ArchiveError, TableAppender, PARAMS_FILE_NAME};
use crate::config::{Config, ConfigError};
use crate::injection::{
    InjectionError, InjectionRecord, InjectionSampler, PriorDict, Projector, SnrCalculator,
    WaveformGenerator,
};
use crate::segments::{coincident_segments, SegmentError, SegmentSet, SegmentSource};
use crate::shifts::{cropped_length, plan_slide_count, ShiftError, ShiftSet};
use crate::statistics::unit_rng;
use crate::thread_pool::{PoolError, WorkerPool};
use crate::types::{Parameters, Segment, TimeSeries};

use super::strain::{fetch_segment, DataError, StrainSource};
use super::synthesizer::TimeslideSynthesizer;

/// Sub-directory for raw shifted background.
pub const BACKGROUND_DIR: &str = "background";

/// Sub-directory for background plus injections.
pub const INJECTION_DIR: &str = "injection";

/// Errors that abort a whole run, or a single unit of work.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Segment query failed.
    #[error(transparent)]
    Segment(#[from] SegmentError),
    /// Shift planning failed.
    #[error(transparent)]
    Shift(#[from] ShiftError),
    /// Strain could not be read.
    #[error(transparent)]
    Data(#[from] DataError),
    /// Injection sampling or projection failed.
    #[error(transparent)]
    Injection(#[from] InjectionError),
    /// Writing output failed.
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    /// Worker threads could not be started.
    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Counters describing a finished run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Segments whose shifts were attempted.
    pub segments_processed: usize,
    /// Segments skipped: too short for the maximum shift, or fully written.
    pub segments_skipped: usize,
    /// Segments abandoned because their strain could not be read.
    pub segments_failed: usize,
    /// Shifts written in this run.
    pub shifts_written: usize,
    /// Shifts skipped because their output already existed.
    pub shifts_existing: usize,
    /// Shifts that failed and were skipped.
    pub shifts_failed: usize,
    /// Injections placed across all written shifts.
    pub injections: usize,
    /// Prior draws rejected by constraints.
    pub n_rejected: u64,
    /// Background livetime written, in seconds.
    pub livetime: f64,
}

impl PipelineSummary {
    fn absorb(&mut self, other: PipelineSummary) {
        self.segments_processed += other.segments_processed;
        self.segments_skipped += other.segments_skipped;
        self.segments_failed += other.segments_failed;
        self.shifts_written += other.shifts_written;
        self.shifts_existing += other.shifts_existing;
        self.shifts_failed += other.shifts_failed;
        self.injections += other.injections;
        self.n_rejected += other.n_rejected;
        self.livetime += other.livetime;
    }
}

/// Work planned for one segment.
#[derive(Debug, Clone)]
struct SegmentJob {
    index: usize,
    segment: Segment,
    /// Slide length in seconds, on the sample grid.
    length: f64,
    /// Indices into the shift set still to be written.
    pending: Vec<usize>,
}

struct ShiftStats {
    injections: usize,
    n_rejected: u64,
}

/// Generates background and injected timeslides for a set of segments.
pub struct TimeslideGenerator<'a> {
    config: &'a Config,
    strain: &'a dyn StrainSource,
    prior: &'a PriorDict,
    generator: &'a dyn WaveformGenerator,
    projector: &'a dyn Projector,
    snr: &'a dyn SnrCalculator,
}

impl<'a> TimeslideGenerator<'a> {
    /// Wire up a generator, validating `config` against the collaborators.
    pub fn new(
        config: &'a Config,
        strain: &'a dyn StrainSource,
        prior: &'a PriorDict,
        generator: &'a dyn WaveformGenerator,
        projector: &'a dyn Projector,
        snr: &'a dyn SnrCalculator,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        if projector.detectors().len() != config.channels.len() {
            return Err(ConfigError::Invalid(format!(
                "projector has {} detectors for {} channels",
                projector.detectors().len(),
                config.channels.len()
            ))
            .into());
        }
        if generator.sample_rate() != config.sample_rate {
            return Err(ConfigError::Invalid(format!(
                "waveforms are generated at {} Hz but data is written at {} Hz",
                generator.sample_rate(),
                config.sample_rate
            ))
            .into());
        }
        Ok(Self {
            config,
            strain,
            prior,
            generator,
            projector,
            snr,
        })
    }

    /// Query coincident segments from `source`, then [`run`](Self::run).
    pub fn run_with_source<S: SegmentSource + ?Sized>(
        &self,
        source: &S,
        datadir: &Path,
    ) -> Result<PipelineSummary, PipelineError> {
        let cfg = self.config;
        let segments = coincident_segments(
            source,
            &cfg.state_flags,
            cfg.start,
            cfg.stop,
            cfg.min_segment_length,
        )?;
        self.run(&segments, datadir)
    }

    /// Shifts that will be applied to `segments`.
    ///
    /// A target livetime is met by the cropped slides actually written, not
    /// by the uncropped `L(N)` estimate.
    pub fn shift_set(&self, segments: &SegmentSet) -> Result<ShiftSet, PipelineError> {
        let cfg = self.config;
        let n_slides = match cfg.target_livetime {
            Some(target) => {
                let n = plan_slide_count(segments.segments(), target, &cfg.shifts, cfg.sample_rate)?;
                info!("{} slides required for {}s of background", n, target);
                n
            }
            None => self.config.n_slides,
        };
        Ok(ShiftSet::cartesian(&self.config.shifts, n_slides)?)
    }

    /// Generate every pending timeslide of `segments` under `datadir`.
    ///
    /// Failures of a single segment or shift are logged and counted in the
    /// summary; only setup errors abort the run.
    pub fn run(&self, segments: &SegmentSet, datadir: &Path) -> Result<PipelineSummary, PipelineError> {
        let cfg = self.config;
        fs::create_dir_all(datadir).map_err(|source| ArchiveError::Io {
            path: datadir.to_path_buf(),
            source,
        })?;
        let segments = match cfg.chunk_length {
            Some(len) => segments.chunk(len)?,
            None => segments.clone(),
        };
        info!(
            "generating timeslides for {} segments totalling {}s",
            segments.len(),
            segments.total_livetime()
        );

        let shifts = self.shift_set(&segments)?;
        let pool = WorkerPool::new(cfg.workers)?;
        debug!("{} shifts on {} workers", shifts.len(), pool.threads());

        let mut summary = PipelineSummary::default();
        let jobs = self.plan_jobs(&segments, &shifts, datadir, &mut summary);

        let fetch = |job: &SegmentJob| {
            debug!("fetching segment {}", job.segment);
            fetch_segment(
                self.strain,
                &cfg.channels,
                job.segment.start,
                job.segment.stop,
                cfg.sample_rate,
                &cfg.retry,
            )
        };

        let mut next = jobs.first().map(fetch);
        for (i, job) in jobs.iter().enumerate() {
            let Some(strain) = next.take() else { break };
            let upcoming = jobs.get(i + 1);
            let (outcome, prefetched) = pool.join(
                || self.process_segment(&pool, job, strain, &shifts, datadir),
                || upcoming.map(fetch),
            );
            next = prefetched;
            summary.absorb(outcome);
        }

        info!(
            "wrote {} shifts ({} failed, {} existing), {} injections, {}s livetime",
            summary.shifts_written,
            summary.shifts_failed,
            summary.shifts_existing,
            summary.injections,
            summary.livetime
        );
        Ok(summary)
    }

    fn plan_jobs(
        &self,
        segments: &SegmentSet,
        shifts: &ShiftSet,
        datadir: &Path,
        summary: &mut PipelineSummary,
    ) -> Vec<SegmentJob> {
        let sr = self.config.sample_rate;
        let mut jobs = Vec::new();
        for (index, segment) in segments.segments().iter().enumerate() {
            let Some(length) = cropped_length(segment, shifts.max_shift(), sr) else {
                warn!(
                    "segment {} is shorter than the maximum shift {}s, skipping",
                    segment,
                    shifts.max_shift()
                );
                summary.segments_skipped += 1;
                continue;
            };
            let pending: Vec<usize> = shifts
                .shifts()
                .iter()
                .enumerate()
                .filter(|(_, shift)| {
                    let root = datadir.join(shift.to_string());
                    let done = output_exists(&root.join(BACKGROUND_DIR), segment.start, length)
                        && output_exists(&root.join(INJECTION_DIR), segment.start, length);
                    self.config.force_generation || !done
                })
                .map(|(i, _)| i)
                .collect();
            summary.shifts_existing += shifts.len() - pending.len();
            if pending.is_empty() {
                info!("all data for segment {} already exists, skipping", segment);
                summary.segments_skipped += 1;
                continue;
            }
            jobs.push(SegmentJob {
                index,
                segment: *segment,
                length,
                pending,
            });
        }
        jobs
    }

    fn process_segment(
        &self,
        pool: &WorkerPool,
        job: &SegmentJob,
        strain: Result<Vec<TimeSeries>, DataError>,
        shifts: &ShiftSet,
        datadir: &Path,
    ) -> PipelineSummary {
        let mut summary = PipelineSummary::default();
        let strain = match strain {
            Ok(strain) => strain,
            Err(e) => {
                warn!("skipping segment {}: {}", job.segment, e);
                summary.segments_failed += 1;
                return summary;
            }
        };
        info!(
            "processing segment {} with {} shifts of {}s",
            job.segment,
            job.pending.len(),
            job.length
        );
        summary.segments_processed += 1;

        let synth = TimeslideSynthesizer::new(self.config.sample_rate, job.length);
        // blocks until every shift of this segment is written
        let results = pool.map(&job.pending, |_, &shift_index| {
            self.process_shift(job, shift_index, &strain, &synth, shifts, datadir)
        });
        for (result, &shift_index) in results.into_iter().zip(&job.pending) {
            match result {
                Ok(stats) => {
                    summary.shifts_written += 1;
                    summary.injections += stats.injections;
                    summary.n_rejected += stats.n_rejected;
                    summary.livetime += job.length;
                }
                Err(e) => {
                    warn!(
                        "skipping shift {} of segment {}: {}",
                        shifts.shifts()[shift_index],
                        job.segment,
                        e
                    );
                    summary.shifts_failed += 1;
                }
            }
        }
        summary
    }

    fn process_shift(
        &self,
        job: &SegmentJob,
        shift_index: usize,
        strain: &[TimeSeries],
        synth: &TimeslideSynthesizer,
        shifts: &ShiftSet,
        datadir: &Path,
    ) -> Result<ShiftStats, PipelineError> {
        let cfg = self.config;
        let shift = &shifts.shifts()[shift_index];
        let root = datadir.join(shift.to_string());
        let start = job.segment.start;

        debug!("cropping background for {} on {}", job.segment, shift);
        let background = synth.background(strain, &cfg.channels, start, shift)?;
        write_timeseries(&root.join(BACKGROUND_DIR), &background)?;

        let mut rng = unit_rng(cfg.seed, job.index as u64, shift_index as u64);
        let sampler = InjectionSampler::new(self.prior, &cfg.cosmology, cfg.injection_settings());
        let sampled = sampler.sample(start, job.length, &mut rng)?;

        debug!(
            "projecting {} waveforms on {}",
            sampled.parameters.len(),
            shift
        );
        let noise: Vec<&[f64]> = background.data.iter().map(Vec::as_slice).collect();
        let mut rows: Vec<Parameters> = Vec::with_capacity(sampled.parameters.len());
        let mut responses = Vec::with_capacity(sampled.parameters.len());
        let mut times = Vec::with_capacity(sampled.parameters.len());
        for params in sampled.parameters {
            let record =
                InjectionRecord::realise(params, self.generator, self.projector, self.snr, &noise)?;
            times.push(record.geocent_time().unwrap_or(start));
            responses.push(record.responses);
            rows.push(record.parameters);
        }

        let injected = synth.inject(&background, &responses, &times);
        let inj_dir = root.join(INJECTION_DIR);
        write_timeseries(&inj_dir, &injected)?;

        let mut table = TableAppender::open(inj_dir.join(PARAMS_FILE_NAME))?;
        table.append(&rows, sampled.n_rejected)?;
        table.finish()?;
        debug!("wrote {} injections for {}", rows.len(), shift);

        Ok(ShiftStats {
            injections: rows.len(),
            n_rejected: sampled.n_rejected,
        })
    }
}
