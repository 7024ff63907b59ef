//! Time-indexed background and injection files.

use std::path::{Path, PathBuf};

use log::debug;

use crate::timeslide::Timeslide;

use super::{read_json, write_json, ArchiveError};

/// File name for data starting at `t0` and lasting `length` seconds.
pub fn timeseries_file_name(t0: f64, length: f64) -> String {
    format!("{t0}-{length}.json")
}

/// Whether a file for `[t0, t0 + length)` already exists in `dir`.
pub fn output_exists(dir: &Path, t0: f64, length: f64) -> bool {
    dir.join(timeseries_file_name(t0, length)).is_file()
}

/// Write `timeslide` to `dir/<t0>-<length>.json`, returning the path.
///
/// Every channel must have the same number of samples.
pub fn write_timeseries(dir: &Path, timeslide: &Timeslide) -> Result<PathBuf, ArchiveError> {
    let expected = timeslide.n_samples();
    for (channel, data) in timeslide.channels.iter().zip(&timeslide.data) {
        if data.len() != expected {
            return Err(ArchiveError::ChannelLength {
                channel: channel.clone(),
                expected,
                found: data.len(),
            });
        }
    }
    let path = dir.join(timeseries_file_name(timeslide.t0, timeslide.duration()));
    write_json(&path, timeslide)?;
    debug!("wrote {} channels to {}", timeslide.channels.len(), path.display());
    Ok(path)
}

/// Read a timeslide written by [`write_timeseries`].
pub fn read_timeseries(path: &Path) -> Result<Timeslide, ArchiveError> {
    read_json(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Shift;

    fn timeslide() -> Timeslide {
        Timeslide {
            shift: Shift::new(vec![0.0, 1.0]),
            t0: 1000.0,
            sample_rate: 4.0,
            channels: vec!["H1:STRAIN".into(), "L1:STRAIN".into()],
            data: vec![vec![0.0; 8], vec![1.0; 8]],
        }
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let ts = timeslide();
        let path = write_timeseries(dir.path(), &ts).unwrap();
        assert_eq!(path.file_name().unwrap(), "1000-2.json");
        assert!(output_exists(dir.path(), 1000.0, 2.0));
        assert_eq!(read_timeseries(&path).unwrap(), ts);
    }

    #[test]
    fn test_ragged_channels_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut ts = timeslide();
        ts.data[1].pop();
        assert!(matches!(
            write_timeseries(dir.path(), &ts),
            Err(ArchiveError::ChannelLength { .. })
        ));
    }
}
