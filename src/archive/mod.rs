//! Persisted timeslide archives.
//!
//! Layout under an output directory:
//!
//! ```text
//! dt-<shift>/background/<t0>-<length>.json   raw shifted background
//! dt-<shift>/injection/<t0>-<length>.json    background + injections
//! dt-<shift>/injection/params.json           injection parameter table
//! ```
//!
//! All files are JSON written through `serde_json`; every write goes to a
//! temporary sibling first and is renamed into place once flushed.

mod merge;
mod table;
mod timeseries;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

pub use merge::{merge_output, MERGED_FILE_NAME};
pub use table::{ParameterTable, TableAppender, PARAMS_FILE_NAME};
pub use timeseries::{output_exists, read_timeseries, timeseries_file_name, write_timeseries};

/// Errors raised while reading or writing archives.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Filesystem operation failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// JSON encoding or decoding failed.
    #[error("malformed archive {}: {source}", path.display())]
    Json {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
    /// Columns of a table would end up with different lengths.
    #[error("column '{key}' would have {found} rows, expected {expected}")]
    RaggedColumns {
        /// Offending column.
        key: String,
        /// Rows in the rest of the table.
        expected: usize,
        /// Rows in this column.
        found: usize,
    },
    /// A cell holds NaN or an infinity, which JSON cannot carry.
    #[error("column '{key}' row {row} is not finite ({value})")]
    NonFiniteValue {
        /// Offending column.
        key: String,
        /// Row within the appended batch.
        row: usize,
        /// Rejected value.
        value: f64,
    },
    /// Channel data of a timeslide differ in length.
    #[error("channel '{channel}' has {found} samples, expected {expected}")]
    ChannelLength {
        /// Offending channel.
        channel: String,
        /// Expected sample count.
        expected: usize,
        /// Actual sample count.
        found: usize,
    },
}

pub(crate) fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ArchiveError + '_ {
    move |source| ArchiveError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Serialise `value` to `path` via a temporary sibling and rename.
pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ArchiveError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    let tmp = path.with_extension("json.tmp");
    let file = File::create(&tmp).map_err(io_error(&tmp))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, value).map_err(|source| ArchiveError::Json {
        path: tmp.clone(),
        source,
    })?;
    writer.flush().map_err(io_error(&tmp))?;
    writer
        .into_inner()
        .map_err(|e| ArchiveError::Io {
            path: tmp.clone(),
            source: e.into_error(),
        })?
        .sync_all()
        .map_err(io_error(&tmp))?;
    fs::rename(&tmp, path).map_err(io_error(path))
}

/// Deserialise a JSON file.
pub(crate) fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ArchiveError> {
    let file = File::open(path).map_err(io_error(path))?;
    serde_json::from_reader(std::io::BufReader::new(file)).map_err(|source| ArchiveError::Json {
        path: path.to_path_buf(),
        source,
    })
}
