//! Growable injection-parameter tables.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::types::Parameters;

use super::{read_json, write_json, ArchiveError};

/// File name of the per-shift parameter table.
pub const PARAMS_FILE_NAME: &str = "params.json";

/// Column table of injection parameters with a rejected-draw count.
///
/// Columns always have equal length. Appending rows or tables grows every
/// column together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterTable {
    columns: BTreeMap<String, Vec<f64>>,
    n_rejected: u64,
}

impl ParameterTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.columns.values().next().map_or(0, Vec::len)
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Draws rejected by prior constraints while filling the table.
    pub fn n_rejected(&self) -> u64 {
        self.n_rejected
    }

    /// Add to the rejected-draw count.
    pub fn add_rejected(&mut self, n: u64) {
        self.n_rejected += n;
    }

    /// Column for `key`.
    pub fn column(&self, key: &str) -> Option<&[f64]> {
        self.columns.get(key).map(Vec::as_slice)
    }

    /// All columns keyed by parameter name.
    pub fn columns(&self) -> &BTreeMap<String, Vec<f64>> {
        &self.columns
    }

    /// Append rows. Every row must carry exactly the table's keys (any keys
    /// are accepted while the table is empty) and only finite values.
    pub fn append_rows(&mut self, rows: &[Parameters]) -> Result<(), ArchiveError> {
        let mut other = ParameterTable::new();
        for (i, row) in rows.iter().enumerate() {
            for (key, value) in row {
                if !value.is_finite() {
                    return Err(ArchiveError::NonFiniteValue {
                        key: key.clone(),
                        row: i,
                        value: *value,
                    });
                }
                other.columns.entry(key.clone()).or_default().push(*value);
            }
        }
        other.check_rectangular()?;
        self.extend(other)
    }

    /// Concatenate `other` below `self`, summing rejected counts.
    pub fn extend(&mut self, other: ParameterTable) -> Result<(), ArchiveError> {
        if other.is_empty() {
            self.n_rejected += other.n_rejected;
            return Ok(());
        }
        if self.is_empty() {
            self.n_rejected += other.n_rejected;
            self.columns = other.columns;
            return Ok(());
        }
        let (rows, added) = (self.len(), other.len());
        for key in self.columns.keys() {
            if !other.columns.contains_key(key) {
                return Err(ArchiveError::RaggedColumns {
                    key: key.clone(),
                    expected: rows + added,
                    found: rows,
                });
            }
        }
        for key in other.columns.keys() {
            if !self.columns.contains_key(key) {
                return Err(ArchiveError::RaggedColumns {
                    key: key.clone(),
                    expected: rows + added,
                    found: added,
                });
            }
        }
        self.n_rejected += other.n_rejected;
        for (key, values) in other.columns {
            if let Some(col) = self.columns.get_mut(&key) {
                col.extend(values);
            }
        }
        Ok(())
    }

    fn check_rectangular(&self) -> Result<(), ArchiveError> {
        let expected = self.len();
        for (key, col) in &self.columns {
            if col.len() != expected {
                return Err(ArchiveError::RaggedColumns {
                    key: key.clone(),
                    expected,
                    found: col.len(),
                });
            }
        }
        Ok(())
    }

    /// Read a table from disk.
    pub fn read(path: &Path) -> Result<Self, ArchiveError> {
        let table: ParameterTable = read_json(path)?;
        table.check_rectangular()?;
        Ok(table)
    }

    /// Write the table to disk, replacing any existing file.
    pub fn write(&self, path: &Path) -> Result<(), ArchiveError> {
        write_json(path, self)
    }
}

/// Scoped append handle on an on-disk [`ParameterTable`].
///
/// Opening loads whatever the file already holds; appends accumulate in
/// memory and are written back by [`flush`](Self::flush),
/// [`finish`](Self::finish) or, failing those, when the handle is dropped.
/// Earlier entries are never truncated.
#[derive(Debug)]
pub struct TableAppender {
    path: PathBuf,
    table: ParameterTable,
    dirty: bool,
}

impl TableAppender {
    /// Open `path` for appending, creating an empty table if absent.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ArchiveError> {
        let path = path.into();
        let table = if path.is_file() {
            ParameterTable::read(&path)?
        } else {
            ParameterTable::new()
        };
        Ok(Self {
            path,
            table,
            dirty: false,
        })
    }

    /// Path being appended to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows currently held (existing plus appended).
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether no rows are held.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Append rows and their rejected-draw count.
    pub fn append(&mut self, rows: &[Parameters], n_rejected: u64) -> Result<(), ArchiveError> {
        self.table.append_rows(rows)?;
        self.table.add_rejected(n_rejected);
        self.dirty = true;
        Ok(())
    }

    /// Write pending rows to disk.
    pub fn flush(&mut self) -> Result<(), ArchiveError> {
        if self.dirty {
            self.table.write(&self.path)?;
            self.dirty = false;
            debug!("flushed {} rows to {}", self.table.len(), self.path.display());
        }
        Ok(())
    }

    /// Flush and close, returning the full table.
    pub fn finish(mut self) -> Result<ParameterTable, ArchiveError> {
        self.flush()?;
        Ok(std::mem::take(&mut self.table))
    }
}

impl Drop for TableAppender {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!("failed to flush parameter table on drop: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(t: f64, snr: f64) -> Parameters {
        [("geocent_time", t), ("H1_snr", snr)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    #[test]
    fn test_append_grows_all_columns() {
        let mut table = ParameterTable::new();
        table.append_rows(&[row(1.0, 5.0), row(2.0, 6.0)]).unwrap();
        table.append_rows(&[row(3.0, 7.0)]).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.column("geocent_time").unwrap(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_non_finite_cells_rejected() {
        let mut table = ParameterTable::new();
        table.append_rows(&[row(1.0, 5.0)]).unwrap();
        let err = table.append_rows(&[row(2.0, 6.0), row(3.0, f64::INFINITY)]);
        assert!(matches!(
            err,
            Err(ArchiveError::NonFiniteValue { ref key, row: 1, .. }) if key == "H1_snr"
        ));
        assert!(table.append_rows(&[row(f64::NAN, 1.0)]).is_err());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_mismatched_keys_rejected() {
        let mut table = ParameterTable::new();
        table.append_rows(&[row(1.0, 5.0)]).unwrap();
        let mut odd = row(2.0, 1.0);
        odd.insert("L1_snr".into(), 3.0);
        assert!(table.append_rows(&[odd]).is_err());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_appender_reopens_without_truncating() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PARAMS_FILE_NAME);
        {
            let mut app = TableAppender::open(&path).unwrap();
            app.append(&[row(1.0, 5.0)], 2).unwrap();
            // dropped without finish: flushed on drop
        }
        let mut app = TableAppender::open(&path).unwrap();
        assert_eq!(app.len(), 1);
        app.append(&[row(2.0, 6.0)], 3).unwrap();
        let table = app.finish().unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.n_rejected(), 5);
        assert_eq!(ParameterTable::read(&path).unwrap(), table);
    }
}
