//! Merging per-unit parameter tables into one archive.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use super::table::ParameterTable;
use super::{io_error, ArchiveError};

/// Name of the merged archive.
pub const MERGED_FILE_NAME: &str = "timeslide_waveforms.json";

/// Concatenate every `*.json` table in `dir` into `dir/timeslide_waveforms.json`.
///
/// Inputs are taken in file-name order, their columns concatenated and their
/// `n_rejected` counts summed. Inputs are deleted once the merged file is
/// written. Returns the merged table.
pub fn merge_output(dir: &Path) -> Result<ParameterTable, ArchiveError> {
    let mut inputs: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(io_error(dir))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension().is_some_and(|ext| ext == "json")
                && p.file_name().is_some_and(|n| n != MERGED_FILE_NAME)
        })
        .collect();
    inputs.sort();

    let mut merged = ParameterTable::new();
    for path in &inputs {
        merged.extend(ParameterTable::read(path)?)?;
    }
    merged.write(&dir.join(MERGED_FILE_NAME))?;
    for path in &inputs {
        fs::remove_file(path).map_err(io_error(path))?;
    }
    info!(
        "merged {} tables into {} rows ({} rejected)",
        inputs.len(),
        merged.len(),
        merged.n_rejected()
    );
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Parameters;

    #[test]
    fn test_merge_sums_and_removes_inputs() {
        let dir = tempfile::tempdir().unwrap();
        for (i, name) in ["b.json", "a.json"].iter().enumerate() {
            let mut table = ParameterTable::new();
            let row: Parameters = [("x".to_string(), i as f64)].into_iter().collect();
            table.append_rows(&[row]).unwrap();
            table.add_rejected(4);
            table.write(&dir.path().join(name)).unwrap();
        }
        let merged = merge_output(dir.path()).unwrap();
        assert_eq!(merged.n_rejected(), 8);
        // a.json (x = 1) sorts before b.json (x = 0)
        assert_eq!(merged.column("x").unwrap(), &[1.0, 0.0]);
        assert!(!dir.path().join("a.json").exists());
        assert!(dir.path().join(MERGED_FILE_NAME).exists());
    }
}
