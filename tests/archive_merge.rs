//! Parameter tables: appending, reopening and merging.

use timeslide_vt::archive::{merge_output, ParameterTable, TableAppender, MERGED_FILE_NAME};
use timeslide_vt::Parameters;

fn row(t: f64) -> Parameters {
    [("geocent_time", t), ("H1_snr", 2.0 * t), ("L1_snr", 3.0 * t)]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// Merging k tables with r rejections each keeps every row in name order and
/// reports k·r rejections.
#[test]
fn merge_concatenates_in_name_order() {
    let dir = tempfile::tempdir().unwrap();
    let k = 5;
    for i in 0..k {
        let mut table = ParameterTable::new();
        let rows: Vec<Parameters> = (0..=i).map(|j| row((10 * i + j) as f64)).collect();
        table.append_rows(&rows).unwrap();
        table.add_rejected(7);
        table.write(&dir.path().join(format!("part-{i}.json"))).unwrap();
    }
    // non-json files are left alone
    std::fs::write(dir.path().join("notes.txt"), "keep").unwrap();

    let merged = merge_output(dir.path()).unwrap();
    assert_eq!(merged.n_rejected(), 7 * k as u64);
    assert_eq!(merged.len(), (1..=k).sum::<usize>());

    let times = merged.column("geocent_time").unwrap();
    let expected: Vec<f64> = (0..k)
        .flat_map(|i| (0..=i).map(move |j| (10 * i + j) as f64))
        .collect();
    assert_eq!(times, expected.as_slice());
    let snrs = merged.column("L1_snr").unwrap();
    assert!(times.iter().zip(snrs).all(|(t, s)| *s == 3.0 * t));

    assert!(dir.path().join("notes.txt").exists());
    for i in 0..k {
        assert!(!dir.path().join(format!("part-{i}.json")).exists());
    }
    let reread = ParameterTable::read(&dir.path().join(MERGED_FILE_NAME)).unwrap();
    assert_eq!(reread, merged);
}

/// Tables whose columns disagree cannot be merged.
#[test]
fn merge_rejects_mismatched_columns() {
    let dir = tempfile::tempdir().unwrap();
    let mut a = ParameterTable::new();
    a.append_rows(&[row(1.0)]).unwrap();
    a.write(&dir.path().join("a.json")).unwrap();

    let mut b = ParameterTable::new();
    let mut other = row(2.0);
    other.remove("L1_snr");
    b.append_rows(&[other]).unwrap();
    b.write(&dir.path().join("b.json")).unwrap();

    assert!(merge_output(dir.path()).is_err());
    assert!(dir.path().join("a.json").exists());
}

/// Reopening an appender keeps earlier rows; dropping it flushes.
#[test]
fn appender_never_truncates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("params.json");
    {
        let mut appender = TableAppender::open(&path).unwrap();
        appender.append(&[row(1.0), row(2.0)], 3).unwrap();
    }
    let mut appender = TableAppender::open(&path).unwrap();
    assert_eq!(appender.len(), 2);
    appender.append(&[row(3.0)], 1).unwrap();
    let table = appender.finish().unwrap();
    assert_eq!(table.column("geocent_time").unwrap(), &[1.0, 2.0, 3.0]);
    assert_eq!(table.n_rejected(), 4);
    assert_eq!(ParameterTable::read(&path).unwrap(), table);
}
