//! Concatenation of feature tables

use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use tempfile::NamedTempFile;
use tracing::info;

use crate::error::{AscanError, Result};

use super::same_file;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub tables: usize,
    pub rows: usize,
}

/// Append every table in `inputs` to `output`, writing the header once.
/// All tables must share the first table's header.
///
/// Rows are staged in a temporary file next to `output`, which is replaced
/// only once every input has been read.
pub fn merge_tables(inputs: &[PathBuf], output: &Path, delimiter: u8) -> Result<MergeSummary> {
    if let Some(input) = inputs.iter().find(|input| same_file(input, output)) {
        return Err(AscanError::OutputIsInput { path: input.clone() });
    }

    let dir = match output.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            std::fs::create_dir_all(parent)?;
            parent
        }
        None => Path::new("."),
    };
    let mut staged = NamedTempFile::new_in(dir)?;
    let mut wtr = WriterBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .from_writer(staged.as_file_mut());

    let mut expected: Option<(StringRecord, &Path)> = None;
    let mut summary = MergeSummary::default();

    for input in inputs {
        let mut rdr = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .from_path(input)
            .map_err(|e| AscanError::csv(input, e))?;
        let headers = rdr.headers().map_err(|e| AscanError::csv(input, e))?.clone();

        match &expected {
            Some((first, first_path)) => {
                if !first.iter().eq(headers.iter()) {
                    return Err(AscanError::HeaderMismatch {
                        path: input.clone(),
                        expected_from: first_path.to_path_buf(),
                    });
                }
            }
            None => {
                wtr.write_record(&headers).map_err(|e| AscanError::csv(output, e))?;
                expected = Some((headers, input.as_path()));
            }
        }

        for record in rdr.records() {
            let record = record.map_err(|e| AscanError::csv(input, e))?;
            wtr.write_record(&record).map_err(|e| AscanError::csv(output, e))?;
            summary.rows += 1;
        }
        summary.tables += 1;
    }
    wtr.flush()?;
    drop(wtr);
    staged.persist(output).map_err(|e| AscanError::Io(e.error))?;

    info!("merged {} tables ({} rows) into {}", summary.tables, summary.rows, output.display());
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_merge_writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.csv", "x|y\n1|2\n3|4\n");
        let b = write(dir.path(), "b.csv", "x|y\n5|6\n");
        let out = dir.path().join("merged.csv");

        let summary = merge_tables(&[a, b], &out, b'|').unwrap();
        assert_eq!(summary, MergeSummary { tables: 2, rows: 3 });
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "x|y\n1|2\n3|4\n5|6\n");
    }

    #[test]
    fn test_merge_rejects_mismatched_header() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.csv", "x|y\n1|2\n");
        let b = write(dir.path(), "b.csv", "x|z\n5|6\n");
        let out = dir.path().join("merged.csv");

        let err = merge_tables(&[a, b.clone()], &out, b'|').unwrap_err();
        match err {
            AscanError::HeaderMismatch { path, .. } => assert_eq!(path, b),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_merge_into_one_of_its_inputs_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.csv", "x|y\n1|2\n");
        let b = write(dir.path(), "b.csv", "x|y\n5|6\n");

        let err = merge_tables(&[a.clone(), b], &a, b'|').unwrap_err();
        assert!(matches!(err, AscanError::OutputIsInput { .. }), "{}", err);
        assert_eq!(std::fs::read_to_string(&a).unwrap(), "x|y\n1|2\n");
    }

    #[test]
    fn test_failed_merge_leaves_output_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.csv", "x|y\n1|2\n");
        let b = write(dir.path(), "b.csv", "x|z\n5|6\n");
        let out = write(dir.path(), "merged.csv", "x|y\n0|0\n");

        merge_tables(&[a, b], &out, b'|').unwrap_err();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "x|y\n0|0\n");
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 3);
    }
}
