//! Batch processing
//!
//! Walks an input directory, mirrors its layout under an output directory and
//! runs the pipeline on every frame table found. A failing file is recorded
//! and the batch carries on.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, error, info};

use crate::error::{AscanError, Result};
use crate::output::same_file;
use crate::parallel::maybe_par_map;
use crate::pipeline::Pipeline;
use crate::report::ProcessingReport;

/// Extensions treated as frame tables
pub const TABLE_EXTENSIONS: [&str; 3] = ["csv", "tsv", "psv"];

#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub file: PathBuf,
    pub error: String,
    /// Missing mandatory column(s)
    pub schema: bool,
}

#[derive(Debug, Default, Serialize)]
pub struct BatchSummary {
    pub reports: Vec<ProcessingReport>,
    pub failures: Vec<FileFailure>,
}

impl BatchSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// All per-file counters folded into one report
    pub fn totals(&self) -> ProcessingReport {
        let mut totals = ProcessingReport::default();
        for report in &self.reports {
            totals.absorb(report.clone());
        }
        totals
    }
}

fn is_table(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| TABLE_EXTENSIONS.iter().any(|t| e.eq_ignore_ascii_case(t)))
        .unwrap_or(false)
}

/// Every frame table under `root`, sorted by path.
pub fn discover_tables(root: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if is_table(&path) {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}

/// `file`'s location under `output_root`, keeping its path relative to
/// `input_root`.
pub fn mirror_path(input_root: &Path, output_root: &Path, file: &Path) -> PathBuf {
    match file.strip_prefix(input_root) {
        Ok(relative) => output_root.join(relative),
        Err(_) => output_root.join(file.file_name().unwrap_or(file.as_os_str())),
    }
}

/// Process every table under `input_root` into the mirrored location under
/// `output_root`. The two roots must differ, or every output would replace
/// its input.
pub fn run_batch(pipeline: &Pipeline, input_root: &Path, output_root: &Path, per_file: bool) -> Result<BatchSummary> {
    if same_file(input_root, output_root) {
        return Err(AscanError::OutputIsInput {
            path: input_root.to_path_buf(),
        });
    }
    let mut inputs = discover_tables(input_root)?;
    // Outputs nested inside the input tree are not inputs
    if output_root.starts_with(input_root) && output_root != input_root {
        inputs.retain(|p| !p.starts_with(output_root));
    }
    info!("{}: {} frame tables", input_root.display(), inputs.len());

    let stats = pipeline.stats().clone();
    let results = maybe_par_map(inputs, per_file, |input| {
        let output = mirror_path(input_root, output_root, &input);
        let relpath = input.strip_prefix(input_root).unwrap_or(input.as_path());
        debug!("{} -> {}", input.display(), output.display());
        let result = pipeline.process_file_at(&input, relpath, &output);
        (input, result)
    });

    let mut summary = BatchSummary::default();
    for (input, result) in results {
        match result {
            Ok(report) => {
                stats.inc_files();
                summary.reports.push(report);
            }
            Err(e) => {
                error!("{}: {}", input.display(), e);
                stats.inc_failures();
                summary.failures.push(FileFailure {
                    schema: e.is_schema(),
                    error: e.to_string(),
                    file: input,
                });
            }
        }
    }
    Ok(summary)
}
