//! Feature Table Assembler
//!
//! Orders window records deterministically, drops records with an undefined
//! feature, and writes them as one delimited table.

use std::fs::OpenOptions;
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};
use tracing::debug;

use crate::error::{AscanError, Result};
use crate::features::{FeatureId, FeatureSet};
use crate::wireless::MacAddr;

use super::record::{header, WindowFeatureRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Truncate and write a header
    #[default]
    Create,
    /// Append rows; the header is written only if the file is empty,
    /// otherwise the existing header must match
    Append,
}

/// A record left out of the table
#[derive(Debug, Clone, PartialEq)]
pub struct DroppedRecord {
    pub client: MacAddr,
    pub window_id: u32,
    pub feature: FeatureId,
}

/// Records ready to be written
#[derive(Debug, Clone, Default)]
pub struct FeatureTable {
    pub records: Vec<WindowFeatureRecord>,
    pub dropped: Vec<DroppedRecord>,
}

#[derive(Debug, Clone)]
pub struct FeatureTableAssembler {
    features: FeatureSet,
    delimiter: u8,
}

impl FeatureTableAssembler {
    pub fn new(features: FeatureSet, delimiter: u8) -> Self {
        Self { features, delimiter }
    }

    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    pub fn header(&self) -> Vec<String> {
        header(&self.features)
    }

    /// Sort by (file, client, window id) and drop records with a NaN in an
    /// enabled feature.
    pub fn assemble(&self, mut records: Vec<WindowFeatureRecord>) -> FeatureTable {
        records.sort_by(|a, b| {
            (a.file_name.as_str(), a.client, a.window_id).cmp(&(b.file_name.as_str(), b.client, b.window_id))
        });

        let mut table = FeatureTable::default();
        for record in records {
            let undefined = self
                .features
                .ids()
                .iter()
                .copied()
                .find(|id| record.feature(*id).map_or(true, f64::is_nan));
            match undefined {
                Some(feature) => table.dropped.push(DroppedRecord {
                    client: record.client,
                    window_id: record.window_id,
                    feature,
                }),
                None => table.records.push(record),
            }
        }
        table
    }

    /// Write `records` to `path`. Returns the number of rows written.
    pub fn write(&self, records: &[WindowFeatureRecord], path: &Path, mode: WriteMode) -> Result<usize> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        if mode == WriteMode::Append {
            self.check_existing_header(path)?;
        }

        let file = match mode {
            WriteMode::Create => OpenOptions::new().write(true).create(true).truncate(true).open(path),
            WriteMode::Append => OpenOptions::new().append(true).create(true).open(path),
        }
        .map_err(|e| AscanError::open(path, e))?;
        let write_header = file.metadata()?.len() == 0;

        let mut wtr = WriterBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .from_writer(file);

        if write_header {
            wtr.write_record(self.header()).map_err(|e| AscanError::csv(path, e))?;
        }
        for record in records {
            wtr.write_record(record.to_row(&self.features))
                .map_err(|e| AscanError::csv(path, e))?;
        }
        wtr.flush()?;

        debug!("{}: wrote {} rows", path.display(), records.len());
        Ok(records.len())
    }

    /// A non-empty table at `path` must start with this assembler's header.
    fn check_existing_header(&self, path: &Path) -> Result<()> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > 0 => {}
            _ => return Ok(()),
        }

        let mut rdr = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .map_err(|e| AscanError::csv(path, e))?;
        let existing = match rdr.records().next() {
            Some(record) => record.map_err(|e| AscanError::csv(path, e))?,
            None => return Ok(()),
        };

        if !existing.iter().eq(self.header().iter().map(String::as_str)) {
            return Err(AscanError::AppendMismatch { path: path.to_path_buf() });
        }
        Ok(())
    }
}
