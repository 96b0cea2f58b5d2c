//! Ground-truth scanning epochs
//!
//! An epoch file lists, one per row, the times (milliseconds, first
//! comma-separated column) at which a client was externally observed to start
//! active scanning. Probe requests too far from every listed time are ignored
//! when forming episodes.

use std::path::Path;

use csv::ReaderBuilder;

use crate::error::{AscanError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct EpochFilter {
    /// Seconds, ascending
    epochs: Vec<f64>,
    threshold: f64,
}

impl EpochFilter {
    /// `epochs` in seconds; `threshold` is the largest accepted distance.
    pub fn new(mut epochs: Vec<f64>, threshold: f64) -> Self {
        epochs.retain(|e| e.is_finite());
        epochs.sort_by(f64::total_cmp);
        Self { epochs, threshold }
    }

    pub fn load(path: &Path, threshold: f64) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .map_err(|e| AscanError::csv(path, e))?;

        let mut epochs = Vec::new();
        for (line, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| AscanError::csv(path, e))?;
            let text = record.get(0).unwrap_or("").trim();
            if text.is_empty() {
                continue;
            }
            match text.parse::<f64>() {
                Ok(ms) => epochs.push(ms / 1000.0),
                // A leading header row is tolerated
                Err(_) if line == 0 => continue,
                Err(_) => {
                    return Err(AscanError::EpochFilter {
                        path: path.to_path_buf(),
                        reason: format!("line {}: not a number: {:?}", line + 1, text),
                    })
                }
            }
        }

        if epochs.is_empty() {
            return Err(AscanError::EpochFilter {
                path: path.to_path_buf(),
                reason: "no epochs".to_string(),
            });
        }
        Ok(Self::new(epochs, threshold))
    }

    pub fn epochs(&self) -> &[f64] {
        &self.epochs
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// `epoch` lies within the threshold of some listed epoch.
    pub fn accepts(&self, epoch: f64) -> bool {
        let idx = self.epochs.partition_point(|e| *e < epoch);
        let below = idx.checked_sub(1).and_then(|i| self.epochs.get(i));
        let above = self.epochs.get(idx);
        [below, above]
            .into_iter()
            .flatten()
            .any(|e| (e - epoch).abs() <= self.threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_accepts_nearest() {
        let filter = EpochFilter::new(vec![110.0, 100.0], 2.0);
        assert!(filter.accepts(100.0));
        assert!(filter.accepts(98.0));
        assert!(filter.accepts(111.5));
        assert!(!filter.accepts(105.0));
        assert!(!filter.accepts(112.5));
        assert!(!filter.accepts(50.0));
    }

    #[test]
    fn test_empty_filter_rejects_everything() {
        let filter = EpochFilter::new(Vec::new(), 2.0);
        assert!(!filter.accepts(0.0));
    }

    #[test]
    fn test_load_milliseconds() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "epoch_ms,label").unwrap();
        writeln!(file, "100000,scan").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "105500").unwrap();

        let filter = EpochFilter::load(file.path(), 2.0).unwrap();
        assert_eq!(filter.epochs(), &[100.0, 105.5]);
    }

    #[test]
    fn test_load_rejects_garbage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "100000").unwrap();
        writeln!(file, "soon").unwrap();

        let err = EpochFilter::load(file.path(), 2.0).unwrap_err();
        assert!(matches!(err, AscanError::EpochFilter { .. }));
    }
}
