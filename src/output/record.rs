//! Output rows

use crate::features::{FeatureId, FeatureSet};
use crate::wireless::MacAddr;

/// Provenance columns, written before the features
pub const PROVENANCE_COLUMNS: [&str; 13] = [
    "csv_file.name",
    "csv_file.relpath",
    "relevant_client.mac",
    "window.id",
    "window_start.time_epoch",
    "window_end.time_epoch",
    "window_duration.seconds",
    "window_frames.count",
    "episode.id",
    "episode_start.time_epoch",
    "episode_end.time_epoch",
    "episode_duration.seconds",
    "episode_frames.count",
];

/// Full header for a table carrying `features`
pub fn header(features: &FeatureSet) -> Vec<String> {
    PROVENANCE_COLUMNS
        .iter()
        .copied()
        .chain(features.names())
        .map(str::to_string)
        .collect()
}

/// One row per (client, window)
#[derive(Debug, Clone, PartialEq)]
pub struct WindowFeatureRecord {
    pub file_name: String,
    /// Input path relative to the batch root, or as given
    pub file_relpath: String,
    pub client: MacAddr,
    pub window_id: u32,
    pub window_start: f64,
    pub window_end: f64,
    pub window_duration: f64,
    pub window_frames: usize,
    pub episode_id: u32,
    pub episode_start: f64,
    pub episode_end: f64,
    pub episode_duration: f64,
    pub episode_frames: usize,
    /// In column order
    pub features: Vec<(FeatureId, f64)>,
}

impl WindowFeatureRecord {
    pub fn feature(&self, id: FeatureId) -> Option<f64> {
        self.features.iter().find(|(f, _)| *f == id).map(|(_, v)| *v)
    }

    /// First feature that came out NaN
    pub fn undefined_feature(&self) -> Option<FeatureId> {
        self.features.iter().find(|(_, v)| v.is_nan()).map(|(id, _)| *id)
    }

    /// Field values for `features`, matching [`header`]
    pub fn to_row(&self, features: &FeatureSet) -> Vec<String> {
        let mut row = vec![
            self.file_name.clone(),
            self.file_relpath.clone(),
            self.client.to_string(),
            self.window_id.to_string(),
            self.window_start.to_string(),
            self.window_end.to_string(),
            self.window_duration.to_string(),
            self.window_frames.to_string(),
            self.episode_id.to_string(),
            self.episode_start.to_string(),
            self.episode_end.to_string(),
            self.episode_duration.to_string(),
            self.episode_frames.to_string(),
        ];
        row.extend(
            features
                .ids()
                .iter()
                .map(|id| self.feature(*id).unwrap_or(f64::NAN).to_string()),
        );
        row
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn record(file: &str, client: &str, window_id: u32, rssi: f64) -> WindowFeatureRecord {
        WindowFeatureRecord {
            file_name: file.to_string(),
            file_relpath: format!("day1/{}", file),
            client: client.parse().unwrap(),
            window_id,
            window_start: 1.0,
            window_end: 2.5,
            window_duration: 1.5,
            window_frames: 4,
            episode_id: window_id,
            episode_start: 2.5,
            episode_end: 2.75,
            episode_duration: 0.25,
            episode_frames: 3,
            features: vec![(FeatureId::RssiMean, rssi), (FeatureId::ClientAssociatedBinary, 1.0)],
        }
    }

    #[test]
    fn test_row_matches_header() {
        let set = FeatureSet::from_names(&["rssi__mean", "client_associated__binary"]).unwrap();
        let rec = record("cap.csv", "c0:ee:fb:30:d7:17", 2, -42.5);
        let header = header(&set);
        let row = rec.to_row(&set);

        assert_eq!(header.len(), row.len());
        assert_eq!(header[13], "rssi__mean");
        assert_eq!(row[0], "cap.csv");
        assert_eq!(row[1], "day1/cap.csv");
        assert_eq!(row[2], "c0:ee:fb:30:d7:17");
        assert_eq!(row[3], "2");
        assert_eq!(row[13], "-42.5");
        assert_eq!(row[14], "1");
    }

    #[test]
    fn test_undefined_feature() {
        assert_eq!(record("a", "c0:ee:fb:30:d7:17", 1, -40.0).undefined_feature(), None);
        assert_eq!(
            record("a", "c0:ee:fb:30:d7:17", 1, f64::NAN).undefined_feature(),
            Some(FeatureId::RssiMean)
        );
    }
}
