//! Frame table loader
//!
//! Reads a delimited frame dump (one row per frame, header row first) into
//! time-ordered [`Frame`] records.

use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, warn};

use crate::error::{AscanError, Result};
use crate::wireless::{FrameSubtype, MacAddr};

use super::frame::Frame;
use super::schema::ColumnIndex;

/// Frames loaded from one table
#[derive(Debug, Clone, Default)]
pub struct FrameTable {
    /// Time-ascending; ties keep file order
    pub frames: Vec<Frame>,
    pub rows_read: usize,
    /// Rows without a usable time or RSSI, or unreadable rows
    pub rows_dropped: usize,
}

impl FrameTable {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct FrameTableLoader {
    delimiter: u8,
}

impl Default for FrameTableLoader {
    fn default() -> Self {
        Self { delimiter: b'|' }
    }
}

impl FrameTableLoader {
    pub fn new(delimiter: u8) -> Self {
        Self { delimiter }
    }

    pub fn load(&self, path: &Path) -> Result<FrameTable> {
        let file = std::fs::File::open(path).map_err(|e| AscanError::open(path, e))?;
        self.from_reader(file, path)
    }

    /// Load from any reader; `path` is only used in error messages.
    pub fn from_reader<R: Read>(&self, reader: R, path: &Path) -> Result<FrameTable> {
        let mut rdr = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = rdr.headers().map_err(|e| AscanError::csv(path, e))?.clone();
        let columns = ColumnIndex::resolve(headers.iter()).map_err(|missing| AscanError::Schema {
            path: path.to_path_buf(),
            missing,
        })?;

        let mut table = FrameTable::default();
        for (row, result) in rdr.records().enumerate() {
            table.rows_read += 1;
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    warn!("{}: skipping unreadable row {}: {}", path.display(), row + 1, e);
                    table.rows_dropped += 1;
                    continue;
                }
            };
            match parse_row(&record, &columns, row) {
                Some(frame) => table.frames.push(frame),
                None => table.rows_dropped += 1,
            }
        }

        table.frames.sort_by(|a, b| a.time_epoch.total_cmp(&b.time_epoch));

        debug!(
            "{}: {} rows read, {} kept, {} dropped",
            path.display(),
            table.rows_read,
            table.frames.len(),
            table.rows_dropped
        );
        Ok(table)
    }
}

fn parse_row(record: &StringRecord, columns: &ColumnIndex, row: usize) -> Option<Frame> {
    let field = |idx: usize| record.get(idx).unwrap_or("").trim();

    let time_epoch = parse_f64(field(columns.time_epoch))?;
    let rssi = parse_rssi(field(columns.rssi))?;
    let type_subtype = first_value(field(columns.type_subtype))
        .and_then(parse_int)
        .and_then(|v| u16::try_from(v).ok())
        .unwrap_or(u16::MAX);

    Some(Frame {
        row,
        time_epoch,
        type_subtype,
        subtype: FrameSubtype::from_code(type_subtype),
        source: MacAddr::parse_opt(field(columns.source)),
        destination: MacAddr::parse_opt(field(columns.destination)),
        transmitter: MacAddr::parse_opt(field(columns.transmitter)),
        receiver: MacAddr::parse_opt(field(columns.receiver)),
        bssid: MacAddr::parse_opt(field(columns.bssid)),
        addrs: MacAddr::parse_list(field(columns.addrs)),
        retry: parse_flag(field(columns.retry)),
        pwrmgt: parse_flag(field(columns.pwrmgt)),
        rssi,
        data_len: first_value(field(columns.data_len))
            .and_then(parse_int)
            .and_then(|v| u32::try_from(v).ok()),
        status_code: first_value(field(columns.status_code))
            .and_then(parse_int)
            .and_then(|v| u16::try_from(v).ok()),
        datarate: columns
            .datarate
            .and_then(|idx| first_value(field(idx)))
            .and_then(parse_f64),
    })
}

fn first_value(text: &str) -> Option<&str> {
    text.split(',').map(str::trim).find(|s| !s.is_empty())
}

fn parse_f64(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Decimal or `0x`-prefixed hexadecimal
fn parse_int(text: &str) -> Option<u64> {
    let text = text.trim();
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

fn parse_flag(text: &str) -> Option<bool> {
    match first_value(text)?.to_ascii_lowercase().as_str() {
        "1" | "true" | "set" => Some(true),
        "0" | "false" | "not set" => Some(false),
        _ => None,
    }
}

/// Mean of a per-antenna RSSI list, ignoring non-numeric entries.
fn parse_rssi(text: &str) -> Option<f64> {
    let values: Vec<f64> = text.split(',').filter_map(parse_f64).collect();
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const HEADER: &str = "frame.time_epoch|radiotap.dbm_antsignal|wlan.addr|wlan.sa|wlan.da|wlan.ta|wlan.ra|wlan.bssid|wlan.fc.type_subtype|wlan.fc.retry|wlan.fc.pwrmgt|data.len|wlan.fixed.status_code";

    fn load(body: &str) -> Result<FrameTable> {
        let text = format!("{}\n{}", HEADER, body);
        FrameTableLoader::default().from_reader(text.as_bytes(), Path::new("test.csv"))
    }

    #[test]
    fn test_rssi_list_is_averaged() {
        let table = load("1.0|-40,-50,x|c0:ee:fb:30:d7:17|c0:ee:fb:30:d7:17|ff:ff:ff:ff:ff:ff|||ff:ff:ff:ff:ff:ff|4|0|0||\n").unwrap();
        assert_eq!(table.len(), 1);
        assert_abs_diff_eq!(table.frames[0].rssi, -45.0);
        assert_eq!(table.frames[0].subtype, FrameSubtype::ProbeRequest);
        assert_eq!(table.frames[0].retry, Some(false));
        assert_eq!(table.frames[0].data_len, None);
    }

    #[test]
    fn test_rows_missing_time_or_rssi_are_dropped() {
        let body = "\
|-40|||||||8|0|0||
2.0||||||||8|0|0||
2.0|x,y|||||||8|0|0||
3.0|-60|||||||8|0|0||
";
        let table = load(body).unwrap();
        assert_eq!(table.rows_read, 4);
        assert_eq!(table.rows_dropped, 3);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_sorted_stably_by_time() {
        let body = "\
3.0|-60|||||||8|0|0||
1.0|-61|||||||36|0|0||
3.0|-62|||||||40|0|0||
2.0|-63|||||||4|0|0||
";
        let table = load(body).unwrap();
        let order: Vec<usize> = table.frames.iter().map(|f| f.row).collect();
        assert_eq!(order, vec![1, 3, 0, 2]);
    }

    #[test]
    fn test_hex_codes() {
        let table = load("1.0|-40|||||||0x0001|1|1|12|0x0000\n").unwrap();
        let frame = &table.frames[0];
        assert_eq!(frame.subtype, FrameSubtype::AssocResponse);
        assert_eq!(frame.status_code, Some(0));
        assert_eq!(frame.data_len, Some(12));
        assert_eq!(frame.pwrmgt, Some(true));
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let text = "frame.time_epoch|wlan.sa\n1.0|c0:ee:fb:30:d7:17\n";
        let err = FrameTableLoader::default()
            .from_reader(text.as_bytes(), Path::new("bad.csv"))
            .unwrap_err();
        assert!(err.is_schema());
        assert!(err.to_string().contains("radiotap.dbm_antsignal"));
        assert!(err.to_string().contains("bad.csv"));
    }

    #[test]
    fn test_unreadable_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("day1/missing.psv");
        let err = FrameTableLoader::default().load(&path).unwrap_err();
        assert!(matches!(err, AscanError::Open { .. }));
        assert!(err.to_string().contains("missing.psv"), "{}", err);
    }
}
