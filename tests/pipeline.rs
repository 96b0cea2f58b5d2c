//! End-to-end runs over a synthetic capture

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use approx::assert_relative_eq;

use ascan::output::merge_tables;
use ascan::{EpochFilter, MacAddr, Pipeline, PipelineOptions};

const CLIENT: &str = "c0:ee:fb:30:d7:17";
const AP: &str = "00:11:22:33:44:55";
const BCAST: &str = "ff:ff:ff:ff:ff:ff";

const HEADER: &str = "frame.time_epoch|radiotap.dbm_antsignal|wlan.addr|wlan.sa|wlan.da|wlan.ta|wlan.ra|wlan.bssid|wlan.fc.type_subtype|wlan.fc.retry|wlan.fc.pwrmgt|data.len|wlan.fixed.status_code";

#[allow(clippy::too_many_arguments)]
fn row(out: &mut String, t: f64, rssi: i32, from: &str, to: &str, bssid: &str, subtype: u16, pwrmgt: u8, len: &str, status: &str) {
    writeln!(
        out,
        "{t:.4}|{rssi}|{from},{to}|{from}|{to}|{from}|{to}|{bssid}|{subtype}|0|{pwrmgt}|{len}|{status}"
    )
    .unwrap();
}

/// Client associated with AP, two scanning episodes, a beacon outage
/// between 102 s and 103 s and a reassociation just before episode 2.
fn capture() -> String {
    let mut out = String::from(HEADER);
    out.push('\n');

    let mut t = 90.0;
    while t < 110.0 {
        if !(102.0..103.0).contains(&t) {
            row(&mut out, t, -60, AP, BCAST, AP, 8, 0, "", "");
        }
        t += 0.1024;
    }

    row(&mut out, 95.0, -45, CLIENT, AP, AP, 32, 0, "120", "");
    for probe in [100.0, 100.3, 100.6, 105.0, 105.2] {
        row(&mut out, probe, -50, CLIENT, BCAST, BCAST, 4, 0, "", "");
    }
    row(&mut out, 101.0, -40, CLIENT, AP, AP, 36, 1, "0", "");
    row(&mut out, 103.5, -44, CLIENT, AP, AP, 32, 0, "50", "");
    row(&mut out, 104.5, -42, CLIENT, AP, AP, 0, 0, "", "");
    row(&mut out, 104.6, -55, AP, CLIENT, AP, 1, 0, "", "0");
    out
}

fn write_capture(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, capture()).unwrap();
    path
}

struct Output {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Output {
    fn read(path: &Path) -> Self {
        let mut rdr = csv::ReaderBuilder::new().delimiter(b'|').from_path(path).unwrap();
        let columns = rdr.headers().unwrap().iter().map(str::to_string).collect();
        let rows = rdr
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect();
        Self { columns, rows }
    }

    fn get(&self, row: usize, column: &str) -> f64 {
        let idx = self
            .columns
            .iter()
            .position(|c| c == column)
            .unwrap_or_else(|| panic!("no column {}", column));
        self.rows[row][idx].parse().unwrap()
    }
}

fn sequential() -> PipelineOptions {
    PipelineOptions {
        per_client: false,
        ..Default::default()
    }
}

#[test]
fn test_window_rows() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_capture(dir.path(), "capture.psv");
    let output = dir.path().join("features.psv");

    let report = Pipeline::new(sequential()).process_file(&input, &output).unwrap();
    assert_eq!(report.clients, 1);
    assert_eq!(report.windows, 2);
    assert_eq!(report.records_written, 2);
    assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);

    let out = Output::read(&output);
    assert_eq!(out.columns[0], "csv_file.name");
    assert_eq!(out.rows.len(), 2);
    assert_eq!(out.rows[0][0], "capture.psv");
    assert_eq!(out.rows[0][1], input.to_string_lossy());
    assert_eq!(out.rows[0][2], CLIENT);

    // window 1 runs from the first beacon to the first probe request
    assert_relative_eq!(out.get(0, "window_start.time_epoch"), 90.0);
    assert_relative_eq!(out.get(0, "window_end.time_epoch"), 100.0);
    assert_relative_eq!(out.get(0, "rssi__mean"), -45.0);
    assert_relative_eq!(out.get(0, "client_associated__binary"), 1.0);
    assert_relative_eq!(out.get(0, "max_consecutive_beacon_loss__count"), 0.0);
    assert_relative_eq!(out.get(0, "client_connection_request_frames__binary_1"), 0.0);

    // window 2: (100.6, 105.0)
    assert_relative_eq!(out.get(1, "window.id"), 2.0);
    assert_relative_eq!(out.get(1, "window_start.time_epoch"), 100.6);
    assert_relative_eq!(out.get(1, "window_end.time_epoch"), 105.0);
    assert_relative_eq!(out.get(1, "episode_start.time_epoch"), 105.0);
    assert_relative_eq!(out.get(1, "episode_end.time_epoch"), 105.2);
    assert_relative_eq!(out.get(1, "rssi__mean"), -42.0);
    assert_relative_eq!(out.get(1, "sleep_frames__binary"), 1.0);
    assert_relative_eq!(out.get(1, "client_connection_request_frames__binary_1"), 1.0);
    assert_relative_eq!(out.get(1, "client_connection_success_response_frames__binary_1"), 1.0);
    assert_relative_eq!(out.get(1, "broadcasted_probe_requests__binary"), 1.0);
    assert_relative_eq!(out.get(1, "directed_probe_requests__binary"), 0.0);
    assert!(out.get(1, "max_consecutive_beacon_loss__count") >= 5.0);

    // count companions
    assert_relative_eq!(out.get(0, "client_associated__ternary"), 1.0);
    assert_relative_eq!(out.get(1, "client_connection_request_frames__count_1"), 1.0);
    assert_relative_eq!(out.get(1, "client_connection_success_response_frames__count_1"), 1.0);
    assert_relative_eq!(out.get(1, "success_association_response__count"), 1.0);
    assert_relative_eq!(out.get(1, "unsuccess_association_response__count"), 0.0);
    assert_relative_eq!(out.get(1, "broadcasted_probe_requests__count"), 2.0);
    assert_relative_eq!(out.get(1, "sleep_null_frames__count"), 1.0);
}

#[test]
fn test_relpath_column() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("day1")).unwrap();
    let input = write_capture(&dir.path().join("day1"), "capture.psv");
    let output = dir.path().join("features.psv");

    Pipeline::new(sequential())
        .process_file_at(&input, Path::new("day1/capture.psv"), &output)
        .unwrap();

    let out = Output::read(&output);
    assert_eq!(out.columns[1], "csv_file.relpath");
    assert!(out.rows.iter().all(|r| r[0] == "capture.psv" && r[1] == "day1/capture.psv"));
}

#[test]
fn test_parallel_output_is_identical() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_capture(dir.path(), "capture.psv");
    let seq = dir.path().join("seq.psv");
    let par = dir.path().join("par.psv");

    Pipeline::new(sequential()).process_file(&input, &seq).unwrap();
    Pipeline::new(PipelineOptions::default()).process_file(&input, &par).unwrap();

    assert_eq!(std::fs::read(&seq).unwrap(), std::fs::read(&par).unwrap());
}

#[test]
fn test_epoch_filter_keeps_confirmed_episode() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_capture(dir.path(), "capture.psv");
    let truth = dir.path().join("truth.csv");
    std::fs::write(&truth, "105100\n").unwrap();
    let output = dir.path().join("features.psv");

    let client: MacAddr = CLIENT.parse().unwrap();
    let mut epoch_filters = HashMap::new();
    epoch_filters.insert(client, EpochFilter::load(&truth, 2.0).unwrap());
    let options = PipelineOptions {
        epoch_filters,
        ..sequential()
    };

    let report = Pipeline::new(options).process_file(&input, &output).unwrap();
    assert_eq!(report.windows, 1);

    let out = Output::read(&output);
    assert_relative_eq!(out.get(0, "window_start.time_epoch"), 90.0);
    assert_relative_eq!(out.get(0, "window_end.time_epoch"), 105.0);
}

#[test]
fn test_missing_column_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("broken.psv");
    std::fs::write(&input, "frame.time_epoch|wlan.sa\n1.0|c0:ee:fb:30:d7:17\n").unwrap();

    let err = Pipeline::new(sequential())
        .process_file(&input, &dir.path().join("out.psv"))
        .unwrap_err();
    assert!(err.is_schema());
    assert!(err.to_string().contains("radiotap.dbm_antsignal"));
}

#[test]
fn test_merge_processed_tables() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(sequential());
    let mut outputs = Vec::new();
    for name in ["a.psv", "b.psv"] {
        let input = write_capture(dir.path(), name);
        let output = dir.path().join(format!("features-{}", name));
        pipeline.process_file(&input, &output).unwrap();
        outputs.push(output);
    }

    let merged = dir.path().join("all.psv");
    let summary = merge_tables(&outputs, &merged, b'|').unwrap();
    assert_eq!(summary.rows, 4);

    let out = Output::read(&merged);
    assert_eq!(out.rows.len(), 4);
    assert_eq!(out.rows[0][0], "a.psv");
    assert_eq!(out.rows[3][0], "b.psv");
}
