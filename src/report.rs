//! Processing diagnostics
//!
//! Non-fatal conditions met while processing one frame table. Each is logged
//! when raised and kept in the file's [`ProcessingReport`].

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::wireless::MacAddr;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Nothing left after relevance filtering
    EmptyInput,
    /// Client has no (remaining) probe requests, so no episodes
    NoProbeRequests { client: MacAddr },
    /// A feature could not be computed for a window
    FeatureUndefined {
        client: MacAddr,
        window_id: u32,
        feature: String,
    },
    /// Several APs are plausible for a client; the majority one was chosen
    AmbiguousAssociation {
        client: MacAddr,
        chosen: MacAddr,
        candidates: Vec<(MacAddr, u64)>,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::EmptyInput => write!(f, "no relevant frames"),
            Diagnostic::NoProbeRequests { client } => {
                write!(f, "{}: no probe requests", client)
            }
            Diagnostic::FeatureUndefined { client, window_id, feature } => {
                write!(f, "{}: window {}: {} undefined", client, window_id, feature)
            }
            Diagnostic::AmbiguousAssociation { client, chosen, candidates } => {
                let list: Vec<String> = candidates
                    .iter()
                    .map(|(bssid, count)| format!("{}x{}", bssid, count))
                    .collect();
                write!(f, "{}: ambiguous association [{}], chose {}", client, list.join(", "), chosen)
            }
        }
    }
}

/// Outcome of processing one frame table
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessingReport {
    pub file: PathBuf,
    pub rows_read: usize,
    /// Rows dropped for a missing time or RSSI
    pub rows_dropped: usize,
    pub frames_relevant: usize,
    pub clients: usize,
    pub windows: usize,
    pub records_written: usize,
    /// Records dropped for an undefined feature
    pub records_dropped: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl ProcessingReport {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            ..Default::default()
        }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn count<F>(&self, pred: F) -> usize
    where
        F: Fn(&Diagnostic) -> bool,
    {
        self.diagnostics.iter().filter(|d| pred(d)).count()
    }

    /// Fold another report's counters and diagnostics into this one.
    pub fn absorb(&mut self, other: ProcessingReport) {
        self.rows_read += other.rows_read;
        self.rows_dropped += other.rows_dropped;
        self.frames_relevant += other.frames_relevant;
        self.clients += other.clients;
        self.windows += other.windows;
        self.records_written += other.records_written;
        self.records_dropped += other.records_dropped;
        self.diagnostics.extend(other.diagnostics);
    }
}
