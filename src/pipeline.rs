//! Processing pipeline
//!
//! Turns one frame table into one feature table:
//! 1. Load - parse and time-sort the frame table
//! 2. Relevance filter - keep frames of the selected clients plus beacons
//! 3. Beacon trends - whole-capture beacon slope per AP, shared read-only
//! 4. Per client - resolve scope, segment into episodes and windows, replay
//!    association state and evaluate the enabled features per window
//! 5. Assemble - sort rows, drop rows with an undefined feature, write
//!
//! Clients are independent once step 3 is done, so step 4 may fan out.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::capture::{all_access_points, all_clients, client_scope, relevance_filter, Frame, FrameTable, FrameTableLoader};
use crate::episode::{EpochFilter, Segmenter};
use crate::error::{AscanError, Result};
use crate::features::{BeaconTrends, ConnectionMatches, FeatureRegistry, FeatureSet, WindowContext};
use crate::output::{same_file, FeatureTableAssembler, WindowFeatureRecord, WriteMode};
use crate::parallel::{maybe_par_map, ParallelStats};
use crate::report::{Diagnostic, ProcessingReport};
use crate::wireless::{association_candidates, AssociationRecord, AssociationStateStore, MacAddr};

/// Everything that shapes one run
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub input_delimiter: u8,
    pub output_delimiter: u8,
    pub segmenter: Segmenter,
    /// Expected beacon spacing, seconds
    pub beacon_interval: f64,
    pub features: FeatureSet,
    /// BSSIDs of independent networks, for the class predicate
    pub sta_bssids: HashSet<MacAddr>,
    /// Explicit client allow-list; every probe-request sender when `None`
    pub clients: Option<HashSet<MacAddr>>,
    /// Explicit AP allow-list for beacons; every beacon when `None`
    pub access_points: Option<HashSet<MacAddr>>,
    /// Ground-truth episode filters, per client
    pub epoch_filters: HashMap<MacAddr, EpochFilter>,
    /// Fan out over clients
    pub per_client: bool,
    pub write_mode: WriteMode,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            input_delimiter: b'|',
            output_delimiter: b'|',
            segmenter: Segmenter::default(),
            beacon_interval: 0.105,
            features: FeatureSet::all(),
            sta_bssids: HashSet::new(),
            clients: None,
            access_points: None,
            epoch_filters: HashMap::new(),
            per_client: true,
            write_mode: WriteMode::Create,
        }
    }
}

/// Result of running the per-client stages over one frame table
#[derive(Debug)]
pub struct Extraction {
    /// Unsorted, unfiltered window records
    pub records: Vec<WindowFeatureRecord>,
    /// Final association state of every processed client
    pub associations: AssociationStateStore,
    pub report: ProcessingReport,
}

/// What one client contributed
struct ClientOutcome {
    client: MacAddr,
    records: Vec<WindowFeatureRecord>,
    diagnostics: Vec<Diagnostic>,
    association: AssociationRecord,
}

pub struct Pipeline {
    options: PipelineOptions,
    registry: FeatureRegistry,
    assembler: FeatureTableAssembler,
    stats: Arc<ParallelStats>,
}

impl Pipeline {
    pub fn new(options: PipelineOptions) -> Self {
        let registry = FeatureRegistry::for_features(&options.features);
        let assembler = FeatureTableAssembler::new(options.features.clone(), options.output_delimiter);
        Self {
            options,
            registry,
            assembler,
            stats: ParallelStats::shared(),
        }
    }

    /// Share counters with the caller (e.g. across a batch)
    pub fn with_stats(mut self, stats: Arc<ParallelStats>) -> Self {
        self.stats = stats;
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn stats(&self) -> &Arc<ParallelStats> {
        &self.stats
    }

    pub fn assembler(&self) -> &FeatureTableAssembler {
        &self.assembler
    }

    /// Load `input`, extract features and write them to `output`.
    pub fn process_file(&self, input: &Path, output: &Path) -> Result<ProcessingReport> {
        self.process_file_at(input, input, output)
    }

    /// As [`process_file`](Self::process_file), recording `relpath` as the
    /// input's location in the `csv_file.relpath` column.
    pub fn process_file_at(&self, input: &Path, relpath: &Path, output: &Path) -> Result<ProcessingReport> {
        if same_file(input, output) {
            return Err(AscanError::OutputIsInput {
                path: input.to_path_buf(),
            });
        }
        let table = FrameTableLoader::new(self.options.input_delimiter).load(input)?;
        let file_name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let relpath = relpath.to_string_lossy();

        let Extraction { records, mut report, .. } = self.extract(table, &file_name, &relpath);
        report.file = input.to_path_buf();

        let table = self.assembler.assemble(records);
        for dropped in &table.dropped {
            debug!(
                "{}: dropping window {} of {} ({} undefined)",
                file_name, dropped.window_id, dropped.client, dropped.feature
            );
        }
        report.records_dropped = table.dropped.len();
        self.stats.add_dropped(table.dropped.len() as u64);

        report.records_written = self.assembler.write(&table.records, output, self.options.write_mode)?;
        info!(
            "{}: {} clients, {} windows, {} rows written, {} dropped",
            file_name, report.clients, report.windows, report.records_written, report.records_dropped
        );
        Ok(report)
    }

    /// Run relevance filtering and the per-client stages over a loaded
    /// table. `file_name` and `relpath` go into the provenance columns.
    pub fn extract(&self, table: FrameTable, file_name: &str, relpath: &str) -> Extraction {
        let mut report = ProcessingReport::new(file_name);
        report.rows_read = table.rows_read;
        report.rows_dropped = table.rows_dropped;

        let mut clients: Vec<MacAddr> = match &self.options.clients {
            Some(allowed) => allowed.iter().copied().collect(),
            None => all_clients(&table.frames),
        };
        clients.sort();
        let client_set: HashSet<MacAddr> = clients.iter().copied().collect();

        let frames = relevance_filter(table.frames, &client_set, self.options.access_points.as_ref());
        report.frames_relevant = frames.len();

        let mut associations = AssociationStateStore::with_sta_bssids(self.options.sta_bssids.clone());
        if frames.is_empty() {
            warn!("{}: no relevant frames", file_name);
            report.push(Diagnostic::EmptyInput);
            return Extraction {
                records: Vec::new(),
                associations,
                report,
            };
        }

        let trends = BeaconTrends::from_frames(&frames, &all_access_points(&frames));
        debug!("{}: {} relevant frames, {} beaconing APs", file_name, frames.len(), trends.len());

        let outcomes = maybe_par_map(clients, self.options.per_client, |client| {
            let _worker = self.stats.enter();
            self.process_client(client, &frames, &trends, file_name, relpath)
        });

        let mut records = Vec::new();
        for outcome in outcomes {
            report.clients += 1;
            report.windows += outcome.records.len();
            for diagnostic in outcome.diagnostics {
                report.push(diagnostic);
            }
            associations.insert(outcome.client, outcome.association);
            records.extend(outcome.records);
        }
        self.stats.add_clients(report.clients as u64);
        self.stats.add_windows(report.windows as u64);

        Extraction {
            records,
            associations,
            report,
        }
    }

    fn process_client(
        &self,
        client: MacAddr,
        frames: &[Frame],
        trends: &BeaconTrends,
        file_name: &str,
        relpath: &str,
    ) -> ClientOutcome {
        let sta_bssids = &self.options.sta_bssids;
        let mut outcome = ClientOutcome {
            client,
            records: Vec::new(),
            diagnostics: Vec::new(),
            association: AssociationRecord::new(),
        };

        let candidates = association_candidates(&client, frames, sta_bssids);
        if candidates.len() > 1 {
            let diagnostic = Diagnostic::AmbiguousAssociation {
                client,
                chosen: candidates[0].0,
                candidates: candidates.clone(),
            };
            warn!("{}: {}", file_name, diagnostic);
            outcome.diagnostics.push(diagnostic);
        }
        let access_points: Vec<MacAddr> = candidates.iter().map(|(ap, _)| *ap).collect();
        let scope = client_scope(frames, &client, &access_points);

        let epoch_filter = self.options.epoch_filters.get(&client);
        let Some(segmentation) = self.options.segmenter.segment(&client, &scope, epoch_filter) else {
            let diagnostic = Diagnostic::NoProbeRequests { client };
            warn!("{}: {}", file_name, diagnostic);
            outcome.diagnostics.push(diagnostic);
            return outcome;
        };

        let connections = ConnectionMatches::compute(&client, scope.iter().copied(), &segmentation.episode_mean_epochs());
        debug!(
            "{}: {}: {} episodes over {} frames",
            file_name,
            client,
            segmentation.episodes.len(),
            scope.len()
        );

        for (window, episode) in segmentation.windows.iter().zip(&segmentation.episodes) {
            let window_frames = segmentation.window_frames(window.id);
            let episode_frames = segmentation.episode_frames(episode.id);

            outcome.association.replay(&client, window_frames.iter().copied(), sta_bssids);

            let ctx = WindowContext {
                client,
                window,
                episode,
                window_frames: &window_frames,
                episode_frames: &episode_frames,
                association: &outcome.association,
                connections: &connections,
                beacon_trends: trends,
                beacon_interval: self.options.beacon_interval,
                sta_bssids,
            };
            let features = self.registry.compute_all(&ctx);

            for (id, value) in &features {
                if value.is_nan() {
                    debug!("{}: {}: window {}: {} undefined", file_name, client, window.id, id);
                    outcome.diagnostics.push(Diagnostic::FeatureUndefined {
                        client,
                        window_id: window.id,
                        feature: id.name().to_string(),
                    });
                }
            }

            outcome.records.push(WindowFeatureRecord {
                file_name: file_name.to_string(),
                file_relpath: relpath.to_string(),
                client,
                window_id: window.id,
                window_start: window.start,
                window_end: window.end,
                window_duration: window.duration(),
                window_frames: window_frames.len(),
                episode_id: episode.id,
                episode_start: episode.start,
                episode_end: episode.end,
                episode_duration: episode.duration(),
                episode_frames: episode_frames.len(),
                features,
            });

            outcome.association.replay(&client, episode_frames.iter().copied(), sta_bssids);
        }
        outcome
    }
}
