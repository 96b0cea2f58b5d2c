use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use tabled::{Table, Tabled};
#[cfg(feature = "parallel")]
use tracing::warn;

use ascan::batch::run_batch;
use ascan::capture::{all_access_points, all_clients, FrameTableLoader};
use ascan::config::{delimiter_byte, Config};
use ascan::episode::{EpochFilter, Segmenter};
use ascan::features::{BeaconTrends, FeatureSet};
use ascan::output::{header, merge_tables, WriteMode};
use ascan::pipeline::{Pipeline, PipelineOptions};
use ascan::report::ProcessingReport;
use ascan::wireless::{AssociationStateStore, MacAddr};

#[derive(Parser)]
#[command(name = "ascan")]
#[command(author, version, about = "802.11 active-scanning episode segmentation and window feature extraction")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Table,
    Json,
}

/// Options shared by `process` and `batch`
#[derive(clap::Args)]
pub struct SelectionArgs {
    /// Only these clients (comma-separated MACs); default: every probe-request sender
    #[arg(long, value_delimiter = ',')]
    clients: Vec<MacAddr>,

    /// Only beacons of these APs (comma-separated BSSIDs); default: every beacon
    #[arg(long, value_delimiter = ',')]
    access_points: Vec<MacAddr>,

    /// Ground-truth episode epochs for a client, as CLIENT=PATH (repeatable)
    #[arg(long = "epoch-filter", value_name = "CLIENT=PATH")]
    epoch_filters: Vec<String>,

    /// Episode gap threshold in seconds (overrides config)
    #[arg(long)]
    gap: Option<f64>,

    /// Feature columns to compute (comma-separated; overrides config)
    #[arg(long, value_delimiter = ',')]
    features: Vec<String>,

    /// Append to existing feature tables
    #[arg(long)]
    append: bool,

    /// Process sequentially
    #[arg(long)]
    sequential: bool,

    /// Report format
    #[arg(long, value_enum, default_value = "table")]
    report: ReportFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract window features from one frame table
    Process {
        /// Frame table
        input: PathBuf,

        /// Feature table to write
        output: PathBuf,

        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Process every frame table under a directory
    Batch {
        /// Input directory
        input_dir: PathBuf,

        /// Output directory, mirroring the input layout
        output_dir: PathBuf,

        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Concatenate feature tables
    Merge {
        /// Feature tables, in order
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Merged table
        #[arg(short, long)]
        output: PathBuf,
    },

    /// List clients and access points found in a frame table
    Inspect {
        /// Frame table
        input: PathBuf,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// List the output columns
    Features,

    /// Generate default configuration file
    GenConfig {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Table row for processing reports
#[derive(Tabled)]
struct ReportRow {
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "Rows")]
    rows: usize,
    #[tabled(rename = "Dropped")]
    rows_dropped: usize,
    #[tabled(rename = "Relevant")]
    relevant: usize,
    #[tabled(rename = "Clients")]
    clients: usize,
    #[tabled(rename = "Windows")]
    windows: usize,
    #[tabled(rename = "Written")]
    written: usize,
    #[tabled(rename = "Incomplete")]
    incomplete: usize,
}

impl From<&ProcessingReport> for ReportRow {
    fn from(r: &ProcessingReport) -> Self {
        Self {
            file: r.file.display().to_string(),
            rows: r.rows_read,
            rows_dropped: r.rows_dropped,
            relevant: r.frames_relevant,
            clients: r.clients,
            windows: r.windows,
            written: r.records_written,
            incomplete: r.records_dropped,
        }
    }
}

/// Table row for discovered clients
#[derive(Tabled, serde::Serialize)]
struct ClientRow {
    #[tabled(rename = "Client")]
    client: String,
    #[tabled(rename = "Probe requests")]
    probe_requests: usize,
    #[tabled(rename = "Frames")]
    frames: usize,
    #[tabled(rename = "Association")]
    status: String,
    #[tabled(rename = "AP")]
    ap: String,
}

/// Table row for discovered access points
#[derive(Tabled, serde::Serialize)]
struct AccessPointRow {
    #[tabled(rename = "BSSID")]
    bssid: String,
    #[tabled(rename = "Beacons")]
    beacons: usize,
    #[tabled(rename = "Beacons/s")]
    rate: String,
}

pub fn run_command(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default()?,
    };

    init_thread_pool(&config);

    match cli.command {
        Commands::Process {
            input,
            output,
            selection,
        } => cmd_process(&config, input, output, selection),
        Commands::Batch {
            input_dir,
            output_dir,
            selection,
        } => cmd_batch(&config, input_dir, output_dir, selection),
        Commands::Merge { inputs, output } => cmd_merge(&config, inputs, output),
        Commands::Inspect { input, json } => cmd_inspect(&config, input, json),
        Commands::Features => cmd_features(&config),
        Commands::GenConfig { output } => cmd_gen_config(output),
    }
}

#[cfg(feature = "parallel")]
fn init_thread_pool(config: &Config) {
    if let Err(e) = config.parallel.init_thread_pool() {
        warn!("thread pool already initialized: {}", e);
    }
}

#[cfg(not(feature = "parallel"))]
fn init_thread_pool(_config: &Config) {}

/// Parse `CLIENT=PATH`
fn parse_epoch_filter(arg: &str) -> Result<(MacAddr, PathBuf)> {
    let (client, path) = arg
        .split_once('=')
        .ok_or_else(|| anyhow!("expected CLIENT=PATH, got {:?}", arg))?;
    let client: MacAddr = client
        .trim()
        .parse()
        .with_context(|| format!("epoch filter {:?}", arg))?;
    Ok((client, PathBuf::from(path.trim())))
}

fn pipeline_options(config: &Config, selection: &SelectionArgs) -> Result<PipelineOptions> {
    let mut options = config.pipeline_options()?;

    if let Some(gap) = selection.gap {
        if !(gap.is_finite() && gap > 0.0) {
            bail!("--gap must be positive, got {}", gap);
        }
        options.segmenter = Segmenter::new(gap);
    }
    if !selection.features.is_empty() {
        options.features = FeatureSet::from_names(&selection.features)?;
    }
    if !selection.clients.is_empty() {
        options.clients = Some(selection.clients.iter().copied().collect::<HashSet<_>>());
    }
    if !selection.access_points.is_empty() {
        options.access_points = Some(selection.access_points.iter().copied().collect::<HashSet<_>>());
    }
    if selection.append {
        options.write_mode = WriteMode::Append;
    }
    if selection.sequential {
        options.per_client = false;
    }

    let mut filters = HashMap::new();
    for arg in &selection.epoch_filters {
        let (client, path) = parse_epoch_filter(arg)?;
        let filter = EpochFilter::load(&path, config.segmentation.true_epoch_threshold_secs)?;
        filters.insert(client, filter);
    }
    options.epoch_filters = filters;

    Ok(options)
}

fn print_reports(reports: &[ProcessingReport], format: ReportFormat) -> Result<()> {
    match format {
        ReportFormat::Json => {
            println!("{}", serde_json::to_string_pretty(reports)?);
        }
        ReportFormat::Table => {
            let rows: Vec<ReportRow> = reports.iter().map(ReportRow::from).collect();
            println!("{}", Table::new(rows));
            for report in reports {
                for diagnostic in &report.diagnostics {
                    println!("{} {}: {}", "warning:".yellow().bold(), report.file.display(), diagnostic);
                }
            }
        }
    }
    Ok(())
}

fn cmd_process(config: &Config, input: PathBuf, output: PathBuf, selection: SelectionArgs) -> Result<()> {
    let pipeline = Pipeline::new(pipeline_options(config, &selection)?);
    let report = pipeline
        .process_file(&input, &output)
        .with_context(|| format!("Failed to process {}", input.display()))?;

    print_reports(std::slice::from_ref(&report), selection.report)?;
    if selection.report == ReportFormat::Table {
        println!(
            "{} {} rows to {}",
            "Wrote".green().bold(),
            report.records_written,
            output.display()
        );
    }
    Ok(())
}

fn cmd_batch(config: &Config, input_dir: PathBuf, output_dir: PathBuf, selection: SelectionArgs) -> Result<()> {
    let pipeline = Pipeline::new(pipeline_options(config, &selection)?);
    let per_file = config.parallel.per_file && !selection.sequential;
    let summary = run_batch(&pipeline, &input_dir, &output_dir, per_file)
        .with_context(|| format!("Failed to scan {}", input_dir.display()))?;

    match selection.report {
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        ReportFormat::Table => {
            print_reports(&summary.reports, ReportFormat::Table)?;
            for failure in &summary.failures {
                let label = if failure.schema { "schema error:" } else { "error:" };
                println!("{} {}", label.red().bold(), failure.error);
            }
            let totals = summary.totals();
            println!(
                "{} {} files, {} windows, {} rows written",
                "Done:".green().bold(),
                summary.reports.len(),
                totals.windows,
                totals.records_written
            );
        }
    }

    if !summary.is_success() {
        bail!(
            "{} of {} files failed",
            summary.failures.len(),
            summary.failures.len() + summary.reports.len()
        );
    }
    Ok(())
}

fn cmd_merge(config: &Config, inputs: Vec<PathBuf>, output: PathBuf) -> Result<()> {
    let delimiter = delimiter_byte(&config.output.delimiter)?;
    let summary = merge_tables(&inputs, &output, delimiter)
        .with_context(|| format!("Failed to merge into {}", output.display()))?;
    println!(
        "{} {} tables ({} rows) into {}",
        "Merged".green().bold(),
        summary.tables,
        summary.rows,
        output.display()
    );
    Ok(())
}

fn cmd_inspect(config: &Config, input: PathBuf, json: bool) -> Result<()> {
    let table = FrameTableLoader::new(delimiter_byte(&config.loader.delimiter)?)
        .load(&input)
        .with_context(|| format!("Failed to load {}", input.display()))?;
    let frames = &table.frames;

    let mut store = AssociationStateStore::with_sta_bssids(config.ibss_bssids()?);
    let clients: Vec<ClientRow> = all_clients(frames)
        .into_iter()
        .map(|client| {
            let involving: Vec<_> = frames.iter().filter(|f| f.involves(&client)).collect();
            store.replay(&client, involving.iter().copied());
            ClientRow {
                client: client.to_string(),
                probe_requests: involving
                    .iter()
                    .filter(|f| f.is_probe_request() && f.is_from(&client))
                    .count(),
                frames: involving.len(),
                status: format!("{:?}", store.status(&client)).to_lowercase(),
                ap: store
                    .associated_ap(&client)
                    .map(|ap| ap.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            }
        })
        .collect();

    let aps = all_access_points(frames);
    let trends = BeaconTrends::from_frames(frames, &aps);
    let access_points: Vec<AccessPointRow> = aps
        .iter()
        .map(|ap| AccessPointRow {
            bssid: ap.to_string(),
            beacons: frames.iter().filter(|f| f.is_beacon_of(ap)).count(),
            rate: trends
                .slope(ap)
                .map(|s| format!("{:.2}", s))
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();

    if json {
        let value = serde_json::json!({
            "file": input.display().to_string(),
            "frames": table.len(),
            "rows_dropped": table.rows_dropped,
            "clients": clients,
            "access_points": access_points,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!(
        "{} {} ({} frames, {} rows dropped)",
        "File:".bold(),
        input.display(),
        table.len(),
        table.rows_dropped
    );
    if clients.is_empty() {
        println!("No probe-request senders");
    } else {
        println!("{}", Table::new(clients));
    }
    if access_points.is_empty() {
        println!("No beaconing access points");
    } else {
        println!("{}", Table::new(access_points));
    }
    Ok(())
}

fn cmd_features(config: &Config) -> Result<()> {
    let enabled = config.feature_set()?;
    for (i, column) in header(&enabled).iter().enumerate() {
        println!("{:>3}  {}", i + 1, column);
    }
    Ok(())
}

fn cmd_gen_config(output: Option<PathBuf>) -> Result<()> {
    let config = Config::default();
    let toml_str = toml::to_string_pretty(&config)?;

    match output {
        Some(path) => {
            std::fs::write(&path, &toml_str)?;
            println!("Configuration written to {}", path.display());
        }
        None => {
            println!("{}", toml_str);
        }
    }

    Ok(())
}
