use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::episode::Segmenter;
use crate::features::FeatureSet;
use crate::output::WriteMode;
use crate::parallel::ParallelConfig;
use crate::pipeline::PipelineOptions;
use crate::wireless::MacAddr;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub loader: LoaderConfig,

    #[serde(default)]
    pub segmentation: SegmentationConfig,

    #[serde(default)]
    pub features: FeaturesConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub parallel: ParallelConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))?;
        Ok(config)
    }

    /// Load config from default locations or create default
    pub fn load_or_default() -> Result<Self> {
        let paths = [
            PathBuf::from("/etc/ascan/config.toml"),
            dirs_next::config_dir()
                .map(|p| p.join("ascan/config.toml"))
                .unwrap_or_default(),
            PathBuf::from("config.toml"),
        ];

        for path in &paths {
            if path.exists() {
                return Self::load(path);
            }
        }

        Ok(Self::default())
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        delimiter_byte(&self.loader.delimiter).context("loader.delimiter")?;
        delimiter_byte(&self.output.delimiter).context("output.delimiter")?;

        let gap = self.segmentation.gap_threshold_secs;
        if !(gap.is_finite() && gap > 0.0) {
            bail!("segmentation.gap_threshold_secs must be positive, got {}", gap);
        }
        let true_epoch = self.segmentation.true_epoch_threshold_secs;
        if !(true_epoch.is_finite() && true_epoch >= 0.0) {
            bail!("segmentation.true_epoch_threshold_secs must not be negative, got {}", true_epoch);
        }
        let interval = self.features.beacon_interval_secs;
        if !(interval.is_finite() && interval > 0.0) {
            bail!("features.beacon_interval_secs must be positive, got {}", interval);
        }

        self.feature_set()?;
        self.ibss_bssids()?;
        Ok(())
    }

    /// Enabled feature columns, all when the list is empty
    pub fn feature_set(&self) -> Result<FeatureSet> {
        FeatureSet::from_names(&self.features.enabled).context("features.enabled")
    }

    pub fn ibss_bssids(&self) -> Result<HashSet<MacAddr>> {
        self.features
            .ibss_bssids
            .iter()
            .map(|s| s.parse::<MacAddr>().with_context(|| format!("features.ibss_bssids: {}", s)))
            .collect()
    }

    /// Pipeline options for this configuration. Client/AP allow-lists and
    /// epoch filters come from the command line and are left empty.
    pub fn pipeline_options(&self) -> Result<PipelineOptions> {
        Ok(PipelineOptions {
            input_delimiter: delimiter_byte(&self.loader.delimiter)?,
            output_delimiter: delimiter_byte(&self.output.delimiter)?,
            segmenter: Segmenter::new(self.segmentation.gap_threshold_secs),
            beacon_interval: self.features.beacon_interval_secs,
            features: self.feature_set()?,
            sta_bssids: self.ibss_bssids()?,
            per_client: self.parallel.per_client,
            write_mode: if self.output.append {
                WriteMode::Append
            } else {
                WriteMode::Create
            },
            ..Default::default()
        })
    }
}

/// Single-byte field delimiter; `\t` and `tab` mean tab.
pub fn delimiter_byte(text: &str) -> Result<u8> {
    match text {
        "\\t" | "tab" => return Ok(b'\t'),
        _ => {}
    }
    match text.as_bytes() {
        [b] if b.is_ascii() => Ok(*b),
        _ => bail!("delimiter must be a single ASCII character, got {:?}", text),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Field delimiter of frame tables
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationConfig {
    /// Largest gap between probe requests of one episode (seconds)
    #[serde(default = "default_gap_threshold")]
    pub gap_threshold_secs: f64,

    /// Distance to a ground-truth epoch within which a probe request is kept
    #[serde(default = "default_true_epoch_threshold")]
    pub true_epoch_threshold_secs: f64,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            gap_threshold_secs: default_gap_threshold(),
            true_epoch_threshold_secs: default_true_epoch_threshold(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturesConfig {
    /// Expected beacon spacing (seconds)
    #[serde(default = "default_beacon_interval")]
    pub beacon_interval_secs: f64,

    /// Feature columns to compute; empty means all
    #[serde(default)]
    pub enabled: Vec<String>,

    /// BSSIDs of ad-hoc networks
    #[serde(default)]
    pub ibss_bssids: Vec<String>,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            beacon_interval_secs: default_beacon_interval(),
            enabled: Vec::new(),
            ibss_bssids: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Field delimiter of feature tables
    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    /// Append to an existing feature table instead of replacing it
    #[serde(default)]
    pub append: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            append: false,
        }
    }
}

// Default value functions
fn default_delimiter() -> String {
    "|".to_string()
}

fn default_gap_threshold() -> f64 {
    1.0
}

fn default_true_epoch_threshold() -> f64 {
    2.0
}

fn default_beacon_interval() -> f64 {
    0.105 // 102.4 TU rounded up
}
