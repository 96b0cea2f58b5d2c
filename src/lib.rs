//! ascan - 802.11 active-scanning analysis
//!
//! Segments each client's probe requests into scanning episodes, takes the
//! interval before every episode as its window, and describes the window
//! with a fixed set of link-layer features (signal, power management,
//! traffic, beacon reception, association and connection activity). The
//! result is one row per (client, window), written as a delimited table.
//!
//! ```no_run
//! use ascan::pipeline::{Pipeline, PipelineOptions};
//!
//! let pipeline = Pipeline::new(PipelineOptions::default());
//! let report = pipeline.process_file("capture.psv".as_ref(), "features.psv".as_ref())?;
//! println!("{} rows", report.records_written);
//! # Ok::<(), ascan::AscanError>(())
//! ```

pub mod batch;
pub mod capture;
pub mod config;
pub mod episode;
pub mod error;
pub mod features;
pub mod output;
pub mod parallel;
pub mod pipeline;
pub mod report;
pub mod wireless;

pub use capture::{Frame, FrameTable, FrameTableLoader};
pub use episode::{Episode, EpochFilter, Segmentation, Segmenter, Window};
pub use error::{AscanError, Result};
pub use features::{FeatureId, FeatureRegistry, FeatureSet};
pub use output::{FeatureTableAssembler, WindowFeatureRecord};
pub use pipeline::{Pipeline, PipelineOptions};
pub use report::{Diagnostic, ProcessingReport};
pub use wireless::{AssociationRecord, AssociationStateStore, AssociationStatus, MacAddr};
