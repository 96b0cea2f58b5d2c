use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AscanError {
    #[error("{}: missing mandatory column(s): {}", path.display(), missing.join(", "))]
    Schema { path: PathBuf, missing: Vec<String> },

    #[error("csv error in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("unknown feature: {0}")]
    UnknownFeature(String),

    #[error("invalid epoch filter {}: {reason}", path.display())]
    EpochFilter { path: PathBuf, reason: String },

    #[error("{}: header does not match {}", path.display(), expected_from.display())]
    HeaderMismatch { path: PathBuf, expected_from: PathBuf },

    #[error("{}: existing header does not match the enabled features", path.display())]
    AppendMismatch { path: PathBuf },

    #[error("{}: output would overwrite an input", path.display())]
    OutputIsInput { path: PathBuf },

    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AscanError {
    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        AscanError::Csv {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AscanError::Open {
            path: path.into(),
            source,
        }
    }

    /// Whether this error aborts the whole input file (as opposed to a
    /// configuration or output problem).
    pub fn is_schema(&self) -> bool {
        matches!(self, AscanError::Schema { .. })
    }
}

pub type Result<T> = std::result::Result<T, AscanError>;
