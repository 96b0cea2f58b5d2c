//! Feature table output

use std::path::Path;

pub mod record;
pub mod assembler;
pub mod merge;

pub use record::{header, WindowFeatureRecord, PROVENANCE_COLUMNS};
pub use assembler::{DroppedRecord, FeatureTable, FeatureTableAssembler, WriteMode};
pub use merge::{merge_tables, MergeSummary};

/// Both paths name the same file. Paths that do not exist yet are compared
/// as written.
pub fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
