//! Active-scanning episodes and the windows preceding them

pub mod epoch_filter;
pub mod segmenter;

pub use epoch_filter::EpochFilter;
pub use segmenter::{Episode, Segment, Segmentation, Segmenter, TaggedFrame, Window};
