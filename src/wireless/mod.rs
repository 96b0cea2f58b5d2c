//! 802.11 Link-Layer Model
//!
//! Addressing, frame subtypes, the frame-class predicate, and per-client
//! association state inferred from captured frames.

pub mod ieee80211;
pub mod class;
pub mod state;

pub use ieee80211::{FrameSubtype, FrameType, MacAddr, ParseMacError};
pub use class::{class_of, FrameClass};
pub use state::{association_candidates, AssociationRecord, AssociationStateStore, AssociationStatus};
