//! IEEE 802.11 Addressing and Frame Codes

mod frame;

pub use frame::*;
