//! Frame table ingestion
//!
//! Loading delimited frame dumps into [`Frame`] records and narrowing them to
//! the clients and access points of interest.

pub mod frame;
pub mod schema;
pub mod loader;
pub mod filter;

pub use frame::Frame;
pub use loader::{FrameTable, FrameTableLoader};
pub use filter::{all_access_points, all_clients, client_scope, relevance_filter};
