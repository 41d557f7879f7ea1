//! utils.rs
//!
//! Common helpers shared across the Concord crates: participant identifiers
//! and the record timestamp source.

pub mod node_id;
pub use node_id::NodeId;

pub mod time;
