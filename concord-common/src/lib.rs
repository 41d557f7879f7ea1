//! Shared types for the Concord consensus workbench.
//!
//! Every crate in the workspace speaks in terms of the types defined here:
//! node identifiers, ledger records, proposals and the error taxonomy.

pub mod crypto;
pub mod env;
pub mod error;
pub mod utils;

pub use env::record::{Record, RecordTag};
pub use error::{ConcordError, Result};
pub use utils::NodeId;
