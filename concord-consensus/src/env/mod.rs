pub mod config;

pub use config::{ConsensusMode, PowConfig, StrategyKind, TallyOrdering, DEFAULT_DIFFICULTY};
