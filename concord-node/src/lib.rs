pub mod cli;
pub mod config;
pub mod runner;
pub mod setup;

pub use config::SimulationConfig;
pub use runner::{run, SimulationReport};
