use std::path::PathBuf;

use clap::{Parser, Subcommand};

use concord_consensus::StrategyKind;

#[derive(Parser, Debug)]
#[command(name = "concord")]
#[command(about = "Consensus protocol workbench over a hash-chained ledger")]
pub struct Cli {
    /// Print the resulting ledger as JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Also write consensus audit events to this file
    #[arg(long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a simulation config for a protocol
    Init {
        #[arg(value_name = "FILE", default_value = "simulation.json")]
        path: PathBuf,
        #[arg(short, long, default_value = "paxos")]
        protocol: StrategyKind,
    },
    /// Run the simulation described by a config file, creating it if missing
    Run {
        #[arg(value_name = "FILE", default_value = "simulation.json")]
        path: PathBuf,
        /// Override the config's random seed
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Run the built-in demonstration for a protocol
    Demo {
        protocol: StrategyKind,
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_demo() {
        let cli = Cli::try_parse_from(["concord", "demo", "dpos", "--seed", "7", "--json"]).unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Demo { protocol, seed } => {
                assert_eq!(protocol, StrategyKind::DelegatedProofOfStake);
                assert_eq!(seed, Some(7));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_run_defaults() {
        let cli = Cli::try_parse_from(["concord", "--log-file", "audit.log", "run"]).unwrap();
        assert_eq!(cli.log_file, Some(PathBuf::from("audit.log")));
        match cli.command {
            Commands::Run { path, seed } => {
                assert_eq!(path, PathBuf::from("simulation.json"));
                assert_eq!(seed, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_unknown_protocol() {
        assert!(Cli::try_parse_from(["concord", "demo", "zab"]).is_err());
    }
}
