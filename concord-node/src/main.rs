use std::path::Path;

use clap::Parser;
use concord_node::{
    cli::{Cli, Commands},
    config::SimulationConfig,
    runner::{run, SimulationReport},
    setup::ensure_config,
};
use concord_consensus::StrategyKind;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;

fn init_logging(log_file: Option<&Path>) -> Option<WorkerGuard> {
    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let name = path.file_name().map(|n| n.to_os_string()).unwrap_or_else(|| "audit.log".into());
            let file_appender = tracing_appender::rolling::never(dir, name);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(tracing_subscriber::filter::filter_fn(|metadata| {
                    metadata.target() == "consensus"
                }));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    // Results go to stdout, logs to stderr
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "info".into()))
        .with_filter(tracing_subscriber::filter::filter_fn(|metadata| {
            metadata.target() != "consensus"
        }));

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .init();

    guard
}

fn print_report(report: &SimulationReport, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!("{}", report);
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let _guard = init_logging(cli.log_file.as_deref());

    info!("--- CONCORD ---");

    match cli.command {
        Commands::Init { path, protocol } => {
            if ensure_config(&path, protocol)? {
                println!("Wrote {}", path.display());
            } else {
                println!("{} already exists", path.display());
            }
        }
        Commands::Run { path, seed } => {
            ensure_config(&path, StrategyKind::Paxos)?;
            let mut config = SimulationConfig::load_from_file(&path)?;
            info!("Config: {}", path.display());
            if seed.is_some() {
                config.seed = seed;
            }
            match run(&config) {
                Ok(report) => print_report(&report, cli.json)?,
                Err(e) => {
                    error!("❌ Simulation failed: {}", e);
                    return Err(e.into());
                }
            }
        }
        Commands::Demo { protocol, seed } => {
            let config = SimulationConfig {
                seed,
                ..SimulationConfig::demo(protocol)
            };
            let report = run(&config)?;
            print_report(&report, cli.json)?;
        }
    }

    Ok(())
}
