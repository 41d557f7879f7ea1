use std::path::Path;

use tracing::info;

use concord_common::error::Result;
use concord_consensus::StrategyKind;

use crate::config::SimulationConfig;

/// Writes the `protocol` demo config to `path` unless a file already exists.
///
/// Returns `true` when a new file was written.
pub fn ensure_config(path: &Path, protocol: StrategyKind) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }

    info!("⚠️ Config not found. Writing {} defaults to {}...", protocol, path.display());
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    SimulationConfig::demo(protocol).save_to_file(path)?;
    info!("✅ Config written");
    Ok(true)
}
