/// `strata bench`
pub mod bench;
/// `strata config`
pub mod config;
/// `strata run`
pub mod run;

use std::fs;
use std::path::Path;

use crate::demo::config::SimulationConfig;

/// Load a simulation config from a JSON file, or the defaults when no file
/// is given.
fn load_config(path: Option<&Path>) -> Result<SimulationConfig, String> {
    let Some(path) = path else {
        return Ok(SimulationConfig::default());
    };
    let text = fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    serde_json::from_str(&text).map_err(|e| format!("invalid config {}: {e}", path.display()))
}
