use crate::demo::config::SimulationConfig;

/// Print the default simulation config as pretty JSON.
pub fn run() -> Result<(), String> {
    let json = serde_json::to_string_pretty(&SimulationConfig::default())
        .map_err(|e| format!("failed to serialize config: {e}"))?;
    println!("{json}");
    Ok(())
}
