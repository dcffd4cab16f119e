use std::path::Path;

use colored::Colorize;
use comfy_table::{ContentArrangement, Table};

use crate::demo::{Demo, ORIGIN_TAG, SPARKS_GROUP};

/// Command-line overrides applied on top of the loaded config.
pub struct RunArgs<'a> {
    /// Ticks to run.
    pub ticks: Option<u64>,
    /// Initial population.
    pub entities: Option<usize>,
    /// RNG seed.
    pub seed: Option<u64>,
    /// Seconds per tick.
    pub delta: Option<f32>,
    /// JSON config file to start from.
    pub config: Option<&'a Path>,
}

/// Run the demo and print its summary.
pub fn run(args: RunArgs<'_>) -> Result<(), String> {
    let mut config = super::load_config(args.config)?;
    if let Some(ticks) = args.ticks {
        config = config.with_ticks(ticks);
    }
    if let Some(entities) = args.entities {
        config = config.with_entities(entities);
    }
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    if let Some(delta) = args.delta {
        config = config.with_delta(delta);
    }

    let mut demo = Demo::new(config)?;
    demo.run_configured()
        .map_err(|e| format!("simulation error: {e}"))?;

    let config = demo.config();
    let world = demo.world();

    // Header
    println!(
        "  {} {}",
        "Simulation".bold(),
        format!(
            "({} ticks, seed={}, delta={}s)",
            config.ticks, config.seed, config.delta
        )
        .dimmed()
    );
    println!(
        "  {} alive, {} created, {} deleted",
        world.active_entity_count(),
        world.total_created(),
        world.total_deleted()
    );
    println!(
        "  {} emitted, {} expired, {} sparks faded",
        demo.emitted(),
        demo.expired(),
        demo.faded()
    );
    println!("  last tick: {}", world.last_tick());
    println!();

    // Systems
    println!("  {}", "Systems".bold().underline());
    println!();
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["#", "System", "Active"]);
    for info in world.systems() {
        let name = if info.passive {
            format!("{} (passive)", info.name)
        } else {
            info.name
        };
        table.add_row(vec![info.index.to_string(), name, info.actives.to_string()]);
    }
    println!("{table}");
    println!();

    // Compositions
    println!("  {}", "Compositions".bold().underline());
    println!();
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Id", "Components", "Entities"]);
    for row in demo.compositions() {
        let components = if row.components.is_empty() {
            "(none)".to_string()
        } else {
            row.components.join(", ")
        };
        table.add_row(vec![row.id.to_string(), components, row.entities.to_string()]);
    }
    println!("{table}");
    println!();

    // Managers
    println!("  {}", "Managers".bold().underline());
    let origin = match demo.origin() {
        Some(entity) => entity.to_string().green(),
        None => "expired".dimmed(),
    };
    println!("  tag '{ORIGIN_TAG}': {origin}");
    println!("  group '{SPARKS_GROUP}': {} member(s)", demo.sparks());
    println!();

    Ok(())
}
