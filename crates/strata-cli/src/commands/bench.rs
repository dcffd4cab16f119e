use std::time::Instant;

use colored::Colorize;
use comfy_table::{CellAlignment, ContentArrangement, Table};

use crate::demo::Demo;
use crate::demo::config::SimulationConfig;

/// Build and run the demo once per population size and print timings.
pub fn run(sizes: &[usize], ticks: u64) -> Result<(), String> {
    if sizes.is_empty() {
        return Err("no population sizes given".into());
    }

    println!(
        "  {} {}",
        "Benchmark".bold(),
        format!("({ticks} ticks per size)").dimmed()
    );
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Entities", "Build ms", "Total ms", "Per tick us", "Alive"]);

    for &size in sizes {
        let config = SimulationConfig::default()
            .with_entities(size)
            .with_ticks(ticks);

        let started = Instant::now();
        let mut demo = Demo::new(config)?;
        let built = started.elapsed();

        let started = Instant::now();
        demo.run(ticks)
            .map_err(|e| format!("benchmark with {size} entities failed: {e}"))?;
        let elapsed = started.elapsed();
        let per_tick = elapsed.as_micros() / u128::from(ticks.max(1));

        table.add_row(vec![
            size.to_string(),
            format!("{:.2}", built.as_secs_f64() * 1000.0),
            format!("{:.2}", elapsed.as_secs_f64() * 1000.0),
            per_tick.to_string(),
            demo.world().active_entity_count().to_string(),
        ]);
    }

    for index in 0..5 {
        if let Some(column) = table.column_mut(index) {
            column.set_cell_alignment(CellAlignment::Right);
        }
    }

    println!("{table}");
    println!();
    Ok(())
}
