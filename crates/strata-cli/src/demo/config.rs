use serde::{Deserialize, Serialize};
use strata_core::WorldConfig;

/// Configuration for a demo run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Ticks to run.
    pub ticks: u64,
    /// Seconds of world time per tick.
    pub delta: f32,
    /// Particles spawned before the first tick.
    pub entities: usize,
    /// RNG seed for deterministic runs.
    pub seed: u64,
    /// What the emitter spawns while running.
    pub spawn: SpawnMix,
    /// Tuning for the world itself.
    pub world: WorldConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            ticks: 120,
            delta: 0.1,
            entities: 500,
            seed: 42,
            spawn: SpawnMix::default(),
            world: WorldConfig::default(),
        }
    }
}

/// Emitter settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnMix {
    /// Seconds between bursts.
    pub interval: f32,
    /// Particles per burst.
    pub burst: usize,
    /// Share of particles that carry a spark, 0.0..=1.0.
    pub spark_ratio: f64,
    /// Shortest particle lifetime in seconds.
    pub min_lifetime: f32,
    /// Longest particle lifetime in seconds.
    pub max_lifetime: f32,
    /// Largest speed along either axis.
    pub max_speed: f32,
}

impl Default for SpawnMix {
    fn default() -> Self {
        Self {
            interval: 0.5,
            burst: 25,
            spark_ratio: 0.25,
            min_lifetime: 1.0,
            max_lifetime: 6.0,
            max_speed: 4.0,
        }
    }
}

impl SimulationConfig {
    /// Set the number of ticks.
    pub fn with_ticks(mut self, ticks: u64) -> Self {
        self.ticks = ticks;
        self
    }

    /// Set the seconds per tick.
    pub fn with_delta(mut self, delta: f32) -> Self {
        self.delta = delta;
        self
    }

    /// Set the initial population.
    pub fn with_entities(mut self, entities: usize) -> Self {
        self.entities = entities;
        self
    }

    /// Set the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Reject settings the demo cannot run with.
    pub fn validate(&self) -> Result<(), String> {
        let spawn = &self.spawn;
        if !self.delta.is_finite() || self.delta < 0.0 {
            return Err(format!("delta must be a non-negative number, got {}", self.delta));
        }
        if !(0.0..=1.0).contains(&spawn.spark_ratio) {
            return Err(format!(
                "spawn.spark_ratio must be within 0..=1, got {}",
                spawn.spark_ratio
            ));
        }
        let lifetimes_ordered = spawn.min_lifetime > 0.0 && spawn.min_lifetime < spawn.max_lifetime;
        if !lifetimes_ordered {
            return Err(format!(
                "spawn lifetimes must satisfy 0 < min < max, got {}..{}",
                spawn.min_lifetime, spawn.max_lifetime
            ));
        }
        let rates_positive = spawn.interval > 0.0 && spawn.max_speed > 0.0;
        if !rates_positive {
            return Err("spawn.interval and spawn.max_speed must be positive".into());
        }
        Ok(())
    }
}
