use serde::{Deserialize, Serialize};

/// Tuning knobs for a [`crate::World`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Composition classifications allowed per tick before
    /// [`crate::World::is_rebuilding_index_allowed`] reports false.
    pub max_rebuilt_indices_per_tick: usize,
    /// Initial capacity hint for entity bookkeeping.
    pub expected_entities: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            max_rebuilt_indices_per_tick: 4096,
            expected_entities: 128,
        }
    }
}

impl WorldConfig {
    /// Set the per-tick classification budget.
    pub fn with_max_rebuilt_indices_per_tick(mut self, max: usize) -> Self {
        self.max_rebuilt_indices_per_tick = max;
        self
    }

    /// Set the initial capacity hint.
    pub fn with_expected_entities(mut self, expected: usize) -> Self {
        self.expected_entities = expected;
        self
    }
}
