use std::fmt;

use serde::Serialize;

/// Counters for one `World::process` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickStats {
    /// 1-based tick number.
    pub tick: u64,
    /// Entities dispatched as added.
    pub added: usize,
    /// Entities dispatched as changed.
    pub changed: usize,
    /// Entities dispatched as enabled.
    pub enabled: usize,
    /// Entities dispatched as disabled.
    pub disabled: usize,
    /// Entities dispatched as deleted.
    pub deleted: usize,
    /// Compositions seen for the first time.
    pub new_compositions: usize,
    /// Composition classifications performed against systems.
    pub rebuilt_indices: usize,
    /// Drain rounds run across every commit of the tick.
    pub commit_rounds: usize,
}

impl fmt::Display for TickStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tick {}: +{} ~{} -{} (enabled {}, disabled {}), {} new composition(s)",
            self.tick,
            self.added,
            self.changed,
            self.deleted,
            self.enabled,
            self.disabled,
            self.new_compositions
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_summary() {
        let stats = TickStats {
            tick: 3,
            added: 10,
            changed: 2,
            deleted: 1,
            new_compositions: 4,
            ..TickStats::default()
        };
        insta::assert_snapshot!(
            stats.to_string(),
            @"tick 3: +10 ~2 -1 (enabled 0, disabled 0), 4 new composition(s)"
        );
    }
}
