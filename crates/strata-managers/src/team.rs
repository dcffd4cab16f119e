use std::collections::HashMap;

use strata_core::{EntityObserver, Manager};

/// Assigns players to teams. Works on player names, not entities; pair it
/// with [`crate::PlayerManager`] to go from an entity to its team.
#[derive(Debug, Default)]
pub struct TeamManager {
    players_by_team: HashMap<String, Vec<String>>,
    team_by_player: HashMap<String, String>,
}

impl TeamManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Team of `player`.
    pub fn team(&self, player: &str) -> Option<&str> {
        self.team_by_player.get(player).map(String::as_str)
    }

    /// Put `player` on `team`, leaving any previous team.
    pub fn set_team(&mut self, player: impl Into<String>, team: impl Into<String>) {
        let (player, team) = (player.into(), team.into());
        self.remove_from_team(&player);
        self.players_by_team
            .entry(team.clone())
            .or_default()
            .push(player.clone());
        self.team_by_player.insert(player, team);
    }

    /// Players on `team`.
    pub fn players(&self, team: &str) -> &[String] {
        self.players_by_team
            .get(team)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Take `player` off its team, returning the team it left.
    pub fn remove_from_team(&mut self, player: &str) -> Option<String> {
        let team = self.team_by_player.remove(player)?;
        if let Some(players) = self.players_by_team.get_mut(&team) {
            players.retain(|p| p != player);
        }
        Some(team)
    }
}

impl EntityObserver for TeamManager {}

impl Manager for TeamManager {
    fn name(&self) -> &str {
        "teams"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn players_switch_teams() {
        let mut teams = TeamManager::new();
        teams.set_team("ada", "north");
        teams.set_team("bo", "north");
        assert_eq!(teams.players("north"), ["ada".to_string(), "bo".to_string()]);

        teams.set_team("ada", "south");
        assert_eq!(teams.team("ada"), Some("south"));
        assert_eq!(teams.players("north"), ["bo".to_string()]);

        assert_eq!(teams.remove_from_team("bo"), Some("north".to_string()));
        assert!(teams.players("north").is_empty());
        assert_eq!(teams.remove_from_team("bo"), None);
        assert!(teams.players("west").is_empty());
    }
}
