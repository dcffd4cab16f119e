use std::collections::HashMap;

use strata_core::{EcsResult, Entity, EntityObserver, Manager, World};

/// Records which player owns each entity.
#[derive(Debug, Default)]
pub struct PlayerManager {
    player_by_entity: HashMap<Entity, String>,
    entities_by_player: HashMap<String, Vec<Entity>>,
}

impl PlayerManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Give `entity` to `player`, taking it from its previous owner.
    pub fn set_player(&mut self, entity: Entity, player: impl Into<String>) {
        let player = player.into();
        if self.player(entity) == Some(player.as_str()) {
            return;
        }
        self.remove_from_player(entity);
        self.entities_by_player
            .entry(player.clone())
            .or_default()
            .push(entity);
        self.player_by_entity.insert(entity, player);
    }

    /// Entities owned by `player`.
    pub fn entities_of_player(&self, player: &str) -> &[Entity] {
        self.entities_by_player
            .get(player)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Release `entity` from its owner.
    pub fn remove_from_player(&mut self, entity: Entity) {
        let Some(player) = self.player_by_entity.remove(&entity) else {
            return;
        };
        if let Some(entities) = self.entities_by_player.get_mut(&player) {
            entities.retain(|&e| e != entity);
        }
    }

    /// Owner of `entity`.
    pub fn player(&self, entity: Entity) -> Option<&str> {
        self.player_by_entity.get(&entity).map(String::as_str)
    }
}

impl EntityObserver for PlayerManager {
    fn deleted_entity(&mut self, _world: &mut World, entity: Entity) -> EcsResult<()> {
        self.remove_from_player(entity);
        Ok(())
    }
}

impl Manager for PlayerManager {
    fn name(&self) -> &str {
        "players"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ownership_moves_between_players() {
        let mut players = PlayerManager::new();
        let unit = Entity::from_id(4);
        players.set_player(unit, "red");
        assert_eq!(players.player(unit), Some("red"));
        assert_eq!(players.entities_of_player("red"), [unit]);

        players.set_player(unit, "blue");
        assert!(players.entities_of_player("red").is_empty());
        assert_eq!(players.entities_of_player("blue"), [unit]);

        players.remove_from_player(unit);
        assert_eq!(players.player(unit), None);
        assert!(players.entities_of_player("blue").is_empty());
    }

    #[test]
    fn deleted_entity_is_released() {
        let mut world = World::new();
        world.register_manager(PlayerManager::new());
        let unit = world.create_entity();
        world.process().unwrap();

        world.manager_mut::<PlayerManager>().unwrap().set_player(unit, "red");
        world.delete_entity(unit);
        world.process().unwrap();

        let players = world.manager::<PlayerManager>().unwrap();
        assert_eq!(players.player(unit), None);
        assert!(players.entities_of_player("red").is_empty());
    }
}
