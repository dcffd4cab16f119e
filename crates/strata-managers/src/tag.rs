use std::collections::HashMap;

use strata_core::{EcsResult, Entity, EntityObserver, Manager, World};
use tracing::debug;

/// Maps unique tags to single entities, e.g. `"player"` or `"camera"`.
///
/// Registering a tag that is already taken moves it to the new entity.
#[derive(Debug, Default)]
pub struct TagManager {
    entities_by_tag: HashMap<String, Entity>,
    tags_by_entity: HashMap<Entity, Vec<String>>,
}

impl TagManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag `entity` with `tag`.
    pub fn register(&mut self, tag: impl Into<String>, entity: Entity) {
        let tag = tag.into();
        if let Some(previous) = self.entities_by_tag.insert(tag.clone(), entity) {
            if previous == entity {
                return;
            }
            debug!(%tag, from = %previous, to = %entity, "tag moved");
            self.forget_tag(previous, &tag);
        }
        self.tags_by_entity.entry(entity).or_default().push(tag);
    }

    /// Remove `tag`, returning the entity it pointed to.
    pub fn unregister(&mut self, tag: &str) -> Option<Entity> {
        let entity = self.entities_by_tag.remove(tag)?;
        self.forget_tag(entity, tag);
        Some(entity)
    }

    /// Returns true if `tag` points at an entity.
    pub fn is_registered(&self, tag: &str) -> bool {
        self.entities_by_tag.contains_key(tag)
    }

    /// The entity tagged `tag`.
    pub fn entity(&self, tag: &str) -> Option<Entity> {
        self.entities_by_tag.get(tag).copied()
    }

    /// Every registered tag, sorted.
    pub fn registered_tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.entities_by_tag.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    /// Tags held by `entity`, in registration order.
    pub fn tags(&self, entity: Entity) -> &[String] {
        self.tags_by_entity
            .get(&entity)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn forget_tag(&mut self, entity: Entity, tag: &str) {
        if let Some(tags) = self.tags_by_entity.get_mut(&entity) {
            tags.retain(|t| t != tag);
            if tags.is_empty() {
                self.tags_by_entity.remove(&entity);
            }
        }
    }
}

impl EntityObserver for TagManager {
    fn deleted_entity(&mut self, _world: &mut World, entity: Entity) -> EcsResult<()> {
        for tag in self.tags_by_entity.remove(&entity).unwrap_or_default() {
            self.entities_by_tag.remove(&tag);
        }
        Ok(())
    }
}

impl Manager for TagManager {
    fn name(&self) -> &str {
        "tags"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_lookup() {
        let mut tags = TagManager::new();
        let hero = Entity::from_id(3);
        tags.register("hero", hero);
        tags.register("leader", hero);

        assert!(tags.is_registered("hero"));
        assert_eq!(tags.entity("leader"), Some(hero));
        assert_eq!(tags.registered_tags(), vec!["hero", "leader"]);
        assert_eq!(tags.tags(hero), ["hero".to_string(), "leader".to_string()]);
    }

    #[test]
    fn retagging_moves_the_tag() {
        let mut tags = TagManager::new();
        let (a, b) = (Entity::from_id(0), Entity::from_id(1));
        tags.register("camera", a);
        tags.register("camera", b);

        assert_eq!(tags.entity("camera"), Some(b));
        assert!(tags.tags(a).is_empty());
        assert_eq!(tags.unregister("camera"), Some(b));
        assert!(!tags.is_registered("camera"));
        assert!(tags.tags(b).is_empty());
    }

    #[test]
    fn deleted_entity_loses_its_tags() {
        let mut world = World::new();
        world.register_manager(TagManager::new());
        let boss = world.create_entity();
        world.process().unwrap();

        world.manager_mut::<TagManager>().unwrap().register("boss", boss);
        world.delete_entity(boss);
        world.process().unwrap();

        let tags = world.manager::<TagManager>().unwrap();
        assert!(!tags.is_registered("boss"));
        assert!(tags.registered_tags().is_empty());
    }
}
