use std::collections::HashMap;

use strata_core::{EcsResult, Entity, EntityObserver, Manager, World};

/// Many-to-many membership between entities and named groups.
#[derive(Debug, Default)]
pub struct GroupManager {
    entities_by_group: HashMap<String, Vec<Entity>>,
    groups_by_entity: HashMap<Entity, Vec<String>>,
}

impl GroupManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `entity` in `group`. Adding twice has no effect.
    pub fn add(&mut self, entity: Entity, group: impl Into<String>) {
        let group = group.into();
        let members = self.entities_by_group.entry(group.clone()).or_default();
        if members.contains(&entity) {
            return;
        }
        members.push(entity);
        self.groups_by_entity.entry(entity).or_default().push(group);
    }

    /// Take `entity` out of `group`.
    pub fn remove(&mut self, entity: Entity, group: &str) {
        if let Some(members) = self.entities_by_group.get_mut(group) {
            members.retain(|&e| e != entity);
        }
        if let Some(groups) = self.groups_by_entity.get_mut(&entity) {
            groups.retain(|g| g != group);
        }
    }

    /// Take `entity` out of every group it is in.
    pub fn remove_from_all_groups(&mut self, entity: Entity) {
        let Some(groups) = self.groups_by_entity.remove(&entity) else {
            return;
        };
        for group in groups {
            if let Some(members) = self.entities_by_group.get_mut(&group) {
                members.retain(|&e| e != entity);
            }
        }
    }

    /// Members of `group`, in insertion order.
    pub fn entities(&self, group: &str) -> &[Entity] {
        self.entities_by_group
            .get(group)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Groups `entity` belongs to, in insertion order.
    pub fn groups(&self, entity: Entity) -> &[String] {
        self.groups_by_entity
            .get(&entity)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns true if `entity` is in at least one group.
    pub fn is_in_any_group(&self, entity: Entity) -> bool {
        !self.groups(entity).is_empty()
    }

    /// Returns true if `entity` is in `group`.
    pub fn is_in_group(&self, entity: Entity, group: &str) -> bool {
        self.groups(entity).iter().any(|g| g == group)
    }

    /// Every group name that has held a member, sorted.
    pub fn group_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entities_by_group.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl EntityObserver for GroupManager {
    fn deleted_entity(&mut self, _world: &mut World, entity: Entity) -> EcsResult<()> {
        self.remove_from_all_groups(entity);
        Ok(())
    }
}

impl Manager for GroupManager {
    fn name(&self) -> &str {
        "groups"
    }
}
