use std::collections::HashMap;

use strata_core::{EcsResult, Entity, EntityObserver, Manager, World};
use uuid::Uuid;

/// Resolves stable UUIDs to live entities.
///
/// Entities created with [`World::create_entity_with_uuid`] are indexed when
/// they are added. Other entities get a random v4 UUID the first time
/// [`UuidEntityManager::uuid_of`] is asked for one. Assign UUIDs through
/// this type's associated functions so the world record and the index stay
/// in step.
#[derive(Debug, Default)]
pub struct UuidEntityManager {
    entity_by_uuid: HashMap<Uuid, Entity>,
    uuid_by_entity: HashMap<Entity, Uuid>,
}

impl UuidEntityManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// The entity carrying `uuid`.
    pub fn entity(&self, uuid: Uuid) -> Option<Entity> {
        self.entity_by_uuid.get(&uuid).copied()
    }

    /// Indexed UUID of `entity`, without assigning one.
    pub fn indexed_uuid(&self, entity: Entity) -> Option<Uuid> {
        self.uuid_by_entity.get(&entity).copied()
    }

    /// Number of indexed entities.
    pub fn len(&self) -> usize {
        self.entity_by_uuid.len()
    }

    /// Returns true if nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.entity_by_uuid.is_empty()
    }

    /// UUID of `entity`, assigning a random one on first request.
    pub fn uuid_of(world: &mut World, entity: Entity) -> EcsResult<Uuid> {
        if let Some(uuid) = world.uuid(entity) {
            return Ok(uuid);
        }
        let uuid = Uuid::new_v4();
        Self::set_uuid(world, entity, uuid)?;
        Ok(uuid)
    }

    /// Give `entity` the identity `uuid`, replacing any previous one.
    pub fn set_uuid(world: &mut World, entity: Entity, uuid: Uuid) -> EcsResult<()> {
        world.set_uuid(entity, uuid)?;
        if let Some(manager) = world.manager_mut::<Self>() {
            manager.index(entity, uuid);
        }
        Ok(())
    }

    fn index(&mut self, entity: Entity, uuid: Uuid) {
        if let Some(previous) = self.uuid_by_entity.insert(entity, uuid) {
            self.entity_by_uuid.remove(&previous);
        }
        self.entity_by_uuid.insert(uuid, entity);
    }
}

impl EntityObserver for UuidEntityManager {
    fn added_entity(&mut self, world: &mut World, entity: Entity) -> EcsResult<()> {
        if let Some(uuid) = world.uuid(entity) {
            self.index(entity, uuid);
        }
        Ok(())
    }

    fn deleted_entity(&mut self, _world: &mut World, entity: Entity) -> EcsResult<()> {
        if let Some(uuid) = self.uuid_by_entity.remove(&entity) {
            self.entity_by_uuid.remove(&uuid);
        }
        Ok(())
    }
}

impl Manager for UuidEntityManager {
    fn name(&self) -> &str {
        "uuids"
    }
}
