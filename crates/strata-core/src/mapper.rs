use std::fmt;
use std::marker::PhantomData;

use crate::component::Component;
use crate::entity::Entity;
use crate::error::EcsResult;
use crate::registry::ComponentTypeId;
use crate::storage::{InsertStorage, Storage};
use crate::world::World;

/// Typed accessor bound to one component type.
///
/// The mapper caches the dense type index, so lookups go straight to the
/// store without hashing a `TypeId`. It is `Copy` and can be kept by a
/// system across ticks.
pub struct ComponentMapper<T> {
    ty: ComponentTypeId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for ComponentMapper<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ComponentMapper<T> {}

impl<T> fmt::Debug for ComponentMapper<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentMapper<{}>({})", std::any::type_name::<T>(), self.ty.index())
    }
}

impl<T: Component> ComponentMapper<T> {
    pub(crate) fn new(ty: ComponentTypeId) -> Self {
        Self {
            ty,
            _marker: PhantomData,
        }
    }

    /// The component type this mapper reads.
    pub fn component_type(&self) -> ComponentTypeId {
        self.ty
    }

    /// The stored record, if any. Data removed this tick stays visible
    /// until the commit completes.
    pub fn get<'w>(&self, world: &'w World, entity: Entity) -> Option<&'w T> {
        world.components.store::<T>(self.ty)?.get(entity.id())
    }

    /// Mutable access to the stored record, if any.
    pub fn get_mut<'w>(&self, world: &'w mut World, entity: Entity) -> Option<&'w mut T> {
        world.components.store_mut::<T>(self.ty)?.get_mut(entity.id())
    }

    /// Returns true if the entity's current mask holds `T`, including edits
    /// not yet committed.
    pub fn has(&self, world: &World, entity: Entity) -> bool {
        world.has_component(entity, self.ty)
    }

    /// Like [`ComponentMapper::get`], but `None` once `T` has been removed
    /// from the entity's mask.
    pub fn get_safe<'w>(&self, world: &'w World, entity: Entity) -> Option<&'w T> {
        if self.has(world, entity) {
            self.get(world, entity)
        } else {
            None
        }
    }

    /// Allocate `T` for `entity` through the store.
    pub fn create<'w>(&self, world: &'w mut World, entity: Entity) -> EcsResult<&'w mut T>
    where
        T: Default,
    {
        world.edit(entity)?;
        world.restore_component(entity, self.ty);
        Ok(world.components.storage_mut::<T>().create(entity.id()))
    }

    /// Attach `value` to `entity`.
    pub fn set(&self, world: &mut World, entity: Entity, value: T) -> EcsResult<()>
    where
        T::Storage: InsertStorage<T>,
    {
        world.edit(entity)?.add(value);
        Ok(())
    }

    /// Detach `T` from `entity`.
    pub fn remove(&self, world: &mut World, entity: Entity) -> EcsResult<()> {
        world.edit(entity)?.remove_type(self.ty);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::BoxedStorage;

    #[derive(Debug, Default, PartialEq)]
    struct Fuel(u32);
    impl Component for Fuel {
        type Storage = BoxedStorage<Self>;
    }

    #[test]
    fn mapper_sees_uncommitted_adds() {
        let mut world = World::new();
        let fuel = world.mapper::<Fuel>();
        let e = world.create_entity();
        fuel.set(&mut world, e, Fuel(30)).unwrap();
        assert!(fuel.has(&world, e));
        assert_eq!(fuel.get(&world, e), Some(&Fuel(30)));
    }

    #[test]
    fn removed_data_readable_until_commit() {
        let mut world = World::new();
        let fuel = world.mapper::<Fuel>();
        let e = world.create_entity();
        fuel.set(&mut world, e, Fuel(5)).unwrap();
        world.process().unwrap();

        fuel.remove(&mut world, e).unwrap();
        assert!(!fuel.has(&world, e));
        assert_eq!(fuel.get(&world, e), Some(&Fuel(5)));
        assert!(fuel.get_safe(&world, e).is_none());

        world.process().unwrap();
        assert!(fuel.get(&world, e).is_none());
    }

    #[test]
    fn create_through_mapper() {
        let mut world = World::new();
        let fuel = world.mapper::<Fuel>();
        let e = world.create_entity();
        fuel.create(&mut world, e).unwrap().0 = 7;
        assert_eq!(fuel.get_mut(&mut world, e).map(|f| f.0), Some(7));
        world.process().unwrap();
        assert!(world.component_bits(e).unwrap().contains(fuel.component_type().index()));
    }

    #[test]
    fn dead_entity_is_reported() {
        let mut world = World::new();
        let fuel = world.mapper::<Fuel>();
        let err = fuel.set(&mut world, Entity::from_id(40), Fuel(1)).unwrap_err();
        assert!(matches!(err, crate::EcsError::DeadEntity(e) if e.id() == 40));
    }
}
