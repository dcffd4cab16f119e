use std::any::{Any, type_name};
use std::fmt;
use std::marker::PhantomData;

use crate::entity::Entity;
use crate::error::EcsResult;
use crate::wiring::Wiring;
use crate::world::World;

/// Downcasting support for collaborators stored as trait objects.
///
/// Implemented for every `'static` type; call it through a `&dyn` reference,
/// not through the `Box` holding it.
pub trait AsAny: Any {
    /// `self` as `&dyn Any`.
    fn as_any(&self) -> &dyn Any;
    /// `self` as `&mut dyn Any`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
    /// The box as `Box<dyn Any>`.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Lifecycle notifications dispatched during a commit.
///
/// The batch form is what the world calls. By default each batch method
/// forwards to its single-entity form, which does nothing.
pub trait EntityObserver {
    /// Entities that became alive.
    fn added(&mut self, world: &mut World, entities: &[Entity]) -> EcsResult<()> {
        entities.iter().try_for_each(|&e| self.added_entity(world, e))
    }

    /// Entities whose composition changed.
    fn changed(&mut self, world: &mut World, entities: &[Entity]) -> EcsResult<()> {
        entities.iter().try_for_each(|&e| self.changed_entity(world, e))
    }

    /// Entities being deleted. Their components are still readable.
    fn deleted(&mut self, world: &mut World, entities: &[Entity]) -> EcsResult<()> {
        entities.iter().try_for_each(|&e| self.deleted_entity(world, e))
    }

    /// Entities that were re-enabled.
    fn enabled(&mut self, world: &mut World, entities: &[Entity]) -> EcsResult<()> {
        entities.iter().try_for_each(|&e| self.enabled_entity(world, e))
    }

    /// Entities that were disabled.
    fn disabled(&mut self, world: &mut World, entities: &[Entity]) -> EcsResult<()> {
        entities.iter().try_for_each(|&e| self.disabled_entity(world, e))
    }

    /// Single-entity form of [`EntityObserver::added`].
    fn added_entity(&mut self, _world: &mut World, _entity: Entity) -> EcsResult<()> {
        Ok(())
    }

    /// Single-entity form of [`EntityObserver::changed`].
    fn changed_entity(&mut self, _world: &mut World, _entity: Entity) -> EcsResult<()> {
        Ok(())
    }

    /// Single-entity form of [`EntityObserver::deleted`].
    fn deleted_entity(&mut self, _world: &mut World, _entity: Entity) -> EcsResult<()> {
        Ok(())
    }

    /// Single-entity form of [`EntityObserver::enabled`].
    fn enabled_entity(&mut self, _world: &mut World, _entity: Entity) -> EcsResult<()> {
        Ok(())
    }

    /// Single-entity form of [`EntityObserver::disabled`].
    fn disabled_entity(&mut self, _world: &mut World, _entity: Entity) -> EcsResult<()> {
        Ok(())
    }
}

/// An auxiliary observer owned by the world. Managers see every lifecycle
/// event before systems do, and are never iterated by the tick.
pub trait Manager: EntityObserver + AsAny {
    /// Human-readable name.
    fn name(&self) -> &str {
        type_name::<Self>()
    }

    /// Resolve collaborators. Runs once, before `initialize`.
    fn wire(&mut self, _wiring: &mut Wiring<'_>) -> EcsResult<()> {
        Ok(())
    }

    /// One-time setup after wiring.
    fn initialize(&mut self, _world: &mut World) -> EcsResult<()> {
        Ok(())
    }

    /// Teardown, called from `World::dispose`.
    fn dispose(&mut self, _world: &mut World) -> EcsResult<()> {
        Ok(())
    }
}

/// Typed handle to a registered manager.
pub struct ManagerId<M> {
    index: usize,
    _marker: PhantomData<fn() -> M>,
}

impl<M> ManagerId<M> {
    pub(crate) fn new(index: usize) -> Self {
        Self {
            index,
            _marker: PhantomData,
        }
    }

    /// Registration index.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl<M> Clone for ManagerId<M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M> Copy for ManagerId<M> {}

impl<M> PartialEq for ManagerId<M> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<M> Eq for ManagerId<M> {}

impl<M> fmt::Debug for ManagerId<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ManagerId<{}>({})", type_name::<M>(), self.index)
    }
}

/// Downcast a manager trait object.
pub(crate) fn manager_as<M: Manager>(manager: &dyn Manager) -> Option<&M> {
    AsAny::as_any(manager).downcast_ref()
}

pub(crate) fn manager_as_mut<M: Manager>(manager: &mut dyn Manager) -> Option<&mut M> {
    AsAny::as_any_mut(manager).downcast_mut()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        seen: Vec<Entity>,
    }

    impl EntityObserver for Counter {
        fn deleted_entity(&mut self, _world: &mut World, entity: Entity) -> EcsResult<()> {
            self.seen.push(entity);
            Ok(())
        }
    }

    impl Manager for Counter {}

    #[test]
    fn batch_forwards_to_single_entity_form() {
        let mut world = World::new();
        let mut counter = Counter::default();
        let batch = [Entity::from_id(2), Entity::from_id(5)];
        counter.deleted(&mut world, &batch).unwrap();
        counter.added(&mut world, &batch).unwrap();
        assert_eq!(counter.seen, batch);
    }

    #[test]
    fn downcast_through_trait_object() {
        let boxed: Box<dyn Manager> = Box::new(Counter::default());
        assert!(manager_as::<Counter>(boxed.as_ref()).is_some());
        assert!(AsAny::into_any(boxed).downcast::<Counter>().is_ok());
    }
}
