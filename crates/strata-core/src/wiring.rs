use std::any::type_name;

use crate::component::Component;
use crate::error::{EcsError, EcsResult};
use crate::mapper::ComponentMapper;
use crate::observer::{Manager, ManagerId};
use crate::system::{EntitySystem, SystemId};
use crate::world::World;

/// Resolves a collaborator's dependencies against the world registries.
///
/// Handed to `wire` on systems and managers, and to [`Wire::wire`] through
/// [`World::inject`]. Collaborators keep the returned handles and mappers
/// and use them during later callbacks.
pub struct Wiring<'w> {
    world: &'w mut World,
}

impl<'w> Wiring<'w> {
    pub(crate) fn new(world: &'w mut World) -> Self {
        Self { world }
    }

    /// Mapper for `T`, registering the type if needed.
    pub fn mapper<T: Component>(&mut self) -> ComponentMapper<T> {
        self.world.mapper::<T>()
    }

    /// Handle to the registered system of type `S`.
    pub fn require_system<S: EntitySystem>(&self) -> EcsResult<SystemId<S>> {
        self.optional_system::<S>().ok_or_else(|| EcsError::Unresolved {
            kind: "system",
            name: type_name::<S>().to_string(),
        })
    }

    /// Handle to the system of type `S`, if one is registered.
    pub fn optional_system<S: EntitySystem>(&self) -> Option<SystemId<S>> {
        self.world.system_id::<S>()
    }

    /// Handle to the registered manager of type `M`.
    pub fn require_manager<M: Manager>(&self) -> EcsResult<ManagerId<M>> {
        self.optional_manager::<M>().ok_or_else(|| EcsError::Unresolved {
            kind: "manager",
            name: type_name::<M>().to_string(),
        })
    }

    /// Handle to the manager of type `M`, if one is registered.
    pub fn optional_manager<M: Manager>(&self) -> Option<ManagerId<M>> {
        self.world.manager_id::<M>()
    }

    /// A copy of the injectable registered under `name`.
    pub fn require_injectable<T: Clone + 'static>(&self, name: &str) -> EcsResult<T> {
        self.optional_injectable(name)
            .ok_or_else(|| EcsError::Unresolved {
                kind: "injectable",
                name: name.to_string(),
            })
    }

    /// A copy of the injectable registered under `name`, if present and of type `T`.
    pub fn optional_injectable<T: Clone + 'static>(&self, name: &str) -> Option<T> {
        self.world.injectable::<T>(name).cloned()
    }

    /// The world being wired against.
    pub fn world(&mut self) -> &mut World {
        self.world
    }
}

/// An object whose dependencies can be resolved from a world.
pub trait Wire {
    /// Pull mappers, handles and injectables out of `wiring`.
    fn wire(&mut self, wiring: &mut Wiring<'_>) -> EcsResult<()>;
}
