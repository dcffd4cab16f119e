use std::any::{TypeId, type_name};

use crate::bits::Bits;
use crate::component::Component;
use crate::registry::{ComponentManager, ComponentTypeId};
use crate::storage::Storage;
use crate::world::World;

#[derive(Clone, Copy)]
struct Entry {
    type_id: TypeId,
    name: &'static str,
    register: fn(&mut ComponentManager) -> ComponentTypeId,
    create: fn(&mut ComponentManager, u32),
}

fn create_default<T: Component + Default>(components: &mut ComponentManager, id: u32) {
    components.storage_mut::<T>().create(id);
}

/// Builds an [`Archetype`]: a component set whose composition id is
/// resolved once, up front.
#[derive(Clone, Default)]
pub struct ArchetypeBuilder {
    entries: Vec<Entry>,
}

impl ArchetypeBuilder {
    /// An empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from the components of `parent`.
    pub fn from_parent(parent: &Archetype) -> Self {
        Self {
            entries: parent.entries.clone(),
        }
    }

    /// Include `T`, default-initialized on creation.
    pub fn add<T: Component + Default>(mut self) -> Self {
        let type_id = TypeId::of::<T>();
        if !self.entries.iter().any(|e| e.type_id == type_id) {
            self.entries.push(Entry {
                type_id,
                name: type_name::<T>(),
                register: ComponentManager::register::<T>,
                create: create_default::<T>,
            });
        }
        self
    }

    /// Drop `T` from the set.
    pub fn remove<T: Component>(mut self) -> Self {
        let type_id = TypeId::of::<T>();
        self.entries.retain(|e| e.type_id != type_id);
        self
    }

    /// Register the component types and the composition with `world`.
    pub fn build(self, world: &mut World) -> Archetype {
        let types: Vec<ComponentTypeId> = self
            .entries
            .iter()
            .map(|e| (e.register)(&mut world.components))
            .collect();
        let bits: Bits = types.iter().map(|t| t.index()).collect();
        let composition_id = world.composition_id_for(&bits);
        Archetype {
            entries: self.entries,
            types,
            bits,
            composition_id,
        }
    }
}

/// A pre-built composition template for bulk entity creation.
#[derive(Clone)]
pub struct Archetype {
    entries: Vec<Entry>,
    types: Vec<ComponentTypeId>,
    bits: Bits,
    composition_id: u32,
}

impl Archetype {
    /// Composition id shared by every entity created from this archetype.
    pub fn composition_id(&self) -> u32 {
        self.composition_id
    }

    /// Component mask.
    pub fn bits(&self) -> &Bits {
        &self.bits
    }

    /// Component types, in builder order.
    pub fn component_types(&self) -> &[ComponentTypeId] {
        &self.types
    }

    /// Type names, in builder order.
    pub fn component_names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.name).collect()
    }

    /// Default-create every component for entity `id`.
    pub(crate) fn instantiate(&self, components: &mut ComponentManager, id: u32) {
        for entry in &self.entries {
            (entry.create)(components, id);
        }
    }
}

impl std::fmt::Debug for Archetype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archetype")
            .field("components", &self.component_names())
            .field("composition_id", &self.composition_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::BoxedStorage;

    #[derive(Default)]
    struct Hull(u32);
    impl Component for Hull {
        type Storage = BoxedStorage<Self>;
    }

    #[derive(Default)]
    struct Shield;
    impl Component for Shield {
        type Storage = BoxedStorage<Self>;
    }

    #[test]
    fn duplicate_types_are_ignored() {
        let mut world = World::new();
        let archetype = ArchetypeBuilder::new()
            .add::<Hull>()
            .add::<Hull>()
            .build(&mut world);
        assert_eq!(archetype.component_types().len(), 1);
    }

    #[test]
    fn parent_and_remove() {
        let mut world = World::new();
        let both = ArchetypeBuilder::new()
            .add::<Hull>()
            .add::<Shield>()
            .build(&mut world);
        let hull_only = ArchetypeBuilder::from_parent(&both)
            .remove::<Shield>()
            .build(&mut world);
        let again = ArchetypeBuilder::new().add::<Hull>().build(&mut world);

        assert_ne!(both.composition_id(), hull_only.composition_id());
        assert_eq!(hull_only.composition_id(), again.composition_id());
    }

    #[test]
    fn entities_from_archetype_get_default_components() {
        let mut world = World::new();
        let archetype = ArchetypeBuilder::new().add::<Hull>().build(&mut world);
        let hulls = world.mapper::<Hull>();
        let e = world.create_entity_from(&archetype);
        assert!(hulls.has(&world, e));
        assert_eq!(hulls.get(&world, e).map(|h| h.0), Some(0));

        world.process().unwrap();
        assert_eq!(world.composition_id(e), Some(archetype.composition_id()));
    }
}
