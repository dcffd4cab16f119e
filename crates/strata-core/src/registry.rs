use std::any::{TypeId, type_name};
use std::collections::HashMap;

use crate::component::{Component, StorageKind};
use crate::storage::{ErasedStore, Storage, TypedStore};

/// Dense index of a component type, used as its bit position in every
/// component mask. Assigned in first-seen order and stable for the life
/// of a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentTypeId(u32);

impl ComponentTypeId {
    /// The dense index.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) const fn from_index(index: usize) -> Self {
        Self(index as u32)
    }
}

/// Registry entry for a component type.
#[derive(Debug, Clone)]
pub struct ComponentTypeInfo {
    /// Rust type name.
    pub name: &'static str,
    /// Storage strategy.
    pub kind: StorageKind,
}

/// Component types seen by a world, in registration order.
#[derive(Debug, Default)]
pub struct ComponentTypes {
    by_type: HashMap<TypeId, ComponentTypeId>,
    infos: Vec<ComponentTypeInfo>,
}

impl ComponentTypes {
    /// Index of `T`, if it has been registered.
    pub fn id_of<T: Component>(&self) -> Option<ComponentTypeId> {
        self.by_type.get(&TypeId::of::<T>()).copied()
    }

    /// Registry entry for `id`.
    pub fn info(&self, id: ComponentTypeId) -> Option<&ComponentTypeInfo> {
        self.infos.get(id.index())
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    /// Returns true if no type has been registered.
    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    /// Iterate `(id, info)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (ComponentTypeId, &ComponentTypeInfo)> {
        self.infos
            .iter()
            .enumerate()
            .map(|(i, info)| (ComponentTypeId(i as u32), info))
    }

    /// Register `T`, returning its index and whether it was new.
    fn get_or_register<T: Component>(&mut self) -> (ComponentTypeId, bool) {
        if let Some(&id) = self.by_type.get(&TypeId::of::<T>()) {
            return (id, false);
        }
        let id = ComponentTypeId(self.infos.len() as u32);
        self.by_type.insert(TypeId::of::<T>(), id);
        self.infos.push(ComponentTypeInfo {
            name: type_name::<T>(),
            kind: <T::Storage as Storage<T>>::KIND,
        });
        (id, true)
    }
}

/// Type registry plus one store per registered type.
#[derive(Default)]
pub(crate) struct ComponentManager {
    types: ComponentTypes,
    stores: Vec<Box<dyn ErasedStore>>,
}

impl ComponentManager {
    pub(crate) fn types(&self) -> &ComponentTypes {
        &self.types
    }

    /// Register `T` on first sight and create its store.
    pub(crate) fn register<T: Component>(&mut self) -> ComponentTypeId {
        let (id, is_new) = self.types.get_or_register::<T>();
        if is_new {
            tracing::trace!(component = type_name::<T>(), index = id.0, "registered component type");
            self.stores.push(Box::new(TypedStore::<T>::default()));
        }
        id
    }

    pub(crate) fn store<T: Component>(&self, id: ComponentTypeId) -> Option<&T::Storage> {
        let store = self.stores.get(id.index())?;
        store
            .as_any()
            .downcast_ref::<TypedStore<T>>()
            .map(|typed| &typed.inner)
    }

    pub(crate) fn store_mut<T: Component>(&mut self, id: ComponentTypeId) -> Option<&mut T::Storage> {
        let store = self.stores.get_mut(id.index())?;
        store
            .as_any_mut()
            .downcast_mut::<TypedStore<T>>()
            .map(|typed| &mut typed.inner)
    }

    /// Store for `T`, registering the type first if needed.
    pub(crate) fn storage_mut<T: Component>(&mut self) -> &mut T::Storage {
        let id = self.register::<T>();
        match self.store_mut::<T>(id) {
            Some(store) => store,
            None => unreachable!("store for a registered component type is always present"),
        }
    }

    pub(crate) fn remove(&mut self, id: u32, ty: ComponentTypeId) {
        if let Some(store) = self.stores.get_mut(ty.index()) {
            store.remove(id);
        }
    }
}
