use crate::bits::Bits;
use crate::component::Component;
use crate::entity::Entity;
use crate::registry::ComponentTypeId;
use crate::storage::{InsertStorage, Storage};
use crate::world::World;

const NO_SLOT: u32 = u32::MAX;

/// Pending changes for one entity, applied at the next commit.
#[derive(Debug, Clone)]
pub(crate) struct PendingEdit {
    pub(crate) entity: Entity,
    /// Working copy of the component mask.
    pub(crate) bits: Bits,
    pub(crate) deleted: bool,
    /// Known composition id, set when the mask came from an archetype and
    /// cleared by any later add or remove.
    pub(crate) composition: Option<u32>,
}

/// One pending edit per entity, in first-touched order.
#[derive(Debug, Default)]
pub(crate) struct EditPool {
    edits: Vec<PendingEdit>,
    slots: Vec<u32>,
}

impl EditPool {
    pub(crate) fn pending(&self, entity: Entity) -> Option<&PendingEdit> {
        let slot = *self.slots.get(entity.index())?;
        self.edits.get(slot as usize)
    }

    /// The entity's pending edit, starting one from `current` if there is none.
    pub(crate) fn get_or_insert(
        &mut self,
        entity: Entity,
        current: impl FnOnce() -> (Bits, u32),
    ) -> &mut PendingEdit {
        let index = entity.index();
        if index >= self.slots.len() {
            self.slots.resize(index + 1, NO_SLOT);
        }
        if self.slots[index] == NO_SLOT {
            let (bits, composition) = current();
            self.slots[index] = self.edits.len() as u32;
            self.edits.push(PendingEdit {
                entity,
                bits,
                deleted: false,
                composition: Some(composition),
            });
        }
        let slot = self.slots[index] as usize;
        &mut self.edits[slot]
    }

    /// Drain every pending edit, oldest first.
    pub(crate) fn take_all(&mut self) -> Vec<PendingEdit> {
        for edit in &self.edits {
            self.slots[edit.entity.index()] = NO_SLOT;
        }
        std::mem::take(&mut self.edits)
    }

    /// Drop the entity's pending edit, if any.
    pub(crate) fn discard(&mut self, entity: Entity) -> Option<PendingEdit> {
        let slot = self.slots.get_mut(entity.index())?;
        if *slot == NO_SLOT {
            return None;
        }
        let at = *slot as usize;
        *slot = NO_SLOT;
        let removed = self.edits.swap_remove(at);
        if let Some(moved) = self.edits.get(at) {
            self.slots[moved.entity.index()] = at as u32;
        }
        Some(removed)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }
}

/// Accumulates component changes for one entity until the next commit.
///
/// Every `World::edit` call for the same entity within a tick works on the
/// same pending record. Component data is written to the store right away;
/// the entity's mask, composition and system membership change at commit.
pub struct EntityEdit<'w> {
    world: &'w mut World,
    entity: Entity,
}

impl<'w> EntityEdit<'w> {
    pub(crate) fn new(world: &'w mut World, entity: Entity) -> Self {
        Self { world, entity }
    }

    /// The entity being edited.
    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// Attach `value`, replacing any existing `T`.
    pub fn add<T>(&mut self, value: T) -> &mut Self
    where
        T: Component,
        T::Storage: InsertStorage<T>,
    {
        let ty = self.world.components.register::<T>();
        self.world.restore_component(self.entity, ty);
        self.world
            .components
            .storage_mut::<T>()
            .insert(self.entity.id(), value);
        self
    }

    /// Allocate `T` through its store and return it for initialization.
    /// Returns the existing record if the entity already has one; a record
    /// removed earlier in the tick is reset first.
    pub fn create<T>(&mut self) -> &mut T
    where
        T: Component + Default,
    {
        let ty = self.world.components.register::<T>();
        self.world.restore_component(self.entity, ty);
        self.world.components.storage_mut::<T>().create(self.entity.id())
    }

    /// Detach `T`. The data stays readable until the commit that applies
    /// the removal completes.
    pub fn remove<T: Component>(&mut self) -> &mut Self {
        if let Some(ty) = self.world.components.types().id_of::<T>() {
            self.remove_type(ty);
        }
        self
    }

    /// Detach a component known only by type index.
    pub fn remove_type(&mut self, ty: ComponentTypeId) -> &mut Self {
        let pending = self.world.pending_edit(self.entity);
        if pending.bits.remove(ty.index()) {
            pending.composition = None;
            self.world.removals.push((self.entity, ty));
        }
        self
    }

    /// Returns true if the working mask holds `T`.
    pub fn has<T: Component>(&self) -> bool {
        self.world
            .components
            .types()
            .id_of::<T>()
            .is_some_and(|ty| self.world.has_component(self.entity, ty))
    }

    /// Working copy of the entity's component mask.
    pub fn bits(&self) -> Bits {
        self.world.current_bits(self.entity).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(indices: &[usize]) -> Bits {
        indices.iter().copied().collect()
    }

    #[test]
    fn one_pending_record_per_entity() {
        let mut pool = EditPool::default();
        let e = Entity::from_id(3);
        pool.get_or_insert(e, || (bits(&[1]), 2)).bits.insert(4);
        let again = pool.get_or_insert(e, || unreachable!("already pending"));
        assert_eq!(again.bits, bits(&[1, 4]));
        assert_eq!(pool.take_all().len(), 1);
    }

    #[test]
    fn take_all_preserves_order_and_resets_slots() {
        let mut pool = EditPool::default();
        for id in [5, 1, 9] {
            pool.get_or_insert(Entity::from_id(id), || (Bits::new(), 1));
        }
        let order: Vec<u32> = pool.take_all().iter().map(|p| p.entity.id()).collect();
        assert_eq!(order, vec![5, 1, 9]);
        assert!(pool.is_empty());
        assert!(pool.pending(Entity::from_id(1)).is_none());
    }

    #[test]
    fn discard_patches_moved_slot() {
        let mut pool = EditPool::default();
        for id in 0..3 {
            pool.get_or_insert(Entity::from_id(id), || (Bits::new(), 1));
        }
        assert!(pool.discard(Entity::from_id(0)).is_some());
        assert!(pool.discard(Entity::from_id(0)).is_none());
        assert_eq!(pool.pending(Entity::from_id(2)).map(|p| p.entity.id()), Some(2));
        assert_eq!(pool.pending(Entity::from_id(1)).map(|p| p.entity.id()), Some(1));
    }
}
