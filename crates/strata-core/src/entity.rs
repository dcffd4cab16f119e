use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt;

use uuid::Uuid;

use crate::bits::Bits;

/// Handle to an entity: a dense, recycled integer id.
///
/// The handle carries no state of its own. Component bits, composition id,
/// enabled flag and UUID live in the owning [`crate::World`] and are read
/// through its accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity(u32);

impl Entity {
    /// Wrap a raw id. Mostly useful in tests and when decoding ids stored elsewhere.
    pub const fn from_id(id: u32) -> Self {
        Self(id)
    }

    /// The dense integer id.
    pub const fn id(self) -> u32 {
        self.0
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity[{}]", self.0)
    }
}

/// Per-entity state owned by the world.
#[derive(Debug, Clone, Default)]
pub(crate) struct EntityRecord {
    pub(crate) component_bits: Bits,
    pub(crate) system_bits: Bits,
    pub(crate) composition_id: u32,
    pub(crate) uuid: Option<Uuid>,
}

/// Mints dense ids and recycles freed ones.
///
/// Freed ids are parked until [`IdentifierPool::recycle`] runs at the end of
/// a commit, so an id deleted and re-created within one commit never aliases.
#[derive(Debug, Default)]
pub(crate) struct IdentifierPool {
    next: u32,
    recyclable: BinaryHeap<Reverse<u32>>,
    freed: Vec<u32>,
}

impl IdentifierPool {
    /// Smallest recyclable id, or a fresh one.
    pub(crate) fn create(&mut self) -> u32 {
        match self.recyclable.pop() {
            Some(Reverse(id)) => id,
            None => {
                let id = self.next;
                self.next += 1;
                id
            }
        }
    }

    pub(crate) fn free(&mut self, id: u32) {
        self.freed.push(id);
    }

    /// Make ids freed since the last call available to `create`.
    pub(crate) fn recycle(&mut self) {
        self.recyclable
            .extend(self.freed.drain(..).map(Reverse));
    }
}

/// Entity lifecycle bookkeeping: the identifier pool plus parallel bitsets.
#[derive(Debug, Default)]
pub(crate) struct EntityManager {
    pool: IdentifierPool,
    records: Vec<EntityRecord>,
    allocated: Bits,
    alive: Bits,
    enabled: Bits,
    dying: Bits,
    alive_count: usize,
    created_total: u64,
    deleted_total: u64,
}

impl EntityManager {
    pub(crate) fn with_capacity(expected: usize) -> Self {
        Self {
            records: Vec::with_capacity(expected),
            ..Self::default()
        }
    }

    /// Allocate an id and reset its record. The entity is not alive until
    /// its `added` notification is dispatched.
    pub(crate) fn create(&mut self, empty_composition: u32) -> Entity {
        let id = self.pool.create();
        self.ensure_capacity(id as usize);
        let record = &mut self.records[id as usize];
        record.component_bits.clear();
        record.system_bits.clear();
        record.composition_id = empty_composition;
        record.uuid = None;
        self.allocated.insert(id as usize);
        self.enabled.insert(id as usize);
        self.created_total += 1;
        Entity(id)
    }

    /// Grow the record table to hold `id`, rounding up to the next
    /// power of two plus one.
    fn ensure_capacity(&mut self, id: usize) {
        if id >= self.records.len() {
            let len = (id + 1).next_power_of_two() + 1;
            self.records.resize_with(len, EntityRecord::default);
        }
    }

    pub(crate) fn record(&self, entity: Entity) -> Option<&EntityRecord> {
        if self.is_allocated(entity) {
            self.records.get(entity.index())
        } else {
            None
        }
    }

    pub(crate) fn record_mut(&mut self, entity: Entity) -> Option<&mut EntityRecord> {
        if self.is_allocated(entity) {
            self.records.get_mut(entity.index())
        } else {
            None
        }
    }

    pub(crate) fn is_allocated(&self, entity: Entity) -> bool {
        self.allocated.contains(entity.index())
    }

    pub(crate) fn is_alive(&self, entity: Entity) -> bool {
        self.alive.contains(entity.index())
    }

    pub(crate) fn is_enabled(&self, entity: Entity) -> bool {
        self.enabled.contains(entity.index())
    }

    /// Mark the entity live. Returns false if it already was.
    pub(crate) fn activate(&mut self, entity: Entity) -> bool {
        if !self.is_allocated(entity) || !self.alive.insert(entity.index()) {
            return false;
        }
        self.alive_count += 1;
        true
    }

    /// Flip the enabled flag. Returns true if the state changed.
    pub(crate) fn set_enabled(&mut self, entity: Entity, enabled: bool) -> bool {
        if enabled {
            self.enabled.insert(entity.index())
        } else {
            self.enabled.remove(entity.index())
        }
    }

    /// Flag the entity as queued for deletion. Returns false if it already was.
    pub(crate) fn mark_dying(&mut self, entity: Entity) -> bool {
        self.is_allocated(entity) && self.dying.insert(entity.index())
    }

    /// Retire the entity: clear every flag, wipe the record and hand the id
    /// back to the pool.
    pub(crate) fn free(&mut self, entity: Entity) {
        let index = entity.index();
        if !self.allocated.remove(index) {
            return;
        }
        if self.alive.remove(index) {
            self.alive_count -= 1;
        }
        self.enabled.remove(index);
        self.dying.remove(index);
        if let Some(record) = self.records.get_mut(index) {
            record.component_bits.clear();
            record.system_bits.clear();
            record.composition_id = 0;
            record.uuid = None;
        }
        self.deleted_total += 1;
        self.pool.free(entity.0);
    }

    pub(crate) fn recycle(&mut self) {
        self.pool.recycle();
    }

    pub(crate) fn alive_count(&self) -> usize {
        self.alive_count
    }

    pub(crate) fn created_total(&self) -> u64 {
        self.created_total
    }

    pub(crate) fn deleted_total(&self) -> u64 {
        self.deleted_total
    }

    /// Every live entity, in id order.
    pub(crate) fn alive_entities(&self) -> Vec<Entity> {
        self.alive.iter().map(|i| Entity(i as u32)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_display_matches_handle_form() {
        insta::assert_snapshot!(Entity::from_id(0).to_string(), @"Entity[0]");
    }

    #[test]
    fn pool_hands_out_dense_ids() {
        let mut pool = IdentifierPool::default();
        assert_eq!(pool.create(), 0);
        assert_eq!(pool.create(), 1);
        assert_eq!(pool.create(), 2);
        assert_eq!(pool.next, 3);
    }

    #[test]
    fn freed_ids_wait_for_recycle() {
        let mut pool = IdentifierPool::default();
        let a = pool.create();
        let _b = pool.create();
        pool.free(a);
        assert_eq!(pool.create(), 2, "freed id must not be reused before recycle");
        pool.recycle();
        assert_eq!(pool.create(), a);
    }

    #[test]
    fn recycling_prefers_smallest_id() {
        let mut pool = IdentifierPool::default();
        for _ in 0..5 {
            pool.create();
        }
        pool.free(4);
        pool.free(1);
        pool.free(3);
        pool.recycle();
        assert_eq!(pool.create(), 1);
        assert_eq!(pool.create(), 3);
        assert_eq!(pool.create(), 4);
        assert_eq!(pool.create(), 5);
    }

    #[test]
    fn never_allocated_ids_are_not_alive() {
        let manager = EntityManager::default();
        assert!(!manager.is_alive(Entity::from_id(0)));
        assert!(!manager.is_alive(Entity::from_id(9_999)));
        assert!(manager.record(Entity::from_id(12)).is_none());
    }

    #[test]
    fn activation_and_free_keep_count_in_step() {
        let mut manager = EntityManager::default();
        let e = manager.create(1);
        assert_eq!(manager.alive_count(), 0);
        assert!(manager.activate(e));
        assert!(!manager.activate(e));
        assert_eq!(manager.alive_count(), 1);

        manager.free(e);
        manager.free(e);
        assert_eq!(manager.alive_count(), 0);
        assert!(!manager.is_allocated(e));
    }

    #[test]
    fn recycled_record_is_blank() {
        let mut manager = EntityManager::default();
        let e = manager.create(1);
        manager.record_mut(e).unwrap().component_bits.insert(7);
        manager.free(e);
        manager.recycle();

        let again = manager.create(1);
        assert_eq!(again, e);
        let record = manager.record(again).unwrap();
        assert!(record.component_bits.is_empty());
        assert_eq!(record.composition_id, 1);
    }

    #[test]
    fn record_table_growth_rounds_up() {
        let mut manager = EntityManager::default();
        manager.create(1);
        assert_eq!(manager.records.len(), 2);
        for _ in 0..4 {
            manager.create(1);
        }
        assert_eq!(manager.records.len(), 9);
    }
}
