use std::any::Any;
use std::marker::PhantomData;

use crate::bits::Bits;
use crate::component::{Component, PackedComponent, PooledComponent, StorageKind};

/// Per-type component store, indexed by entity id.
///
/// `remove` of an absent id is a no-op and `create` of a present id returns
/// the existing record.
pub trait Storage<T>: Default + 'static {
    /// Strategy implemented by this store.
    const KIND: StorageKind;

    /// Returns true if `id` has a record.
    fn contains(&self, id: u32) -> bool;

    /// The record for `id`, if any.
    fn get(&self, id: u32) -> Option<&T>;

    /// Mutable access to the record for `id`, if any.
    fn get_mut(&mut self, id: u32) -> Option<&mut T>;

    /// Allocate a record for `id` through the store, or return the existing one.
    fn create(&mut self, id: u32) -> &mut T
    where
        T: Default;

    /// Drop the record for `id`.
    fn remove(&mut self, id: u32);
}

/// Stores that accept a ready-made value.
pub trait InsertStorage<T>: Storage<T> {
    /// Store `value` for `id`, replacing any existing record.
    fn insert(&mut self, id: u32, value: T) -> &mut T;
}

fn slot<T>(slots: &mut Vec<Option<T>>, id: u32) -> &mut Option<T> {
    let index = id as usize;
    if index >= slots.len() {
        slots.resize_with(index + 1, || None);
    }
    &mut slots[index]
}

/// One independent heap record per entity.
#[derive(Debug)]
pub struct BoxedStorage<T> {
    slots: Vec<Option<Box<T>>>,
}

impl<T> Default for BoxedStorage<T> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<T: 'static> Storage<T> for BoxedStorage<T> {
    const KIND: StorageKind = StorageKind::Boxed;

    fn contains(&self, id: u32) -> bool {
        self.slots.get(id as usize).is_some_and(Option::is_some)
    }

    fn get(&self, id: u32) -> Option<&T> {
        self.slots.get(id as usize)?.as_deref()
    }

    fn get_mut(&mut self, id: u32) -> Option<&mut T> {
        self.slots.get_mut(id as usize)?.as_deref_mut()
    }

    fn create(&mut self, id: u32) -> &mut T
    where
        T: Default,
    {
        slot(&mut self.slots, id).get_or_insert_with(Box::default)
    }

    fn remove(&mut self, id: u32) {
        if let Some(slot) = self.slots.get_mut(id as usize) {
            *slot = None;
        }
    }
}

impl<T: 'static> InsertStorage<T> for BoxedStorage<T> {
    fn insert(&mut self, id: u32, value: T) -> &mut T {
        slot(&mut self.slots, id).insert(Box::new(value))
    }
}

/// Free list of reset component records.
///
/// `obtain` hands back the most recently freed record, so a remove followed
/// by a create reuses the same allocation.
#[derive(Debug)]
pub struct ComponentPool<T> {
    free: Vec<Box<T>>,
}

impl<T> Default for ComponentPool<T> {
    fn default() -> Self {
        Self { free: Vec::new() }
    }
}

impl<T: PooledComponent> ComponentPool<T> {
    /// Pop a free record, or allocate a fresh one.
    pub fn obtain(&mut self) -> Box<T> {
        self.free.pop().unwrap_or_default()
    }

    /// Reset `record` and park it for reuse.
    pub fn free(&mut self, mut record: Box<T>) {
        record.reset();
        self.free.push(record);
    }

    /// Number of parked records.
    pub fn len(&self) -> usize {
        self.free.len()
    }

    /// Returns true if no record is parked.
    pub fn is_empty(&self) -> bool {
        self.free.is_empty()
    }
}

/// Boxed layout backed by a [`ComponentPool`].
#[derive(Debug)]
pub struct PooledStorage<T> {
    slots: Vec<Option<Box<T>>>,
    pool: ComponentPool<T>,
}

impl<T> Default for PooledStorage<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            pool: ComponentPool::default(),
        }
    }
}

impl<T: PooledComponent> PooledStorage<T> {
    /// The free list behind this store.
    pub fn pool(&self) -> &ComponentPool<T> {
        &self.pool
    }
}

impl<T: PooledComponent> Storage<T> for PooledStorage<T> {
    const KIND: StorageKind = StorageKind::Pooled;

    fn contains(&self, id: u32) -> bool {
        self.slots.get(id as usize).is_some_and(Option::is_some)
    }

    fn get(&self, id: u32) -> Option<&T> {
        self.slots.get(id as usize)?.as_deref()
    }

    fn get_mut(&mut self, id: u32) -> Option<&mut T> {
        self.slots.get_mut(id as usize)?.as_deref_mut()
    }

    fn create(&mut self, id: u32) -> &mut T {
        let pool = &mut self.pool;
        slot(&mut self.slots, id).get_or_insert_with(|| pool.obtain())
    }

    fn remove(&mut self, id: u32) {
        let taken = self.slots.get_mut(id as usize).and_then(Option::take);
        if let Some(record) = taken {
            self.pool.free(record);
        }
    }
}

impl<T: PooledComponent> InsertStorage<T> for PooledStorage<T> {
    fn insert(&mut self, id: u32, value: T) -> &mut T {
        let pool = &mut self.pool;
        let record = slot(&mut self.slots, id).get_or_insert_with(|| pool.obtain());
        **record = value;
        record
    }
}

/// A single shared [`PackedComponent`] instance plus a presence mask.
#[derive(Debug)]
pub struct PackedStorage<T> {
    instance: T,
    present: Bits,
    capacity: u32,
}

impl<T: Default> Default for PackedStorage<T> {
    fn default() -> Self {
        Self {
            instance: T::default(),
            present: Bits::new(),
            capacity: 0,
        }
    }
}

impl<T: PackedComponent> PackedStorage<T> {
    /// The shared instance, for id-indexed reads.
    pub fn instance(&self) -> &T {
        &self.instance
    }

    /// Number of rows requested through `ensure_capacity` so far.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }
}

impl<T: PackedComponent> Storage<T> for PackedStorage<T> {
    const KIND: StorageKind = StorageKind::Packed;

    fn contains(&self, id: u32) -> bool {
        self.present.contains(id as usize)
    }

    fn get(&self, id: u32) -> Option<&T> {
        self.contains(id).then_some(&self.instance)
    }

    fn get_mut(&mut self, id: u32) -> Option<&mut T> {
        if !self.contains(id) {
            return None;
        }
        self.instance.for_entity(id);
        Some(&mut self.instance)
    }

    fn create(&mut self, id: u32) -> &mut T {
        if id >= self.capacity {
            self.instance.ensure_capacity(id);
            self.capacity = id + 1;
        }
        self.present.insert(id as usize);
        self.instance.for_entity(id);
        &mut self.instance
    }

    fn remove(&mut self, id: u32) {
        if self.present.remove(id as usize) {
            self.instance.for_entity(id);
            self.instance.reset();
        }
    }
}

/// Type-erased view of a store, used by the commit loop to drop components
/// it only knows by type index.
pub(crate) trait ErasedStore: Any {
    fn remove(&mut self, id: u32);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

pub(crate) struct TypedStore<T: Component> {
    pub(crate) inner: T::Storage,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Component> Default for TypedStore<T> {
    fn default() -> Self {
        Self {
            inner: T::Storage::default(),
            _marker: PhantomData,
        }
    }
}

impl<T: Component> ErasedStore for TypedStore<T> {
    fn remove(&mut self, id: u32) {
        self.inner.remove(id);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
