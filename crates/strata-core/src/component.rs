use crate::storage::Storage;

/// A plain data record attached to entities.
///
/// The associated `Storage` picks one of the three storage strategies:
///
/// ```ignore
/// struct Position { x: f32, y: f32 }
/// impl Component for Position {
///     type Storage = BoxedStorage<Self>;
/// }
/// ```
pub trait Component: Sized + 'static {
    /// Per-type store holding every instance of this component.
    type Storage: Storage<Self>;
}

/// A component whose records are recycled through a free list.
///
/// `reset` runs when the component is removed, before the record goes back
/// to the pool, so a later `create` sees a zeroed record.
pub trait PooledComponent: Default + 'static {
    /// Return the record to its zero state.
    fn reset(&mut self);
}

/// A columnar component: a single shared instance holds parallel arrays
/// indexed by entity id.
///
/// Consumers read and write through the entity id. The store moves the
/// cursor with `for_entity` before handing out `&mut` access, so cursor
/// based accessors address the right row.
pub trait PackedComponent: Default + 'static {
    /// Point the shared instance at the row for `id`.
    fn for_entity(&mut self, id: u32);

    /// Clear the row the cursor points at.
    fn reset(&mut self);

    /// Make sure the backing arrays can hold row `id`. Must never shrink.
    fn ensure_capacity(&mut self, id: u32);
}

/// Storage strategy of a component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKind {
    /// One heap record per entity.
    Boxed,
    /// Like boxed, but removed records are reset and reused.
    Pooled,
    /// Parallel arrays in one shared instance.
    Packed,
}

impl std::fmt::Display for StorageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Boxed => "boxed",
            Self::Pooled => "pooled",
            Self::Packed => "packed",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_kind_display() {
        assert_eq!(StorageKind::Boxed.to_string(), "boxed");
        assert_eq!(StorageKind::Pooled.to_string(), "pooled");
        assert_eq!(StorageKind::Packed.to_string(), "packed");
    }
}
