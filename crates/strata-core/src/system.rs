use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;

use crate::aspect::{Aspect, AspectBits};
use crate::bits::Bits;
use crate::composition::CompositionRegistry;
use crate::entity::Entity;
use crate::error::EcsResult;
use crate::observer::AsAny;
use crate::wiring::Wiring;
use crate::world::World;

/// A unit of behavior run once per tick over the entities matching its aspect.
///
/// The world keeps the active set. `inserted` and `removed` report changes
/// to it; `process_entities` receives the current set every tick unless the
/// system is passive or `check_processing` returns false.
pub trait EntitySystem: AsAny {
    /// Membership predicate. Read once, at registration.
    fn aspect(&self) -> Aspect;

    /// Human-readable name for this system.
    fn name(&self) -> &str {
        type_name::<Self>()
    }

    /// Resolve collaborators. Runs once, before `initialize`.
    fn wire(&mut self, _wiring: &mut Wiring<'_>) -> EcsResult<()> {
        Ok(())
    }

    /// One-time setup after wiring. Systems registered from here are
    /// initialized in the same pass.
    fn initialize(&mut self, _world: &mut World) -> EcsResult<()> {
        Ok(())
    }

    /// `entity` joined the active set.
    fn inserted(&mut self, _world: &mut World, _entity: Entity) -> EcsResult<()> {
        Ok(())
    }

    /// `entity` left the active set.
    fn removed(&mut self, _world: &mut World, _entity: Entity) -> EcsResult<()> {
        Ok(())
    }

    /// Gate for this tick's run.
    fn check_processing(&mut self, _world: &World) -> bool {
        true
    }

    /// Runs before `process_entities`.
    fn begin(&mut self, _world: &mut World) -> EcsResult<()> {
        Ok(())
    }

    /// Process the active set. Edits made here are committed before the
    /// next system runs.
    fn process_entities(&mut self, world: &mut World, entities: &[Entity]) -> EcsResult<()>;

    /// Runs after `process_entities`.
    fn end(&mut self, _world: &mut World) -> EcsResult<()> {
        Ok(())
    }

    /// Teardown, called from `World::dispose`.
    fn dispose(&mut self, _world: &mut World) -> EcsResult<()> {
        Ok(())
    }
}

pub(crate) fn system_as<S: EntitySystem>(system: &dyn EntitySystem) -> Option<&S> {
    AsAny::as_any(system).downcast_ref()
}

pub(crate) fn system_as_mut<S: EntitySystem>(system: &mut dyn EntitySystem) -> Option<&mut S> {
    AsAny::as_any_mut(system).downcast_mut()
}

/// Typed handle to a registered system.
pub struct SystemId<S> {
    index: usize,
    _marker: PhantomData<fn() -> S>,
}

impl<S> SystemId<S> {
    pub(crate) fn new(index: usize) -> Self {
        Self {
            index,
            _marker: PhantomData,
        }
    }

    /// Registration index; also the bit this system owns in entity system masks.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl<S> Clone for SystemId<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for SystemId<S> {}

impl<S> PartialEq for SystemId<S> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<S> Eq for SystemId<S> {}

impl<S> fmt::Debug for SystemId<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SystemId<{}>({})", type_name::<S>(), self.index)
    }
}

/// Lifecycle event being applied to a system's membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lifecycle {
    Added,
    Changed,
    Enabled,
    Disabled,
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transition {
    Insert,
    Remove,
    Keep,
}

/// Membership decision for one entity and one system.
pub(crate) fn transition(
    in_active: bool,
    interested: bool,
    enabled: bool,
    event: Lifecycle,
) -> Transition {
    if event == Lifecycle::Deleted {
        return if in_active {
            Transition::Remove
        } else {
            Transition::Keep
        };
    }
    match (in_active, interested && enabled) {
        (true, false) => Transition::Remove,
        (false, true) => Transition::Insert,
        _ => Transition::Keep,
    }
}

const ABSENT: u32 = u32::MAX;

/// A system's view of the world: its resolved aspect, the per-composition
/// classification cache, and the active set.
#[derive(Debug)]
pub(crate) struct Subscription {
    aspect: AspectBits,
    processed: Bits,
    interesting: Bits,
    pub(crate) actives: Vec<Entity>,
    positions: Vec<u32>,
}

impl Subscription {
    pub(crate) fn new(aspect: AspectBits) -> Self {
        Self {
            aspect,
            processed: Bits::new(),
            interesting: Bits::new(),
            actives: Vec::new(),
            positions: Vec::new(),
        }
    }

    /// Record whether composition `id` matches. Returns false if `id` was
    /// already classified.
    pub(crate) fn classify(&mut self, id: u32, bits: &Bits) -> bool {
        if !self.processed.insert(id as usize) {
            return false;
        }
        if self.aspect.matches(bits) {
            self.interesting.insert(id as usize);
        }
        true
    }

    /// Whether entities of composition `id` belong here, classifying it on
    /// first sight. The second flag reports a fresh classification.
    pub(crate) fn is_interested(
        &mut self,
        id: u32,
        compositions: &CompositionRegistry,
    ) -> (bool, bool) {
        let mut classified = false;
        if !self.processed.contains(id as usize) {
            let bits = compositions.bits_of(id).cloned().unwrap_or_default();
            classified = self.classify(id, &bits);
        }
        (self.interesting.contains(id as usize), classified)
    }

    pub(crate) fn contains(&self, entity: Entity) -> bool {
        self.positions
            .get(entity.index())
            .is_some_and(|&pos| pos != ABSENT)
    }

    pub(crate) fn insert(&mut self, entity: Entity) {
        let index = entity.index();
        if index >= self.positions.len() {
            self.positions.resize(index + 1, ABSENT);
        }
        self.positions[index] = self.actives.len() as u32;
        self.actives.push(entity);
    }

    /// Swap-remove `entity`, patching the position of the moved entity.
    pub(crate) fn remove(&mut self, entity: Entity) -> bool {
        let Some(pos) = self.positions.get_mut(entity.index()) else {
            return false;
        };
        if *pos == ABSENT {
            return false;
        }
        let at = *pos as usize;
        *pos = ABSENT;
        self.actives.swap_remove(at);
        if let Some(&moved) = self.actives.get(at) {
            self.positions[moved.index()] = at as u32;
        }
        true
    }

    pub(crate) fn len(&self) -> usize {
        self.actives.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_table() {
        use Lifecycle::*;
        use Transition::*;
        // not active, interesting, enabled -> insert
        assert_eq!(transition(false, true, true, Added), Insert);
        assert_eq!(transition(false, true, true, Enabled), Insert);
        // active, not interesting -> remove
        assert_eq!(transition(true, false, true, Changed), Remove);
        // active, interesting, enabled -> keep
        assert_eq!(transition(true, true, true, Changed), Keep);
        // active, interesting, disabled -> remove
        assert_eq!(transition(true, true, false, Disabled), Remove);
        // delete removes whatever the match says
        assert_eq!(transition(true, true, true, Deleted), Remove);
        assert_eq!(transition(false, true, true, Deleted), Keep);
        // disabled entities are never inserted
        assert_eq!(transition(false, true, false, Changed), Keep);
        assert_eq!(transition(false, false, true, Added), Keep);
    }

    fn subscription() -> Subscription {
        Subscription::new(AspectBits::new(
            Bits::from_indices([0]),
            Bits::new(),
            Bits::from_indices([1]),
        ))
    }

    #[test]
    fn swap_remove_keeps_positions_consistent() {
        let mut sub = subscription();
        let entities: Vec<Entity> = (0..5).map(Entity::from_id).collect();
        for &e in &entities {
            sub.insert(e);
        }
        assert!(sub.remove(entities[1]));
        assert!(!sub.remove(entities[1]));
        assert!(sub.remove(entities[4]));
        assert_eq!(sub.len(), 3);
        for &e in &sub.actives.clone() {
            assert!(sub.contains(e));
            assert!(sub.remove(e));
        }
        assert_eq!(sub.len(), 0);
        assert!(!sub.contains(entities[0]));
    }

    #[test]
    fn classification_is_cached() {
        let mut compositions = CompositionRegistry::default();
        let (x, _) = compositions.get_or_register(&Bits::from_indices([0]));
        let (xy, _) = compositions.get_or_register(&Bits::from_indices([0, 1]));
        let mut sub = subscription();

        assert_eq!(sub.is_interested(x, &compositions), (true, true));
        assert_eq!(sub.is_interested(x, &compositions), (true, false));
        assert_eq!(sub.is_interested(xy, &compositions), (false, true));
        assert!(!sub.classify(xy, &Bits::from_indices([0])));
        assert_eq!(sub.is_interested(xy, &compositions), (false, false));
    }
}
