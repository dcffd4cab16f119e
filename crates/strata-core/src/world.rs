use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::mem;

use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::archetype::Archetype;
use crate::bits::Bits;
use crate::component::Component;
use crate::composition::CompositionRegistry;
use crate::config::WorldConfig;
use crate::edit::{EditPool, EntityEdit, PendingEdit};
use crate::entity::{Entity, EntityManager};
use crate::error::{EcsError, EcsResult};
use crate::mapper::ComponentMapper;
use crate::observer::{AsAny, Manager, ManagerId, manager_as, manager_as_mut};
use crate::registry::{ComponentManager, ComponentTypeId, ComponentTypes};
use crate::stats::TickStats;
use crate::system::{
    EntitySystem, Lifecycle, Subscription, SystemId, Transition, system_as, system_as_mut,
    transition,
};
use crate::wiring::{Wire, Wiring};

/// Composition id of an entity without components.
const EMPTY_COMPOSITION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Registered,
    Wired,
    Initialized,
    Removed,
}

struct SystemSlot {
    system: Option<Box<dyn EntitySystem>>,
    subscription: Subscription,
    passive: bool,
    state: SlotState,
    type_id: TypeId,
    name: String,
}

struct ManagerSlot {
    manager: Option<Box<dyn Manager>>,
    state: SlotState,
    type_id: TypeId,
    name: String,
}

/// Summary of one registered system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemInfo {
    /// Registration index.
    pub index: usize,
    /// System name.
    pub name: String,
    /// Passive systems are not run by the tick.
    pub passive: bool,
    /// Size of the active set.
    pub actives: usize,
}

/// The ECS world: owns entities, component stores, compositions, systems,
/// and managers, and runs the commit pipeline.
///
/// Collaborators are boxed and owned here. While one of them runs, the
/// world moves it out of its slot and hands it `&mut World`, then puts it
/// back, so callbacks can freely read and edit the world.
pub struct World {
    config: WorldConfig,
    pub(crate) entities: EntityManager,
    pub(crate) components: ComponentManager,
    compositions: CompositionRegistry,
    edits: EditPool,
    pub(crate) removals: Vec<(Entity, ComponentTypeId)>,

    systems: Vec<SystemSlot>,
    systems_by_type: HashMap<TypeId, usize>,
    managers: Vec<ManagerSlot>,
    managers_by_type: HashMap<TypeId, usize>,
    injectables: HashMap<String, Box<dyn Any>>,

    // Commit queues
    added: Vec<Entity>,
    changed: Vec<Entity>,
    enabled: Vec<Entity>,
    disabled: Vec<Entity>,
    deleted: Vec<Entity>,
    dead: Vec<Entity>,

    delta: f32,
    initialized: bool,
    processing: bool,
    tick: u64,
    stats: TickStats,
    last: TickStats,
    budget_warned: bool,
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("tick", &self.tick)
            .field("alive", &self.entities.alive_count())
            .field("compositions", &self.compositions.len())
            .field("systems", &self.systems.len())
            .field("managers", &self.managers.len())
            .finish()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Create a world with the default configuration.
    pub fn new() -> Self {
        Self::with_config(WorldConfig::default())
    }

    /// Create a world with `config`.
    pub fn with_config(config: WorldConfig) -> Self {
        let mut compositions = CompositionRegistry::default();
        compositions.get_or_register(&Bits::new());
        Self {
            entities: EntityManager::with_capacity(config.expected_entities),
            config,
            components: ComponentManager::default(),
            compositions,
            edits: EditPool::default(),
            removals: Vec::new(),
            systems: Vec::new(),
            systems_by_type: HashMap::new(),
            managers: Vec::new(),
            managers_by_type: HashMap::new(),
            injectables: HashMap::new(),
            added: Vec::new(),
            changed: Vec::new(),
            enabled: Vec::new(),
            disabled: Vec::new(),
            deleted: Vec::new(),
            dead: Vec::new(),
            delta: 0.0,
            initialized: false,
            processing: false,
            tick: 0,
            stats: TickStats::default(),
            last: TickStats::default(),
            budget_warned: false,
        }
    }

    /// The configuration this world was built with.
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Entities
    // ------------------------------------------------------------------

    /// Allocate an entity. It becomes alive at the next commit.
    pub fn create_entity(&mut self) -> Entity {
        let entity = self.entities.create(EMPTY_COMPOSITION);
        self.edits
            .get_or_insert(entity, || (Bits::new(), EMPTY_COMPOSITION));
        trace!(%entity, "created entity");
        entity
    }

    /// Allocate an entity holding default-initialized components of
    /// `archetype`, skipping per-component composition lookups.
    pub fn create_entity_from(&mut self, archetype: &Archetype) -> Entity {
        let entity = self.entities.create(EMPTY_COMPOSITION);
        archetype.instantiate(&mut self.components, entity.id());
        let bits = archetype.bits().clone();
        let composition = archetype.composition_id();
        self.edits.get_or_insert(entity, || (bits, composition));
        trace!(%entity, composition, "created entity from archetype");
        entity
    }

    /// Allocate an entity with a known stable identity.
    pub fn create_entity_with_uuid(&mut self, uuid: Uuid) -> Entity {
        let entity = self.create_entity();
        if let Some(record) = self.entities.record_mut(entity) {
            record.uuid = Some(uuid);
        }
        entity
    }

    /// The live entity with id `id`.
    pub fn entity(&self, id: u32) -> Option<Entity> {
        let entity = Entity::from_id(id);
        self.entities.is_alive(entity).then_some(entity)
    }

    /// Every live entity, in id order.
    pub fn alive_entities(&self) -> Vec<Entity> {
        self.entities.alive_entities()
    }

    /// Returns true between the entity's `added` and `deleted` dispatches.
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    /// Returns true unless the entity is disabled or not allocated.
    pub fn is_enabled(&self, entity: Entity) -> bool {
        self.entities.is_allocated(entity) && self.entities.is_enabled(entity)
    }

    /// Number of live entities.
    pub fn active_entity_count(&self) -> usize {
        self.entities.alive_count()
    }

    /// Entities allocated over the life of the world.
    pub fn total_created(&self) -> u64 {
        self.entities.created_total()
    }

    /// Entities retired over the life of the world.
    pub fn total_deleted(&self) -> u64 {
        self.entities.deleted_total()
    }

    /// Queue `entity` for deletion. Deleting a dying or unallocated entity
    /// does nothing.
    pub fn delete_entity(&mut self, entity: Entity) {
        if !self.entities.mark_dying(entity) {
            return;
        }
        self.pending_edit(entity).deleted = true;
        trace!(%entity, "queued delete");
    }

    /// Re-enable a disabled entity at the next commit.
    pub fn enable(&mut self, entity: Entity) {
        if self.entities.is_allocated(entity) {
            self.enabled.push(entity);
        }
    }

    /// Disable an entity at the next commit. Disabled entities stay alive
    /// but leave every system's active set.
    pub fn disable(&mut self, entity: Entity) {
        if self.entities.is_allocated(entity) {
            self.disabled.push(entity);
        }
    }

    /// Start or continue the pending edit for `entity`.
    pub fn edit(&mut self, entity: Entity) -> EcsResult<EntityEdit<'_>> {
        if !self.entities.is_allocated(entity) {
            return Err(EcsError::DeadEntity(entity));
        }
        self.pending_edit(entity);
        Ok(EntityEdit::new(self, entity))
    }

    /// Committed composition id.
    pub fn composition_id(&self, entity: Entity) -> Option<u32> {
        self.entities.record(entity).map(|r| r.composition_id)
    }

    /// Committed component mask.
    pub fn component_bits(&self, entity: Entity) -> Option<&Bits> {
        self.entities.record(entity).map(|r| &r.component_bits)
    }

    /// Mask of systems whose active set holds the entity, by registration index.
    pub fn system_bits(&self, entity: Entity) -> Option<&Bits> {
        self.entities.record(entity).map(|r| &r.system_bits)
    }

    /// Stable identity, if one was assigned.
    pub fn uuid(&self, entity: Entity) -> Option<Uuid> {
        self.entities.record(entity).and_then(|r| r.uuid)
    }

    /// Assign a stable identity.
    pub fn set_uuid(&mut self, entity: Entity, uuid: Uuid) -> EcsResult<()> {
        let record = self
            .entities
            .record_mut(entity)
            .ok_or(EcsError::DeadEntity(entity))?;
        record.uuid = Some(uuid);
        Ok(())
    }

    /// Component mask including edits not yet committed.
    pub(crate) fn current_bits(&self, entity: Entity) -> Option<&Bits> {
        match self.edits.pending(entity) {
            Some(pending) => Some(&pending.bits),
            None => self.component_bits(entity),
        }
    }

    pub(crate) fn has_component(&self, entity: Entity, ty: ComponentTypeId) -> bool {
        self.current_bits(entity)
            .is_some_and(|bits| bits.contains(ty.index()))
    }

    pub(crate) fn pending_edit(&mut self, entity: Entity) -> &mut PendingEdit {
        let entities = &self.entities;
        self.edits.get_or_insert(entity, || {
            entities
                .record(entity)
                .map(|r| (r.component_bits.clone(), r.composition_id))
                .unwrap_or((Bits::new(), EMPTY_COMPOSITION))
        })
    }

    /// Set `ty` in the entity's working mask. A record whose removal is
    /// still pending is released to its store first, so the next write
    /// starts from a fresh or reset record.
    pub(crate) fn restore_component(&mut self, entity: Entity, ty: ComponentTypeId) {
        let pending = self.pending_edit(entity);
        if !pending.bits.insert(ty.index()) {
            return;
        }
        pending.composition = None;
        let queued = self.removals.len();
        self.removals.retain(|&(e, t)| e != entity || t != ty);
        if self.removals.len() != queued {
            self.components.remove(entity.id(), ty);
        }
    }

    // ------------------------------------------------------------------
    // Components and compositions
    // ------------------------------------------------------------------

    /// Register `T` and return its index.
    pub fn register_component<T: Component>(&mut self) -> ComponentTypeId {
        self.components.register::<T>()
    }

    /// Index of `T`, if registered.
    pub fn component_type<T: Component>(&self) -> Option<ComponentTypeId> {
        self.components.types().id_of::<T>()
    }

    /// Every registered component type.
    pub fn component_types(&self) -> &ComponentTypes {
        self.components.types()
    }

    /// Typed accessor for `T`, registering the type if needed.
    pub fn mapper<T: Component>(&mut self) -> ComponentMapper<T> {
        ComponentMapper::new(self.components.register::<T>())
    }

    /// Direct access to the store of `T`.
    pub fn storage<T: Component>(&self) -> Option<&T::Storage> {
        let ty = self.component_type::<T>()?;
        self.components.store::<T>(ty)
    }

    /// The composition registry.
    pub fn compositions(&self) -> &CompositionRegistry {
        &self.compositions
    }

    /// Composition id for `bits`, registering it and classifying it against
    /// every system if it is new.
    pub(crate) fn composition_id_for(&mut self, bits: &Bits) -> u32 {
        let (id, is_new) = self.compositions.get_or_register(bits);
        if is_new {
            self.stats.new_compositions += 1;
            debug!(composition = id, components = %bits, "new composition");
            for slot in &mut self.systems {
                if slot.state != SlotState::Removed && slot.subscription.classify(id, bits) {
                    self.stats.rebuilt_indices += 1;
                }
            }
            self.note_rebuild_budget();
        }
        id
    }

    /// Returns false once this tick has classified more compositions than
    /// `max_rebuilt_indices_per_tick`. Callers creating many new
    /// compositions can use it to spread the work across ticks.
    pub fn is_rebuilding_index_allowed(&self) -> bool {
        self.stats.rebuilt_indices <= self.config.max_rebuilt_indices_per_tick
    }

    fn note_rebuild_budget(&mut self) {
        if !self.budget_warned && !self.is_rebuilding_index_allowed() {
            self.budget_warned = true;
            warn!(
                rebuilt = self.stats.rebuilt_indices,
                budget = self.config.max_rebuilt_indices_per_tick,
                "composition rebuild budget exceeded this tick"
            );
        }
    }

    // ------------------------------------------------------------------
    // Systems
    // ------------------------------------------------------------------

    /// Register a system run every tick, in registration order.
    pub fn register_system<S: EntitySystem>(&mut self, system: S) -> SystemId<S> {
        self.add_system(system, false)
    }

    /// Register a system that tracks membership but is never run by the tick.
    pub fn register_passive_system<S: EntitySystem>(&mut self, system: S) -> SystemId<S> {
        self.add_system(system, true)
    }

    fn add_system<S: EntitySystem>(&mut self, system: S, passive: bool) -> SystemId<S> {
        let aspect = system.aspect().resolve(&mut self.components);
        let index = self.systems.len();
        let name = system.name().to_string();
        debug!(system = %name, index, passive, "registered system");
        self.systems_by_type
            .entry(TypeId::of::<S>())
            .or_insert(index);
        self.systems.push(SystemSlot {
            system: Some(Box::new(system)),
            subscription: Subscription::new(aspect),
            passive,
            state: SlotState::Registered,
            type_id: TypeId::of::<S>(),
            name,
        });
        SystemId::new(index)
    }

    /// Handle to the first registered system of type `S`.
    pub fn system_id<S: EntitySystem>(&self) -> Option<SystemId<S>> {
        self.systems_by_type
            .get(&TypeId::of::<S>())
            .map(|&i| SystemId::new(i))
    }

    /// The first registered system of type `S`. `None` while that system is
    /// running.
    pub fn system<S: EntitySystem>(&self) -> Option<&S> {
        self.system_by_id(self.system_id::<S>()?)
    }

    /// Mutable access to the first registered system of type `S`.
    pub fn system_mut<S: EntitySystem>(&mut self) -> Option<&mut S> {
        self.system_by_id_mut(self.system_id::<S>()?)
    }

    /// The system behind `id`.
    pub fn system_by_id<S: EntitySystem>(&self, id: SystemId<S>) -> Option<&S> {
        let system = self.systems.get(id.index())?.system.as_deref()?;
        system_as(system)
    }

    /// Mutable access to the system behind `id`.
    pub fn system_by_id_mut<S: EntitySystem>(&mut self, id: SystemId<S>) -> Option<&mut S> {
        let system = self.systems.get_mut(id.index())?.system.as_deref_mut()?;
        system_as_mut(system)
    }

    /// Active set of the first registered system of type `S`. Empty while
    /// that system is running.
    pub fn actives<S: EntitySystem>(&self) -> &[Entity] {
        self.system_id::<S>()
            .and_then(|id| self.systems.get(id.index()))
            .map(|slot| slot.subscription.actives.as_slice())
            .unwrap_or(&[])
    }

    /// Summary of every registered system, in registration order.
    pub fn systems(&self) -> Vec<SystemInfo> {
        self.systems
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.state != SlotState::Removed)
            .map(|(index, slot)| SystemInfo {
                index,
                name: slot.name.clone(),
                passive: slot.passive,
                actives: slot.subscription.len(),
            })
            .collect()
    }

    /// Detach the first registered system of type `S`. Its entities leave
    /// the system without `removed` callbacks.
    pub fn remove_system<S: EntitySystem>(&mut self) -> Option<S> {
        let type_id = TypeId::of::<S>();
        let index = self.systems_by_type.remove(&type_id)?;
        let slot = &mut self.systems[index];
        slot.state = SlotState::Removed;
        let system = slot.system.take();
        let actives = mem::take(&mut slot.subscription.actives);
        for entity in actives {
            if let Some(record) = self.entities.record_mut(entity) {
                record.system_bits.remove(index);
            }
        }
        if let Some(next) = self
            .systems
            .iter()
            .position(|s| s.type_id == type_id && s.state != SlotState::Removed)
        {
            self.systems_by_type.insert(type_id, next);
        }
        debug!(index, "removed system");
        AsAny::into_any(system?).downcast::<S>().ok().map(|boxed| *boxed)
    }

    fn restore_system(&mut self, index: usize, system: Box<dyn EntitySystem>) {
        let slot = &mut self.systems[index];
        if slot.state != SlotState::Removed {
            slot.system = Some(system);
        }
    }

    // ------------------------------------------------------------------
    // Managers
    // ------------------------------------------------------------------

    /// Register a manager. Managers see lifecycle events before systems.
    pub fn register_manager<M: Manager>(&mut self, manager: M) -> ManagerId<M> {
        let index = self.managers.len();
        let name = manager.name().to_string();
        debug!(manager = %name, index, "registered manager");
        self.managers_by_type
            .entry(TypeId::of::<M>())
            .or_insert(index);
        self.managers.push(ManagerSlot {
            manager: Some(Box::new(manager)),
            state: SlotState::Registered,
            type_id: TypeId::of::<M>(),
            name,
        });
        ManagerId::new(index)
    }

    /// Handle to the first registered manager of type `M`.
    pub fn manager_id<M: Manager>(&self) -> Option<ManagerId<M>> {
        self.managers_by_type
            .get(&TypeId::of::<M>())
            .map(|&i| ManagerId::new(i))
    }

    /// The first registered manager of type `M`. `None` while it is running.
    pub fn manager<M: Manager>(&self) -> Option<&M> {
        self.manager_by_id(self.manager_id::<M>()?)
    }

    /// Mutable access to the first registered manager of type `M`.
    pub fn manager_mut<M: Manager>(&mut self) -> Option<&mut M> {
        self.manager_by_id_mut(self.manager_id::<M>()?)
    }

    /// The manager behind `id`.
    pub fn manager_by_id<M: Manager>(&self, id: ManagerId<M>) -> Option<&M> {
        let manager = self.managers.get(id.index())?.manager.as_deref()?;
        manager_as(manager)
    }

    /// Mutable access to the manager behind `id`.
    pub fn manager_by_id_mut<M: Manager>(&mut self, id: ManagerId<M>) -> Option<&mut M> {
        let manager = self.managers.get_mut(id.index())?.manager.as_deref_mut()?;
        manager_as_mut(manager)
    }

    /// Names of registered managers, in registration order.
    pub fn manager_names(&self) -> Vec<&str> {
        self.managers
            .iter()
            .filter(|slot| slot.state != SlotState::Removed)
            .map(|slot| slot.name.as_str())
            .collect()
    }

    /// Detach the first registered manager of type `M`.
    pub fn remove_manager<M: Manager>(&mut self) -> Option<M> {
        let type_id = TypeId::of::<M>();
        let index = self.managers_by_type.remove(&type_id)?;
        let slot = &mut self.managers[index];
        slot.state = SlotState::Removed;
        let manager = slot.manager.take();
        if let Some(next) = self
            .managers
            .iter()
            .position(|s| s.type_id == type_id && s.state != SlotState::Removed)
        {
            self.managers_by_type.insert(type_id, next);
        }
        debug!(index, "removed manager");
        AsAny::into_any(manager?).downcast::<M>().ok().map(|boxed| *boxed)
    }

    fn restore_manager(&mut self, index: usize, manager: Box<dyn Manager>) {
        let slot = &mut self.managers[index];
        if slot.state != SlotState::Removed {
            slot.manager = Some(manager);
        }
    }

    // ------------------------------------------------------------------
    // Injection
    // ------------------------------------------------------------------

    /// Make `value` available to [`Wiring::require_injectable`] under `name`.
    pub fn register_injectable<T: Any>(&mut self, name: impl Into<String>, value: T) {
        self.injectables.insert(name.into(), Box::new(value));
    }

    /// The injectable registered under `name`, if it is a `T`.
    pub fn injectable<T: Any>(&self, name: &str) -> Option<&T> {
        self.injectables.get(name)?.downcast_ref()
    }

    /// Wire an object that is not owned by the world.
    pub fn inject<W: Wire + ?Sized>(&mut self, target: &mut W) -> EcsResult<()> {
        if !self.initialized {
            return Err(EcsError::NotInitialized {
                operation: "World::inject",
            });
        }
        target.wire(&mut Wiring::new(self))
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Wire and initialize every registered manager and system. Safe to
    /// call again; only collaborators registered since are handled.
    pub fn initialize(&mut self) -> EcsResult<()> {
        self.initialized = true;
        self.initialize_pending()
    }

    /// Returns true once `initialize` has run.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Seconds covered by the current tick.
    pub fn delta(&self) -> f32 {
        self.delta
    }

    /// Set the seconds covered by the next tick.
    pub fn set_delta(&mut self, delta: f32) {
        self.delta = delta;
    }

    /// Number of completed and running ticks.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Counters from the last successful `process` call.
    pub fn last_tick(&self) -> &TickStats {
        &self.last
    }

    /// Run one tick: commit pending edits, then run every non-passive
    /// system in registration order, committing after each one.
    pub fn process(&mut self) -> EcsResult<()> {
        if self.processing {
            return Err(EcsError::ReentrantProcess);
        }
        self.processing = true;
        self.tick += 1;
        self.stats = TickStats {
            tick: self.tick,
            ..TickStats::default()
        };
        self.budget_warned = false;

        let result = self.run_tick();
        self.processing = false;
        self.entities.recycle();

        if result.is_ok() {
            self.last = self.stats;
            debug!(
                tick = self.tick,
                added = self.stats.added,
                changed = self.stats.changed,
                deleted = self.stats.deleted,
                alive = self.entities.alive_count(),
                "tick complete"
            );
        }
        result
    }

    fn run_tick(&mut self) -> EcsResult<()> {
        if !self.initialized {
            self.initialize()?;
        }
        self.commit()?;
        let mut index = 0;
        while index < self.systems.len() {
            let slot = &self.systems[index];
            if slot.state == SlotState::Initialized && !slot.passive {
                self.process_system(index)?;
                self.commit()?;
            }
            index += 1;
        }
        Ok(())
    }

    fn process_system(&mut self, index: usize) -> EcsResult<()> {
        let Some(mut system) = self.systems[index].system.take() else {
            return Ok(());
        };
        let actives = mem::take(&mut self.systems[index].subscription.actives);
        let result = self.run_system(system.as_mut(), &actives);
        self.systems[index].subscription.actives = actives;
        self.restore_system(index, system);
        result
    }

    fn run_system(&mut self, system: &mut dyn EntitySystem, actives: &[Entity]) -> EcsResult<()> {
        if !system.check_processing(self) {
            return Ok(());
        }
        system.begin(self)?;
        system.process_entities(self, actives)?;
        system.end(self)
    }

    /// Dispose every system, then every manager. Failures are collected and
    /// returned together once every collaborator has been disposed.
    pub fn dispose(&mut self) -> EcsResult<()> {
        let mut errors = Vec::new();
        for index in 0..self.systems.len() {
            let Some(mut system) = self.systems[index].system.take() else {
                continue;
            };
            if let Err(err) = system.dispose(self) {
                warn!(system = %self.systems[index].name, error = %err, "system dispose failed");
                errors.push(err);
            }
            self.restore_system(index, system);
        }
        for index in 0..self.managers.len() {
            let Some(mut manager) = self.managers[index].manager.take() else {
                continue;
            };
            if let Err(err) = manager.dispose(self) {
                warn!(manager = %self.managers[index].name, error = %err, "manager dispose failed");
                errors.push(err);
            }
            self.restore_manager(index, manager);
        }
        debug!(failures = errors.len(), "world disposed");
        if errors.is_empty() {
            Ok(())
        } else {
            Err(EcsError::Dispose(errors))
        }
    }

    // ------------------------------------------------------------------
    // Commit pipeline
    // ------------------------------------------------------------------

    fn initialize_pending(&mut self) -> EcsResult<()> {
        if !self.initialized {
            return Ok(());
        }
        loop {
            let mut progressed = false;
            for index in 0..self.managers.len() {
                if self.managers[index].state == SlotState::Registered {
                    self.wire_manager(index)?;
                    progressed = true;
                }
            }
            for index in 0..self.systems.len() {
                if self.systems[index].state == SlotState::Registered {
                    self.wire_system(index)?;
                    progressed = true;
                }
            }
            for index in 0..self.managers.len() {
                if self.managers[index].state == SlotState::Wired {
                    self.initialize_manager(index)?;
                    progressed = true;
                }
            }
            for index in 0..self.systems.len() {
                if self.systems[index].state == SlotState::Wired {
                    self.initialize_system(index)?;
                    progressed = true;
                }
            }
            if !progressed {
                return Ok(());
            }
        }
    }

    fn wire_manager(&mut self, index: usize) -> EcsResult<()> {
        let Some(mut manager) = self.managers[index].manager.take() else {
            return Ok(());
        };
        let result = manager.wire(&mut Wiring::new(self));
        self.restore_manager(index, manager);
        result?;
        if self.managers[index].state == SlotState::Registered {
            self.managers[index].state = SlotState::Wired;
        }
        Ok(())
    }

    fn wire_system(&mut self, index: usize) -> EcsResult<()> {
        let Some(mut system) = self.systems[index].system.take() else {
            return Ok(());
        };
        let result = system.wire(&mut Wiring::new(self));
        self.restore_system(index, system);
        result?;
        if self.systems[index].state == SlotState::Registered {
            self.systems[index].state = SlotState::Wired;
        }
        Ok(())
    }

    fn initialize_manager(&mut self, index: usize) -> EcsResult<()> {
        let Some(mut manager) = self.managers[index].manager.take() else {
            return Ok(());
        };
        let result = manager.initialize(self);
        self.restore_manager(index, manager);
        result?;
        if self.managers[index].state == SlotState::Wired {
            self.managers[index].state = SlotState::Initialized;
        }
        Ok(())
    }

    fn initialize_system(&mut self, index: usize) -> EcsResult<()> {
        let Some(mut system) = self.systems[index].system.take() else {
            return Ok(());
        };
        let result = system.initialize(self);
        self.restore_system(index, system);
        result?;
        if self.systems[index].state != SlotState::Wired {
            return Ok(());
        }
        self.systems[index].state = SlotState::Initialized;
        let alive = self.entities.alive_entities();
        if alive.is_empty() {
            return Ok(());
        }
        self.apply_membership(index, Lifecycle::Added, &alive)
    }

    /// Drain every queue until no handler produces more work.
    fn commit(&mut self) -> EcsResult<()> {
        self.initialize_pending()?;
        loop {
            self.stats.commit_rounds += 1;
            loop {
                let added = mem::take(&mut self.added);
                if !added.is_empty() {
                    for &entity in &added {
                        self.entities.activate(entity);
                    }
                    self.stats.added += added.len();
                    self.dispatch(Lifecycle::Added, &added)?;
                }
                let changed = mem::take(&mut self.changed);
                if !changed.is_empty() {
                    self.stats.changed += changed.len();
                    self.dispatch(Lifecycle::Changed, &changed)?;
                }
                if self.edits.is_empty() {
                    break;
                }
                self.apply_edits();
            }

            if self.disabled.is_empty() && self.enabled.is_empty() && self.deleted.is_empty() {
                break;
            }

            let disabled = self.take_state_changes(false);
            if !disabled.is_empty() {
                self.stats.disabled += disabled.len();
                self.dispatch(Lifecycle::Disabled, &disabled)?;
            }
            let enabled = self.take_state_changes(true);
            if !enabled.is_empty() {
                self.stats.enabled += enabled.len();
                self.dispatch(Lifecycle::Enabled, &enabled)?;
            }
            let deleted = mem::take(&mut self.deleted);
            if !deleted.is_empty() {
                self.stats.deleted += deleted.len();
                self.dispatch(Lifecycle::Deleted, &deleted)?;
                self.dead.extend(deleted);
            }
            self.clean();
        }
        self.clean();
        Ok(())
    }

    /// Drain the enable or disable queue, keeping only live entities whose
    /// flag actually flips.
    fn take_state_changes(&mut self, enable: bool) -> Vec<Entity> {
        let queue = if enable {
            mem::take(&mut self.enabled)
        } else {
            mem::take(&mut self.disabled)
        };
        let entities = &mut self.entities;
        queue
            .into_iter()
            .filter(|&e| entities.is_alive(e) && entities.set_enabled(e, enable))
            .collect()
    }

    /// Fold pending edits into entity records and route each entity to
    /// the added, changed, deleted, or dead queue.
    fn apply_edits(&mut self) {
        for edit in self.edits.take_all() {
            let PendingEdit {
                entity,
                bits,
                deleted,
                composition,
            } = edit;
            if !self.entities.is_allocated(entity) {
                continue;
            }
            let alive = self.entities.is_alive(entity);
            if alive
                && !deleted
                && self
                    .component_bits(entity)
                    .is_some_and(|current| *current == bits)
            {
                continue;
            }
            let composition = match composition {
                Some(id) => id,
                None => self.composition_id_for(&bits),
            };
            if let Some(record) = self.entities.record_mut(entity) {
                record.component_bits = bits;
                record.composition_id = composition;
            }
            match (deleted, alive) {
                (true, true) => self.deleted.push(entity),
                (true, false) => {
                    trace!(%entity, "discarded entity deleted before its first commit");
                    self.dead.push(entity);
                }
                (false, false) => self.added.push(entity),
                (false, true) => self.changed.push(entity),
            }
        }
    }

    /// Retire dead entities, then drop component data whose removal has
    /// been committed.
    fn clean(&mut self) {
        for entity in mem::take(&mut self.dead) {
            self.kill(entity);
        }
        let removals = mem::take(&mut self.removals);
        for (entity, ty) in removals {
            let pending = self
                .edits
                .pending(entity)
                .map(|p| p.bits.contains(ty.index()));
            let committed = self
                .component_bits(entity)
                .is_some_and(|bits| bits.contains(ty.index()));
            match (pending, committed) {
                // Re-added before the removal was applied.
                (Some(true), _) | (None, true) => {}
                // Removal not applied yet.
                (Some(false), true) => self.removals.push((entity, ty)),
                (Some(false), false) | (None, false) => {
                    self.components.remove(entity.id(), ty);
                }
            }
        }
    }

    fn kill(&mut self, entity: Entity) {
        let mut bits = self
            .component_bits(entity)
            .cloned()
            .unwrap_or_default();
        if let Some(pending) = self.edits.discard(entity) {
            for index in pending.bits.iter() {
                bits.insert(index);
            }
        }
        for index in bits.iter() {
            self.components
                .remove(entity.id(), ComponentTypeId::from_index(index));
        }
        self.entities.free(entity);
        trace!(%entity, "freed entity");
    }

    fn dispatch(&mut self, event: Lifecycle, batch: &[Entity]) -> EcsResult<()> {
        for index in 0..self.managers.len() {
            if self.managers[index].state != SlotState::Initialized {
                continue;
            }
            let Some(mut manager) = self.managers[index].manager.take() else {
                continue;
            };
            let result = match event {
                Lifecycle::Added => manager.added(self, batch),
                Lifecycle::Changed => manager.changed(self, batch),
                Lifecycle::Enabled => manager.enabled(self, batch),
                Lifecycle::Disabled => manager.disabled(self, batch),
                Lifecycle::Deleted => manager.deleted(self, batch),
            };
            self.restore_manager(index, manager);
            result?;
        }
        for index in 0..self.systems.len() {
            self.apply_membership(index, event, batch)?;
        }
        Ok(())
    }

    fn apply_membership(&mut self, index: usize, event: Lifecycle, batch: &[Entity]) -> EcsResult<()> {
        if self.systems[index].state != SlotState::Initialized {
            return Ok(());
        }
        let Some(mut system) = self.systems[index].system.take() else {
            return Ok(());
        };
        let result = self.update_membership(index, system.as_mut(), event, batch);
        self.restore_system(index, system);
        result
    }

    fn update_membership(
        &mut self,
        index: usize,
        system: &mut dyn EntitySystem,
        event: Lifecycle,
        batch: &[Entity],
    ) -> EcsResult<()> {
        for &entity in batch {
            let Some(composition) = self.composition_id(entity) else {
                continue;
            };
            let enabled = self.entities.is_enabled(entity);
            let slot = &mut self.systems[index];
            if slot.state == SlotState::Removed {
                break;
            }
            let (interested, classified) =
                slot.subscription.is_interested(composition, &self.compositions);
            if classified {
                self.stats.rebuilt_indices += 1;
            }
            let in_active = slot.subscription.contains(entity);
            match transition(in_active, interested, enabled, event) {
                Transition::Insert => {
                    slot.subscription.insert(entity);
                    trace!(%entity, system = %slot.name, ?event, "inserted");
                    if let Some(record) = self.entities.record_mut(entity) {
                        record.system_bits.insert(index);
                    }
                    system.inserted(self, entity)?;
                }
                Transition::Remove => {
                    slot.subscription.remove(entity);
                    trace!(%entity, system = %slot.name, ?event, "removed");
                    if let Some(record) = self.entities.record_mut(entity) {
                        record.system_bits.remove(index);
                    }
                    system.removed(self, entity)?;
                }
                Transition::Keep => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aspect::Aspect;
    use crate::component::PooledComponent;
    use crate::storage::{BoxedStorage, PooledStorage, Storage};

    #[derive(Debug, Default, PartialEq)]
    struct X(i32);
    impl Component for X {
        type Storage = BoxedStorage<Self>;
    }

    #[derive(Debug, Default, PartialEq)]
    struct Y;
    impl Component for Y {
        type Storage = BoxedStorage<Self>;
    }

    #[derive(Debug, Default)]
    struct Spark {
        energy: u32,
    }
    impl PooledComponent for Spark {
        fn reset(&mut self) {
            self.energy = 0;
        }
    }
    impl Component for Spark {
        type Storage = PooledStorage<Self>;
    }

    /// Records inserted/removed callbacks.
    #[derive(Default)]
    struct Tracker {
        aspect_exclude_y: bool,
        log: Vec<String>,
        processed: usize,
    }

    impl EntitySystem for Tracker {
        fn aspect(&self) -> Aspect {
            if self.aspect_exclude_y {
                Aspect::new().all::<X>().exclude::<Y>()
            } else {
                Aspect::new().all::<X>()
            }
        }

        fn inserted(&mut self, _world: &mut World, entity: Entity) -> EcsResult<()> {
            self.log.push(format!("+{}", entity.id()));
            Ok(())
        }

        fn removed(&mut self, world: &mut World, entity: Entity) -> EcsResult<()> {
            // Removed data is still readable from here.
            let x = world
                .storage::<X>()
                .and_then(|s| s.get(entity.id()))
                .map(|x| x.0);
            self.log.push(format!("-{}:{:?}", entity.id(), x));
            Ok(())
        }

        fn process_entities(&mut self, _world: &mut World, entities: &[Entity]) -> EcsResult<()> {
            self.processed += entities.len();
            Ok(())
        }
    }

    fn tracked(world: &mut World) -> SystemId<Tracker> {
        world.register_system(Tracker::default())
    }

    #[test]
    fn empty_composition_is_one() {
        let mut world = World::new();
        let e = world.create_entity();
        assert_eq!(world.composition_id(e), Some(1));
        world.process().unwrap();
        assert_eq!(world.composition_id(e), Some(1));
        assert!(world.is_alive(e));
    }

    #[test]
    fn entity_is_alive_only_after_commit() {
        let mut world = World::new();
        let e = world.create_entity();
        assert!(!world.is_alive(e));
        assert!(world.entity(e.id()).is_none());
        world.process().unwrap();
        assert_eq!(world.entity(e.id()), Some(e));
        assert_eq!(world.active_entity_count(), 1);
    }

    #[test]
    fn add_then_remove_in_one_tick_leaves_no_trace() {
        let mut world = World::new();
        let id = tracked(&mut world);
        let e = world.create_entity();
        world.process().unwrap();

        world.edit(e).unwrap().add(X(1)).remove::<X>();
        world.process().unwrap();

        assert!(world.component_bits(e).unwrap().is_empty());
        assert!(world.system_by_id(id).unwrap().log.is_empty());
        assert_eq!(world.last_tick().changed, 0);
        assert!(world.storage::<X>().is_some_and(|s| !s.contains(e.id())));
    }

    #[test]
    fn add_remove_add_inserts_once() {
        let mut world = World::new();
        let id = tracked(&mut world);
        let e = world.create_entity();
        world.edit(e).unwrap().add(X(1)).remove::<X>().add(X(2));
        world.process().unwrap();
        assert_eq!(world.system_by_id(id).unwrap().log, vec![format!("+{}", e.id())]);
        assert_eq!(world.mapper::<X>().get(&world, e), Some(&X(2)));
    }

    #[test]
    fn added_and_changed_in_same_tick_reports_added_only() {
        let mut world = World::new();
        let e = world.create_entity();
        world.edit(e).unwrap().add(X(1));
        world.edit(e).unwrap().add(Y);
        world.process().unwrap();
        let stats = world.last_tick();
        assert_eq!(stats.added, 1);
        assert_eq!(stats.changed, 0);
    }

    #[test]
    fn disable_before_first_commit() {
        let mut world = World::new();
        let id = tracked(&mut world);
        let e = world.create_entity();
        world.edit(e).unwrap().add(X(4));
        world.disable(e);
        world.process().unwrap();

        let log = &world.system_by_id(id).unwrap().log;
        assert_eq!(log, &vec![format!("+{}", e.id()), format!("-{}:Some(4)", e.id())]);
        assert!(world.actives::<Tracker>().is_empty());
        assert!(world.is_alive(e));
        assert!(!world.is_enabled(e));
    }

    #[test]
    fn redundant_enable_and_disable_are_absorbed() {
        let mut world = World::new();
        let e = world.create_entity();
        world.process().unwrap();
        world.enable(e);
        world.process().unwrap();
        assert_eq!(world.last_tick().enabled, 0);

        world.disable(e);
        world.disable(e);
        world.process().unwrap();
        assert_eq!(world.last_tick().disabled, 1);

        world.enable(e);
        world.process().unwrap();
        assert_eq!(world.last_tick().enabled, 1);
        assert!(world.is_enabled(e));
    }

    #[test]
    fn deleted_entity_data_readable_in_removed() {
        let mut world = World::new();
        let id = tracked(&mut world);
        let e = world.create_entity();
        world.edit(e).unwrap().add(X(9));
        world.process().unwrap();

        world.delete_entity(e);
        world.delete_entity(e);
        world.process().unwrap();

        let log = &world.system_by_id(id).unwrap().log;
        assert_eq!(log.last(), Some(&format!("-{}:Some(9)", e.id())));
        assert_eq!(world.last_tick().deleted, 1);
        assert!(!world.is_alive(e));
        assert!(world.mapper::<X>().get(&world, e).is_none());
    }

    #[test]
    fn delete_then_create_within_tick_gets_new_id() {
        let mut world = World::new();
        let e = world.create_entity();
        world.process().unwrap();

        world.delete_entity(e);
        let other = world.create_entity();
        assert_ne!(other.id(), e.id());
        world.process().unwrap();

        let recycled = world.create_entity();
        assert_eq!(recycled.id(), e.id());
    }

    #[test]
    fn stillborn_entities_are_never_reported() {
        let mut world = World::new();
        let id = tracked(&mut world);
        let e = world.create_entity();
        world.edit(e).unwrap().add(X(1));
        world.delete_entity(e);
        world.process().unwrap();

        assert!(world.system_by_id(id).unwrap().log.is_empty());
        assert_eq!(world.last_tick().added, 0);
        assert_eq!(world.last_tick().deleted, 0);
        assert!(world.edit(e).is_err());
        assert_eq!(world.total_deleted(), 1);
    }

    #[test]
    fn passive_system_tracks_membership_but_never_runs() {
        let mut world = World::new();
        let id = world.register_passive_system(Tracker::default());
        let e = world.create_entity();
        world.edit(e).unwrap().add(X(0));
        world.process().unwrap();
        world.process().unwrap();

        let tracker = world.system_by_id(id).unwrap();
        assert_eq!(tracker.processed, 0);
        assert_eq!(world.actives::<Tracker>(), &[e]);
        assert!(world.system_bits(e).unwrap().contains(id.index()));
    }

    #[test]
    fn pooled_record_is_reused_after_delete() {
        let mut world = World::new();
        let sparks = world.mapper::<Spark>();
        let first = world.create_entity();
        world.edit(first).unwrap().create::<Spark>().energy = 7;
        let address = sparks.get(&world, first).unwrap() as *const Spark;
        world.process().unwrap();

        world.delete_entity(first);
        world.process().unwrap();

        let second = world.create_entity();
        let mut edit = world.edit(second).unwrap();
        let spark = edit.create::<Spark>();
        assert_eq!(spark.energy, 0);
        assert_eq!(spark as *const Spark, address);
    }

    #[test]
    fn pooled_record_is_reset_when_recreated_in_same_tick() {
        let mut world = World::new();
        let sparks = world.mapper::<Spark>();
        let e = world.create_entity();
        world.edit(e).unwrap().create::<Spark>().energy = 7;
        world.process().unwrap();
        let address = sparks.get(&world, e).unwrap() as *const Spark;

        let mut edit = world.edit(e).unwrap();
        let spark = edit.remove::<Spark>().create::<Spark>();
        assert_eq!(spark.energy, 0);
        assert_eq!(spark as *const Spark, address);
        spark.energy = 3;
        world.process().unwrap();

        assert!(sparks.has(&world, e));
        assert_eq!(sparks.get(&world, e).map(|s| s.energy), Some(3));
        assert_eq!(world.storage::<Spark>().unwrap().pool().len(), 0);
    }

    #[test]
    fn boxed_create_after_remove_starts_from_default() {
        let mut world = World::new();
        let id = tracked(&mut world);
        let e = world.create_entity();
        world.edit(e).unwrap().add(X(5));
        world.process().unwrap();

        let x = world.mapper::<X>().create(&mut world, e).unwrap();
        assert_eq!(*x, X(5));
        world.edit(e).unwrap().remove::<X>();
        assert_eq!(world.edit(e).unwrap().create::<X>(), &mut X(0));
        world.process().unwrap();

        assert_eq!(world.mapper::<X>().get(&world, e), Some(&X(0)));
        assert_eq!(world.system_by_id(id).unwrap().log, vec![format!("+{}", e.id())]);
    }

    #[test]
    fn late_system_is_seeded_with_existing_entities() {
        let mut world = World::new();
        let e = world.create_entity();
        world.edit(e).unwrap().add(X(3));
        world.process().unwrap();

        let id = tracked(&mut world);
        world.process().unwrap();
        assert_eq!(world.system_by_id(id).unwrap().log, vec![format!("+{}", e.id())]);
        assert_eq!(world.system_by_id(id).unwrap().processed, 1);
    }

    #[test]
    fn remove_system_returns_it_and_clears_bits() {
        let mut world = World::new();
        let id = tracked(&mut world);
        let e = world.create_entity();
        world.edit(e).unwrap().add(X(3));
        world.process().unwrap();
        assert!(world.system_bits(e).unwrap().contains(id.index()));

        let tracker = world.remove_system::<Tracker>().unwrap();
        assert_eq!(tracker.processed, 1);
        assert!(world.system_bits(e).unwrap().is_empty());
        assert!(world.system::<Tracker>().is_none());
        assert!(world.remove_system::<Tracker>().is_none());
        world.process().unwrap();
    }

    #[test]
    fn uuid_round_trip() {
        let mut world = World::new();
        let uuid = Uuid::new_v4();
        let e = world.create_entity_with_uuid(uuid);
        assert_eq!(world.uuid(e), Some(uuid));
        let other = world.create_entity();
        assert_eq!(world.uuid(other), None);
        world.set_uuid(other, uuid).unwrap();
        assert_eq!(world.uuid(other), Some(uuid));
        assert!(world.set_uuid(Entity::from_id(99), uuid).is_err());
    }

    #[test]
    fn rebuild_budget_is_reported() {
        let mut world = World::with_config(WorldConfig::default().with_max_rebuilt_indices_per_tick(1));
        tracked(&mut world);
        world.register_system(Tracker {
            aspect_exclude_y: true,
            ..Tracker::default()
        });
        let a = world.create_entity();
        world.edit(a).unwrap().add(X(1));
        let b = world.create_entity();
        world.edit(b).unwrap().add(X(1)).add(Y);
        world.process().unwrap();
        assert!(world.last_tick().rebuilt_indices > 1);
        assert!(!world.is_rebuilding_index_allowed());
        assert_eq!(world.last_tick().new_compositions, 2);
    }

    #[test]
    fn delta_is_stored() {
        let mut world = World::new();
        world.set_delta(0.25);
        assert_eq!(world.delta(), 0.25);
    }
}
