//! Core of the strata ECS runtime.
//!
//! Entities are dense, recycled integer ids. Components live in per-type
//! stores (boxed, pooled, or packed). Each distinct component mask is
//! canonicalized to a small composition id, and systems classify each
//! composition once against their [`Aspect`]. Edits are buffered and folded
//! in by [`World::process`], which drains added, changed, disabled, enabled,
//! and deleted notifications until nothing is left to do.

/// Pre-built component sets for bulk entity creation.
pub mod archetype;
/// Membership predicates over component masks.
pub mod aspect;
/// Growable bit set used for component and system masks.
pub mod bits;
/// Component traits and storage strategies.
pub mod component;
/// Component mask to composition id registry.
pub mod composition;
/// World configuration.
pub mod config;
/// Deferred per-entity edits.
pub mod edit;
/// Entity handles and the identifier pool.
pub mod entity;
/// Error types used throughout the crate.
pub mod error;
/// Typed component accessors.
pub mod mapper;
/// Lifecycle observers and managers.
pub mod observer;
/// Component type registry.
pub mod registry;
/// Per-tick counters.
pub mod stats;
/// Boxed, pooled, and packed component stores.
pub mod storage;
/// Entity systems and their membership bookkeeping.
pub mod system;
/// Dependency resolution for systems, managers, and other collaborators.
pub mod wiring;
/// The world façade and commit pipeline.
pub mod world;

pub use archetype::{Archetype, ArchetypeBuilder};
pub use aspect::{Aspect, AspectBits};
pub use bits::Bits;
pub use component::{Component, PackedComponent, PooledComponent, StorageKind};
pub use composition::CompositionRegistry;
pub use config::WorldConfig;
pub use edit::EntityEdit;
pub use entity::Entity;
pub use error::{EcsError, EcsResult};
pub use mapper::ComponentMapper;
pub use observer::{AsAny, EntityObserver, Manager, ManagerId};
pub use registry::{ComponentTypeId, ComponentTypeInfo, ComponentTypes};
pub use stats::TickStats;
pub use storage::{
    BoxedStorage, ComponentPool, InsertStorage, PackedStorage, PooledStorage, Storage,
};
pub use system::{EntitySystem, SystemId};
pub use uuid::Uuid;
pub use wiring::{Wire, Wiring};
pub use world::{SystemInfo, World};
