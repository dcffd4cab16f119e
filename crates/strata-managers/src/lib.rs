//! Named lookup managers for the strata ECS runtime.
//!
//! Managers are registered with [`strata_core::World::register_manager`]
//! and keep their indexes in step with entity lifecycle: every manager
//! here forgets an entity when it is deleted.

/// Many-to-many group membership.
pub mod group;
/// Entity ownership by player.
pub mod player;
/// Unique string tags.
pub mod tag;
/// Player to team assignment.
pub mod team;
/// UUID to entity lookup.
pub mod uuid_entity;

pub use group::GroupManager;
pub use player::PlayerManager;
pub use tag::TagManager;
pub use team::TeamManager;
pub use uuid_entity::UuidEntityManager;
