use rand::Rng;
use rand::rngs::StdRng;
use strata_core::{
    Archetype, Aspect, ComponentMapper, EcsError, EcsResult, Entity, ManagerId, World, Wiring,
};
use strata_managers::GroupManager;
use strata_systems::{DelayTimer, DelayedProcessor, EntityProcessor, IntervalProcessor};

use super::SPARKS_GROUP;
use super::components::{Lifetime, Position, Spark, Velocity};
use super::config::SpawnMix;

/// Bounds particles wrap around in, injected under [`Arena::NAME`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arena {
    /// Horizontal extent.
    pub width: f32,
    /// Vertical extent.
    pub height: f32,
}

impl Arena {
    /// Injectable name.
    pub const NAME: &'static str = "arena";
}

fn unwired(system: &str) -> EcsError {
    EcsError::custom(format!("{system} used before wiring"))
}

/// Moves particles by their velocity and wraps them around the arena.
#[derive(Debug, Default)]
pub struct Movement {
    wired: Option<(ComponentMapper<Position>, ComponentMapper<Velocity>, Arena)>,
}

impl EntityProcessor for Movement {
    fn aspect(&self) -> Aspect {
        Aspect::new().all::<Position>().all::<Velocity>()
    }

    fn name(&self) -> &str {
        "movement"
    }

    fn wire(&mut self, wiring: &mut Wiring<'_>) -> EcsResult<()> {
        let arena = wiring.require_injectable::<Arena>(Arena::NAME)?;
        self.wired = Some((wiring.mapper(), wiring.mapper(), arena));
        Ok(())
    }

    fn process(&mut self, world: &mut World, entity: Entity) -> EcsResult<()> {
        let (positions, velocities, arena) = self.wired.ok_or_else(|| unwired("movement"))?;
        let (dx, dy) = velocities
            .get(world, entity)
            .map(|v| v.of(entity.id()))
            .unwrap_or_default();
        let delta = world.delta();
        if let Some(position) = positions.get_mut(world, entity) {
            position.x = (position.x + dx * delta).rem_euclid(arena.width);
            position.y = (position.y + dy * delta).rem_euclid(arena.height);
        }
        Ok(())
    }
}

/// Dims sparks every tick and strips the spark once it is out.
#[derive(Debug, Default)]
pub struct Flicker {
    sparks: Option<ComponentMapper<Spark>>,
    faded: usize,
}

impl Flicker {
    const DECAY: f32 = 0.8;
    const CUTOFF: f32 = 0.05;

    /// Sparks that have burnt out so far.
    pub fn faded(&self) -> usize {
        self.faded
    }
}

impl EntityProcessor for Flicker {
    fn aspect(&self) -> Aspect {
        Aspect::new().all::<Spark>()
    }

    fn name(&self) -> &str {
        "flicker"
    }

    fn wire(&mut self, wiring: &mut Wiring<'_>) -> EcsResult<()> {
        self.sparks = Some(wiring.mapper());
        Ok(())
    }

    fn process(&mut self, world: &mut World, entity: Entity) -> EcsResult<()> {
        let sparks = self.sparks.ok_or_else(|| unwired("flicker"))?;
        let Some(spark) = sparks.get_mut(world, entity) else {
            return Ok(());
        };
        spark.intensity *= Self::DECAY;
        if spark.intensity < Self::CUTOFF {
            sparks.remove(world, entity)?;
            self.faded += 1;
        }
        Ok(())
    }
}

/// Deletes particles when their lifetime runs out.
#[derive(Debug, Default)]
pub struct Expiry {
    lifetimes: Option<ComponentMapper<Lifetime>>,
    expired: usize,
}

impl Expiry {
    /// Particles deleted so far.
    pub fn expired(&self) -> usize {
        self.expired
    }

    fn lifetimes(&self) -> EcsResult<ComponentMapper<Lifetime>> {
        self.lifetimes.ok_or_else(|| unwired("expiry"))
    }
}

impl DelayedProcessor for Expiry {
    fn aspect(&self) -> Aspect {
        Aspect::new().all::<Lifetime>()
    }

    fn name(&self) -> &str {
        "expiry"
    }

    fn wire(&mut self, wiring: &mut Wiring<'_>) -> EcsResult<()> {
        self.lifetimes = Some(wiring.mapper());
        Ok(())
    }

    fn remaining_delay(&self, world: &World, entity: Entity) -> f32 {
        self.lifetimes
            .and_then(|lifetimes| lifetimes.get(world, entity))
            .map_or(0.0, |lifetime| lifetime.remaining)
    }

    fn process_delta(&mut self, world: &mut World, entity: Entity, elapsed: f32) -> EcsResult<()> {
        if let Some(lifetime) = self.lifetimes()?.get_mut(world, entity) {
            lifetime.remaining -= elapsed;
        }
        Ok(())
    }

    fn process_expired(
        &mut self,
        world: &mut World,
        entity: Entity,
        _timer: &mut DelayTimer,
    ) -> EcsResult<()> {
        world.delete_entity(entity);
        self.expired += 1;
        Ok(())
    }
}

/// Builds particles from archetypes with randomized state.
#[derive(Debug)]
pub struct Spawner {
    particle: Archetype,
    spark: Archetype,
    mix: SpawnMix,
    arena: Arena,
    rng: StdRng,
}

impl Spawner {
    /// Spawner drawing from `rng`, placing particles inside `arena`.
    pub fn new(
        particle: Archetype,
        spark: Archetype,
        mix: SpawnMix,
        arena: Arena,
        rng: StdRng,
    ) -> Self {
        Self {
            particle,
            spark,
            mix,
            arena,
            rng,
        }
    }

    /// Create one particle. Spark particles join the sparks group when a
    /// group manager is given.
    pub fn spawn(
        &mut self,
        world: &mut World,
        groups: Option<ManagerId<GroupManager>>,
    ) -> EcsResult<Entity> {
        let with_spark = self.rng.random_bool(self.mix.spark_ratio);
        let archetype = if with_spark { &self.spark } else { &self.particle };
        let entity = world.create_entity_from(archetype);

        let x = self.rng.random_range(0.0..self.arena.width);
        let y = self.rng.random_range(0.0..self.arena.height);
        let speed = self.mix.max_speed;
        let dx = self.rng.random_range(-speed..=speed);
        let dy = self.rng.random_range(-speed..=speed);
        let lifetime = self
            .rng
            .random_range(self.mix.min_lifetime..self.mix.max_lifetime);

        world.mapper::<Position>().set(world, entity, Position { x, y })?;
        world.mapper::<Lifetime>().set(world, entity, Lifetime { remaining: lifetime })?;
        if let Some(velocity) = world.mapper::<Velocity>().get_mut(world, entity) {
            velocity.set(dx, dy);
        }
        if with_spark {
            if let Some(spark) = world.mapper::<Spark>().get_mut(world, entity) {
                spark.intensity = 1.0;
            }
            if let Some(id) = groups {
                if let Some(groups) = world.manager_by_id_mut(id) {
                    groups.add(entity, SPARKS_GROUP);
                }
            }
        }
        Ok(entity)
    }
}

/// Spawns a burst of particles every interval.
#[derive(Debug)]
pub struct Emitter {
    spawner: Spawner,
    groups: Option<ManagerId<GroupManager>>,
    spawned: usize,
}

impl Emitter {
    /// Emitter spawning bursts through `spawner`.
    pub fn new(spawner: Spawner) -> Self {
        Self {
            spawner,
            groups: None,
            spawned: 0,
        }
    }

    /// Particles spawned by this emitter.
    pub fn spawned(&self) -> usize {
        self.spawned
    }
}

impl IntervalProcessor for Emitter {
    fn aspect(&self) -> Aspect {
        Aspect::empty()
    }

    fn name(&self) -> &str {
        "emitter"
    }

    fn wire(&mut self, wiring: &mut Wiring<'_>) -> EcsResult<()> {
        self.groups = wiring.optional_manager::<GroupManager>();
        Ok(())
    }

    fn process(&mut self, world: &mut World, _entities: &[Entity], _elapsed: f32) -> EcsResult<()> {
        if !world.is_rebuilding_index_allowed() {
            return Ok(());
        }
        for _ in 0..self.spawner.mix.burst {
            self.spawner.spawn(world, self.groups)?;
        }
        self.spawned += self.spawner.mix.burst;
        Ok(())
    }
}
