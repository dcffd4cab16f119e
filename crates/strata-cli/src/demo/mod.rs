//! A particle simulation that exercises every storage strategy, system
//! shape, and manager in the workspace.

/// Particle components.
pub mod components;
/// Run configuration.
pub mod config;
/// Particle systems and spawning.
pub mod systems;

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand::rngs::StdRng;
use strata_core::{ArchetypeBuilder, EcsResult, Entity, World};
use strata_managers::{GroupManager, TagManager};
use strata_systems::{Delayed, Interval, Processing};
use tracing::debug;

use components::{Lifetime, Position, Spark, Velocity};
use config::SimulationConfig;
use systems::{Arena, Emitter, Expiry, Flicker, Movement, Spawner};

/// Group holding every particle spawned with a spark.
pub const SPARKS_GROUP: &str = "sparks";
/// Tag of the first particle of the initial population.
pub const ORIGIN_TAG: &str = "origin";

const ARENA: Arena = Arena {
    width: 100.0,
    height: 100.0,
};

/// Alive entities sharing one component mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositionRow {
    /// Composition id.
    pub id: u32,
    /// Short names of the component types in the mask.
    pub components: Vec<String>,
    /// Alive entities with this composition.
    pub entities: usize,
}

/// A configured demo world.
pub struct Demo {
    world: World,
    config: SimulationConfig,
}

impl Demo {
    /// Build the world, register systems and managers, and spawn the
    /// initial population.
    pub fn new(config: SimulationConfig) -> Result<Self, String> {
        config.validate()?;
        let mut world = World::with_config(config.world.clone());
        world.register_injectable(Arena::NAME, ARENA);
        let groups = world.register_manager(GroupManager::new());
        world.register_manager(TagManager::new());

        let particle = ArchetypeBuilder::new()
            .add::<Position>()
            .add::<Velocity>()
            .add::<Lifetime>()
            .build(&mut world);
        let spark = ArchetypeBuilder::from_parent(&particle)
            .add::<Spark>()
            .build(&mut world);

        let mut spawner = Spawner::new(
            particle.clone(),
            spark.clone(),
            config.spawn.clone(),
            ARENA,
            StdRng::seed_from_u64(config.seed),
        );
        let emitter = Spawner::new(
            particle,
            spark,
            config.spawn.clone(),
            ARENA,
            StdRng::seed_from_u64(config.seed.wrapping_add(1)),
        );

        world.register_system(Interval::new(
            Emitter::new(emitter),
            config.spawn.interval,
        ));
        world.register_system(Processing::new(Movement::default()));
        world.register_system(Processing::new(Flicker::default()));
        world.register_system(Delayed::new(Expiry::default()));
        world.set_delta(config.delta);

        let mut origin = None;
        for _ in 0..config.entities {
            let entity = spawner.spawn(&mut world, Some(groups)).map_err(|e| e.to_string())?;
            origin = origin.or(Some(entity));
        }
        if let (Some(entity), Some(tags)) = (origin, world.manager_mut::<TagManager>()) {
            tags.register(ORIGIN_TAG, entity);
        }
        debug!(entities = config.entities, seed = config.seed, "demo world built");

        Ok(Self { world, config })
    }

    /// Run `ticks` ticks.
    pub fn run(&mut self, ticks: u64) -> EcsResult<()> {
        for _ in 0..ticks {
            self.world.process()?;
        }
        Ok(())
    }

    /// Run the configured number of ticks.
    pub fn run_configured(&mut self) -> EcsResult<()> {
        self.run(self.config.ticks)
    }

    /// The underlying world.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// The config this demo was built from.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Particle tagged as the origin, while it lives.
    pub fn origin(&self) -> Option<Entity> {
        self.world.manager::<TagManager>()?.entity(ORIGIN_TAG)
    }

    /// Members of the sparks group.
    pub fn sparks(&self) -> usize {
        self.world
            .manager::<GroupManager>()
            .map_or(0, |groups| groups.entities(SPARKS_GROUP).len())
    }

    /// Particles spawned by the emitter.
    pub fn emitted(&self) -> usize {
        self.world
            .system::<Interval<Emitter>>()
            .map_or(0, |s| s.processor().spawned())
    }

    /// Particles deleted on expiry.
    pub fn expired(&self) -> usize {
        self.world
            .system::<Delayed<Expiry>>()
            .map_or(0, |s| s.processor().expired())
    }

    /// Sparks that burnt out.
    pub fn faded(&self) -> usize {
        self.world
            .system::<Processing<Flicker>>()
            .map_or(0, |s| s.processor().faded())
    }

    /// Alive entity counts per composition, in composition id order.
    pub fn compositions(&self) -> Vec<CompositionRow> {
        let world = &self.world;
        let names: Vec<String> = world
            .component_types()
            .iter()
            .map(|(_, info)| short_type_name(info.name).to_string())
            .collect();

        let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
        for entity in world.alive_entities() {
            if let Some(id) = world.composition_id(entity) {
                *counts.entry(id).or_default() += 1;
            }
        }

        world
            .compositions()
            .iter()
            .map(|(id, bits)| CompositionRow {
                id,
                components: bits.iter().filter_map(|i| names.get(i).cloned()).collect(),
                entities: counts.get(&id).copied().unwrap_or_default(),
            })
            .collect()
    }
}

/// `a::b::Name<c::D>` becomes `Name<c::D>`.
pub fn short_type_name(name: &str) -> &str {
    let generic = name.find('<').unwrap_or(name.len());
    match name[..generic].rfind("::") {
        Some(i) => &name[i + 2..],
        None => name,
    }
}
