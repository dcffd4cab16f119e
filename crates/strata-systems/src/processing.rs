use std::any::type_name;

use strata_core::{Aspect, EcsResult, Entity, EntitySystem, World, Wiring};

/// Per-entity logic run by [`Processing`].
pub trait EntityProcessor: 'static {
    /// Membership predicate for the wrapping system.
    fn aspect(&self) -> Aspect;

    /// Human-readable name for the wrapping system.
    fn name(&self) -> &str {
        type_name::<Self>()
    }

    /// Resolve collaborators.
    fn wire(&mut self, _wiring: &mut Wiring<'_>) -> EcsResult<()> {
        Ok(())
    }

    /// Runs before the first entity of each tick.
    fn begin(&mut self, _world: &mut World) -> EcsResult<()> {
        Ok(())
    }

    /// Process one active entity.
    fn process(&mut self, world: &mut World, entity: Entity) -> EcsResult<()>;

    /// Runs after the last entity of each tick.
    fn end(&mut self, _world: &mut World) -> EcsResult<()> {
        Ok(())
    }
}

/// A system that hands every active entity to its processor, in active-set
/// order.
#[derive(Debug, Default)]
pub struct Processing<P> {
    processor: P,
}

impl<P: EntityProcessor> Processing<P> {
    /// Wrap `processor`.
    pub fn new(processor: P) -> Self {
        Self { processor }
    }

    /// The wrapped processor.
    pub fn processor(&self) -> &P {
        &self.processor
    }

    /// Mutable access to the wrapped processor.
    pub fn processor_mut(&mut self) -> &mut P {
        &mut self.processor
    }
}

impl<P: EntityProcessor> EntitySystem for Processing<P> {
    fn aspect(&self) -> Aspect {
        self.processor.aspect()
    }

    fn name(&self) -> &str {
        self.processor.name()
    }

    fn wire(&mut self, wiring: &mut Wiring<'_>) -> EcsResult<()> {
        self.processor.wire(wiring)
    }

    fn begin(&mut self, world: &mut World) -> EcsResult<()> {
        self.processor.begin(world)
    }

    fn process_entities(&mut self, world: &mut World, entities: &[Entity]) -> EcsResult<()> {
        for &entity in entities {
            self.processor.process(world, entity)?;
        }
        Ok(())
    }

    fn end(&mut self, world: &mut World) -> EcsResult<()> {
        self.processor.end(world)
    }
}

#[cfg(test)]
mod tests {
    use strata_core::{BoxedStorage, Component, ComponentMapper, EcsError};

    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Health(i32);
    impl Component for Health {
        type Storage = BoxedStorage<Self>;
    }

    #[derive(Default)]
    struct Regen {
        health: Option<ComponentMapper<Health>>,
        begun: usize,
        ended: usize,
    }

    impl EntityProcessor for Regen {
        fn aspect(&self) -> Aspect {
            Aspect::new().all::<Health>()
        }

        fn name(&self) -> &str {
            "regen"
        }

        fn wire(&mut self, wiring: &mut Wiring<'_>) -> EcsResult<()> {
            self.health = Some(wiring.mapper::<Health>());
            Ok(())
        }

        fn begin(&mut self, _world: &mut World) -> EcsResult<()> {
            self.begun += 1;
            Ok(())
        }

        fn process(&mut self, world: &mut World, entity: Entity) -> EcsResult<()> {
            let health = self
                .health
                .ok_or_else(|| EcsError::custom("regen not wired"))?;
            if let Some(hp) = health.get_mut(world, entity) {
                hp.0 += 1;
            }
            Ok(())
        }

        fn end(&mut self, _world: &mut World) -> EcsResult<()> {
            self.ended += 1;
            Ok(())
        }
    }

    #[test]
    fn processes_each_active_entity() {
        let mut world = World::new();
        world.register_system(Processing::new(Regen::default()));
        let a = world.create_entity();
        world.edit(a).unwrap().add(Health(10));
        let b = world.create_entity();
        world.edit(b).unwrap().add(Health(3));
        let bystander = world.create_entity();

        world.process().unwrap();
        world.process().unwrap();

        let health = world.mapper::<Health>();
        assert_eq!(health.get(&world, a), Some(&Health(12)));
        assert_eq!(health.get(&world, b), Some(&Health(5)));
        assert!(health.get(&world, bystander).is_none());

        let system = world.system::<Processing<Regen>>().unwrap();
        assert_eq!(system.processor().begun, 2);
        assert_eq!(system.processor().ended, 2);
    }

    #[test]
    fn takes_its_name_from_the_processor() {
        let mut world = World::new();
        world.register_system(Processing::new(Regen::default()));
        let names: Vec<String> = world.systems().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["regen".to_string()]);
    }
}
