use std::any::type_name;

use strata_core::{Aspect, EcsResult, Entity, EntitySystem, World, Wiring};
use tracing::trace;

/// Batch logic run by [`Interval`] once per elapsed interval.
pub trait IntervalProcessor: 'static {
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

    /// Process the active set. `elapsed` is the world time since the
    /// previous run.
    fn process(&mut self, world: &mut World, entities: &[Entity], elapsed: f32) -> EcsResult<()>;
}

/// A system that runs only after `interval` seconds of world time have
/// accumulated.
///
/// Overshoot carries over: with an interval of 1.0 and deltas of 1.1 and
/// 0.95, both ticks run.
#[derive(Debug)]
pub struct Interval<P> {
    processor: P,
    interval: f32,
    acc: f32,
    since_last: f32,
    interval_delta: f32,
}

impl<P: IntervalProcessor> Interval<P> {
    /// Run `processor` every `interval` seconds of world time.
    pub fn new(processor: P, interval: f32) -> Self {
        Self {
            processor,
            interval,
            acc: 0.0,
            since_last: 0.0,
            interval_delta: 0.0,
        }
    }

    /// The configured interval.
    pub fn interval(&self) -> f32 {
        self.interval
    }

    /// World time between the last two runs (or since startup, after the
    /// first run).
    pub fn interval_delta(&self) -> f32 {
        self.interval_delta
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

impl<P: IntervalProcessor> EntitySystem for Interval<P> {
    fn aspect(&self) -> Aspect {
        self.processor.aspect()
    }

    fn name(&self) -> &str {
        self.processor.name()
    }

    fn wire(&mut self, wiring: &mut Wiring<'_>) -> EcsResult<()> {
        self.processor.wire(wiring)
    }

    fn check_processing(&mut self, world: &World) -> bool {
        let delta = world.delta();
        self.acc += delta;
        self.since_last += delta;
        if self.acc < self.interval {
            return false;
        }
        self.acc -= self.interval;
        self.interval_delta = self.since_last;
        self.since_last = 0.0;
        trace!(
            system = self.processor.name(),
            elapsed = self.interval_delta,
            "interval elapsed"
        );
        true
    }

    fn process_entities(&mut self, world: &mut World, entities: &[Entity]) -> EcsResult<()> {
        self.processor.process(world, entities, self.interval_delta)
    }
}

#[cfg(test)]
mod tests {
    use strata_core::{BoxedStorage, Component};

    use super::*;

    #[derive(Debug, Default)]
    struct Beacon;
    impl Component for Beacon {
        type Storage = BoxedStorage<Self>;
    }

    #[derive(Default)]
    struct Pulse {
        runs: Vec<(usize, f32)>,
    }

    impl IntervalProcessor for Pulse {
        fn aspect(&self) -> Aspect {
            Aspect::new().all::<Beacon>()
        }

        fn process(&mut self, _world: &mut World, entities: &[Entity], elapsed: f32) -> EcsResult<()> {
            self.runs.push((entities.len(), elapsed));
            Ok(())
        }
    }

    const EPSILON: f32 = 1e-4;

    #[test]
    fn interval_delta_tracks_time_between_runs() {
        let mut world = World::new();
        world.register_system(Interval::new(Pulse::default(), 1.0));
        world.initialize().unwrap();

        world.set_delta(1.1);
        world.process().unwrap();
        let system = world.system::<Interval<Pulse>>().unwrap();
        assert!((system.interval_delta() - 1.1).abs() < EPSILON);

        world.set_delta(0.95);
        world.process().unwrap();
        let system = world.system::<Interval<Pulse>>().unwrap();
        assert!((system.interval_delta() - 0.95).abs() < EPSILON);
        assert_eq!(system.processor().runs.len(), 2);
    }

    #[test]
    fn skips_ticks_until_interval_accumulates() {
        let mut world = World::new();
        world.register_system(Interval::new(Pulse::default(), 1.0));
        let e = world.create_entity();
        world.edit(e).unwrap().add(Beacon);

        world.set_delta(0.4);
        for _ in 0..4 {
            world.process().unwrap();
        }

        let runs = &world.system::<Interval<Pulse>>().unwrap().processor().runs;
        // Runs on the third tick at 1.2; the fourth leaves 0.6 accumulated.
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].0, 1);
        assert!((runs[0].1 - 1.2).abs() < EPSILON);
    }
}
