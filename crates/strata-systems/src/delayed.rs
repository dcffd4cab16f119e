use std::any::type_name;

use strata_core::{Aspect, EcsResult, Entity, EntitySystem, World, Wiring};
use tracing::trace;

/// One-shot countdown shared by every entity of a [`Delayed`] system.
///
/// The timer always tracks the soonest pending expiry: offering a delay
/// rearms it only when it is stopped or the offer is shorter than what
/// remains.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DelayTimer {
    delay: f32,
    acc: f32,
    running: bool,
}

impl DelayTimer {
    /// Arm the timer if `delay` expires before the current countdown.
    pub fn offer_delay(&mut self, delay: f32) {
        if !self.running || delay < self.remaining() {
            self.restart(delay);
        }
    }

    /// Arm the timer for `delay` from now, discarding the current countdown.
    pub fn restart(&mut self, delay: f32) {
        self.delay = delay;
        self.acc = 0.0;
        self.running = true;
    }

    /// Disarm the timer.
    pub fn stop(&mut self) {
        self.delay = 0.0;
        self.acc = 0.0;
        self.running = false;
    }

    /// Time left before the next run, or 0 when stopped.
    pub fn remaining(&self) -> f32 {
        if self.running {
            self.delay - self.acc
        } else {
            0.0
        }
    }

    /// Time accumulated since the timer was armed.
    pub fn accumulated(&self) -> f32 {
        self.acc
    }

    /// Returns true while armed.
    pub fn is_running(&self) -> bool {
        self.running
    }

    fn advance(&mut self, delta: f32) -> bool {
        if !self.running {
            return false;
        }
        self.acc += delta;
        self.acc >= self.delay
    }
}

/// Per-entity countdown logic run by [`Delayed`].
pub trait DelayedProcessor: 'static {
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

    /// Time left before `entity` expires.
    fn remaining_delay(&self, world: &World, entity: Entity) -> f32;

    /// Subtract `elapsed` from the entity's countdown. A negative value
    /// adds time back.
    fn process_delta(&mut self, world: &mut World, entity: Entity, elapsed: f32) -> EcsResult<()>;

    /// The entity's countdown reached zero. Offer a new delay on `timer` to
    /// keep it scheduled.
    fn process_expired(
        &mut self,
        world: &mut World,
        entity: Entity,
        timer: &mut DelayTimer,
    ) -> EcsResult<()>;
}

/// A system that runs only when the soonest entity countdown expires.
///
/// Each run hands every active entity the time accumulated since the timer
/// was armed, expires those whose countdown reached zero, and rearms the
/// timer with the soonest remaining delay.
#[derive(Debug)]
pub struct Delayed<P> {
    processor: P,
    timer: DelayTimer,
}

impl<P: DelayedProcessor> Delayed<P> {
    /// Wrap `processor` with a stopped timer.
    pub fn new(processor: P) -> Self {
        Self {
            processor,
            timer: DelayTimer::default(),
        }
    }

    /// Rearm the timer if `delay` is sooner than the current countdown.
    pub fn offer_delay(&mut self, delay: f32) {
        self.timer.offer_delay(delay);
    }

    /// Time left before the next run, or 0 when no entity is scheduled.
    pub fn remaining_time_until_processing(&self) -> f32 {
        self.timer.remaining()
    }

    /// Returns true while some entity is scheduled.
    pub fn is_running(&self) -> bool {
        self.timer.is_running()
    }

    /// The shared timer.
    pub fn timer(&self) -> &DelayTimer {
        &self.timer
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

impl<P: DelayedProcessor> EntitySystem for Delayed<P> {
    fn aspect(&self) -> Aspect {
        self.processor.aspect()
    }

    fn name(&self) -> &str {
        self.processor.name()
    }

    fn wire(&mut self, wiring: &mut Wiring<'_>) -> EcsResult<()> {
        self.processor.wire(wiring)
    }

    fn inserted(&mut self, world: &mut World, entity: Entity) -> EcsResult<()> {
        let delay = self.processor.remaining_delay(world, entity);
        // The next run subtracts the whole accumulator from every entity.
        self.processor
            .process_delta(world, entity, -self.timer.accumulated())?;
        self.timer.offer_delay(delay);
        Ok(())
    }

    fn check_processing(&mut self, world: &World) -> bool {
        self.timer.advance(world.delta())
    }

    fn process_entities(&mut self, world: &mut World, entities: &[Entity]) -> EcsResult<()> {
        let elapsed = self.timer.accumulated();
        self.timer.stop();
        trace!(system = self.processor.name(), elapsed, "delay expired");
        for &entity in entities {
            self.processor.process_delta(world, entity, elapsed)?;
            let remaining = self.processor.remaining_delay(world, entity);
            if remaining <= 0.0 {
                self.processor
                    .process_expired(world, entity, &mut self.timer)?;
            } else {
                self.timer.offer_delay(remaining);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use strata_core::{BoxedStorage, Component, ComponentMapper};

    use super::*;

    #[derive(Debug, Default)]
    struct Fuse {
        delay: f32,
    }
    impl Component for Fuse {
        type Storage = BoxedStorage<Self>;
    }

    #[derive(Debug)]
    struct SlowFuse {
        delay: f32,
    }
    impl Default for SlowFuse {
        fn default() -> Self {
            Self { delay: 1.0 }
        }
    }
    impl Component for SlowFuse {
        type Storage = BoxedStorage<Self>;
    }

    /// Expired fuses are rewound by 2.0.
    #[derive(Default)]
    struct Fuses {
        fast: Option<ComponentMapper<Fuse>>,
        slow: Option<ComponentMapper<SlowFuse>>,
    }

    impl Fuses {
        fn mappers(&self) -> (ComponentMapper<Fuse>, ComponentMapper<SlowFuse>) {
            match (self.fast, self.slow) {
                (Some(fast), Some(slow)) => (fast, slow),
                _ => panic!("fuses not wired"),
            }
        }
    }

    impl DelayedProcessor for Fuses {
        fn aspect(&self) -> Aspect {
            Aspect::new().one::<Fuse>().one::<SlowFuse>()
        }

        fn wire(&mut self, wiring: &mut Wiring<'_>) -> EcsResult<()> {
            self.fast = Some(wiring.mapper());
            self.slow = Some(wiring.mapper());
            Ok(())
        }

        fn remaining_delay(&self, world: &World, entity: Entity) -> f32 {
            let (fast, slow) = self.mappers();
            let mut result = f32::MAX;
            if let Some(fuse) = fast.get(world, entity) {
                result = result.min(fuse.delay);
            }
            if let Some(fuse) = slow.get(world, entity) {
                result = result.min(fuse.delay);
            }
            result
        }

        fn process_delta(&mut self, world: &mut World, entity: Entity, elapsed: f32) -> EcsResult<()> {
            let (fast, slow) = self.mappers();
            if let Some(fuse) = fast.get_mut(world, entity) {
                fuse.delay -= elapsed;
            }
            if let Some(fuse) = slow.get_mut(world, entity) {
                fuse.delay -= elapsed;
            }
            Ok(())
        }

        fn process_expired(
            &mut self,
            world: &mut World,
            entity: Entity,
            timer: &mut DelayTimer,
        ) -> EcsResult<()> {
            let (fast, slow) = self.mappers();
            let mut next = f32::MAX;
            if let Some(fuse) = fast.get_mut(world, entity) {
                if fuse.delay <= 0.0 {
                    fuse.delay += 2.0;
                    next = next.min(fuse.delay);
                }
            }
            if let Some(fuse) = slow.get_mut(world, entity) {
                if fuse.delay <= 0.0 {
                    fuse.delay += 2.0;
                    next = next.min(fuse.delay);
                }
            }
            timer.offer_delay(next);
            Ok(())
        }
    }

    const EPSILON: f32 = 1e-4;

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < EPSILON,
            "expected {expected}, got {actual}"
        );
    }

    fn assert_fuses(world: &mut World, fast: f32, slow: f32) {
        let fast_fuses = world.mapper::<Fuse>();
        let slow_fuses = world.mapper::<SlowFuse>();
        for &entity in world.actives::<Delayed<Fuses>>() {
            if let Some(fuse) = fast_fuses.get(world, entity) {
                assert_close(fuse.delay, fast);
            }
            if let Some(fuse) = slow_fuses.get(world, entity) {
                assert_close(fuse.delay, slow);
            }
        }
    }

    fn remaining(world: &World) -> f32 {
        world
            .system::<Delayed<Fuses>>()
            .map(Delayed::remaining_time_until_processing)
            .unwrap_or_default()
    }

    #[test]
    fn stopped_timer_reports_no_remaining_time() {
        let mut world = World::new();
        world.register_system(Delayed::new(Fuses::default()));
        world.process().unwrap();

        let system = world.system::<Delayed<Fuses>>().unwrap();
        assert!(!system.is_running());
        assert_close(system.remaining_time_until_processing(), 0.0);
        assert!(world.actives::<Delayed<Fuses>>().is_empty());
    }

    #[test]
    fn timer_tracks_the_soonest_fuse() {
        let mut world = World::new();
        world.register_system(Delayed::new(Fuses::default()));
        world.initialize().unwrap();

        let bystander = world.create_entity();
        let e2 = world.create_entity();
        world.edit(e2).unwrap().add(Fuse::default());
        let e3 = world.create_entity();
        world.edit(e3).unwrap().add(SlowFuse::default());
        let e4 = world.create_entity();
        world.edit(e4).unwrap().add(Fuse::default()).add(SlowFuse::default());

        world.process().unwrap();
        let actives = world.actives::<Delayed<Fuses>>();
        assert!(!actives.contains(&bystander));
        assert!(actives.contains(&e2) && actives.contains(&e3) && actives.contains(&e4));
        assert_fuses(&mut world, 2.0, 1.0);
        assert_close(remaining(&world), 1.0);

        world.set_delta(0.5);
        world.process().unwrap();
        assert_fuses(&mut world, 2.0, 1.0);
        assert_close(remaining(&world), 0.5);

        world.process().unwrap();
        assert_fuses(&mut world, 1.0, 2.0);
        assert_close(remaining(&world), 1.0);

        world.set_delta(2.5);
        world.process().unwrap();
        assert_fuses(&mut world, 0.5, 1.5);
        assert_close(remaining(&world), 0.5);

        for entity in [bystander, e2, e3, e4] {
            world.delete_entity(entity);
        }
        world.process().unwrap();
        assert!(world.actives::<Delayed<Fuses>>().is_empty());
    }

    #[test]
    fn offer_keeps_the_sooner_deadline() {
        let mut timer = DelayTimer::default();
        timer.offer_delay(3.0);
        timer.offer_delay(5.0);
        assert_close(timer.remaining(), 3.0);
        timer.offer_delay(1.5);
        assert_close(timer.remaining(), 1.5);
        timer.stop();
        assert!(!timer.is_running());
        assert_close(timer.remaining(), 0.0);
    }
}
