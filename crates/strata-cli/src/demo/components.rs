use strata_core::{
    BoxedStorage, Component, PackedComponent, PackedStorage, PooledComponent, PooledStorage,
};

/// Location inside the arena.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Position {
    /// Horizontal coordinate.
    pub x: f32,
    /// Vertical coordinate.
    pub y: f32,
}

impl Component for Position {
    type Storage = BoxedStorage<Self>;
}

/// Seconds left before the particle expires.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Lifetime {
    /// Seconds left.
    pub remaining: f32,
}

impl Component for Lifetime {
    type Storage = BoxedStorage<Self>;
}

/// Glow of a spark particle. Removed once it fades out.
#[derive(Debug, Default)]
pub struct Spark {
    /// Brightness, 1.0 when spawned.
    pub intensity: f32,
}

impl PooledComponent for Spark {
    fn reset(&mut self) {
        self.intensity = 0.0;
    }
}

impl Component for Spark {
    type Storage = PooledStorage<Self>;
}

/// Velocities of every particle, stored column-wise.
#[derive(Debug, Default)]
pub struct Velocity {
    row: usize,
    dx: Vec<f32>,
    dy: Vec<f32>,
}

impl Velocity {
    /// Set the velocity of the current row.
    pub fn set(&mut self, dx: f32, dy: f32) {
        if let (Some(x), Some(y)) = (self.dx.get_mut(self.row), self.dy.get_mut(self.row)) {
            *x = dx;
            *y = dy;
        }
    }

    /// Velocity of entity `id`.
    pub fn of(&self, id: u32) -> (f32, f32) {
        let row = id as usize;
        (
            self.dx.get(row).copied().unwrap_or_default(),
            self.dy.get(row).copied().unwrap_or_default(),
        )
    }
}

impl PackedComponent for Velocity {
    fn for_entity(&mut self, id: u32) {
        self.row = id as usize;
    }

    fn reset(&mut self) {
        self.set(0.0, 0.0);
    }

    fn ensure_capacity(&mut self, id: u32) {
        let len = id as usize + 1;
        if self.dx.len() < len {
            self.dx.resize(len, 0.0);
            self.dy.resize(len, 0.0);
        }
    }
}

impl Component for Velocity {
    type Storage = PackedStorage<Self>;
}
