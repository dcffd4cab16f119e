//! Reusable system shapes for the strata ECS runtime.
//!
//! Each shape wraps a small processor trait and implements
//! [`strata_core::EntitySystem`] on its behalf, so game code only writes
//! the per-entity or per-batch logic.

/// Delay-scheduled processing driven by a shared one-shot timer.
pub mod delayed;
/// Batch processing gated by a fixed interval of world time.
pub mod interval;
/// Plain per-entity processing.
pub mod processing;

/// Re-exports of [`delayed::Delayed`], [`delayed::DelayedProcessor`], and [`delayed::DelayTimer`].
pub use delayed::{DelayTimer, Delayed, DelayedProcessor};
/// Re-exports of [`interval::Interval`] and [`interval::IntervalProcessor`].
pub use interval::{Interval, IntervalProcessor};
/// Re-exports of [`processing::EntityProcessor`] and [`processing::Processing`].
pub use processing::{EntityProcessor, Processing};
