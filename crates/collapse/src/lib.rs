//! Constraint solving: propagation waves and the collapse scheduler.
//!
//! # Invariants
//! - A propagation wave always runs to exhaustion before anything else
//!   mutates the grid; candidate sets only shrink along the way.
//! - Contradictions resolve to the fallback tile and are reported as events,
//!   never as failures.
//! - All randomness flows through the scheduler's single seeded generator,
//!   so a fixed seed replays a fixed world.

mod propagate;
mod schedule;

pub use propagate::{PropagationReport, Propagator};
pub use schedule::Scheduler;

pub fn crate_info() -> &'static str {
    "wavegrid-collapse v0.1.0"
}
