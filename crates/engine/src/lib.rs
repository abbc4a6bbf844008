//! Engine core: owns the world and wires streaming and collapse together.
//!
//! # Invariants
//! - A frame is stream-then-collapse; the two phases never interleave.
//! - Simulation state depends only on the seed, the rules, and the observer
//!   path; wall-clock time never feeds the world.
//! - Configuration is validated before the first frame; a bad profile never
//!   starts generating.

mod config;
mod engine;

pub use config::EngineConfig;
pub use engine::{Engine, EngineError, EngineStats, FrameReport};

pub fn crate_info() -> &'static str {
    "wavegrid-engine v0.1.0"
}
