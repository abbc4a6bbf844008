//! Streaming: keeps the window of resident cells centered on the observer.
//!
//! # Invariants
//! - After a tick, every cell within the window radius of the observer is
//!   resident.
//! - Cells are evicted only beyond the hysteresis band, never inside it.
//! - Ticks are idempotent: a stationary observer changes nothing.

mod streamer;

pub use streamer::{FrameTimer, StreamConfig, StreamDelta, StreamStats, Streamer};

pub fn crate_info() -> &'static str {
    "wavegrid-stream v0.1.0"
}
