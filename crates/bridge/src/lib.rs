//! Event consumption: the seam where generated world state leaves the core.
//!
//! # Invariants
//! - Bridges observe; world truth stays kernel-owned.
//! - Dispatch preserves event order.

mod bridge;

pub use bridge::{dispatch, DebugTextBridge, RenderBridge};

pub fn crate_info() -> &'static str {
    "wavegrid-bridge v0.1.0"
}
