//! Shared vocabulary for the wavegrid workspace: grid coordinates, cardinal
//! directions, the tile alphabet, and possibility sets.
//!
//! # Invariants
//! - The tile alphabet is closed; variants and their rotations are compile-time facts.
//! - `TileSet` iteration follows alphabet order, so set-derived decisions are reproducible.

mod coord;
mod tile;

pub use coord::{Direction, GridCoord};
pub use tile::{Rotation, TileSet, TileType};

pub fn crate_info() -> &'static str {
    "wavegrid-common v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("common"));
    }
}
