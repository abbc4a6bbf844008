//! Grid kernel: authoritative cell state, the spatial index, and the event log.
//!
//! # Invariants
//! - All cell mutations flow through explicit `WorldGrid` operations.
//! - Candidate sets only shrink while a cell is resident; collapse pins them
//!   to a singleton. Contradiction resolution is the one sanctioned override.
//! - Every externally visible change appends exactly one event.

mod cell;
mod world;

pub use cell::{Cell, Shrink};
pub use world::{CollapseEvent, GridError, WorldGrid, WorldEvent};
