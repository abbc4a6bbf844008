//! Rule profiles: which tiles may sit beside which, and how often each spawns.
//!
//! # Invariants
//! - A `TileRuleSet` that exists has passed validation; consumers never see
//!   asymmetric tables, non-positive weights, or an empty alphabet.
//! - Adjacency is symmetric: if A allows B to its east, B allows A to its west.

mod open_space;
mod ruleset;

pub use open_space::open_space;
pub use ruleset::{RuleSetBuilder, RuleSetError, TileRuleSet};

pub fn crate_info() -> &'static str {
    "wavegrid-rules v0.1.0"
}
