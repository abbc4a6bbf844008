use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use wavegrid_common::{GridCoord, TileSet, TileType};
use wavegrid_kernel::{CollapseEvent, GridError, WorldEvent, WorldGrid};
use wavegrid_rules::TileRuleSet;

use crate::propagate::Propagator;

/// Entropy-ordered, budgeted collapse driver.
///
/// Each batch repeatedly picks the most constrained undecided cell in the
/// window, commits it to one tile, and propagates the consequences to
/// exhaustion before the next pick. The per-batch budget keeps a large
/// undecided window from stalling a frame; leftover cells simply wait for
/// the next batch.
///
/// The scheduler owns the world's only randomness. Both the tie-break among
/// equally constrained cells and the tile draw flow through one seeded
/// generator, so a fixed seed replays a fixed world.
#[derive(Debug)]
pub struct Scheduler {
    rng: SmallRng,
    budget: usize,
}

impl Scheduler {
    pub fn new(seed: u64, budget: usize) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            budget,
        }
    }

    /// Collapses permitted per batch.
    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Run one batch over the window around `center`: up to `budget`
    /// scheduled collapses, each propagated to exhaustion. Returns every
    /// collapse event the batch produced, contradiction fallbacks included.
    /// With nothing left to decide the batch is an idle no-op.
    pub fn step_batch(
        &mut self,
        grid: &mut WorldGrid,
        rules: &TileRuleSet,
        propagator: &Propagator,
        center: GridCoord,
        radius: i32,
    ) -> Result<Vec<CollapseEvent>, GridError> {
        let _span = tracing::info_span!("collapse_batch", ?center).entered();
        let log_start = grid.events().len();

        for _ in 0..self.budget {
            let Some((coord, candidates)) = self.lowest_entropy_pick(grid, center, radius) else {
                break;
            };
            let Some(tile) = self.weighted_draw(rules, candidates) else {
                // Unreachable while cell invariants hold: undecided cells
                // always keep at least one candidate.
                break;
            };
            tracing::trace!(?coord, ?tile, "collapsing cell");
            grid.collapse_cell(coord, tile)?;
            propagator.propagate(grid, rules, &[coord])?;
        }

        // The event log is the source of truth for what the batch decided,
        // fallback collapses raised mid-wave included.
        let events = grid.events()[log_start..]
            .iter()
            .filter_map(|event| match *event {
                WorldEvent::Collapsed {
                    coord,
                    tile,
                    rotation,
                } => Some(CollapseEvent {
                    coord,
                    tile,
                    rotation,
                }),
                _ => None,
            })
            .collect();
        Ok(events)
    }

    /// The window's lowest-entropy undecided cell, ties broken uniformly at
    /// random so generation carries no directional bias.
    fn lowest_entropy_pick(
        &mut self,
        grid: &WorldGrid,
        center: GridCoord,
        radius: i32,
    ) -> Option<(GridCoord, TileSet)> {
        let mut ties: Vec<(GridCoord, TileSet)> = Vec::new();
        let mut lowest = usize::MAX;

        // within() walks the window in coordinate order, so ties accumulate
        // in a stable sequence and the seeded pick below replays identically.
        for cell in grid.within(center, radius) {
            if cell.is_collapsed() {
                continue;
            }
            let entropy = cell.entropy();
            if entropy < lowest {
                lowest = entropy;
                ties.clear();
            }
            if entropy == lowest {
                ties.push((cell.coord(), cell.candidates()));
            }
        }

        if ties.is_empty() {
            None
        } else {
            Some(ties[self.rng.random_range(0..ties.len())])
        }
    }

    /// Draw a tile with probability `weight(t) / Σ weight(t')`, the sum
    /// running over `candidates` only: tiles ruled out earlier contribute
    /// nothing to the distribution of the remainder.
    fn weighted_draw(&mut self, rules: &TileRuleSet, candidates: TileSet) -> Option<TileType> {
        let total: f32 = candidates.iter().map(|tile| rules.weight(tile)).sum();
        if !(total > 0.0) {
            return None;
        }
        let mut roll = self.rng.random_range(0.0..total);
        for tile in candidates.iter() {
            let weight = rules.weight(tile);
            if roll < weight {
                return Some(tile);
            }
            roll -= weight;
        }
        // Floating-point residue can survive the walk; the last candidate
        // owns the tail of the interval.
        candidates.iter().last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use wavegrid_common::Direction::{East, North};
    use wavegrid_common::TileType::{Chest, FountainCenter, Ground, Tree};
    use wavegrid_rules::RuleSetBuilder;

    /// Four tiles, mutually compatible in every direction, with the weights
    /// the convergence test ratios are written against.
    fn permissive_rules() -> TileRuleSet {
        let tiles = [Ground, Tree, Chest, FountainCenter];
        let mut builder = RuleSetBuilder::new("permissive")
            .tile(Ground, 30.0)
            .tile(Tree, 20.0)
            .tile(Chest, 10.0)
            .tile(FountainCenter, 50.0);
        for a in tiles {
            for b in tiles {
                builder = builder.allow(a, North, b).allow(a, East, b);
            }
        }
        builder.build().unwrap()
    }

    fn block_grid(side: i32, rules: &TileRuleSet) -> WorldGrid {
        let mut grid = WorldGrid::new();
        for x in 0..side {
            for z in 0..side {
                grid.insert_cell(GridCoord::new(x, z), rules.alphabet())
                    .unwrap();
            }
        }
        grid
    }

    #[test]
    fn batch_stops_at_budget_and_resumes_next_call() {
        let rules = permissive_rules();
        let mut grid = block_grid(3, &rules);
        let propagator = Propagator::new(Ground);
        let mut scheduler = Scheduler::new(7, 4);
        let center = GridCoord::new(1, 1);

        let first = scheduler
            .step_batch(&mut grid, &rules, &propagator, center, 1)
            .unwrap();
        assert_eq!(first.len(), 4);

        let second = scheduler
            .step_batch(&mut grid, &rules, &propagator, center, 1)
            .unwrap();
        assert_eq!(second.len(), 4);

        let third = scheduler
            .step_batch(&mut grid, &rules, &propagator, center, 1)
            .unwrap();
        assert_eq!(third.len(), 1);

        // Fully decided window: the batch idles.
        let idle = scheduler
            .step_batch(&mut grid, &rules, &propagator, center, 1)
            .unwrap();
        assert!(idle.is_empty());
        assert_eq!(grid.collapse_count(), 9);
    }

    #[test]
    fn most_constrained_cell_goes_first() {
        let rules = permissive_rules();
        let mut grid = block_grid(3, &rules);
        let narrow = GridCoord::new(2, 2);
        let shrink = grid.shrink_candidates(narrow, [Tree, Chest].into_iter().collect());
        assert_eq!(shrink, wavegrid_kernel::Shrink::Shrunk(2));

        let propagator = Propagator::new(Ground);
        let mut scheduler = Scheduler::new(11, 1);
        let events = scheduler
            .step_batch(&mut grid, &rules, &propagator, GridCoord::new(1, 1), 1)
            .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].coord, narrow);
        assert!(matches!(events[0].tile, Tree | Chest));
    }

    #[test]
    fn singleton_candidates_collapse_to_their_only_tile() {
        let rules = permissive_rules();
        let mut grid = WorldGrid::new();
        let coord = GridCoord::new(0, 0);
        grid.insert_cell(coord, TileSet::singleton(Chest)).unwrap();

        let propagator = Propagator::new(Ground);
        let mut scheduler = Scheduler::new(0, 1);
        let events = scheduler
            .step_batch(&mut grid, &rules, &propagator, coord, 0)
            .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].tile, Chest);
        assert_eq!(events[0].rotation, Chest.rotation());
    }

    #[test]
    fn empty_window_is_an_idle_batch() {
        let rules = permissive_rules();
        let mut grid = block_grid(2, &rules);
        let propagator = Propagator::new(Ground);
        let mut scheduler = Scheduler::new(3, 8);

        // Negative radius means no window at all; nothing may collapse.
        let events = scheduler
            .step_batch(&mut grid, &rules, &propagator, GridCoord::new(0, 0), -1)
            .unwrap();
        assert!(events.is_empty());
        assert_eq!(grid.collapse_count(), 0);
    }

    #[test]
    fn fallback_collapses_ride_along_in_batch_events() {
        // Ground beside Ground, Tree beside Tree, never mixed.
        let rules = RuleSetBuilder::new("segregated")
            .tile(Ground, 1.0)
            .tile(Tree, 1.0)
            .allow(Ground, North, Ground)
            .allow(Ground, East, Ground)
            .allow(Tree, North, Tree)
            .allow(Tree, East, Tree)
            .build()
            .unwrap();

        let mut grid = WorldGrid::new();
        let a = GridCoord::new(0, 0);
        let b = GridCoord::new(1, 0);
        grid.insert_cell(a, TileSet::singleton(Ground)).unwrap();
        grid.insert_cell(b, TileSet::singleton(Tree)).unwrap();

        let propagator = Propagator::new(Ground);
        let mut scheduler = Scheduler::new(5, 1);
        let events = scheduler
            .step_batch(&mut grid, &rules, &propagator, GridCoord::new(0, 0), 1)
            .unwrap();

        // One scheduled collapse plus the contradiction fallback it forces on
        // the other cell: both appear in the batch's events.
        assert_eq!(events.len(), 2);
        assert_eq!(grid.contradiction_count(), 1);
        assert!(grid.get(a).unwrap().is_collapsed());
        assert!(grid.get(b).unwrap().is_collapsed());
    }

    #[test]
    fn identical_seeds_replay_identical_batches() {
        let rules = permissive_rules();
        let run = |seed: u64| -> Vec<CollapseEvent> {
            let mut grid = block_grid(4, &rules);
            let propagator = Propagator::new(Ground);
            let mut scheduler = Scheduler::new(seed, 4);
            let mut events = Vec::new();
            loop {
                let batch = scheduler
                    .step_batch(&mut grid, &rules, &propagator, GridCoord::new(1, 1), 3)
                    .unwrap();
                if batch.is_empty() {
                    break;
                }
                events.extend(batch);
            }
            events
        };

        let first = run(42);
        assert_eq!(first.len(), 16);
        assert_eq!(first, run(42));
    }

    #[test]
    fn draw_frequencies_track_renormalized_weights() {
        let rules = permissive_rules();
        let propagator = Propagator::new(Ground);
        let mut scheduler = Scheduler::new(2024, 100);

        let mut counts: HashMap<TileType, usize> = HashMap::new();
        let rounds = 200;
        let per_round = 100;
        for _ in 0..rounds {
            let mut grid = block_grid(10, &rules);
            let events = scheduler
                .step_batch(&mut grid, &rules, &propagator, GridCoord::new(4, 4), 5)
                .unwrap();
            assert_eq!(events.len(), per_round);
            for event in events {
                *counts.entry(event.tile).or_default() += 1;
            }
        }

        let total = (rounds * per_round) as f64;
        let share = |tile: TileType| counts.get(&tile).copied().unwrap_or(0) as f64 / total;
        // Weights 30:20:10:50 over a 110 total.
        assert!((share(Ground) - 30.0 / 110.0).abs() < 0.02, "{counts:?}");
        assert!((share(Tree) - 20.0 / 110.0).abs() < 0.02, "{counts:?}");
        assert!((share(Chest) - 10.0 / 110.0).abs() < 0.02, "{counts:?}");
        assert!(
            (share(FountainCenter) - 50.0 / 110.0).abs() < 0.02,
            "{counts:?}"
        );
    }
}
