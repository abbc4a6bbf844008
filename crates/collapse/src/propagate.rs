use std::collections::VecDeque;

use wavegrid_common::{Direction, GridCoord, TileType};
use wavegrid_kernel::{GridError, Shrink, WorldGrid};
use wavegrid_rules::TileRuleSet;

/// Summary of one propagation wave, for telemetry and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropagationReport {
    /// Cells whose candidate set shrank, contradiction resolutions included.
    pub revised: usize,
    /// Cells that emptied out and were force-collapsed to the fallback tile.
    pub contradictions: usize,
    /// Worklist pops, revisits included.
    pub visits: usize,
}

/// Worklist constraint propagation.
///
/// After a cell's candidates change, every reachable neighbor must again
/// satisfy the adjacency rules. A wave restores that: pop a coordinate,
/// intersect its candidates with the tiles each present neighbor still
/// supports, and push its neighbors whenever the set shrank. Breadth-first
/// over an explicit queue, so deep waves cannot overflow the stack.
///
/// The wave terminates because every revision strictly shrinks a finite set:
/// a cell is revised at most once per alphabet tile, and pops that change
/// nothing push nothing.
#[derive(Debug, Clone, Copy)]
pub struct Propagator {
    fallback: TileType,
}

impl Propagator {
    pub fn new(fallback: TileType) -> Self {
        Self { fallback }
    }

    /// Tile an emptied cell is forced to.
    pub fn fallback(&self) -> TileType {
        self.fallback
    }

    /// Propagate outward from `seeds` until no candidate set changes.
    ///
    /// A collapsed seed constrains its neighborhood (the scheduler's case);
    /// an uncollapsed seed is itself revised first, pulling constraints in
    /// from already-collapsed neighbors (the streamer's case for fresh
    /// cells). Absent seeds are skipped.
    ///
    /// A cell whose intersection empties is force-collapsed to the fallback
    /// tile; the grid records one `Contradiction` event plus the forced
    /// `Collapsed` event, and the wave continues through it.
    pub fn propagate(
        &self,
        grid: &mut WorldGrid,
        rules: &TileRuleSet,
        seeds: &[GridCoord],
    ) -> Result<PropagationReport, GridError> {
        let _span = tracing::info_span!("propagate", seeds = seeds.len()).entered();
        let mut report = PropagationReport::default();
        let mut worklist: VecDeque<GridCoord> = VecDeque::new();

        for &seed in seeds {
            let Some(cell) = grid.get(seed) else { continue };
            if !cell.is_collapsed() {
                worklist.push_back(seed);
            }
            push_undecided_neighbors(grid, seed, &mut worklist);
        }

        while let Some(coord) = worklist.pop_front() {
            report.visits += 1;
            let Some(cell) = grid.get(coord) else { continue };
            if cell.is_collapsed() {
                continue;
            }

            // Tiles every present neighbor still supports here: the union of
            // allowed(t, direction back toward this cell) over the neighbor's
            // candidates, intersected across neighbors.
            let mut allowed = rules.alphabet();
            for (dir, neighbor) in grid.neighbors(coord) {
                allowed =
                    allowed.intersection(rules.support(neighbor.candidates(), dir.opposite()));
            }

            match grid.shrink_candidates(coord, allowed) {
                Shrink::Unchanged => {}
                Shrink::Shrunk(remaining) => {
                    report.revised += 1;
                    tracing::trace!(?coord, remaining, "candidates narrowed");
                    push_undecided_neighbors(grid, coord, &mut worklist);
                }
                Shrink::Contradiction => {
                    report.revised += 1;
                    report.contradictions += 1;
                    grid.resolve_contradiction(coord, self.fallback)?;
                    // The forced tile constrains the neighborhood like any
                    // other collapse.
                    push_undecided_neighbors(grid, coord, &mut worklist);
                }
            }
        }

        tracing::debug!(
            revised = report.revised,
            contradictions = report.contradictions,
            "propagation wave settled"
        );
        Ok(report)
    }
}

fn push_undecided_neighbors(
    grid: &WorldGrid,
    coord: GridCoord,
    worklist: &mut VecDeque<GridCoord>,
) {
    for dir in Direction::ALL {
        let next = coord.neighbor(dir);
        if grid.get(next).is_some_and(|cell| !cell.is_collapsed()) {
            worklist.push_back(next);
        }
    }
}
