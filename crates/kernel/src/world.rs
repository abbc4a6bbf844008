use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use wavegrid_common::{Direction, GridCoord, Rotation, TileSet, TileType};

use crate::cell::{Cell, Shrink};

/// An internal consistency fault: the caller violated a grid contract.
///
/// These never arise from world content. A duplicate insert or a collapse of
/// an absent cell means a bug upstream, so they surface as errors instead of
/// being absorbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("cell {0:?} is already resident")]
    DuplicateCell(GridCoord),
    #[error("cell {0:?} is not resident")]
    MissingCell(GridCoord),
    #[error("cell {0:?} is already collapsed")]
    AlreadyCollapsed(GridCoord),
    #[error("{tile:?} is not a candidate for cell {coord:?}")]
    NotACandidate { coord: GridCoord, tile: TileType },
}

/// An event record produced by every externally visible grid change.
///
/// The log is append-only and drained by consumers (render bridges,
/// telemetry). Collapse events are never emitted twice for a coordinate
/// while it stays resident; eviction forgets the coordinate entirely.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WorldEvent {
    /// A cell was decided, either by the scheduler or by contradiction
    /// fallback. `rotation` orients the visual for consumers.
    Collapsed {
        coord: GridCoord,
        tile: TileType,
        rotation: Rotation,
    },
    /// A cell's candidates emptied out; it was force-collapsed to the
    /// fallback tile. The paired `Collapsed` event follows immediately.
    Contradiction { coord: GridCoord },
    /// A cell left the retained window and was discarded.
    Evicted { coord: GridCoord },
}

/// A collapse decision in the shape consumers want it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollapseEvent {
    pub coord: GridCoord,
    pub tile: TileType,
    pub rotation: Rotation,
}

/// The authoritative grid: every resident cell, plus the event log.
///
/// All mutations go through explicit operations here so the cell invariants
/// and the event log cannot drift apart. Point lookups are hash-map O(1);
/// anything that needs a reproducible order sorts coordinates itself.
#[derive(Debug, Default)]
pub struct WorldGrid {
    cells: HashMap<GridCoord, Cell>,
    event_log: Vec<WorldEvent>,
    collapse_count: u64,
    contradiction_count: u64,
    eviction_count: u64,
}

impl WorldGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of resident cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, coord: GridCoord) -> bool {
        self.cells.contains_key(&coord)
    }

    pub fn get(&self, coord: GridCoord) -> Option<&Cell> {
        self.cells.get(&coord)
    }

    /// Coordinates of every resident cell, in map order. Callers that need a
    /// reproducible sequence sort the result.
    pub fn coords(&self) -> impl Iterator<Item = GridCoord> {
        self.cells.keys().copied()
    }

    /// Create an undecided cell with the given starting candidates.
    ///
    /// Inserting over a resident cell is a logic fault: streaming is the only
    /// creator and it checks residency first.
    pub fn insert_cell(&mut self, coord: GridCoord, candidates: TileSet) -> Result<(), GridError> {
        if self.cells.contains_key(&coord) {
            return Err(GridError::DuplicateCell(coord));
        }
        self.cells.insert(coord, Cell::new(coord, candidates));
        Ok(())
    }

    /// Remove a cell and record the eviction. Returns false if it was not
    /// resident, which streaming treats as a no-op.
    pub fn evict_cell(&mut self, coord: GridCoord) -> bool {
        if self.cells.remove(&coord).is_none() {
            return false;
        }
        self.eviction_count += 1;
        self.event_log.push(WorldEvent::Evicted { coord });
        true
    }

    /// The resident von-Neumann neighbors of `coord`, with the direction
    /// each one lies in.
    pub fn neighbors(&self, coord: GridCoord) -> impl Iterator<Item = (Direction, &Cell)> {
        Direction::ALL
            .into_iter()
            .filter_map(move |dir| self.cells.get(&coord.neighbor(dir)).map(|cell| (dir, cell)))
    }

    /// Resident cells within the square window of `radius` around `center`.
    /// A negative radius yields nothing.
    pub fn within(&self, center: GridCoord, radius: i32) -> impl Iterator<Item = &Cell> {
        (-radius..=radius).flat_map(move |dx| {
            (-radius..=radius)
                .filter_map(move |dz| self.cells.get(&GridCoord::new(center.x + dx, center.z + dz)))
        })
    }

    /// Intersect a cell's candidates with `allowed`. On `Contradiction` the
    /// cell is left as it was; callers follow up with
    /// [`WorldGrid::resolve_contradiction`].
    pub fn shrink_candidates(&mut self, coord: GridCoord, allowed: TileSet) -> Shrink {
        match self.cells.get_mut(&coord) {
            Some(cell) => cell.shrink(allowed),
            None => Shrink::Unchanged,
        }
    }

    /// Decide a cell. The tile must be one of its candidates and the cell
    /// must still be undecided; anything else is a logic fault upstream.
    pub fn collapse_cell(
        &mut self,
        coord: GridCoord,
        tile: TileType,
    ) -> Result<Rotation, GridError> {
        let cell = self
            .cells
            .get_mut(&coord)
            .ok_or(GridError::MissingCell(coord))?;
        if cell.is_collapsed() {
            return Err(GridError::AlreadyCollapsed(coord));
        }
        if !cell.candidates().contains(tile) {
            return Err(GridError::NotACandidate { coord, tile });
        }
        cell.collapse(tile);
        let rotation = tile.rotation();
        self.collapse_count += 1;
        self.event_log.push(WorldEvent::Collapsed {
            coord,
            tile,
            rotation,
        });
        Ok(rotation)
    }

    /// Resolve an emptied candidate set by force-collapsing to `fallback`.
    ///
    /// Records the contradiction once, then the collapse, regardless of
    /// whether `fallback` was still a candidate. Generation continues.
    pub fn resolve_contradiction(
        &mut self,
        coord: GridCoord,
        fallback: TileType,
    ) -> Result<Rotation, GridError> {
        let cell = self
            .cells
            .get_mut(&coord)
            .ok_or(GridError::MissingCell(coord))?;
        if cell.is_collapsed() {
            return Err(GridError::AlreadyCollapsed(coord));
        }
        tracing::warn!(?coord, ?fallback, "contradiction, forcing fallback tile");
        cell.collapse(fallback);
        let rotation = fallback.rotation();
        self.contradiction_count += 1;
        self.collapse_count += 1;
        self.event_log.push(WorldEvent::Contradiction { coord });
        self.event_log.push(WorldEvent::Collapsed {
            coord,
            tile: fallback,
            rotation,
        });
        Ok(rotation)
    }

    /// The decided tile at `coord`: `None` while absent or undecided.
    /// Read-only; external collaborators poll this between frames.
    pub fn tile_at(&self, coord: GridCoord) -> Option<TileType> {
        self.cells.get(&coord).and_then(|cell| cell.tile())
    }

    /// Drain and return the event log.
    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.event_log)
    }

    /// Read-only access to the undrained event log.
    pub fn events(&self) -> &[WorldEvent] {
        &self.event_log
    }

    /// Collapse operations performed over the grid's lifetime.
    pub fn collapse_count(&self) -> u64 {
        self.collapse_count
    }

    /// Contradictions resolved over the grid's lifetime.
    pub fn contradiction_count(&self) -> u64 {
        self.contradiction_count
    }

    /// Evictions performed over the grid's lifetime.
    pub fn eviction_count(&self) -> u64 {
        self.eviction_count
    }
}
