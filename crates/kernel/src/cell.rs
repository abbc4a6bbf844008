use wavegrid_common::{GridCoord, TileSet, TileType};

/// Outcome of intersecting a cell's candidates with an allowed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shrink {
    /// The allowed set already covered every candidate.
    Unchanged,
    /// Candidates were removed; the count is how many survived.
    Shrunk(usize),
    /// The intersection would be empty. The cell is left untouched; the
    /// caller resolves the contradiction.
    Contradiction,
}

/// One grid cell: either undecided with a set of candidate tiles, or
/// collapsed to a single tile.
///
/// Entropy is the candidate count, read straight off the set. Mutation goes
/// through the owning [`WorldGrid`](crate::WorldGrid) so the event log stays
/// complete.
#[derive(Debug, Clone)]
pub struct Cell {
    coord: GridCoord,
    collapsed: bool,
    tile: Option<TileType>,
    candidates: TileSet,
}

impl Cell {
    pub(crate) fn new(coord: GridCoord, candidates: TileSet) -> Self {
        Self {
            coord,
            collapsed: false,
            tile: None,
            candidates,
        }
    }

    pub fn coord(&self) -> GridCoord {
        self.coord
    }

    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    /// The decided tile, once collapsed.
    pub fn tile(&self) -> Option<TileType> {
        self.tile
    }

    /// Tiles this cell can still become.
    pub fn candidates(&self) -> TileSet {
        self.candidates
    }

    /// Number of remaining candidates. 1 for collapsed cells.
    pub fn entropy(&self) -> usize {
        self.candidates.len()
    }

    /// Intersect candidates with `allowed`. Collapsed cells never change.
    pub(crate) fn shrink(&mut self, allowed: TileSet) -> Shrink {
        if self.collapsed {
            return Shrink::Unchanged;
        }
        let next = self.candidates.intersection(allowed);
        if next == self.candidates {
            return Shrink::Unchanged;
        }
        if next.is_empty() {
            return Shrink::Contradiction;
        }
        self.candidates = next;
        Shrink::Shrunk(next.len())
    }

    pub(crate) fn collapse(&mut self, tile: TileType) {
        self.collapsed = true;
        self.tile = Some(tile);
        self.candidates = TileSet::singleton(tile);
    }
}
