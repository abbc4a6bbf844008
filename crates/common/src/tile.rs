use std::fmt;

use serde::{Deserialize, Serialize};

/// The closed tile alphabet.
///
/// Fountains are 3x3 structures assembled from a center, four corner pieces,
/// and four edge pieces. Corner and edge variants exist once per orientation
/// so adjacency rules can tell them apart; consumers reuse one mesh per piece
/// kind and apply [`TileType::rotation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TileType {
    Ground,
    Tree,
    Chest,
    FountainCenter,
    FountainCorner1,
    FountainCorner2,
    FountainCorner3,
    FountainCorner4,
    FountainEdge1,
    FountainEdge2,
    FountainEdge3,
    FountainEdge4,
}

impl TileType {
    pub const COUNT: usize = 12;

    pub const ALL: [TileType; TileType::COUNT] = [
        TileType::Ground,
        TileType::Tree,
        TileType::Chest,
        TileType::FountainCenter,
        TileType::FountainCorner1,
        TileType::FountainCorner2,
        TileType::FountainCorner3,
        TileType::FountainCorner4,
        TileType::FountainEdge1,
        TileType::FountainEdge2,
        TileType::FountainEdge3,
        TileType::FountainEdge4,
    ];

    /// Dense index within [`TileType::ALL`]; `TileSet` bit positions use it.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Orientation a consumer applies when instancing this tile's visual.
    ///
    /// Corner1 is the top-left (north-west) corner and the mesh is authored
    /// for the bottom-left, so the quarter turns below line the ring up.
    pub const fn rotation(self) -> Rotation {
        match self {
            TileType::FountainCorner1 | TileType::FountainEdge2 => Rotation::R90,
            TileType::FountainCorner2 | TileType::FountainEdge4 => Rotation::R180,
            TileType::FountainCorner4 | TileType::FountainEdge3 => Rotation::R270,
            _ => Rotation::R0,
        }
    }
}

/// Quarter-turn orientation around the vertical axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rotation {
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    pub const fn degrees(self) -> f32 {
        match self {
            Rotation::R0 => 0.0,
            Rotation::R90 => 90.0,
            Rotation::R180 => 180.0,
            Rotation::R270 => 270.0,
        }
    }

    pub fn radians(self) -> f32 {
        self.degrees().to_radians()
    }
}

/// A set of still-possible tiles, stored as a bitmask over the alphabet.
///
/// Possibility sets are the unit of work in constraint propagation, so they
/// want O(1) intersection and counting. Iteration walks bits in alphabet
/// order, which keeps every decision derived from a set reproducible.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileSet(u16);

impl TileSet {
    pub const EMPTY: TileSet = TileSet(0);

    /// Every tile in the alphabet.
    pub const FULL: TileSet = TileSet((1 << TileType::COUNT) - 1);

    pub const fn singleton(tile: TileType) -> Self {
        TileSet(1 << tile.index())
    }

    pub const fn contains(self, tile: TileType) -> bool {
        self.0 & (1 << tile.index()) != 0
    }

    pub fn insert(&mut self, tile: TileType) {
        self.0 |= 1 << tile.index();
    }

    pub fn remove(&mut self, tile: TileType) {
        self.0 &= !(1 << tile.index());
    }

    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn intersection(self, other: TileSet) -> TileSet {
        TileSet(self.0 & other.0)
    }

    pub const fn union(self, other: TileSet) -> TileSet {
        TileSet(self.0 | other.0)
    }

    pub const fn is_subset_of(self, other: TileSet) -> bool {
        self.0 & !other.0 == 0
    }

    /// Tiles in alphabet order.
    pub fn iter(self) -> impl Iterator<Item = TileType> {
        TileType::ALL
            .into_iter()
            .filter(move |t| self.contains(*t))
    }

    /// The sole member of a singleton set, if the set is one.
    pub fn single(self) -> Option<TileType> {
        if self.len() == 1 { self.iter().next() } else { None }
    }
}

impl FromIterator<TileType> for TileSet {
    fn from_iter<I: IntoIterator<Item = TileType>>(iter: I) -> Self {
        let mut set = TileSet::EMPTY;
        for tile in iter {
            set.insert(tile);
        }
        set
    }
}

impl fmt::Debug for TileSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
