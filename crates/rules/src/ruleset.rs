use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use wavegrid_common::{Direction, TileSet, TileType};

/// Errors produced while building, loading, or validating a rule profile.
///
/// All of these are fatal: generation never starts on a malformed profile.
#[derive(Debug, Error)]
pub enum RuleSetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("rule profile has an empty tile alphabet")]
    EmptyAlphabet,
    #[error("duplicate alphabet entry: {0:?}")]
    DuplicateTile(TileType),
    #[error("weight for {tile:?} must be positive, got {weight}")]
    NonPositiveWeight { tile: TileType, weight: f32 },
    #[error("rule references {0:?}, which is not in the alphabet")]
    ForeignTile(TileType),
    #[error("{a:?} allows {b:?} to its {dir:?}, but {b:?} does not allow {a:?} back")]
    AsymmetricRule {
        a: TileType,
        dir: Direction,
        b: TileType,
    },
}

/// A validated rule profile: the tile alphabet, per-direction adjacency, and
/// spawn weights.
///
/// Lookup tables are dense arrays indexed by tile and direction; `allowed`
/// and `support` sit on the propagation hot path.
#[derive(Debug, Clone, PartialEq)]
pub struct TileRuleSet {
    name: String,
    alphabet: TileSet,
    allowed: [[TileSet; Direction::COUNT]; TileType::COUNT],
    weights: [f32; TileType::COUNT],
}

impl TileRuleSet {
    /// Profile name, for diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Every tile this profile generates. Fresh cells start from this set.
    pub fn alphabet(&self) -> TileSet {
        self.alphabet
    }

    /// Tiles permitted adjacent to `tile` in direction `dir`.
    pub fn allowed(&self, tile: TileType, dir: Direction) -> TileSet {
        self.allowed[tile.index()][dir.index()]
    }

    /// Tiles a neighbor whose candidates are `from` permits in direction
    /// `toward`: the union of the allowed sets of every candidate.
    pub fn support(&self, from: TileSet, toward: Direction) -> TileSet {
        let mut out = TileSet::EMPTY;
        for tile in from.iter() {
            out = out.union(self.allowed(tile, toward));
        }
        out
    }

    /// Spawn weight of `tile`. Zero for tiles outside the alphabet.
    pub fn weight(&self, tile: TileType) -> f32 {
        self.weights[tile.index()]
    }

    /// Check the profile invariants. Run on every construction path; a
    /// failure here must abort startup rather than surface mid-generation.
    pub fn validate(&self) -> Result<(), RuleSetError> {
        if self.alphabet.is_empty() {
            return Err(RuleSetError::EmptyAlphabet);
        }
        for tile in TileType::ALL {
            let row = &self.allowed[tile.index()];
            if !self.alphabet.contains(tile) {
                if row.iter().any(|set| !set.is_empty()) {
                    return Err(RuleSetError::ForeignTile(tile));
                }
                continue;
            }
            let weight = self.weights[tile.index()];
            if !(weight > 0.0) || !weight.is_finite() {
                return Err(RuleSetError::NonPositiveWeight { tile, weight });
            }
            for dir in Direction::ALL {
                let neighbors = row[dir.index()];
                if !neighbors.is_subset_of(self.alphabet) {
                    let foreign = neighbors
                        .iter()
                        .find(|t| !self.alphabet.contains(*t))
                        .unwrap_or(tile);
                    return Err(RuleSetError::ForeignTile(foreign));
                }
                for other in neighbors.iter() {
                    if !self.allowed(other, dir.opposite()).contains(tile) {
                        return Err(RuleSetError::AsymmetricRule {
                            a: tile,
                            dir,
                            b: other,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Parse a profile from YAML and validate it.
    pub fn from_yaml_str(text: &str) -> Result<Self, RuleSetError> {
        let spec: RuleSpec = serde_yaml::from_str(text)?;
        spec.into_ruleset()
    }

    /// Load a profile from a YAML file and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RuleSetError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let rules = Self::from_yaml_str(&text)?;
        tracing::info!(path = %path.display(), profile = rules.name(), "loaded rule profile");
        Ok(rules)
    }

    /// Render the profile as YAML, in the same schema `load` accepts.
    pub fn to_yaml_string(&self) -> Result<String, RuleSetError> {
        Ok(serde_yaml::to_string(&self.to_spec())?)
    }

    fn to_spec(&self) -> RuleSpec {
        let tiles = self
            .alphabet
            .iter()
            .map(|tile| TileSpec {
                tile,
                weight: self.weight(tile),
                north: self.allowed(tile, Direction::North).iter().collect(),
                east: self.allowed(tile, Direction::East).iter().collect(),
                south: self.allowed(tile, Direction::South).iter().collect(),
                west: self.allowed(tile, Direction::West).iter().collect(),
            })
            .collect();
        RuleSpec {
            name: self.name.clone(),
            tiles,
        }
    }
}

/// Incremental construction of a [`TileRuleSet`].
///
/// `allow` records an adjacency in both directions at once, so hand-built
/// tables cannot drift out of symmetry; `build` still validates everything.
#[derive(Debug, Clone)]
pub struct RuleSetBuilder {
    name: String,
    alphabet: TileSet,
    duplicates: Vec<TileType>,
    allowed: [[TileSet; Direction::COUNT]; TileType::COUNT],
    weights: [f32; TileType::COUNT],
}

impl RuleSetBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alphabet: TileSet::EMPTY,
            duplicates: Vec::new(),
            allowed: [[TileSet::EMPTY; Direction::COUNT]; TileType::COUNT],
            weights: [0.0; TileType::COUNT],
        }
    }

    /// Add `tile` to the alphabet with the given spawn weight.
    pub fn tile(mut self, tile: TileType, weight: f32) -> Self {
        if self.alphabet.contains(tile) {
            self.duplicates.push(tile);
        }
        self.alphabet.insert(tile);
        self.weights[tile.index()] = weight;
        self
    }

    /// Permit `b` adjacent to `a` in direction `dir`, and `a` adjacent to
    /// `b` in the opposite direction.
    pub fn allow(mut self, a: TileType, dir: Direction, b: TileType) -> Self {
        self.allowed[a.index()][dir.index()].insert(b);
        self.allowed[b.index()][dir.opposite().index()].insert(a);
        self
    }

    /// `allow` for several neighbors at once.
    pub fn allow_each(mut self, a: TileType, dir: Direction, neighbors: &[TileType]) -> Self {
        for &b in neighbors {
            self = self.allow(a, dir, b);
        }
        self
    }

    pub fn build(self) -> Result<TileRuleSet, RuleSetError> {
        if let Some(&tile) = self.duplicates.first() {
            return Err(RuleSetError::DuplicateTile(tile));
        }
        let rules = TileRuleSet {
            name: self.name,
            alphabet: self.alphabet,
            allowed: self.allowed,
            weights: self.weights,
        };
        rules.validate()?;
        Ok(rules)
    }
}

// Serde goes through the authored schema so an embedded profile (for example
// inside an engine config file) gets the same validation as a loaded one.
impl Serialize for TileRuleSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_spec().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TileRuleSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let spec = RuleSpec::deserialize(deserializer)?;
        spec.into_ruleset().map_err(serde::de::Error::custom)
    }
}

/// On-disk schema for rule profiles. Adjacency is authored per direction and
/// checked for symmetry after parsing, so a hand-edited file cannot smuggle
/// in a one-sided rule.
#[derive(Debug, Serialize, Deserialize)]
struct RuleSpec {
    name: String,
    tiles: Vec<TileSpec>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TileSpec {
    tile: TileType,
    weight: f32,
    #[serde(default)]
    north: Vec<TileType>,
    #[serde(default)]
    east: Vec<TileType>,
    #[serde(default)]
    south: Vec<TileType>,
    #[serde(default)]
    west: Vec<TileType>,
}

impl RuleSpec {
    fn into_ruleset(self) -> Result<TileRuleSet, RuleSetError> {
        let mut alphabet = TileSet::EMPTY;
        let mut allowed = [[TileSet::EMPTY; Direction::COUNT]; TileType::COUNT];
        let mut weights = [0.0; TileType::COUNT];

        for entry in &self.tiles {
            if alphabet.contains(entry.tile) {
                return Err(RuleSetError::DuplicateTile(entry.tile));
            }
            alphabet.insert(entry.tile);
            weights[entry.tile.index()] = entry.weight;

            let row = &mut allowed[entry.tile.index()];
            row[Direction::North.index()] = entry.north.iter().copied().collect();
            row[Direction::East.index()] = entry.east.iter().copied().collect();
            row[Direction::South.index()] = entry.south.iter().copied().collect();
            row[Direction::West.index()] = entry.west.iter().copied().collect();
        }

        let rules = TileRuleSet {
            name: self.name,
            alphabet,
            allowed,
            weights,
        };
        rules.validate()?;
        Ok(rules)
    }
}
