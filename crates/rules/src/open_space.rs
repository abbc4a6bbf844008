use wavegrid_common::Direction::{East, North};
use wavegrid_common::TileType::{self, *};

use crate::ruleset::{RuleSetBuilder, TileRuleSet};

/// The built-in profile: open terrain dotted with trees, chests, and 3x3
/// fountains.
///
/// Adjacency is listed once per pair, northward or eastward; the builder
/// mirrors each entry. The fountain ring reads with corner 1 at the
/// north-west and edge 4 along the south, all outer faces meeting ground.
pub fn open_space() -> TileRuleSet {
    let decorative: [TileType; 3] = [Ground, Tree, Chest];

    let mut rules = RuleSetBuilder::new("open_space")
        .tile(Ground, 0.3)
        .tile(Tree, 0.2)
        .tile(Chest, 0.1)
        .tile(FountainCenter, 0.5)
        // Perimeter weights sit close together; the small offsets keep any
        // one piece from dominating partially constrained cells.
        .tile(FountainCorner1, 0.34567)
        .tile(FountainCorner2, 0.3456)
        .tile(FountainCorner3, 0.345)
        .tile(FountainCorner4, 0.34)
        .tile(FountainEdge1, 0.339)
        .tile(FountainEdge2, 0.338)
        .tile(FountainEdge3, 0.337)
        .tile(FountainEdge4, 0.336);

    // Open terrain mixes freely with itself.
    for a in decorative {
        for b in decorative {
            rules = rules.allow(a, North, b).allow(a, East, b);
        }
    }

    rules
        // Outer faces of the ring meet ground.
        .allow_each(Ground, North, &[FountainCorner3, FountainCorner4, FountainEdge4])
        .allow_each(Ground, East, &[FountainCorner1, FountainCorner3, FountainEdge3])
        .allow(FountainCorner1, North, Ground)
        .allow(FountainCorner2, North, Ground)
        .allow(FountainCorner2, East, Ground)
        .allow(FountainCorner4, East, Ground)
        .allow(FountainEdge1, North, Ground)
        .allow(FountainEdge2, East, Ground)
        // The center spans in both axes and meets its facing edges.
        .allow_each(FountainCenter, North, &[FountainEdge1, FountainCenter])
        .allow_each(FountainCenter, East, &[FountainEdge2, FountainCenter])
        // Edges extend along their own axis and close onto corners.
        .allow_each(FountainEdge1, East, &[FountainEdge1, FountainCorner2])
        .allow_each(FountainEdge2, North, &[FountainEdge2, FountainCorner2])
        .allow_each(FountainEdge3, North, &[FountainEdge3, FountainCorner1])
        .allow_each(FountainEdge4, East, &[FountainEdge4, FountainCorner4])
        // Interior seams: each edge backs onto the center or its opposite
        // edge, and corners meet the edges running past them.
        .allow_each(FountainEdge3, East, &[FountainCenter, FountainEdge2])
        .allow_each(FountainEdge4, North, &[FountainCenter, FountainEdge1])
        .allow_each(FountainCorner1, East, &[FountainEdge1, FountainCorner2])
        .allow_each(FountainCorner3, North, &[FountainEdge3, FountainCorner1])
        .allow_each(FountainCorner3, East, &[FountainEdge4, FountainCorner4])
        .allow_each(FountainCorner4, North, &[FountainEdge2, FountainCorner2])
        .build()
        .expect("open_space profile table is well-formed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wavegrid_common::Direction::{South, West};
    use wavegrid_common::{Direction, TileSet};

    #[test]
    fn profile_validates_and_covers_alphabet() {
        let rules = open_space();
        assert_eq!(rules.name(), "open_space");
        assert_eq!(rules.alphabet(), TileSet::FULL);
        assert!(rules.validate().is_ok());
    }

    #[test]
    fn weights_match_profile() {
        let rules = open_space();
        assert_eq!(rules.weight(Ground), 0.3);
        assert_eq!(rules.weight(Tree), 0.2);
        assert_eq!(rules.weight(Chest), 0.1);
        assert_eq!(rules.weight(FountainCenter), 0.5);
    }

    #[test]
    fn decorative_tiles_mingle_in_all_directions() {
        let rules = open_space();
        for dir in Direction::ALL {
            for a in [Ground, Tree, Chest] {
                for b in [Ground, Tree, Chest] {
                    assert!(rules.allowed(a, dir).contains(b), "{a:?} {dir:?} {b:?}");
                }
            }
        }
    }

    #[test]
    fn fountain_center_touches_only_fountain() {
        let rules = open_space();
        for dir in Direction::ALL {
            let neighbors = rules.allowed(FountainCenter, dir);
            assert!(!neighbors.contains(Ground));
            assert!(!neighbors.contains(Tree));
            assert!(neighbors.contains(FountainCenter));
        }
        // Each facing edge interfaces the center on the matching side.
        assert!(rules.allowed(FountainCenter, North).contains(FountainEdge1));
        assert!(rules.allowed(FountainCenter, East).contains(FountainEdge2));
        assert!(rules.allowed(FountainCenter, South).contains(FountainEdge4));
        assert!(rules.allowed(FountainCenter, West).contains(FountainEdge3));
    }

    #[test]
    fn corner_outer_faces_meet_ground() {
        let rules = open_space();
        // North-west corner: ground lies north and west of it.
        assert_eq!(
            rules.allowed(FountainCorner1, North),
            TileSet::singleton(Ground)
        );
        assert_eq!(
            rules.allowed(FountainCorner1, West),
            TileSet::singleton(Ground)
        );
        // Its inner faces continue the ring.
        assert!(rules.allowed(FountainCorner1, East).contains(FountainEdge1));
        assert!(rules.allowed(FountainCorner1, South).contains(FountainEdge3));
    }

    #[test]
    fn a_three_by_three_fountain_tiles_consistently() {
        let rules = open_space();
        // Row by row, west to east: the classic 3x3 assembly.
        let ring = [
            [FountainCorner1, FountainEdge1, FountainCorner2],
            [FountainEdge3, FountainCenter, FountainEdge2],
            [FountainCorner3, FountainEdge4, FountainCorner4],
        ];
        // rows run north (index 0) to south (index 2)
        for (r, row) in ring.iter().enumerate() {
            for (c, &tile) in row.iter().enumerate() {
                if c + 1 < 3 {
                    assert!(
                        rules.allowed(tile, East).contains(row[c + 1]),
                        "{tile:?} east {:?}",
                        row[c + 1]
                    );
                }
                if r + 1 < 3 {
                    assert!(
                        rules.allowed(tile, South).contains(ring[r + 1][c]),
                        "{tile:?} south {:?}",
                        ring[r + 1][c]
                    );
                }
            }
        }
    }
}
