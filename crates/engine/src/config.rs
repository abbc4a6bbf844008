use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use wavegrid_common::TileType;
use wavegrid_rules::{open_space, TileRuleSet};

use crate::engine::EngineError;

/// Engine tuning. The defaults reproduce the original world's feel: 9-unit
/// cells, a 17x17 window re-centered five times a second, four collapses per
/// frame.
///
/// Missing fields in a config file fall back to these defaults, so a file
/// can override just the seed or just the rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Edge length of one cell in world units.
    pub cell_size: f32,
    /// Chebyshev radius of the required window around the observer.
    pub window_radius: i32,
    /// How often the window re-centers on the observer.
    pub stream_interval_ms: u64,
    /// Extra rings a cell may drift outside the window before eviction.
    pub eviction_hysteresis: i32,
    /// Scheduled collapses per frame. Propagation fallout is not budgeted.
    pub max_collapses_per_frame: usize,
    /// Tile an emptied cell is forced to.
    pub fallback_tile: TileType,
    /// Seed for the single world generator.
    pub rng_seed: u64,
    /// Adjacency and weight profile.
    pub rules: TileRuleSet,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cell_size: 9.0,
            window_radius: 8,
            stream_interval_ms: 200,
            eviction_hysteresis: 2,
            max_collapses_per_frame: 4,
            fallback_tile: TileType::Ground,
            rng_seed: 0,
            rules: open_space(),
        }
    }
}

impl EngineConfig {
    /// Reject configurations the simulation cannot start from. Run by
    /// [`Engine::new`](crate::Engine::new) before anything is built.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.cell_size > 0.0) || !self.cell_size.is_finite() {
            return Err(EngineError::BadCellSize(self.cell_size));
        }
        if self.eviction_hysteresis < 0 {
            return Err(EngineError::NegativeHysteresis(self.eviction_hysteresis));
        }
        self.rules.validate()?;
        if !self.rules.alphabet().contains(self.fallback_tile) {
            return Err(EngineError::FallbackOutsideAlphabet(self.fallback_tile));
        }
        Ok(())
    }

    /// Parse a config from YAML and validate it.
    pub fn from_yaml_str(text: &str) -> Result<Self, EngineError> {
        let config: EngineConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a YAML file and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&text)?;
        tracing::info!(
            path = %path.display(),
            profile = config.rules.name(),
            "loaded engine config"
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use wavegrid_common::Direction;
    use wavegrid_rules::RuleSetBuilder;

    fn ground_only_rules() -> TileRuleSet {
        RuleSetBuilder::new("ground_only")
            .tile(TileType::Ground, 1.0)
            .allow(TileType::Ground, Direction::North, TileType::Ground)
            .allow(TileType::Ground, Direction::East, TileType::Ground)
            .build()
            .unwrap()
    }

    #[test]
    fn defaults_match_the_original_tuning() {
        let config = EngineConfig::default();
        assert_eq!(config.cell_size, 9.0);
        assert_eq!(config.window_radius, 8);
        assert_eq!(config.stream_interval_ms, 200);
        assert_eq!(config.eviction_hysteresis, 2);
        assert_eq!(config.max_collapses_per_frame, 4);
        assert_eq!(config.fallback_tile, TileType::Ground);
        assert_eq!(config.rng_seed, 0);
        assert_eq!(config.rules.name(), "open_space");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn bad_cell_size_is_rejected() {
        for cell_size in [0.0, -3.0, f32::NAN, f32::INFINITY] {
            let config = EngineConfig {
                cell_size,
                ..EngineConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(EngineError::BadCellSize(_))
            ));
        }
    }

    #[test]
    fn negative_hysteresis_is_rejected() {
        let config = EngineConfig {
            eviction_hysteresis: -1,
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EngineError::NegativeHysteresis(-1))
        ));
    }

    #[test]
    fn fallback_outside_the_alphabet_is_rejected() {
        let config = EngineConfig {
            rules: ground_only_rules(),
            fallback_tile: TileType::Chest,
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EngineError::FallbackOutsideAlphabet(TileType::Chest))
        ));
    }

    #[test]
    fn yaml_round_trip_preserves_the_config() {
        let config = EngineConfig {
            rng_seed: 99,
            window_radius: 3,
            rules: ground_only_rules(),
            ..EngineConfig::default()
        };
        let text = serde_yaml::to_string(&config).unwrap();
        let parsed = EngineConfig::from_yaml_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let parsed = EngineConfig::from_yaml_str("rng_seed: 7\nwindow_radius: 3\n").unwrap();
        assert_eq!(parsed.rng_seed, 7);
        assert_eq!(parsed.window_radius, 3);
        assert_eq!(parsed.cell_size, 9.0);
        assert_eq!(parsed.rules.name(), "open_space");
    }

    #[test]
    fn embedded_rule_profiles_are_validated() {
        let text = "\
rules:
  name: lopsided
  tiles:
    - tile: Ground
      weight: 1.0
      north: [Tree]
    - tile: Tree
      weight: 1.0
";
        let err = EngineConfig::from_yaml_str(text).unwrap_err();
        assert!(matches!(err, EngineError::Yaml(_)));
    }

    #[test]
    fn load_reads_config_from_disk() {
        let config = EngineConfig {
            rng_seed: 1234,
            ..EngineConfig::default()
        };
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_yaml::to_string(&config).unwrap().as_bytes())
            .unwrap();

        let loaded = EngineConfig::load(file.path()).unwrap();
        assert_eq!(loaded.rng_seed, 1234);
    }

    #[test]
    fn load_missing_file_is_an_io_error() {
        let err = EngineConfig::load("/nonexistent/engine.yml").unwrap_err();
        assert!(matches!(err, EngineError::Io(_)));
    }
}
