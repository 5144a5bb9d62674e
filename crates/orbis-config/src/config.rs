//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Deepest quadtree level the engine supports. Per-level statistics are
/// allocated up to this bound.
pub const MAX_SUPPORTED_QUAD_NODE_LEVEL: u8 = 30;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Quadtree level-of-detail policy.
    pub lod: LodConfig,
    /// Background worker pool used for splits and merges.
    pub workers: WorkerConfig,
    /// Planet and camera flight settings for the headless simulation.
    pub planet: PlanetConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Which cube-to-sphere projection maps patch centers onto the planet.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProjectionKind {
    /// Normalize the cube point and scale by the radius.
    #[default]
    Normalized,
    /// Everitt analytic mapping with better area uniformity.
    Everitt,
}

/// Split/merge policy for the planet quadtree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LodConfig {
    /// Hard ceiling on recursion depth. Nodes at this level never split.
    pub maximum_quad_node_level: u8,
    /// A visible leaf splits when its camera-distance-to-width ratio drops below this.
    pub split_ratio: f64,
    /// A branch merges when its camera-distance-to-width ratio rises above this.
    pub merge_ratio: f64,
    /// Projection used to place patch centers on the sphere.
    pub projection: ProjectionKind,
}

/// Background worker pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkerConfig {
    /// Number of worker threads. `0` picks one less than the CPU count.
    pub threads: usize,
    /// Maximum number of queued or running jobs.
    pub queue_budget: usize,
}

/// Planet configuration for the headless simulation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlanetConfig {
    /// Planet radius in meters.
    pub radius: f64,
    /// Closest camera altitude above the surface in meters.
    pub start_altitude: f64,
    /// Farthest camera altitude above the surface in meters.
    pub far_altitude: f64,
    /// Number of simulated frames for one descent-and-climb flight.
    pub frames: u32,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

// --- Default implementations ---

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            maximum_quad_node_level: 19,
            split_ratio: 1.0,
            merge_ratio: 1.2,
            projection: ProjectionKind::Normalized,
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            queue_budget: 256,
        }
    }
}

impl Default for PlanetConfig {
    fn default() -> Self {
        Self {
            radius: 6_000.0,
            start_altitude: 2.0,
            far_altitude: 60_000.0,
            frames: 240,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Default location of the config directory (`<os config dir>/orbis`).
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("orbis"))
}

// --- Load / Save / Reload / Validate ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            config.validate()?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join("config.ron");
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
        new_config.validate()?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }

    /// Check the values that the quadtree and worker pool rely on.
    #[allow(clippy::neg_cmp_op_on_partial_ord)]
    pub fn validate(&self) -> Result<(), ConfigError> {
        let lod = &self.lod;
        if lod.maximum_quad_node_level > MAX_SUPPORTED_QUAD_NODE_LEVEL {
            return Err(ConfigError::Invalid(format!(
                "lod.maximum_quad_node_level {} exceeds supported maximum {}",
                lod.maximum_quad_node_level, MAX_SUPPORTED_QUAD_NODE_LEVEL
            )));
        }
        if !(lod.split_ratio > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "lod.split_ratio must be positive, got {}",
                lod.split_ratio
            )));
        }
        // Equal thresholds would let a node oscillate every frame.
        if !(lod.merge_ratio > lod.split_ratio) {
            return Err(ConfigError::Invalid(format!(
                "lod.merge_ratio ({}) must be greater than lod.split_ratio ({})",
                lod.merge_ratio, lod.split_ratio
            )));
        }
        if self.workers.queue_budget < 4 {
            return Err(ConfigError::Invalid(format!(
                "workers.queue_budget must allow one full split (4 jobs), got {}",
                self.workers.queue_budget
            )));
        }
        if !(self.planet.radius > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "planet.radius must be positive, got {}",
                self.planet.radius
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(ron_str.contains("maximum_quad_node_level: 19"));
        assert!(ron_str.contains("queue_budget: 256"));
    }

    #[test]
    fn test_default_lod_thresholds() {
        let lod = LodConfig::default();
        assert_eq!(lod.split_ratio, 1.0);
        assert_eq!(lod.merge_ratio, 1.2);
        assert_eq!(lod.projection, ProjectionKind::Normalized);
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_field_uses_default() {
        let ron_str = "(lod: (maximum_quad_node_level: 12))";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.lod.maximum_quad_node_level, 12);
        assert_eq!(config.lod.merge_ratio, 1.2);
        assert_eq!(config.workers, WorkerConfig::default());
    }

    #[test]
    fn test_extra_field_ignored() {
        let ron_str = "(future_setting: true)";
        let result: Result<Config, _> = ron::from_str(ron_str);
        assert!(result.is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.lod.maximum_quad_node_level = 8;
        config.lod.projection = ProjectionKind::Everitt;
        config.workers.threads = 3;

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_or_create_writes_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join("config.ron").exists());
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.lod.merge_ratio = 1.5;
        modified.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert_eq!(result.unwrap().lod.merge_ratio, 1.5);
    }

    #[test]
    fn test_reload_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let result: Result<Config, _> = ron::from_str("{{not valid}}");
        assert!(result.is_err());
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_inverted_hysteresis_rejected() {
        let mut config = Config::default();
        config.lod.merge_ratio = 0.9;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.lod.merge_ratio = config.lod.split_ratio;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_level_ceiling_rejected() {
        let mut config = Config::default();
        config.lod.maximum_quad_node_level = MAX_SUPPORTED_QUAD_NODE_LEVEL + 1;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_tiny_queue_budget_rejected() {
        let mut config = Config::default();
        config.workers.queue_budget = 3;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.ron"),
            "(lod: (split_ratio: 2.0, merge_ratio: 1.0))",
        )
        .unwrap();
        let result = Config::load_or_create(dir.path());
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_ron_comments_preserved() {
        let ron_str = "// This is a comment\n(\n  // Another comment\n)";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config, Config::default());
    }
}
