//! Split/merge policy resolved from configuration.

use orbis_config::{LodConfig, ProjectionKind};
use orbis_cubesphere::ProjectionMethod;

/// Policy constants read by every node on every update.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LodSettings {
    /// Nodes at this level never split.
    pub maximum_quad_node_level: u8,
    /// Visible leaves split below this camera-distance-to-width ratio.
    pub split_ratio: f64,
    /// Branches merge above this camera-distance-to-width ratio.
    pub merge_ratio: f64,
    /// Projection used to place patch centers on the sphere.
    pub projection: ProjectionMethod,
}

impl Default for LodSettings {
    fn default() -> Self {
        Self::from(&LodConfig::default())
    }
}

impl From<&LodConfig> for LodSettings {
    fn from(config: &LodConfig) -> Self {
        Self {
            maximum_quad_node_level: config.maximum_quad_node_level,
            split_ratio: config.split_ratio,
            merge_ratio: config.merge_ratio,
            projection: match config.projection {
                ProjectionKind::Normalized => ProjectionMethod::Normalized,
                ProjectionKind::Everitt => ProjectionMethod::Everitt,
            },
        }
    }
}

impl LodSettings {
    /// Same policy with a different depth ceiling.
    #[must_use]
    pub fn with_maximum_level(self, maximum_quad_node_level: u8) -> Self {
        Self {
            maximum_quad_node_level,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_config_defaults() {
        let settings = LodSettings::default();
        assert_eq!(settings.maximum_quad_node_level, 19);
        assert_eq!(settings.split_ratio, 1.0);
        assert_eq!(settings.merge_ratio, 1.2);
        assert_eq!(settings.projection, ProjectionMethod::Normalized);
    }

    #[test]
    fn test_projection_kind_maps_to_method() {
        let config = LodConfig {
            projection: ProjectionKind::Everitt,
            ..LodConfig::default()
        };
        assert_eq!(LodSettings::from(&config).projection, ProjectionMethod::Everitt);
    }
}
