//! Engine settings tree with the defaults the runtime ships with.

use super::Config;
use serde::{Deserialize, Serialize};

/// Top-level engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Window (render target) configuration
    pub window: WindowConfig,
    /// Scene graph behaviour
    pub scene: SceneConfig,
    /// Physics world parameters
    pub physics: PhysicsConfig,
    /// Renderer and light selection limits
    pub render: RenderConfig,
    /// Defaults applied to new cameras
    pub camera: CameraConfig,
    /// Asynchronous asset loading
    pub assets: AssetConfig,
    /// Logging setup
    pub logging: LoggingConfig,
}

impl Config for EngineConfig {}

/// Window configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window title
    pub title: String,
    /// Window width
    pub width: u32,
    /// Window height
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Scene Engine Application".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

/// What happens when a child is created with a name already used by a sibling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NamePolicy {
    /// Refuse to create the child
    #[default]
    Reject,
    /// Append `_1`, `_2`, ... until the name is free
    AutoSuffix,
}

/// Scene graph configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Sibling name collision policy
    pub name_policy: NamePolicy,
    /// Multiplier applied to every frame's delta time
    pub delta_scale: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            name_policy: NamePolicy::Reject,
            delta_scale: 1.0,
        }
    }
}

/// Physics world configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Gravity acceleration vector
    pub gravity: [f32; 3],
    /// Simulation ticks per second
    pub update_frequency: u32,
    /// Maximum ticks run in a single frame before time is dropped
    pub max_substeps: u32,
    /// Lock simulation to the XY plane
    pub planar: bool,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: [0.0, -9.81, 0.0],
            update_frequency: 50,
            max_substeps: 10,
            planar: false,
        }
    }
}

impl PhysicsConfig {
    /// Length of one simulation tick in seconds
    pub fn fixed_timestep(&self) -> f32 {
        1.0 / self.update_frequency.max(1) as f32
    }
}

/// Renderer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Maximum number of lights handed to one draw call
    pub max_lights_per_draw: usize,
    /// Per-draw limit for point lights
    pub max_point_lights: usize,
    /// Per-draw limit for directional lights
    pub max_directional_lights: usize,
    /// Per-draw limit for spot lights
    pub max_spot_lights: usize,
    /// Create culling colliders and skip drawables outside each camera's view
    pub culling: bool,
    /// Initial renderer mask
    pub mask: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_lights_per_draw: 8,
            max_point_lights: 8,
            max_directional_lights: 2,
            max_spot_lights: 2,
            culling: false,
            mask: 1,
        }
    }
}

/// Defaults for newly created cameras
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees
    pub field_of_view: f32,
    /// Perspective near plane
    pub perspective_near: f32,
    /// Perspective far plane
    pub perspective_far: f32,
    /// Orthographic near plane
    pub orthographic_near: f32,
    /// Orthographic far plane
    pub orthographic_far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            field_of_view: 80.0,
            perspective_near: 1.0,
            perspective_far: 9_999_999.0,
            orthographic_near: -1.0,
            orthographic_far: 1.0,
        }
    }
}

/// Asset loading configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Directories searched in order when resolving a relative path
    pub search_paths: Vec<String>,
    /// Number of background loader threads
    pub worker_threads: usize,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            search_paths: vec!["resources".to_string()],
            worker_threads: 2,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set
    pub default_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_filter: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigError, ConfigFormat};
    use std::path::Path;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults_match_runtime_constants() {
        let config = EngineConfig::default();

        assert_eq!(config.physics.update_frequency, 50);
        assert_relative_eq!(config.physics.fixed_timestep(), 0.02);
        assert_relative_eq!(config.physics.gravity[1], -9.81);
        assert_eq!(config.render.max_point_lights, 8);
        assert_eq!(config.render.max_directional_lights, 2);
        assert_eq!(config.scene.name_policy, NamePolicy::Reject);
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            [scene]
            name_policy = "AutoSuffix"

            [render]
            max_lights_per_draw = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.scene.name_policy, NamePolicy::AutoSuffix);
        assert_eq!(config.render.max_lights_per_draw, 4);
        assert_eq!(config.render.max_spot_lights, 2);
        assert_eq!(config.window.width, 1280);
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let err = EngineConfig::default().save_to_file("engine.json").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_ron_text_parses_into_engine_config() {
        let config = EngineConfig::parse("(physics: (update_frequency: 60), scene: (name_policy: AutoSuffix))", ConfigFormat::Ron)
            .unwrap();

        assert_eq!(config.physics.update_frequency, 60);
        assert_eq!(config.scene.name_policy, NamePolicy::AutoSuffix);
        assert_eq!(config.render.max_point_lights, 8);
    }

    #[test]
    fn test_format_follows_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("settings/engine.ron")).unwrap(), ConfigFormat::Ron);
        assert_eq!(ConfigFormat::from_path(Path::new("engine.toml")).unwrap(), ConfigFormat::Toml);
        assert!(ConfigFormat::from_path(Path::new("engine")).is_err());
    }
}
