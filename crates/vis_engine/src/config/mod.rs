//! # Configuration System
//!
//! Every subsystem reads its tunables from a serde structure so a viewer
//! session can be configured from a TOML or RON file. Defaults reproduce the
//! constants the camera, renderer and selection manager were tuned with.
//!
//! ## Configuration Categories
//!
//! - **Logging**: default log level
//! - **Camera**: initial orbit, fling and pan tuning, fixed frame, pan policy
//! - **Renderer**: clear color, per-layer failure isolation
//! - **Selection**: color pool growth

pub use serde::{Serialize, Deserialize};

use crate::camera::PanPolicy;
use crate::foundation::math::constants::PI;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let is_toml = path.ends_with(".toml");
        if !is_toml && !path.ends_with(".ron") {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        }

        let contents = std::fs::read_to_string(path)
            .map_err(ConfigError::Io)?;

        if is_toml {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, Default::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A value is outside its allowed range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level, overridden by `RUST_LOG`
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

/// # Camera Configuration
///
/// Initial orbit parameters and the tuning constants of the gesture model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    /// Frame treated as the rendering origin until changed at runtime
    pub default_fixed_frame: String,
    /// Initial orbit radius
    pub orbit_radius: f32,
    /// Initial polar angle in radians
    pub theta: f32,
    /// Initial azimuth in radians
    pub phi: f32,
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    /// Near clipping plane
    pub near: f32,
    /// Far clipping plane
    pub far: f32,
    /// Multiplicative fling decay applied once per frame
    pub fling_decay: f32,
    /// Fling velocities below this snap to zero
    pub min_fling_velocity: f32,
    /// Fling velocities are capped to this magnitude
    pub max_fling_velocity: f32,
    /// Per-call cap on screen-space pan deltas
    pub max_translate_speed: f32,
    /// Fraction of the tracked frame's translation used as look target
    pub target_tracking_scale: f32,
    /// Whether a screen-space pan releases the target frame lock
    pub pan_policy: PanPolicy,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            default_fixed_frame: "/world".to_string(),
            orbit_radius: 5.0,
            theta: PI / 4.0,
            phi: PI / 4.0,
            fov_degrees: 45.0,
            near: 0.1,
            far: 1000.0,
            fling_decay: 0.9,
            min_fling_velocity: 0.05,
            max_fling_velocity: 25.0,
            max_translate_speed: 0.18,
            target_tracking_scale: 0.5,
            pan_policy: PanPolicy::default(),
        }
    }
}

impl CameraConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_fixed_frame.trim_start_matches('/').is_empty() {
            return Err(ConfigError::Invalid("default fixed frame cannot be empty".to_string()));
        }
        if !(self.orbit_radius > 0.0) {
            return Err(ConfigError::Invalid(format!("orbit radius must be positive, got {}", self.orbit_radius)));
        }
        if !(self.fling_decay > 0.0 && self.fling_decay < 1.0) {
            return Err(ConfigError::Invalid(format!("fling decay must be in (0, 1), got {}", self.fling_decay)));
        }
        if self.min_fling_velocity < 0.0 || self.max_fling_velocity <= self.min_fling_velocity {
            return Err(ConfigError::Invalid("fling velocity bounds are inconsistent".to_string()));
        }
        if !(self.near > 0.0 && self.far > self.near) {
            return Err(ConfigError::Invalid("clipping planes must satisfy 0 < near < far".to_string()));
        }
        if !(self.fov_degrees > 0.0 && self.fov_degrees < 180.0) {
            return Err(ConfigError::Invalid(format!("field of view out of range: {}", self.fov_degrees)));
        }
        if self.max_translate_speed <= 0.0 {
            return Err(ConfigError::Invalid("max translate speed must be positive".to_string()));
        }
        Ok(())
    }
}

/// # Renderer Configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RendererConfig {
    /// RGBA clear color
    pub clear_color: [f32; 4],
    /// Keep drawing the remaining layers when one layer fails
    pub isolate_layer_failures: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            clear_color: [0.0, 0.0, 0.0, 0.0],
            isolate_layer_failures: true,
        }
    }
}

/// # Selection Configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SelectionConfig {
    /// Number of colors generated each time the free pool runs dry
    pub color_chunk_size: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self { color_chunk_size: 256 }
    }
}

impl SelectionConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.color_chunk_size == 0 {
            return Err(ConfigError::Invalid("color chunk size must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Top level configuration of a visualization session
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewerConfig {
    /// Logging settings
    pub logging: LoggingConfig,
    /// Camera settings
    pub camera: CameraConfig,
    /// Renderer settings
    pub renderer: RendererConfig,
    /// Selection settings
    pub selection: SelectionConfig,
}

impl Config for ViewerConfig {}

impl ViewerConfig {
    /// Validate every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.camera.validate()?;
        self.selection.validate()?;
        Ok(())
    }
}
