use crate::camera::CameraSettings;
use crate::light::Light;
use crate::orbit::OrbitSettings;
use crate::pipeline::PostSettings;
use crate::sky::SkyColors;
use glam::Vec3;
use orrery_input::KeyBindings;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Errors from loading or saving a [`SceneConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Orrery".into(),
            width: 1280,
            height: 720,
        }
    }
}

/// A light as written in a config file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LightConfig {
    Directional {
        direction: Vec3,
        color: Vec3,
        intensity: f32,
    },
    Point {
        position: Vec3,
        range: f32,
        color: Vec3,
        intensity: f32,
    },
    Spot {
        position: Vec3,
        direction: Vec3,
        range: f32,
        falloff: f32,
        color: Vec3,
        intensity: f32,
    },
}

impl LightConfig {
    pub fn to_light(self) -> Light {
        match self {
            LightConfig::Directional {
                direction,
                color,
                intensity,
            } => Light::directional(direction, color, intensity),
            LightConfig::Point {
                position,
                range,
                color,
                intensity,
            } => Light::point(position, range, color, intensity),
            LightConfig::Spot {
                position,
                direction,
                range,
                falloff,
                color,
                intensity,
            } => Light::spot(position, direction, range, falloff, color, intensity),
        }
    }
}

/// Everything a run of the renderer reads at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub window: WindowConfig,
    pub camera: CameraSettings,
    pub ambient: Vec3,
    pub lights: Vec<LightConfig>,
    /// Leading entries of `lights` the shaders evaluate.
    pub active_lights: usize,
    pub post: PostSettings,
    pub sky: SkyColors,
    pub bindings: KeyBindings,
    pub orbit: OrbitSettings,
}

impl Default for SceneConfig {
    fn default() -> Self {
        let white = Vec3::ONE;
        let lights = vec![
            LightConfig::Directional {
                direction: Vec3::NEG_Y,
                color: white,
                intensity: 0.0,
            },
            LightConfig::Directional {
                direction: Vec3::NEG_X,
                color: white,
                intensity: 0.0,
            },
            LightConfig::Point {
                position: Vec3::new(3.0, 3.0, 0.0),
                range: 0.0,
                color: white,
                intensity: 0.0,
            },
            LightConfig::Point {
                position: Vec3::new(-7.0, 1.7, -6.5),
                range: 0.0,
                color: white,
                intensity: 0.0,
            },
            // The sun.
            LightConfig::Point {
                position: Vec3::ZERO,
                range: 100.0,
                color: Vec3::new(1.0, 0.5, 0.8),
                intensity: 1.0,
            },
        ];
        Self {
            window: WindowConfig::default(),
            camera: CameraSettings::default(),
            ambient: Vec3::splat(0.5),
            active_lights: lights.len(),
            lights,
            post: PostSettings::default(),
            sky: SkyColors::default(),
            bindings: KeyBindings::default(),
            orbit: OrbitSettings::default(),
        }
    }
}

impl SceneConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path.as_ref())?;
        let config: Self = serde_json::from_reader(file)?;
        tracing::info!(path = %path.as_ref().display(), "loaded scene config");
        Ok(config)
    }

    /// Save the config to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.window.width as f32 / self.window.height.max(1) as f32
    }
}
