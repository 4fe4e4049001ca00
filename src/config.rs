//! Tunables for world generation, lighting and weather.
//!
//! Every field has a default so a TOML file only needs to name what it
//! changes:
//!
//! ```toml
//! [world]
//! seed = 42
//!
//! [lighting]
//! max_ambient = 0.9
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub world: WorldConfig,
    pub lighting: LightingConfig,
    pub weather: WeatherConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub seed: u64,
    /// Square radius, in chunks, kept generated around the player.
    pub visible_radius: i32,
    /// Chunks farther than this (in chunks) may be evicted. `None` keeps
    /// everything that was ever generated.
    pub unload_radius: Option<i32>,
    /// Chance per chunk of a special structure.
    pub structure_chance: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 0x5A5A_1234,
            visible_radius: 2,
            unload_radius: None,
            structure_chance: 0.05,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    pub base_ambient: f32,
    pub min_ambient: f32,
    pub max_ambient: f32,
    /// Largest change of the smoothed ambient level per update.
    pub transition_step: f32,
    /// Frames between two light-source scans.
    pub scan_interval: u32,
    /// Objects farther than this from the player are never registered.
    pub detection_radius: f32,
    /// Floor of the darkness forwarded to the flashlight.
    pub min_darkness: f32,
    pub fog_enabled: bool,
    pub fog_density: f32,
    pub flashlight: Option<FlashlightConfig>,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            base_ambient: 0.2,
            min_ambient: 0.0,
            max_ambient: 0.8,
            transition_step: 0.05,
            scan_interval: 30,
            detection_radius: 300.0,
            min_darkness: 0.1,
            fog_enabled: true,
            fog_density: 0.04,
            flashlight: Some(FlashlightConfig::default()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlashlightConfig {
    pub range: f32,
    /// Full opening angle of the beam, radians.
    pub cone_angle: f32,
    pub intensity: f32,
    pub color: [u8; 3],
    pub battery: f32,
    /// Battery percent drained per second while on.
    pub drain_per_second: f32,
    /// Additional drain while the beam runs above 0.8 intensity.
    pub extra_drain_per_second: f32,
    /// Darkness the overlay starts at before any ambient update.
    pub darkness: f32,
}

impl Default for FlashlightConfig {
    fn default() -> Self {
        Self {
            range: 180.0,
            cone_angle: std::f32::consts::FRAC_PI_3,
            intensity: 0.85,
            color: [0xFF, 0xF6, 0xC8],
            battery: 100.0,
            drain_per_second: 0.48,
            extra_drain_per_second: 0.12,
            darkness: 0.6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// Per-tick chance of leaving `clear`.
    pub transition_chance: f64,
    pub view_width: f32,
    pub view_height: f32,
    pub spawn_per_tick: usize,
    pub max_leaves: usize,
    pub max_rain: usize,
    pub max_snow: usize,
    pub max_fog: usize,
    /// Normalized time of day (0..1). `None` disables the day/night factor.
    pub time_of_day: Option<f32>,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            transition_chance: 0.0003,
            view_width: 320.0,
            view_height: 180.0,
            spawn_per_tick: 5,
            max_leaves: 5,
            max_rain: 100,
            max_snow: 50,
            max_fog: 20,
            time_of_day: None,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        log::info!("loading config from {}", path.display());
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_seed(seed: u64) -> Self {
        let mut config = Self::default();
        config.world.seed = seed;
        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let lighting = &self.lighting;
        if self.world.visible_radius < 0 {
            return Err(ConfigError::Invalid("visible_radius must be >= 0".into()));
        }
        if let Some(unload) = self.world.unload_radius {
            if unload < self.world.visible_radius {
                return Err(ConfigError::Invalid(
                    "unload_radius must not be smaller than visible_radius".into(),
                ));
            }
        }
        if !(0.0..=1.0).contains(&self.world.structure_chance) {
            return Err(ConfigError::Invalid("structure_chance must be in 0..=1".into()));
        }
        if lighting.min_ambient > lighting.max_ambient {
            return Err(ConfigError::Invalid(format!(
                "min_ambient {} exceeds max_ambient {}",
                lighting.min_ambient, lighting.max_ambient
            )));
        }
        if lighting.transition_step <= 0.0 {
            return Err(ConfigError::Invalid("transition_step must be positive".into()));
        }
        if lighting.scan_interval == 0 {
            return Err(ConfigError::Invalid("scan_interval must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.weather.transition_chance) {
            return Err(ConfigError::Invalid("transition_chance must be in 0..=1".into()));
        }
        if self.weather.view_width <= 0.0 || self.weather.view_height <= 0.0 {
            return Err(ConfigError::Invalid("weather view must have a positive size".into()));
        }
        Ok(())
    }
}
