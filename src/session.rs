use std::path::Path;

use cgmath::Point2;

use crate::config::Config;
use crate::error::ConfigError;
use crate::darkness::{DarknessMask, View};
use crate::light_source::{LightConfig, LightId, WorldObject};
use crate::lighting::LightingSystem;
use crate::tile::Tile;
use crate::weather::{WeatherEngine, WeatherState};
use crate::world::{ChunkGenerator, ChunkPos, ChunkStore};

/// Everything the game loop talks to: the chunk store, lighting and weather,
/// advanced together once per frame.
pub struct GameSession {
    config: Config,
    world: ChunkStore,
    lighting: LightingSystem,
    weather: WeatherEngine,
    player: Point2<f32>,
}

impl GameSession {
    /// Fails if `config` does not pass [`Config::validate`].
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        let world = ChunkStore::from_config(&config.world);
        Ok(Self::with_store(config, world))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let config = Config::load(path)?;
        Ok(Self::new(config)?)
    }

    pub fn with_generator<G: ChunkGenerator + 'static>(
        config: Config,
        generator: G,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::with_store(config, ChunkStore::with_generator(generator)))
    }

    fn with_store(config: Config, world: ChunkStore) -> Self {
        let seed = config.world.seed;
        Self {
            lighting: LightingSystem::new(config.lighting.clone(), seed ^ 0x11_6417),
            weather: WeatherEngine::new(config.weather.clone(), seed.rotate_left(17)),
            world,
            player: Point2::new(0.0, 0.0),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn world(&self) -> &ChunkStore {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut ChunkStore {
        &mut self.world
    }

    pub fn lighting(&self) -> &LightingSystem {
        &self.lighting
    }

    pub fn lighting_mut(&mut self) -> &mut LightingSystem {
        &mut self.lighting
    }

    pub fn weather(&self) -> &WeatherEngine {
        &self.weather
    }

    pub fn weather_mut(&mut self) -> &mut WeatherEngine {
        &mut self.weather
    }

    pub fn player(&self) -> Point2<f32> {
        self.player
    }

    /// Generates the visible square around the player and, when an unload
    /// radius is configured, drops chunks beyond it.
    pub fn ensure_chunks_around_player(&mut self, px: f32, py: f32) -> usize {
        let created = self
            .world
            .ensure_chunks_around_player(px, py, self.config.world.visible_radius);
        if let Some(unload) = self.config.world.unload_radius {
            self.world.evict_distant(ChunkPos::from_world(px, py), unload);
        }
        created
    }

    pub fn tile_at(&self, wx: f32, wy: f32) -> Option<&Tile> {
        self.world.tile_at(wx, wy)
    }

    pub fn ambient_light(&self) -> f32 {
        self.lighting.ambient_level()
    }

    pub fn darkness(&self) -> f32 {
        self.lighting.darkness()
    }

    pub fn set_darkness(&mut self, level: f32) {
        self.lighting.set_darkness(level);
    }

    /// `None` when the kind is unknown; the error is logged by the registry.
    pub fn register_light_source(&mut self, config: &LightConfig) -> Option<LightId> {
        self.lighting.register(config).ok()
    }

    pub fn remove_light_source(&mut self, id: LightId) -> bool {
        self.lighting.remove(id)
    }

    pub fn weather_state(&self) -> WeatherState {
        self.weather.state()
    }

    /// Advances one frame of `dt` seconds with the player at `player` and
    /// `objects` around them.
    pub fn update(&mut self, dt: f32, player: Point2<f32>, objects: &[WorldObject]) {
        self.player = player;
        self.ensure_chunks_around_player(player.x, player.y);
        self.lighting.update(dt, player, objects);

        let flashlight_on = self.lighting.flashlight().map_or(false, |f| f.is_on());
        self.weather.set_player(player, flashlight_on);
        self.weather.set_ambient(Some(self.lighting.ambient_level()));
        self.weather.update(dt);
    }

    /// Darkness overlay for a view centred on the player.
    pub fn render_darkness(&self, mask: &mut DarknessMask) {
        let view = View::centered(
            self.player,
            self.config.weather.view_width,
            self.config.weather.view_height,
        );
        self.lighting.render_mask(mask, &view);
    }
}
