use cgmath::Point2;

use crate::ambient::AmbientAggregator;
use crate::config::LightingConfig;
use crate::darkness::{DarknessMask, View};
use crate::error::LightingError;
use crate::flashlight::Flashlight;
use crate::light_source::{
    LightConfig, LightId, LightSource, LightSourceRegistry, ScanReport, WorldObject,
};

/// Ties the light registry, the smoothed ambient level and the flashlight
/// together and runs them once per frame.
pub struct LightingSystem {
    config: LightingConfig,
    registry: LightSourceRegistry,
    ambient: AmbientAggregator,
    flashlight: Option<Flashlight>,
    manual_darkness: Option<f32>,
    frame: u64,
}

impl LightingSystem {
    pub fn new(config: LightingConfig, seed: u64) -> Self {
        let flashlight = match config.flashlight.clone() {
            Some(flashlight) => Some(Flashlight::new(flashlight, seed ^ 0xF1A5)),
            None => {
                log::warn!("No flashlight configured, darkness will not be forwarded");
                None
            }
        };
        Self {
            registry: LightSourceRegistry::new(config.detection_radius, seed),
            ambient: AmbientAggregator::from_config(&config),
            flashlight,
            manual_darkness: None,
            frame: 0,
            config,
        }
    }

    pub fn config(&self) -> &LightingConfig {
        &self.config
    }

    pub fn registry(&self) -> &LightSourceRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut LightSourceRegistry {
        &mut self.registry
    }

    pub fn ambient(&self) -> &AmbientAggregator {
        &self.ambient
    }

    pub fn ambient_mut(&mut self) -> &mut AmbientAggregator {
        &mut self.ambient
    }

    pub fn ambient_level(&self) -> f32 {
        self.ambient.current()
    }

    pub fn flashlight(&self) -> Option<&Flashlight> {
        self.flashlight.as_ref()
    }

    pub fn flashlight_mut(&mut self) -> Option<&mut Flashlight> {
        self.flashlight.as_mut()
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Darkness derived from the ambient level, before any override.
    pub fn ambient_darkness(&self) -> f32 {
        self.ambient.darkness().max(self.config.min_darkness).min(1.0)
    }

    /// Darkness the overlay should be drawn with.
    pub fn darkness(&self) -> f32 {
        match (&self.flashlight, self.manual_darkness) {
            (Some(flashlight), _) => flashlight.darkness(),
            (None, Some(level)) => level,
            (None, None) => self.ambient_darkness(),
        }
    }

    pub fn set_darkness(&mut self, level: f32) {
        let level = level.clamp(0.0, 1.0);
        match self.flashlight.as_mut() {
            Some(flashlight) => flashlight.set_darkness(level),
            None => self.manual_darkness = Some(level),
        }
    }

    pub fn clear_darkness_override(&mut self) {
        self.manual_darkness = None;
        if let Some(flashlight) = self.flashlight.as_mut() {
            flashlight.clear_darkness_override();
        }
    }

    pub fn register(&mut self, config: &LightConfig) -> Result<LightId, LightingError> {
        self.registry.register(config)
    }

    pub fn remove(&mut self, id: LightId) -> bool {
        self.registry.remove(id)
    }

    /// Scans now, regardless of the frame cadence, and retargets the ambient
    /// level.
    pub fn rescan(&mut self, player: Point2<f32>, objects: &[WorldObject]) -> ScanReport {
        let report = self.registry.scan(player, objects);
        self.ambient.recompute(self.registry.iter());
        if report.added + report.removed > 0 {
            log::debug!(
                "Light scan: +{} -{} ({} lights, ambient target {:.2})",
                report.added,
                report.removed,
                self.registry.len(),
                self.ambient.target()
            );
        }
        report
    }

    /// Advances one frame. Returns the scan report on frames that scanned.
    pub fn update(
        &mut self,
        dt: f32,
        player: Point2<f32>,
        objects: &[WorldObject],
    ) -> Option<ScanReport> {
        let interval = u64::from(self.config.scan_interval.max(1));
        let report = if self.frame % interval == 0 {
            Some(self.rescan(player, objects))
        } else {
            None
        };
        self.frame += 1;

        self.registry.update_flicker(dt);
        self.ambient.tick();

        let darkness = self.ambient_darkness();
        if let Some(flashlight) = self.flashlight.as_mut() {
            flashlight.set_position(player);
            flashlight.update(dt);
            flashlight.forward_darkness(darkness);
        }
        report
    }

    /// Active lights whose glow reaches into `view`.
    pub fn visible_lights<'a>(
        &'a self,
        view: &'a View,
    ) -> impl Iterator<Item = &'a LightSource> + 'a {
        self.registry
            .iter()
            .filter(move |light| light.active && view.touches(light.position, light.radius))
    }

    pub fn render_mask(&self, mask: &mut DarknessMask, view: &View) {
        let fog = self.config.fog_enabled.then_some(self.config.fog_density);
        mask.render(
            view,
            self.darkness(),
            self.visible_lights(view),
            self.flashlight.as_ref(),
            fog,
        );
    }
}
