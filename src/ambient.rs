use crate::config::LightingConfig;
use crate::light_source::LightSource;

/// Slack for accumulated float error when deciding whether the target is
/// within one step.
const SNAP_EPSILON: f32 = 1e-5;

/// Moves `current` toward `target` by at most `step`, landing exactly on the
/// target once it is within reach.
pub fn step(current: f32, target: f32, step: f32) -> f32 {
    let delta = target - current;
    if delta.abs() <= step + SNAP_EPSILON {
        target
    } else {
        current + step.copysign(delta)
    }
}

/// Smoothed scene brightness driven by the active light sources.
#[derive(Clone, Debug, PartialEq)]
pub struct AmbientAggregator {
    base: f32,
    min: f32,
    max: f32,
    step: f32,
    current: f32,
    target: f32,
}

impl Default for AmbientAggregator {
    fn default() -> Self {
        Self::from_config(&LightingConfig::default())
    }
}

impl AmbientAggregator {
    pub fn from_config(config: &LightingConfig) -> Self {
        let base = config.base_ambient.clamp(0.0, 1.0);
        Self {
            base,
            min: config.min_ambient,
            max: config.max_ambient,
            step: config.transition_step,
            current: base,
            target: base,
        }
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn base(&self) -> f32 {
        self.base
    }

    pub fn set_base(&mut self, level: f32) {
        self.base = level.clamp(0.0, 1.0);
    }

    /// Sets the target from the active sources and returns it.
    pub fn recompute<'a, I>(&mut self, sources: I) -> f32
    where
        I: IntoIterator<Item = &'a LightSource>,
    {
        let contribution: f32 = sources
            .into_iter()
            .filter(|light| light.active)
            .map(|light| light.ambient)
            .sum();
        self.target = (self.base + contribution).clamp(self.min, self.max);
        self.target
    }

    /// One smoothing step toward the target.
    pub fn tick(&mut self) -> f32 {
        self.current = step(self.current, self.target, self.step);
        self.current
    }

    pub fn darkness(&self) -> f32 {
        1.0 - self.current
    }

    /// Steps needed to reach the target from the current value.
    pub fn steps_remaining(&self) -> u32 {
        ((self.target - self.current).abs() / self.step - 1e-3).ceil().max(0.0) as u32
    }
}
