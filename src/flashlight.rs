use cgmath::{InnerSpace, MetricSpace, Point2, Vector2};
use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::config::FlashlightConfig;
use crate::tile::Rgb;

/// Battery percentage under which the beam starts cutting out.
pub const LOW_BATTERY: f32 = 20.0;
const FRAME: f32 = 1.0 / 60.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Facing {
    Up,
    Down,
    Left,
    Right,
}

impl Facing {
    /// Unit vector in screen space (y grows downward).
    pub fn vector(self) -> Vector2<f32> {
        match self {
            Facing::Up => Vector2::new(0.0, -1.0),
            Facing::Down => Vector2::new(0.0, 1.0),
            Facing::Left => Vector2::new(-1.0, 0.0),
            Facing::Right => Vector2::new(1.0, 0.0),
        }
    }
}

/// Battery-powered cone light carried by the player. Also owns the darkness
/// level of the overlay it is drawn into.
pub struct Flashlight {
    config: FlashlightConfig,
    on: bool,
    battery: f32,
    position: Point2<f32>,
    direction: Vector2<f32>,
    forwarded_darkness: f32,
    manual_darkness: Option<f32>,
    cut_out: f32,
    rng: SmallRng,
}

impl Flashlight {
    pub fn new(config: FlashlightConfig, seed: u64) -> Self {
        Self {
            battery: config.battery.clamp(0.0, 100.0),
            forwarded_darkness: config.darkness.clamp(0.0, 1.0),
            config,
            on: false,
            position: Point2::new(0.0, 0.0),
            direction: Facing::Down.vector(),
            manual_darkness: None,
            cut_out: 0.0,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn config(&self) -> &FlashlightConfig {
        &self.config
    }

    pub fn color(&self) -> Rgb {
        let [r, g, b] = self.config.color;
        Rgb::new(r, g, b)
    }

    pub fn battery(&self) -> f32 {
        self.battery
    }

    pub fn position(&self) -> Point2<f32> {
        self.position
    }

    pub fn direction(&self) -> Vector2<f32> {
        self.direction
    }

    /// Switched on and not currently cutting out.
    pub fn is_on(&self) -> bool {
        self.on && self.cut_out <= 0.0
    }

    pub fn is_switched_on(&self) -> bool {
        self.on
    }

    pub fn is_low_battery(&self) -> bool {
        self.battery < LOW_BATTERY
    }

    /// Returns the new state. Switching on with an empty battery is refused.
    pub fn toggle(&mut self) -> bool {
        if !self.on && self.battery <= 0.0 {
            log::info!("Flashlight battery is empty");
            return false;
        }
        self.on = !self.on;
        log::debug!(
            "Flashlight {} (battery {:.0}%)",
            if self.on { "on" } else { "off" },
            self.battery
        );
        self.on
    }

    pub fn recharge(&mut self, amount: f32) {
        self.battery = (self.battery + amount.max(0.0)).min(100.0);
    }

    pub fn set_position(&mut self, position: Point2<f32>) {
        self.position = position;
    }

    pub fn face(&mut self, facing: Facing) {
        self.direction = facing.vector();
    }

    /// Points the beam along `direction`. A zero vector is ignored.
    pub fn aim(&mut self, direction: Vector2<f32>) {
        if direction.magnitude2() > f32::EPSILON {
            self.direction = direction.normalize();
        }
    }

    /// Manual darkness override; wins over anything forwarded later.
    pub fn set_darkness(&mut self, level: f32) {
        self.manual_darkness = Some(level.clamp(0.0, 1.0));
    }

    pub fn clear_darkness_override(&mut self) {
        self.manual_darkness = None;
    }

    pub(crate) fn forward_darkness(&mut self, level: f32) {
        self.forwarded_darkness = level.clamp(0.0, 1.0);
    }

    pub fn darkness(&self) -> f32 {
        self.manual_darkness.unwrap_or(self.forwarded_darkness)
    }

    pub fn update(&mut self, dt: f32) {
        let dt = dt.max(0.0);
        if self.cut_out > 0.0 {
            self.cut_out -= dt;
        }
        if !self.on || self.battery <= 0.0 {
            return;
        }

        let mut drain = self.config.drain_per_second;
        if self.config.intensity > 0.8 {
            drain += self.config.extra_drain_per_second;
        }
        self.battery -= drain * dt;
        if self.battery <= 0.0 {
            self.battery = 0.0;
            self.on = false;
            self.cut_out = 0.0;
            log::info!("Flashlight battery ran out");
            return;
        }

        if self.is_low_battery() && self.cut_out <= 0.0 {
            // the emptier the battery, the more often it cuts out
            let chance = (LOW_BATTERY - self.battery) / LOW_BATTERY * 0.02 * (dt / FRAME);
            if self.rng.gen::<f32>() < chance {
                self.cut_out = self.rng.gen_range(3..=7) as f32 * FRAME;
            }
        }
    }

    /// Beam strength at `point`: linear falloff inside the cone, zero outside.
    pub fn illumination(&self, point: Point2<f32>) -> f32 {
        if !self.is_on() {
            return 0.0;
        }
        let distance = self.position.distance(point);
        if distance > self.config.range {
            return 0.0;
        }
        let falloff = self.config.intensity * (1.0 - distance / self.config.range);
        if distance < 1e-3 {
            return falloff;
        }
        let to_point = (point - self.position) / distance;
        let cos = to_point.dot(self.direction).clamp(-1.0, 1.0);
        if cos.acos() > self.config.cone_angle * 0.5 {
            return 0.0;
        }
        falloff
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flashlight() -> Flashlight {
        Flashlight::new(FlashlightConfig::default(), 1)
    }

    #[test]
    fn refuses_to_turn_on_without_battery() {
        let mut light = Flashlight::new(
            FlashlightConfig {
                battery: 0.0,
                ..FlashlightConfig::default()
            },
            1,
        );
        assert!(!light.toggle());
        assert!(!light.is_on());
        light.recharge(150.0);
        assert_eq!(light.battery(), 100.0);
        assert!(light.toggle());
    }

    #[test]
    fn drains_and_switches_off() {
        let mut light = flashlight();
        light.toggle();
        light.update(10.0);
        assert!((light.battery() - (100.0 - 6.0)).abs() < 1e-3);
        light.update(1000.0);
        assert_eq!(light.battery(), 0.0);
        assert!(!light.is_switched_on());
    }

    #[test]
    fn cone_and_range() {
        let mut light = flashlight();
        light.toggle();
        light.set_position(Point2::new(0.0, 0.0));
        light.face(Facing::Right);
        assert!((light.illumination(Point2::new(90.0, 0.0)) - 0.425).abs() < 1e-4);
        // 45 degrees off-axis is outside the 60 degree cone
        assert_eq!(light.illumination(Point2::new(50.0, 50.0)), 0.0);
        assert!(light.illumination(Point2::new(50.0, 20.0)) > 0.0);
        assert_eq!(light.illumination(Point2::new(200.0, 0.0)), 0.0);
        assert_eq!(light.illumination(Point2::new(-50.0, 0.0)), 0.0);
        light.toggle();
        assert_eq!(light.illumination(Point2::new(90.0, 0.0)), 0.0);
    }

    #[test]
    fn aim_normalizes_and_ignores_zero() {
        let mut light = flashlight();
        light.toggle();
        light.set_position(Point2::new(0.0, 0.0));
        light.aim(Vector2::new(0.0, 0.0));
        assert_eq!(light.direction(), Facing::Down.vector());
        light.aim(Vector2::new(30.0, 30.0));
        assert!((light.direction().magnitude() - 1.0).abs() < 1e-6);
        assert!(light.illumination(Point2::new(50.0, 50.0)) > 0.0);
        assert_eq!(light.illumination(Point2::new(90.0, 0.0)), 0.0);
    }

    #[test]
    fn manual_darkness_wins() {
        let mut light = flashlight();
        assert_eq!(light.darkness(), 0.6);
        light.forward_darkness(0.3);
        assert_eq!(light.darkness(), 0.3);
        light.set_darkness(1.7);
        light.forward_darkness(0.2);
        assert_eq!(light.darkness(), 1.0);
        light.clear_darkness_override();
        assert_eq!(light.darkness(), 0.2);
    }

    #[test]
    fn low_battery_cuts_out_sometimes() {
        let mut light = Flashlight::new(
            FlashlightConfig {
                battery: 1.0,
                drain_per_second: 0.0,
                extra_drain_per_second: 0.0,
                ..FlashlightConfig::default()
            },
            7,
        );
        light.toggle();
        let dark_frames = (0..5000)
            .filter(|_| {
                light.update(FRAME);
                !light.is_on()
            })
            .count();
        assert!(dark_frames > 0);
        assert!(dark_frames < 2500);
        assert!(light.is_switched_on());
    }
}
