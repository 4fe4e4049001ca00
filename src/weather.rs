use std::f32::consts::{PI, TAU};
use std::fmt;

use cgmath::{MetricSpace, Point2, Vector2};
use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::config::WeatherConfig;
use crate::tile::Rgb;

/// Particles advance in fixed steps of this length.
pub const TICK: f32 = 1.0 / 60.0;
/// Particles this far outside the view are recycled.
const MARGIN: f32 = 10.0;
const DEFAULT_AMBIENT: f32 = 0.7;
const FLASHLIGHT_REACH: f32 = 100.0;
const FLASHLIGHT_BOOST: f32 = 0.9;

const RAIN_COLOR: Rgb = Rgb::from_u32(0x8BA7BC);
const FOG_COLOR: Rgb = Rgb::from_u32(0xE6E6FA);
const LEAF_GREEN: Rgb = Rgb::from_u32(0x5D9300);
const LEAF_RED: Rgb = Rgb::from_u32(0xFF7777);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WeatherKind {
    Clear,
    Rain,
    Snow,
    Fog,
}

impl WeatherKind {
    pub const ALL: [WeatherKind; 4] = [
        WeatherKind::Clear,
        WeatherKind::Rain,
        WeatherKind::Snow,
        WeatherKind::Fog,
    ];

    pub fn name(self) -> &'static str {
        match self {
            WeatherKind::Clear => "clear",
            WeatherKind::Rain => "rain",
            WeatherKind::Snow => "snow",
            WeatherKind::Fog => "fog",
        }
    }
}

impl fmt::Display for WeatherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WeatherState {
    pub kind: WeatherKind,
    pub wind: Vector2<f32>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParticleKind {
    Rain { length: f32 },
    Snow { wobble: f32, wobble_speed: f32 },
    Fog { opacity: f32 },
    Leaf { rotation: f32, spin: f32 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WeatherParticle {
    pub kind: ParticleKind,
    /// Screen position in view pixels.
    pub position: Point2<f32>,
    pub velocity: Vector2<f32>,
    pub size: f32,
    pub color: Rgb,
    pub wind_factor: f32,
    pub life: u32,
}

impl WeatherParticle {
    fn advance(&mut self, wind: Vector2<f32>) {
        self.position += self.velocity + wind * self.wind_factor;
        match &mut self.kind {
            ParticleKind::Snow {
                wobble,
                wobble_speed,
            } => {
                *wobble += *wobble_speed;
                self.position.x += wobble.sin() * 1.5 * 0.1;
            }
            ParticleKind::Leaf { rotation, spin } => *rotation += *spin,
            ParticleKind::Rain { .. } | ParticleKind::Fog { .. } => {}
        }
    }

    fn outside(&self, width: f32, height: f32) -> bool {
        self.position.x < -MARGIN
            || self.position.x > width + MARGIN
            || self.position.y < -MARGIN
            || self.position.y > height + MARGIN
    }
}

/// Full-screen tint drawn on top of the scene for the current weather.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Overlay {
    None,
    Fill {
        color: Rgb,
        alpha: f32,
    },
    Radial {
        center: Point2<f32>,
        inner_radius: f32,
        outer_radius: f32,
        color: Rgb,
        inner_alpha: f32,
        outer_alpha: f32,
    },
}

impl Overlay {
    /// Overlay alpha at a screen position.
    pub fn alpha_at(&self, point: Point2<f32>) -> f32 {
        match *self {
            Overlay::None => 0.0,
            Overlay::Fill { alpha, .. } => alpha,
            Overlay::Radial {
                center,
                inner_radius,
                outer_radius,
                inner_alpha,
                outer_alpha,
                ..
            } => {
                let d = center.distance(point);
                let t = ((d - inner_radius) / (outer_radius - inner_radius)).clamp(0.0, 1.0);
                inner_alpha + (outer_alpha - inner_alpha) * t
            }
        }
    }
}

pub struct WeatherEngine {
    config: WeatherConfig,
    kind: WeatherKind,
    wind: Vector2<f32>,
    particles: Vec<WeatherParticle>,
    rng: SmallRng,
    accumulator: f32,
    player: Point2<f32>,
    flashlight_on: bool,
    time_of_day: Option<f32>,
    ambient: Option<f32>,
}

impl WeatherEngine {
    pub fn new(config: WeatherConfig, seed: u64) -> Self {
        Self {
            time_of_day: config.time_of_day,
            config,
            kind: WeatherKind::Clear,
            wind: Vector2::new(0.0, 0.0),
            particles: Vec::new(),
            rng: SmallRng::seed_from_u64(seed),
            accumulator: 0.0,
            player: Point2::new(0.0, 0.0),
            flashlight_on: false,
            ambient: None,
        }
    }

    pub fn state(&self) -> WeatherState {
        WeatherState {
            kind: self.kind,
            wind: self.wind,
        }
    }

    pub fn kind(&self) -> WeatherKind {
        self.kind
    }

    pub fn particles(&self) -> &[WeatherParticle] {
        &self.particles
    }

    pub fn cap(&self, kind: WeatherKind) -> usize {
        match kind {
            WeatherKind::Clear => self.config.max_leaves,
            WeatherKind::Rain => self.config.max_rain,
            WeatherKind::Snow => self.config.max_snow,
            WeatherKind::Fog => self.config.max_fog,
        }
    }

    pub fn set_time_of_day(&mut self, time: Option<f32>) {
        self.time_of_day = time.map(|t| t.rem_euclid(1.0));
    }

    /// Where the player stands in the world and whether their flashlight is
    /// lit; both feed `tile_lighting`.
    pub fn set_player(&mut self, position: Point2<f32>, flashlight_on: bool) {
        self.player = position;
        self.flashlight_on = flashlight_on;
    }

    /// Ambient level used by `tile_lighting` when the caller passes none.
    pub fn set_ambient(&mut self, level: Option<f32>) {
        self.ambient = level;
    }

    pub fn ambient(&self) -> Option<f32> {
        self.ambient
    }

    /// Switches weather immediately. Particles of the old weather are dropped.
    pub fn force(&mut self, kind: WeatherKind) {
        if kind != self.kind {
            self.particles.clear();
            log::info!("Weather changed from {} to {kind}", self.kind);
        }
        self.kind = kind;
    }

    /// Runs as many fixed ticks as `dt` covers. Returns the tick count.
    pub fn update(&mut self, dt: f32) -> u32 {
        self.accumulator += dt.max(0.0);
        let mut ticks = 0;
        while self.accumulator >= TICK {
            self.accumulator -= TICK;
            self.tick();
            ticks += 1;
        }
        ticks
    }

    pub fn tick(&mut self) {
        let chance = self.config.transition_chance.clamp(0.0, 1.0);
        if self.kind == WeatherKind::Clear && self.rng.gen_bool(chance) {
            let next = WeatherKind::ALL[self.rng.gen_range(0..WeatherKind::ALL.len())];
            self.wind = Vector2::new(self.rng.gen_range(-0.1..0.1), self.rng.gen_range(0.0..0.1));
            self.force(next);
        }

        let (width, height) = (self.config.view_width, self.config.view_height);
        let wind = self.wind;
        let mut i = 0;
        while i < self.particles.len() {
            self.particles[i].advance(wind);
            if self.particles[i].outside(width, height) {
                let mut particle = self.particles[i];
                self.recycle(&mut particle);
                self.particles[i] = particle;
            }
            let particle = &mut self.particles[i];
            particle.life = particle.life.saturating_sub(1);
            if particle.life == 0 {
                self.particles.swap_remove(i);
            } else {
                i += 1;
            }
        }

        let room = self.cap(self.kind).saturating_sub(self.particles.len());
        for _ in 0..room.min(self.config.spawn_per_tick) {
            let particle = self.spawn(self.kind);
            self.particles.push(particle);
        }
    }

    fn spawn(&mut self, kind: WeatherKind) -> WeatherParticle {
        let (width, height) = (self.config.view_width, self.config.view_height);
        let rng = &mut self.rng;
        match kind {
            WeatherKind::Rain => WeatherParticle {
                kind: ParticleKind::Rain {
                    length: rng.gen_range(5.0..10.0),
                },
                position: Point2::new(rng.gen_range(-25.0..width + 25.0), -MARGIN),
                velocity: Vector2::new(rng.gen_range(-0.25..0.25), rng.gen_range(5.0..8.0)),
                size: 1.0,
                color: RAIN_COLOR,
                wind_factor: 0.3,
                life: 100,
            },
            WeatherKind::Snow => WeatherParticle {
                kind: ParticleKind::Snow {
                    wobble: rng.gen_range(0.0..TAU),
                    wobble_speed: rng.gen_range(-0.025..0.025),
                },
                position: Point2::new(rng.gen_range(0.0..width), -MARGIN),
                velocity: Vector2::new(rng.gen_range(-0.1..0.1), rng.gen_range(0.5..1.0)),
                size: rng.gen_range(1.0..3.0),
                color: Rgb::WHITE,
                wind_factor: 1.5,
                life: rng.gen_range(200..300),
            },
            WeatherKind::Fog => WeatherParticle {
                kind: ParticleKind::Fog {
                    opacity: rng.gen_range(0.1..0.2),
                },
                position: Point2::new(rng.gen_range(0.0..width), height - 20.0 + rng.gen_range(0.0..40.0)),
                velocity: Vector2::new(rng.gen_range(-0.05..0.05), -rng.gen_range(0.05..0.1)),
                size: rng.gen_range(20.0..50.0),
                color: FOG_COLOR,
                wind_factor: 0.8,
                life: rng.gen_range(300..500),
            },
            WeatherKind::Clear => WeatherParticle {
                kind: ParticleKind::Leaf {
                    rotation: rng.gen_range(0.0..TAU),
                    spin: rng.gen_range(-0.025..0.025),
                },
                position: Point2::new(-MARGIN, rng.gen_range(0.0..height)),
                velocity: Vector2::new(rng.gen_range(0.2..0.5), rng.gen_range(-0.1..0.1)),
                size: rng.gen_range(2.0..4.0),
                color: if rng.gen_bool(0.5) { LEAF_GREEN } else { LEAF_RED },
                wind_factor: 1.5,
                life: rng.gen_range(200..300),
            },
        }
    }

    fn recycle(&mut self, particle: &mut WeatherParticle) {
        let (width, height) = (self.config.view_width, self.config.view_height);
        let rng = &mut self.rng;
        match particle.kind {
            ParticleKind::Rain { .. } => {
                particle.position = Point2::new(rng.gen_range(0.0..width), -MARGIN);
                particle.life = 100;
            }
            ParticleKind::Snow { .. } => {
                particle.position = Point2::new(rng.gen_range(0.0..width), -MARGIN);
                particle.life = rng.gen_range(200..300);
            }
            ParticleKind::Fog { .. } => {
                particle.position = if rng.gen_bool(0.5) {
                    let x = if rng.gen_bool(0.5) { -MARGIN } else { width + MARGIN };
                    Point2::new(x, rng.gen_range(0.0..height))
                } else {
                    let y = if rng.gen_bool(0.5) { -MARGIN } else { height + MARGIN };
                    Point2::new(rng.gen_range(0.0..width), y)
                };
                particle.life = rng.gen_range(300..500);
            }
            ParticleKind::Leaf { .. } => {
                particle.position = Point2::new(-MARGIN, rng.gen_range(0.0..height));
                particle.life = rng.gen_range(200..300);
            }
        }
    }

    /// Light level of the tile at world pixel position `(wx, wy)`. An explicit
    /// `ambient` wins over the stored one; with neither, 0.7.
    pub fn tile_lighting(&self, wx: f32, wy: f32, ambient: Option<f32>) -> f32 {
        let mut level = ambient.or(self.ambient).unwrap_or(DEFAULT_AMBIENT);
        if let Some(time) = self.time_of_day {
            level *= (time * PI).sin().max(0.1);
        }
        if self.flashlight_on {
            let d = self.player.distance(Point2::new(wx, wy));
            if d < FLASHLIGHT_REACH {
                level += (1.0 - d / FLASHLIGHT_REACH) * FLASHLIGHT_BOOST;
            }
        }
        level.min(1.0)
    }

    /// Particle colour after lighting. Screen offsets from the view centre
    /// map to world offsets from the player at twice the scale.
    pub fn particle_tint(&self, particle: &WeatherParticle, ambient: Option<f32>) -> Rgb {
        let wx = self.player.x + (particle.position.x - self.config.view_width * 0.5) * 2.0;
        let wy = self.player.y + (particle.position.y - self.config.view_height * 0.5) * 2.0;
        particle.color.scaled(self.tile_lighting(wx, wy, ambient))
    }

    pub fn overlay(&self) -> Overlay {
        let (width, height) = (self.config.view_width, self.config.view_height);
        match self.kind {
            WeatherKind::Clear => Overlay::None,
            WeatherKind::Rain => Overlay::Fill {
                color: Rgb::new(20, 20, 50),
                alpha: 0.1,
            },
            WeatherKind::Snow => Overlay::Fill {
                color: Rgb::WHITE,
                alpha: 0.05,
            },
            WeatherKind::Fog => Overlay::Radial {
                center: Point2::new(width * 0.5, height * 0.5),
                inner_radius: 50.0,
                outer_radius: width * 0.8,
                color: Rgb::new(230, 230, 250),
                inner_alpha: 0.0,
                outer_alpha: 0.3,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> WeatherEngine {
        WeatherEngine::new(WeatherConfig::default(), 21)
    }

    #[test]
    fn rain_fills_to_cap_and_stays_there() {
        let mut weather = engine();
        weather.force(WeatherKind::Rain);
        let mut last = 0;
        for tick in 0..400 {
            weather.tick();
            let count = weather.particles().len();
            assert!(count <= 100);
            if tick < 20 {
                assert!(count >= last);
            }
            last = count;
        }
        assert!(weather.particles().len() >= 95);
        assert!(weather
            .particles()
            .iter()
            .all(|p| matches!(p.kind, ParticleKind::Rain { .. })));
    }

    #[test]
    fn changing_weather_drops_particles() {
        let mut weather = engine();
        weather.force(WeatherKind::Snow);
        for _ in 0..10 {
            weather.tick();
        }
        assert!(!weather.particles().is_empty());
        weather.force(WeatherKind::Fog);
        assert!(weather.particles().is_empty());
        weather.tick();
        assert!(weather
            .particles()
            .iter()
            .all(|p| matches!(p.kind, ParticleKind::Fog { .. })));
    }

    #[test]
    fn clear_keeps_a_few_leaves() {
        let mut weather = WeatherEngine::new(
            WeatherConfig {
                transition_chance: 0.0,
                ..WeatherConfig::default()
            },
            4,
        );
        for _ in 0..600 {
            weather.tick();
            assert!(weather.particles().len() <= 5);
        }
        assert_eq!(weather.kind(), WeatherKind::Clear);
        assert_eq!(weather.overlay(), Overlay::None);
    }

    #[test]
    fn clear_eventually_transitions_with_new_wind() {
        let mut weather = WeatherEngine::new(
            WeatherConfig {
                transition_chance: 1.0,
                ..WeatherConfig::default()
            },
            8,
        );
        let mut left_clear = false;
        for _ in 0..50 {
            weather.tick();
            if weather.kind() != WeatherKind::Clear {
                left_clear = true;
                break;
            }
        }
        assert!(left_clear);
        let wind = weather.state().wind;
        assert!((-0.1..0.1).contains(&wind.x));
        assert!((0.0..0.1).contains(&wind.y));
    }

    #[test]
    fn update_runs_fixed_ticks() {
        let mut weather = engine();
        assert_eq!(weather.update(0.5 * TICK), 0);
        assert_eq!(weather.update(0.6 * TICK), 1);
        assert_eq!(weather.update(10.0 * TICK + 1e-4), 10);
    }

    #[test]
    fn tile_lighting_rules() {
        let mut weather = engine();
        assert!((weather.tile_lighting(0.0, 0.0, None) - 0.7).abs() < 1e-6);
        assert!((weather.tile_lighting(0.0, 0.0, Some(0.4)) - 0.4).abs() < 1e-6);

        weather.set_time_of_day(Some(0.0));
        assert!((weather.tile_lighting(0.0, 0.0, Some(0.5)) - 0.05).abs() < 1e-6);
        weather.set_time_of_day(Some(0.5));
        assert!((weather.tile_lighting(0.0, 0.0, Some(0.5)) - 0.5).abs() < 1e-6);

        weather.set_player(Point2::new(10.0, 10.0), true);
        assert_eq!(weather.tile_lighting(10.0, 10.0, Some(0.5)), 1.0);
        let half = weather.tile_lighting(60.0, 10.0, Some(0.2));
        assert!((half - (0.2 + 0.45)).abs() < 1e-5);
        assert!((weather.tile_lighting(200.0, 10.0, Some(0.2)) - 0.2).abs() < 1e-6);
    }

    #[test]
    fn overlays() {
        let mut weather = engine();
        weather.force(WeatherKind::Rain);
        assert_eq!(
            weather.overlay(),
            Overlay::Fill {
                color: Rgb::new(20, 20, 50),
                alpha: 0.1
            }
        );
        weather.force(WeatherKind::Fog);
        let overlay = weather.overlay();
        assert_eq!(overlay.alpha_at(Point2::new(160.0, 90.0)), 0.0);
        assert!((overlay.alpha_at(Point2::new(160.0 + 256.0, 90.0)) - 0.3).abs() < 1e-5);
    }

    #[test]
    fn leaves_are_tinted_by_light() {
        let mut weather = engine();
        weather.set_player(Point2::new(0.0, 0.0), false);
        let leaf = WeatherParticle {
            kind: ParticleKind::Leaf {
                rotation: 0.0,
                spin: 0.0,
            },
            position: Point2::new(160.0, 90.0),
            velocity: Vector2::new(0.0, 0.0),
            size: 2.0,
            color: Rgb::new(200, 100, 0),
            wind_factor: 1.0,
            life: 10,
        };
        assert_eq!(weather.particle_tint(&leaf, Some(0.5)), Rgb::new(100, 50, 0));
    }

    fn still_engine(kind: WeatherKind) -> WeatherEngine {
        let mut weather = WeatherEngine::new(
            WeatherConfig {
                transition_chance: 0.0,
                spawn_per_tick: 0,
                ..WeatherConfig::default()
            },
            13,
        );
        weather.force(kind);
        weather
    }

    fn particle(kind: ParticleKind, x: f32, y: f32) -> WeatherParticle {
        WeatherParticle {
            kind,
            position: Point2::new(x, y),
            velocity: Vector2::new(0.0, 0.0),
            size: 1.0,
            color: Rgb::WHITE,
            wind_factor: 1.0,
            life: 1000,
        }
    }

    #[test]
    fn rain_and_snow_below_the_view_restart_at_the_top() {
        let drops = [
            (WeatherKind::Rain, ParticleKind::Rain { length: 6.0 }),
            (
                WeatherKind::Snow,
                ParticleKind::Snow {
                    wobble: 0.0,
                    wobble_speed: 0.0,
                },
            ),
        ];
        for (weather_kind, kind) in drops {
            let mut weather = still_engine(weather_kind);
            weather.particles.push(particle(kind, 100.0, 180.0 + 40.0));
            weather.particles.push(particle(kind, 50.0, 50.0));
            weather.tick();

            assert_eq!(weather.particles().len(), 2);
            let recycled = weather.particles()[0];
            assert_eq!(recycled.position.y, -MARGIN);
            assert!((0.0..320.0).contains(&recycled.position.x));
            assert_eq!(weather.particles()[1].position, Point2::new(50.0, 50.0));
        }
    }

    #[test]
    fn leaves_past_the_right_edge_restart_on_the_left() {
        let mut weather = still_engine(WeatherKind::Clear);
        let leaf = ParticleKind::Leaf {
            rotation: 0.0,
            spin: 0.1,
        };
        weather.particles.push(particle(leaf, 320.0 + 40.0, 90.0));
        weather.tick();

        assert_eq!(weather.particles().len(), 1);
        let recycled = weather.particles()[0];
        assert_eq!(recycled.position.x, -MARGIN);
        assert!((0.0..180.0).contains(&recycled.position.y));
        assert!((199..300).contains(&recycled.life));
    }

    #[test]
    fn fog_re_enters_on_an_edge() {
        let mut weather = still_engine(WeatherKind::Fog);
        for i in 0..12 {
            let x = if i % 2 == 0 { -60.0 } else { 400.0 };
            weather
                .particles
                .push(particle(ParticleKind::Fog { opacity: 0.1 }, x, 90.0));
        }
        weather.tick();

        assert_eq!(weather.particles().len(), 12);
        for p in weather.particles() {
            let Point2 { x, y } = p.position;
            let on_side = (x == -MARGIN || x == 320.0 + MARGIN) && (0.0..180.0).contains(&y);
            let on_cap = (y == -MARGIN || y == 180.0 + MARGIN) && (0.0..320.0).contains(&x);
            assert!(on_side || on_cap, "fog came back at ({x}, {y})");
        }
    }
}
