use std::collections::{BTreeMap, HashSet};
use std::fmt;

use cgmath::{MetricSpace, Point2};
use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::error::LightingError;
use crate::tile::Rgb;

/// Lights are considered relevant out to this multiple of their radius.
pub const NEARBY_FACTOR: f32 = 1.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LightId(u32);

impl fmt::Display for LightId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "light#{}", self.0)
    }
}

/// How a light is tied back to the object that produced it. Objects without
/// an id fall back to their name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKey {
    Id(ObjectId),
    Name(String),
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LightKind {
    Campfire,
    Torch,
    Lantern,
    Lamp,
    Window,
    Shadow,
    Ghost,
    Flashlight,
}

#[derive(Clone, Copy, Debug)]
struct LightKindInfo {
    name: &'static str,
    radius: f32,
    color: Rgb,
    intensity: f32,
    flicker: bool,
    flicker_amount: f32,
    ambient: f32,
}

const LIGHT_KIND_INFOS: [LightKindInfo; 8] = [
    LightKindInfo {
        name: "campfire",
        radius: 100.0,
        color: Rgb::from_u32(0xFF9933),
        intensity: 0.8,
        flicker: true,
        flicker_amount: 0.2,
        ambient: 0.4,
    },
    LightKindInfo {
        name: "torch",
        radius: 60.0,
        color: Rgb::from_u32(0xFFCC66),
        intensity: 0.7,
        flicker: true,
        flicker_amount: 0.3,
        ambient: 0.2,
    },
    LightKindInfo {
        name: "lantern",
        radius: 40.0,
        color: Rgb::from_u32(0xFFFFCC),
        intensity: 0.5,
        flicker: true,
        flicker_amount: 0.1,
        ambient: 0.1,
    },
    LightKindInfo {
        name: "lamp",
        radius: 80.0,
        color: Rgb::from_u32(0xFFFFFF),
        intensity: 0.7,
        flicker: false,
        flicker_amount: 0.0,
        ambient: 0.3,
    },
    LightKindInfo {
        name: "window",
        radius: 70.0,
        color: Rgb::from_u32(0xBBDDFF),
        intensity: 0.6,
        flicker: false,
        flicker_amount: 0.0,
        ambient: 0.25,
    },
    LightKindInfo {
        name: "shadow",
        radius: 30.0,
        color: Rgb::from_u32(0x6600CC),
        intensity: 0.4,
        flicker: true,
        flicker_amount: 0.3,
        ambient: 0.05,
    },
    LightKindInfo {
        name: "ghost",
        radius: 40.0,
        color: Rgb::from_u32(0x66CCFF),
        intensity: 0.5,
        flicker: true,
        flicker_amount: 0.2,
        ambient: 0.1,
    },
    LightKindInfo {
        name: "flashlight",
        radius: 80.0,
        color: Rgb::from_u32(0xFFFFCC),
        intensity: 0.8,
        flicker: true,
        flicker_amount: 0.1,
        ambient: 0.0,
    },
];

/// Checked in order, so the more specific words come first ("oil lamp"
/// must win over "lamp").
const KEYWORDS: &[(&str, LightKind)] = &[
    ("campfire", LightKind::Campfire),
    ("fogueira", LightKind::Campfire),
    ("fogo", LightKind::Campfire),
    ("fire", LightKind::Campfire),
    ("antorcha", LightKind::Torch),
    ("tocha", LightKind::Torch),
    ("torch", LightKind::Torch),
    ("lantern", LightKind::Lantern),
    ("lamparina", LightKind::Lantern),
    ("oil lamp", LightKind::Lantern),
    ("light bulb", LightKind::Lamp),
    ("lampada", LightKind::Lamp),
    ("lamp", LightKind::Lamp),
    ("janela", LightKind::Window),
    ("window", LightKind::Window),
    ("sombra", LightKind::Shadow),
    ("shadow", LightKind::Shadow),
    ("fantasma", LightKind::Ghost),
    ("ghost", LightKind::Ghost),
];

impl LightKind {
    pub const ALL: [LightKind; 8] = [
        LightKind::Campfire,
        LightKind::Torch,
        LightKind::Lantern,
        LightKind::Lamp,
        LightKind::Window,
        LightKind::Shadow,
        LightKind::Ghost,
        LightKind::Flashlight,
    ];

    fn info(self) -> &'static LightKindInfo {
        &LIGHT_KIND_INFOS[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }

    pub fn radius(self) -> f32 {
        self.info().radius
    }

    pub fn color(self) -> Rgb {
        self.info().color
    }

    pub fn intensity(self) -> f32 {
        self.info().intensity
    }

    pub fn flickers(self) -> bool {
        self.info().flicker
    }

    pub fn flicker_amount(self) -> f32 {
        self.info().flicker_amount
    }

    pub fn ambient_contribution(self) -> f32 {
        self.info().ambient
    }

    /// Exact, case-insensitive kind name.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }

    /// Guesses a kind from a free-form object name.
    pub fn from_keywords(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        KEYWORDS
            .iter()
            .find(|(word, _)| lower.contains(word))
            .map(|&(_, kind)| kind)
    }
}

impl fmt::Display for LightKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An object reported by the entity layer. Any field may be missing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WorldObject {
    pub id: Option<ObjectId>,
    pub name: Option<String>,
    pub position: Option<Point2<f32>>,
    pub light_kind: Option<LightKind>,
}

impl WorldObject {
    pub fn new(id: u64, name: &str, x: f32, y: f32) -> Self {
        Self {
            id: Some(ObjectId(id)),
            name: Some(name.to_string()),
            position: Some(Point2::new(x, y)),
            light_kind: None,
        }
    }

    pub fn with_kind(mut self, kind: LightKind) -> Self {
        self.light_kind = Some(kind);
        self
    }

    pub fn key(&self) -> Option<ObjectKey> {
        match (&self.id, &self.name) {
            (Some(id), _) => Some(ObjectKey::Id(*id)),
            (None, Some(name)) if !name.is_empty() => Some(ObjectKey::Name(name.clone())),
            _ => None,
        }
    }

    /// Typed tag first, then the name keywords.
    pub fn light_kind(&self) -> Option<LightKind> {
        self.light_kind
            .or_else(|| self.name.as_deref().and_then(LightKind::from_keywords))
    }
}

/// Request to register a light by kind name.
#[derive(Clone, Debug, PartialEq)]
pub struct LightConfig {
    pub kind: String,
    pub position: Point2<f32>,
    pub radius: Option<f32>,
    pub intensity: Option<f32>,
    pub color: Option<Rgb>,
}

impl LightConfig {
    pub fn new(kind: &str, x: f32, y: f32) -> Self {
        Self {
            kind: kind.to_string(),
            position: Point2::new(x, y),
            radius: None,
            intensity: None,
            color: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LightSource {
    pub id: LightId,
    pub kind: LightKind,
    pub position: Point2<f32>,
    pub radius: f32,
    pub color: Rgb,
    pub base_intensity: f32,
    /// Base intensity with flicker applied.
    pub intensity: f32,
    pub flicker: bool,
    pub flicker_amount: f32,
    pub flicker_phase: f32,
    pub flicker_speed: f32,
    pub ambient: f32,
    pub object: Option<ObjectKey>,
    pub active: bool,
}

impl LightSource {
    pub fn reaches(&self, point: Point2<f32>) -> bool {
        self.position.distance(point) <= self.radius * NEARBY_FACTOR
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub added: usize,
    pub removed: usize,
    pub skipped: usize,
}

pub struct LightSourceRegistry {
    lights: BTreeMap<LightId, LightSource>,
    next_id: u32,
    time: f32,
    detection_radius: f32,
    skipped_objects: usize,
    rng: SmallRng,
}

impl LightSourceRegistry {
    pub fn new(detection_radius: f32, seed: u64) -> Self {
        Self {
            lights: BTreeMap::new(),
            next_id: 0,
            time: 0.0,
            detection_radius,
            skipped_objects: 0,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    pub fn get(&self, id: LightId) -> Option<&LightSource> {
        self.lights.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LightSource> + '_ {
        self.lights.values()
    }

    /// Active lights whose reach covers `point`.
    pub fn nearby(&self, point: Point2<f32>) -> impl Iterator<Item = &LightSource> + '_ {
        self.lights
            .values()
            .filter(move |light| light.active && light.reaches(point))
    }

    /// Malformed objects skipped by every scan so far.
    pub fn skipped_objects(&self) -> usize {
        self.skipped_objects
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn register(&mut self, config: &LightConfig) -> Result<LightId, LightingError> {
        let Some(kind) = LightKind::from_name(&config.kind) else {
            let err = LightingError::UnknownLightKind(config.kind.clone());
            log::error!("{err}");
            return Err(err);
        };
        let id = self.insert(kind, config.position, config.radius, None);
        if let Some(light) = self.lights.get_mut(&id) {
            if let Some(intensity) = config.intensity {
                light.base_intensity = intensity.max(0.0);
                light.intensity = light.base_intensity;
            }
            if let Some(color) = config.color {
                light.color = color;
            }
        }
        Ok(id)
    }

    pub fn register_kind(
        &mut self,
        kind: LightKind,
        position: Point2<f32>,
        radius: Option<f32>,
    ) -> LightId {
        self.insert(kind, position, radius, None)
    }

    fn insert(
        &mut self,
        kind: LightKind,
        position: Point2<f32>,
        radius: Option<f32>,
        object: Option<ObjectKey>,
    ) -> LightId {
        let id = LightId(self.next_id);
        self.next_id += 1;
        let light = LightSource {
            id,
            kind,
            position,
            radius: radius.unwrap_or(kind.radius()).max(0.0),
            color: kind.color(),
            base_intensity: kind.intensity(),
            intensity: kind.intensity(),
            flicker: kind.flickers(),
            flicker_amount: kind.flicker_amount(),
            flicker_phase: self.rng.gen_range(0.0..std::f32::consts::TAU),
            flicker_speed: 2.0 + self.rng.gen::<f32>(),
            ambient: kind.ambient_contribution(),
            object,
            active: true,
        };
        log::debug!("Registered {kind} {id} at ({}, {})", position.x, position.y);
        self.lights.insert(id, light);
        id
    }

    pub fn remove(&mut self, id: LightId) -> bool {
        self.lights.remove(&id).is_some()
    }

    pub fn set_position(&mut self, id: LightId, position: Point2<f32>) -> bool {
        match self.lights.get_mut(&id) {
            Some(light) => {
                light.position = position;
                true
            }
            None => false,
        }
    }

    pub fn set_active(&mut self, id: LightId, active: bool) -> bool {
        match self.lights.get_mut(&id) {
            Some(light) => {
                light.active = active;
                true
            }
            None => false,
        }
    }

    /// Reconciles object-bound lights with the objects currently near the
    /// player. Lights added through `register` are never touched here.
    pub fn scan(&mut self, player: Point2<f32>, objects: &[WorldObject]) -> ScanReport {
        let mut report = ScanReport::default();
        let present: HashSet<ObjectKey> = objects.iter().filter_map(WorldObject::key).collect();

        let before = self.lights.len();
        self.lights.retain(|_, light| match &light.object {
            Some(key) => present.contains(key),
            None => true,
        });
        report.removed = before - self.lights.len();

        for object in objects {
            let Some(key) = object.key() else {
                log::debug!("Skipping object: {}", LightingError::MissingIdentity);
                report.skipped += 1;
                continue;
            };
            let Some(position) = object.position else {
                let label = object.name.clone().unwrap_or_else(|| format!("{key:?}"));
                log::debug!("Skipping object: {}", LightingError::MissingPosition(label));
                report.skipped += 1;
                continue;
            };

            if let Some(light) = self
                .lights
                .values_mut()
                .find(|light| light.object.as_ref() == Some(&key))
            {
                light.position = position;
                continue;
            }

            if position.distance(player) > self.detection_radius {
                continue;
            }
            if let Some(kind) = object.light_kind() {
                self.insert(kind, position, None, Some(key));
                report.added += 1;
            }
        }

        self.skipped_objects += report.skipped;
        report
    }

    pub fn total_ambient(&self) -> f32 {
        self.lights
            .values()
            .filter(|light| light.active)
            .map(|light| light.ambient)
            .sum()
    }

    /// Advances the flicker clock by `dt` seconds.
    pub fn update_flicker(&mut self, dt: f32) {
        self.time += dt.max(0.0);
        let time = self.time;
        for light in self.lights.values_mut() {
            if !light.flicker {
                light.intensity = light.base_intensity;
                continue;
            }
            let noise: f32 = self.rng.gen();
            light.intensity = flicker_intensity(light, time, noise);
        }
    }
}

pub fn flicker_intensity(light: &LightSource, time: f32, noise: f32) -> f32 {
    let a = light.flicker_amount;
    let t = (time + light.flicker_phase) * light.flicker_speed;
    let wave = a * t.sin() * 0.5 + a * (t * 2.5).sin() * 0.3 + a * noise * 0.2;
    (light.base_intensity * (1.0 + wave)).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> LightSourceRegistry {
        LightSourceRegistry::new(300.0, 17)
    }

    #[test]
    fn keyword_fallback() {
        assert_eq!(LightKind::from_keywords("Old Campfire"), Some(LightKind::Campfire));
        assert_eq!(LightKind::from_keywords("fogueira"), Some(LightKind::Campfire));
        assert_eq!(LightKind::from_keywords("Tocha de parede"), Some(LightKind::Torch));
        assert_eq!(LightKind::from_keywords("rusty oil lamp"), Some(LightKind::Lantern));
        assert_eq!(LightKind::from_keywords("lamparina"), Some(LightKind::Lantern));
        assert_eq!(LightKind::from_keywords("street lamp"), Some(LightKind::Lamp));
        assert_eq!(LightKind::from_keywords("janela"), Some(LightKind::Window));
        assert_eq!(LightKind::from_keywords("Fantasma"), Some(LightKind::Ghost));
        assert_eq!(LightKind::from_keywords("barrel"), None);
    }

    #[test]
    fn typed_kind_wins_over_name() {
        let object = WorldObject::new(1, "torch", 0.0, 0.0).with_kind(LightKind::Ghost);
        assert_eq!(object.light_kind(), Some(LightKind::Ghost));
    }

    #[test]
    fn register_rejects_unknown_kind() {
        let mut lights = registry();
        let err = lights.register(&LightConfig::new("plasma", 0.0, 0.0)).unwrap_err();
        assert_eq!(err, LightingError::UnknownLightKind("plasma".into()));
        assert!(lights.is_empty());

        let mut config = LightConfig::new("Torch", 4.0, 5.0);
        config.radius = Some(90.0);
        let id = lights.register(&config).unwrap();
        let light = lights.get(id).unwrap();
        assert_eq!(light.kind, LightKind::Torch);
        assert_eq!(light.radius, 90.0);
        assert_eq!(light.ambient, 0.2);
    }

    #[test]
    fn scan_adds_and_removes_bound_lights() {
        let mut lights = registry();
        let player = Point2::new(0.0, 0.0);
        let manual = lights.register_kind(LightKind::Lamp, Point2::new(1.0, 1.0), None);

        let objects = vec![
            WorldObject::new(1, "campfire", 10.0, 0.0),
            WorldObject::new(2, "torch", 0.0, 20.0),
            WorldObject::new(3, "crate", 5.0, 5.0),
            WorldObject::new(4, "torch", 1000.0, 0.0),
        ];
        let report = lights.scan(player, &objects);
        assert_eq!(report.added, 2);
        assert_eq!(lights.len(), 3);

        let report = lights.scan(player, &objects[1..]);
        assert_eq!(report.removed, 1);
        assert_eq!(report.added, 0);
        assert_eq!(lights.len(), 2);
        assert!(lights.iter().all(|l| l.kind != LightKind::Campfire));
        assert!(lights.get(manual).is_some());
    }

    #[test]
    fn scan_skips_malformed_objects() {
        let mut lights = registry();
        let objects = vec![
            WorldObject {
                position: Some(Point2::new(0.0, 0.0)),
                ..WorldObject::default()
            },
            WorldObject {
                id: Some(ObjectId(9)),
                name: Some("torch".into()),
                ..WorldObject::default()
            },
            WorldObject {
                name: Some("ghost".into()),
                position: Some(Point2::new(3.0, 3.0)),
                ..WorldObject::default()
            },
        ];
        let report = lights.scan(Point2::new(0.0, 0.0), &objects);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.added, 1);
        assert_eq!(lights.skipped_objects(), 2);
    }

    #[test]
    fn nearby_uses_reach_and_active_flag() {
        let mut lights = registry();
        let torch = lights.register_kind(LightKind::Torch, Point2::new(0.0, 0.0), None);
        assert_eq!(lights.nearby(Point2::new(89.0, 0.0)).count(), 1);
        assert_eq!(lights.nearby(Point2::new(91.0, 0.0)).count(), 0);
        lights.set_active(torch, false);
        assert_eq!(lights.nearby(Point2::new(0.0, 0.0)).count(), 0);
        assert_eq!(lights.total_ambient(), 0.0);
    }

    #[test]
    fn flicker_stays_near_base() {
        let mut lights = registry();
        let fire = lights.register_kind(LightKind::Campfire, Point2::new(0.0, 0.0), None);
        let lamp = lights.register_kind(LightKind::Lamp, Point2::new(0.0, 0.0), None);
        let mut changed = false;
        for _ in 0..120 {
            lights.update_flicker(1.0 / 60.0);
            let fire = lights.get(fire).unwrap();
            // amplitude 0.2 bounds the swing to 1 +/- 0.2
            assert!(fire.intensity >= 0.8 * 0.8 - 1e-4 && fire.intensity <= 0.8 * 1.2 + 1e-4);
            changed |= (fire.intensity - fire.base_intensity).abs() > 1e-3;
            assert_eq!(lights.get(lamp).unwrap().intensity, 0.7);
        }
        assert!(changed);
        assert!((lights.time() - 2.0).abs() < 1e-3);
    }
}
