use noise::{NoiseFn, Perlin};
use rand::{rngs::SmallRng, Rng, SeedableRng};

/// Frequency of the seeded phase term. Neighbouring chunks still see close
/// phases, so biomes form regions instead of speckle.
const PHASE_FREQUENCY: f64 = 0.5;
/// Radians the phase can swing across. Wide enough that every biome band
/// is reached within a few dozen chunks of any point.
const PHASE_SPAN: f64 = std::f64::consts::PI;
/// Seed-derived offsets are drawn from `[-PHASE_OFFSET_RANGE, PHASE_OFFSET_RANGE)`.
const PHASE_OFFSET_RANGE: f64 = 4096.0;
/// Sum of the amplitudes of the three trigonometric terms.
const AMPLITUDE_SUM: f64 = 1.75;

/// Deterministic 2D value field in `[-1, 1]`, seeded once per world.
///
/// A seeded gradient-noise term supplies a slowly varying phase `n`, which
/// shifts three sine/cosine layers at different scales. The gradient noise
/// is read at a seed-dependent offset, away from its lattice, so the seed
/// moves the phase over its whole span everywhere, spawn included.
#[derive(Clone)]
pub struct NoiseField {
    seed: u64,
    phase: Perlin,
    offset: [f64; 2],
}

impl NoiseField {
    pub fn new(seed: u64) -> Self {
        let folded = (seed as u32) ^ ((seed >> 32) as u32);
        let mut rng = SmallRng::seed_from_u64(seed);
        let offset = [
            rng.gen_range(-PHASE_OFFSET_RANGE..PHASE_OFFSET_RANGE),
            rng.gen_range(-PHASE_OFFSET_RANGE..PHASE_OFFSET_RANGE),
        ];
        Self {
            seed,
            phase: Perlin::new(folded),
            offset,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    fn phase(&self, x: f64, y: f64) -> f64 {
        let point = [
            x * PHASE_FREQUENCY + self.offset[0],
            y * PHASE_FREQUENCY + self.offset[1],
        ];
        self.phase.get(point) * PHASE_SPAN
    }

    pub fn sample(&self, x: f64, y: f64) -> f64 {
        let n = self.phase(x, y);

        let a = (x * 0.1 + n).sin() * (y * 0.1 + n * 2.0).cos();
        let b = (x * 0.2 + y * 0.3 + n * 3.0).sin() * 0.5;
        let c = (x * 0.05 - y * 0.07 + n * 4.0).cos() * 0.25;

        ((a + b + c) / AMPLITUDE_SUM).clamp(-1.0, 1.0)
    }

    /// Sums `octaves` samples starting at `frequency`, doubling the frequency
    /// and halving the amplitude each time. `offset` is added after scaling,
    /// so the same offset shifts every octave alike. Not normalized: three
    /// octaves span `[-1.75, 1.75]`.
    pub fn octaves(&self, x: f64, y: f64, frequency: f64, offset: f64, octaves: u32) -> f64 {
        let mut total = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = frequency;
        for _ in 0..octaves.max(1) {
            total += self.sample(x * frequency + offset, y * frequency + offset) * amplitude;
            amplitude *= 0.5;
            frequency *= 2.0;
        }
        total
    }
}
