use std::collections::{hash_map::DefaultHasher, HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rand::{rngs::SmallRng, SeedableRng};
use rayon::prelude::*;

use crate::biome::{Biome, BiomeClassifier};
use crate::chunk::{Chunk, CHUNK_SIZE, TILE_SIZE};
use crate::config::WorldConfig;
use crate::noise_field::NoiseField;
use crate::scatter::EntityScatterer;
use crate::terrain::TerrainSynthesizer;
use crate::tile::{Tile, TileKind};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkPos {
    pub x: i32,
    pub y: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Chunk containing the world pixel position.
    pub fn from_world(px: f32, py: f32) -> Self {
        let span = CHUNK_SIZE as f32 * TILE_SIZE;
        Self {
            x: (px / span).floor() as i32,
            y: (py / span).floor() as i32,
        }
    }

    /// Chunk containing the world tile coordinate.
    pub fn from_tile(tx: i32, ty: i32) -> Self {
        Self {
            x: tx.div_euclid(CHUNK_SIZE as i32),
            y: ty.div_euclid(CHUNK_SIZE as i32),
        }
    }

    /// World tile coordinates of local tile (0, 0).
    pub fn tile_origin(self) -> (i32, i32) {
        (self.x * CHUNK_SIZE as i32, self.y * CHUNK_SIZE as i32)
    }

    pub fn key(self) -> String {
        self.to_string()
    }

    pub fn from_key(key: &str) -> Option<Self> {
        let (x, y) = key.split_once(',')?;
        Some(Self {
            x: x.trim().parse().ok()?,
            y: y.trim().parse().ok()?,
        })
    }

    pub fn chebyshev(self, other: ChunkPos) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// Produces the contents of one chunk. Implementations must be pure in
/// `pos` so chunks can be generated on any thread in any order.
pub trait ChunkGenerator: Send + Sync {
    fn generate(&self, pos: ChunkPos) -> anyhow::Result<Chunk>;
}

/// Default pipeline: biome, then terrain, then scatter, all driven by one
/// RNG derived from the world seed and the chunk position.
#[derive(Clone)]
pub struct WorldGenerator {
    seed: u64,
    classifier: BiomeClassifier,
    terrain: TerrainSynthesizer,
    scatterer: EntityScatterer,
}

impl WorldGenerator {
    pub fn new(seed: u64) -> Self {
        Self::with_scatterer(seed, EntityScatterer::default())
    }

    pub fn from_config(config: &WorldConfig) -> Self {
        Self::with_scatterer(config.seed, EntityScatterer::new(config.structure_chance))
    }

    fn with_scatterer(seed: u64, scatterer: EntityScatterer) -> Self {
        let noise = NoiseField::new(seed);
        Self {
            seed,
            classifier: BiomeClassifier::new(noise.clone()),
            terrain: TerrainSynthesizer::new(noise),
            scatterer,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn biome_at(&self, pos: ChunkPos) -> Biome {
        self.classifier.classify(pos.x, pos.y)
    }

    fn chunk_rng(&self, pos: ChunkPos) -> SmallRng {
        let mut hasher = DefaultHasher::new();
        pos.hash(&mut hasher);
        let chunk_hash = hasher.finish() ^ self.seed;
        SmallRng::seed_from_u64(chunk_hash)
    }
}

impl ChunkGenerator for WorldGenerator {
    fn generate(&self, pos: ChunkPos) -> anyhow::Result<Chunk> {
        let biome = self.biome_at(pos);
        let mut rng = self.chunk_rng(pos);
        let mut chunk = self.terrain.synthesize(pos, biome, &mut rng)?;
        self.scatterer.populate(&mut chunk, &mut rng);
        log::debug!(
            "Generated chunk {pos} ({biome}, {} entities)",
            chunk.placements().len()
        );
        Ok(chunk)
    }
}

/// Flat walkable plains chunk used in place of one that failed to generate.
pub fn fallback_chunk(pos: ChunkPos) -> Chunk {
    Chunk::filled(pos, Biome::Plains, TileKind::Grass)
}

/// Owns every generated chunk. Chunks are shared out as `Arc` and never
/// change after they are inserted.
pub struct ChunkStore {
    chunks: HashMap<ChunkPos, Arc<Chunk>>,
    generator: Box<dyn ChunkGenerator>,
    failed_generations: usize,
}

impl ChunkStore {
    pub fn new(seed: u64) -> Self {
        Self::with_generator(WorldGenerator::new(seed))
    }

    pub fn from_config(config: &WorldConfig) -> Self {
        log::info!("World seed {:#x}", config.seed);
        Self::with_generator(WorldGenerator::from_config(config))
    }

    pub fn with_generator<G: ChunkGenerator + 'static>(generator: G) -> Self {
        Self {
            chunks: HashMap::new(),
            generator: Box::new(generator),
            failed_generations: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn contains(&self, pos: ChunkPos) -> bool {
        self.chunks.contains_key(&pos)
    }

    pub fn get(&self, pos: ChunkPos) -> Option<&Arc<Chunk>> {
        self.chunks.get(&pos)
    }

    pub fn chunks(&self) -> impl Iterator<Item = (&ChunkPos, &Arc<Chunk>)> + '_ {
        self.chunks.iter()
    }

    /// Number of chunks replaced by the fallback since the store was created.
    pub fn failed_generations(&self) -> usize {
        self.failed_generations
    }

    pub fn ensure_generated(&mut self, pos: ChunkPos) -> Arc<Chunk> {
        if let Some(chunk) = self.chunks.get(&pos) {
            return Arc::clone(chunk);
        }
        let result = self.generator.generate(pos);
        let chunk = Arc::new(self.accept(pos, result));
        self.chunks.insert(pos, Arc::clone(&chunk));
        chunk
    }

    fn accept(&mut self, pos: ChunkPos, result: anyhow::Result<Chunk>) -> Chunk {
        match result {
            Ok(chunk) => chunk,
            Err(err) => {
                self.failed_generations += 1;
                log::error!("Chunk {pos} failed to generate, using flat fallback: {err:#}");
                fallback_chunk(pos)
            }
        }
    }

    /// Generates every missing chunk within `radius` (square) of the chunk
    /// under the player. Returns how many chunks were created.
    pub fn ensure_chunks_around_player(&mut self, px: f32, py: f32, radius: i32) -> usize {
        let center = ChunkPos::from_world(px, py);
        let mut created = 0;
        for cy in (center.y - radius)..=(center.y + radius) {
            for cx in (center.x - radius)..=(center.x + radius) {
                let pos = ChunkPos { x: cx, y: cy };
                if !self.contains(pos) {
                    self.ensure_generated(pos);
                    created += 1;
                }
            }
        }
        created
    }

    /// Generates the missing chunks among `positions` on the rayon pool.
    /// Nothing is inserted until every chunk has finished.
    pub fn pregenerate(&mut self, positions: &[ChunkPos]) -> usize {
        let mut seen = HashSet::new();
        let missing: Vec<ChunkPos> = positions
            .iter()
            .copied()
            .filter(|pos| !self.contains(*pos) && seen.insert(*pos))
            .collect();
        if missing.is_empty() {
            return 0;
        }

        let generator = self.generator.as_ref();
        let finished: Vec<(ChunkPos, anyhow::Result<Chunk>)> = missing
            .par_iter()
            .map(|&pos| (pos, generator.generate(pos)))
            .collect();

        let created = finished.len();
        for (pos, result) in finished {
            let chunk = self.accept(pos, result);
            self.chunks.insert(pos, Arc::new(chunk));
        }
        log::debug!("Pregenerated {created} chunks");
        created
    }

    /// Drops chunks farther than `keep_radius` from `center` unless a caller
    /// still holds them. Returns how many were dropped.
    pub fn evict_distant(&mut self, center: ChunkPos, keep_radius: i32) -> usize {
        let before = self.chunks.len();
        self.chunks.retain(|pos, chunk| {
            pos.chebyshev(center) <= keep_radius || Arc::strong_count(chunk) > 1
        });
        let evicted = before - self.chunks.len();
        if evicted > 0 {
            log::debug!("Evicted {evicted} chunks beyond radius {keep_radius} of {center}");
        }
        evicted
    }

    /// Tile under a world pixel position, if its chunk is loaded.
    pub fn tile_at(&self, wx: f32, wy: f32) -> Option<&Tile> {
        let tx = (wx / TILE_SIZE).floor() as i32;
        let ty = (wy / TILE_SIZE).floor() as i32;
        self.tile_at_tile(tx, ty)
    }

    /// Tile at world tile coordinates, if its chunk is loaded.
    pub fn tile_at_tile(&self, tx: i32, ty: i32) -> Option<&Tile> {
        let chunk = self.chunks.get(&ChunkPos::from_tile(tx, ty))?;
        let size = CHUNK_SIZE as i32;
        chunk.get(tx.rem_euclid(size) as usize, ty.rem_euclid(size) as usize)
    }
}
