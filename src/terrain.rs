use rand::Rng;

use crate::biome::Biome;
use crate::chunk::{index, Chunk, CHUNK_AREA, CHUNK_SIZE};
use crate::error::GenerationError;
use crate::noise_field::NoiseField;
use crate::tile::{Rgb, Tile, TileKind};
use crate::world::ChunkPos;

const MOISTURE_OFFSET: f64 = 500.0;
const FOREST_GRASS: Rgb = Rgb::from_u32(0x4D8A3D);

/// Per-tile scalar field for one chunk, indexed with [`crate::chunk::index`].
pub type TerrainGrid = Vec<f64>;

#[derive(Clone)]
pub struct TerrainSynthesizer {
    noise: NoiseField,
}

impl TerrainSynthesizer {
    pub fn new(noise: NoiseField) -> Self {
        Self { noise }
    }

    /// Three octaves at 0.05, 0.1 and 0.2 cycles per tile with halving
    /// amplitude, remapped to `[0, 1]`.
    pub fn height_map(&self, pos: ChunkPos) -> TerrainGrid {
        self.grid(pos, |noise, wx, wy| {
            (noise.octaves(wx, wy, 0.05, 0.0, 3) * 0.5 + 0.5).clamp(0.0, 1.0)
        })
    }

    /// Same octave scheme as the height map, but offset in noise space so the
    /// two fields are decorrelated.
    pub fn moisture_map(&self, pos: ChunkPos) -> TerrainGrid {
        self.grid(pos, |noise, wx, wy| {
            let sum = noise.octaves(wx, wy, 0.08, MOISTURE_OFFSET, 3);
            ((sum / 1.75 + 1.0) * 0.5).clamp(0.0, 1.0)
        })
    }

    fn grid<F>(&self, pos: ChunkPos, sample: F) -> TerrainGrid
    where
        F: Fn(&NoiseField, f64, f64) -> f64,
    {
        let (origin_x, origin_y) = pos.tile_origin();
        let mut grid = vec![0.0; CHUNK_AREA];
        for y in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let wx = (origin_x + x as i32) as f64;
                let wy = (origin_y + y as i32) as f64;
                grid[index(x, y)] = sample(&self.noise, wx, wy);
            }
        }
        grid
    }

    /// Builds the tile layer of a chunk. Fails if either field produced a
    /// non-finite sample.
    pub fn synthesize<R: Rng>(
        &self,
        pos: ChunkPos,
        biome: Biome,
        rng: &mut R,
    ) -> Result<Chunk, GenerationError> {
        let heights = self.height_map(pos);
        let moisture = self.moisture_map(pos);
        build_tiles(pos, biome, &heights, &moisture, rng)
    }
}

pub(crate) fn build_tiles<R: Rng>(
    pos: ChunkPos,
    biome: Biome,
    heights: &[f64],
    moisture: &[f64],
    rng: &mut R,
) -> Result<Chunk, GenerationError> {
    let mut chunk = Chunk::filled(pos, biome, TileKind::Grass);
    let (origin_x, origin_y) = pos.tile_origin();
    for y in 0..CHUNK_SIZE {
        for x in 0..CHUNK_SIZE {
            let h = heights[index(x, y)];
            let m = moisture[index(x, y)];
            let (world_x, world_y) = (origin_x + x as i32, origin_y + y as i32);
            if !h.is_finite() {
                return Err(GenerationError::NonFiniteSample {
                    field: "height",
                    x: world_x,
                    y: world_y,
                });
            }
            if !m.is_finite() {
                return Err(GenerationError::NonFiniteSample {
                    field: "moisture",
                    x: world_x,
                    y: world_y,
                });
            }

            let mut tile = tile_from_terrain(h, m, biome);
            tile.world_x = world_x;
            tile.world_y = world_y;
            tile.variant = rng.gen_range(0..3);
            chunk.set(x, y, tile);
        }
    }
    Ok(chunk)
}

/// Maps terrain samples and the chunk biome to a tile. High moisture in a
/// low basin becomes water regardless of biome.
pub fn tile_from_terrain(height: f64, moisture: f64, biome: Biome) -> Tile {
    let mut tile = Tile::new(TileKind::Grass);
    tile.elevation = (height * 10.0).floor() as i32;

    match biome {
        Biome::Desert => {
            if height > 0.7 {
                tile = retype(tile, TileKind::Dune);
                tile.elevation += 2;
            } else {
                tile = retype(tile, TileKind::Sand);
            }
        }
        Biome::Plains => {
            if moisture > 0.7 {
                tile = retype(tile, TileKind::Flower);
            }
        }
        Biome::Forest => {
            tile.color = FOREST_GRASS;
        }
        Biome::Mountains => {
            if height > 0.6 {
                tile = retype(tile, TileKind::Mountain);
                tile.elevation += 5;
            } else {
                tile = retype(tile, TileKind::Stone);
            }
        }
        Biome::Snowlands => {
            if height > 0.7 {
                tile = retype(tile, TileKind::Ice);
            } else {
                tile = retype(tile, TileKind::Snow);
            }
        }
    }

    if moisture > 0.85 && height < 0.4 {
        tile = retype(tile, TileKind::Water);
        tile.elevation = 0;
    }

    tile
}

fn retype(tile: Tile, kind: TileKind) -> Tile {
    Tile {
        kind,
        walkable: kind.is_walkable(),
        color: kind.default_color(),
        ..tile
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn water_overrides_every_biome() {
        for biome in Biome::ALL {
            for &(h, m) in &[(0.0, 0.86), (0.39, 0.99), (0.2, 1.0)] {
                let tile = tile_from_terrain(h, m, biome);
                assert_eq!(tile.kind, TileKind::Water, "{biome} at h={h} m={m}");
                assert!(!tile.walkable);
                assert_eq!(tile.elevation, 0);
            }
        }
    }

    #[test]
    fn water_needs_both_thresholds() {
        assert_ne!(tile_from_terrain(0.4, 0.9, Biome::Plains).kind, TileKind::Water);
        assert_ne!(tile_from_terrain(0.3, 0.85, Biome::Plains).kind, TileKind::Water);
    }

    #[test]
    fn biome_rules() {
        let dune = tile_from_terrain(0.75, 0.1, Biome::Desert);
        assert_eq!(dune.kind, TileKind::Dune);
        assert_eq!(dune.elevation, 7 + 2);

        let sand = tile_from_terrain(0.5, 0.1, Biome::Desert);
        assert_eq!(sand.kind, TileKind::Sand);
        assert_eq!(sand.elevation, 5);

        assert_eq!(tile_from_terrain(0.5, 0.75, Biome::Plains).kind, TileKind::Flower);
        assert_eq!(tile_from_terrain(0.5, 0.5, Biome::Plains).kind, TileKind::Grass);

        let forest = tile_from_terrain(0.5, 0.5, Biome::Forest);
        assert_eq!(forest.kind, TileKind::Grass);
        assert_eq!(forest.color, FOREST_GRASS);

        let peak = tile_from_terrain(0.65, 0.2, Biome::Mountains);
        assert_eq!(peak.kind, TileKind::Mountain);
        assert!(!peak.walkable);
        assert_eq!(peak.elevation, 6 + 5);
        assert_eq!(tile_from_terrain(0.6, 0.2, Biome::Mountains).kind, TileKind::Stone);

        assert_eq!(tile_from_terrain(0.8, 0.2, Biome::Snowlands).kind, TileKind::Ice);
        assert_eq!(tile_from_terrain(0.3, 0.2, Biome::Snowlands).kind, TileKind::Snow);
    }

    #[test]
    fn maps_are_normalized() {
        let terrain = TerrainSynthesizer::new(NoiseField::new(9));
        for pos in [ChunkPos { x: 0, y: 0 }, ChunkPos { x: -7, y: 13 }] {
            let h = terrain.height_map(pos);
            let m = terrain.moisture_map(pos);
            assert_eq!(h.len(), CHUNK_AREA);
            assert!(h.iter().chain(m.iter()).all(|v| (0.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn non_finite_samples_fail_generation() {
        let mut heights = vec![0.5; CHUNK_AREA];
        heights[index(2, 3)] = f64::NAN;
        let moisture = vec![0.5; CHUNK_AREA];
        let mut rng = SmallRng::seed_from_u64(1);
        let err = build_tiles(ChunkPos { x: 1, y: 0 }, Biome::Plains, &heights, &moisture, &mut rng)
            .unwrap_err();
        match err {
            GenerationError::NonFiniteSample { field, x, y } => {
                assert_eq!(field, "height");
                assert_eq!((x, y), (16 + 2, 3));
            }
        }
    }
}
