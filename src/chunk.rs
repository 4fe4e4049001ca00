use crate::biome::Biome;
use crate::tile::{StructureKind, Tile, TileKind};
use crate::world::ChunkPos;

pub const CHUNK_SIZE: usize = 16;
pub const CHUNK_AREA: usize = CHUNK_SIZE * CHUNK_SIZE;
/// Edge length of one tile in world pixels.
pub const TILE_SIZE: f32 = 16.0;

pub const fn index(x: usize, y: usize) -> usize {
    x + CHUNK_SIZE * y
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlacementKind {
    Tree,
    Pine,
    Cactus,
    Rock,
    Flower,
    DeadBush,
    SnowPlant,
    Structure(StructureKind),
}

impl PlacementKind {
    pub fn name(self) -> &'static str {
        match self {
            PlacementKind::Tree => "tree",
            PlacementKind::Pine => "pine",
            PlacementKind::Cactus => "cactus",
            PlacementKind::Rock => "rock",
            PlacementKind::Flower => "flower",
            PlacementKind::DeadBush => "deadbush",
            PlacementKind::SnowPlant => "snowplant",
            PlacementKind::Structure(kind) => kind.name(),
        }
    }

    pub fn is_obstacle(self) -> bool {
        !matches!(
            self,
            PlacementKind::Flower | PlacementKind::DeadBush | PlacementKind::SnowPlant
        )
    }
}

/// Something scattered onto a chunk during generation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub kind: PlacementKind,
    pub x: usize,
    pub y: usize,
    pub world_x: i32,
    pub world_y: i32,
    pub walkable: bool,
    pub variant: u8,
    /// Drawn footprint for structures; 1 for everything else.
    pub size: u8,
}

#[derive(Clone, Debug)]
pub struct Chunk {
    pos: ChunkPos,
    biome: Biome,
    tiles: Vec<Tile>,
    placements: Vec<Placement>,
}

impl Chunk {
    /// A chunk whose every tile is a fresh `kind` tile with world
    /// coordinates filled in.
    pub fn filled(pos: ChunkPos, biome: Biome, kind: TileKind) -> Self {
        let (world_x, world_y) = pos.tile_origin();
        let mut tiles = Vec::with_capacity(CHUNK_AREA);
        for y in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let mut tile = Tile::new(kind);
                tile.world_x = world_x + x as i32;
                tile.world_y = world_y + y as i32;
                tiles.push(tile);
            }
        }
        Self {
            pos,
            biome,
            tiles,
            placements: Vec::new(),
        }
    }

    pub fn pos(&self) -> ChunkPos {
        self.pos
    }

    pub fn biome(&self) -> Biome {
        self.biome
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&Tile> {
        if x < CHUNK_SIZE && y < CHUNK_SIZE {
            Some(&self.tiles[index(x, y)])
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, x: usize, y: usize) -> Option<&mut Tile> {
        if x < CHUNK_SIZE && y < CHUNK_SIZE {
            Some(&mut self.tiles[index(x, y)])
        } else {
            None
        }
    }

    pub fn set(&mut self, x: usize, y: usize, tile: Tile) {
        if x < CHUNK_SIZE && y < CHUNK_SIZE {
            self.tiles[index(x, y)] = tile;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &Tile)> + '_ {
        self.tiles
            .iter()
            .enumerate()
            .map(|(i, tile)| (i % CHUNK_SIZE, i / CHUNK_SIZE, tile))
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    pub fn push_placement(&mut self, placement: Placement) {
        self.placements.push(placement);
    }

    pub(crate) fn retain_placements<F: FnMut(&Placement) -> bool>(&mut self, keep: F) {
        self.placements.retain(keep);
    }

    pub fn walkable_count(&self) -> usize {
        self.tiles.iter().filter(|t| t.walkable).count()
    }
}
