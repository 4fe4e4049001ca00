use rand::Rng;

use crate::biome::Biome;
use crate::chunk::{Chunk, Placement, PlacementKind, CHUNK_SIZE};
use crate::tile::StructureKind;

/// Per-tile spawn chances, drawn in this order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScatterDensity {
    pub tree: f64,
    pub rock: f64,
    pub plant: f64,
}

pub fn density(biome: Biome) -> ScatterDensity {
    let (tree, rock, plant) = match biome {
        Biome::Forest => (0.15, 0.03, 0.08),
        Biome::Plains => (0.03, 0.02, 0.10),
        Biome::Desert => (0.01, 0.08, 0.02),
        Biome::Mountains => (0.05, 0.20, 0.03),
        Biome::Snowlands => (0.07, 0.06, 0.01),
    };
    ScatterDensity { tree, rock, plant }
}

fn tree_kind(biome: Biome) -> PlacementKind {
    match biome {
        Biome::Desert => PlacementKind::Cactus,
        Biome::Snowlands => PlacementKind::Pine,
        _ => PlacementKind::Tree,
    }
}

fn plant_kind(biome: Biome) -> PlacementKind {
    match biome {
        Biome::Desert => PlacementKind::DeadBush,
        Biome::Snowlands => PlacementKind::SnowPlant,
        _ => PlacementKind::Flower,
    }
}

/// Populates freshly synthesized chunks with trees, rocks, plants and the
/// occasional structure.
#[derive(Clone, Debug)]
pub struct EntityScatterer {
    structure_chance: f64,
}

impl Default for EntityScatterer {
    fn default() -> Self {
        Self::new(0.05)
    }
}

impl EntityScatterer {
    pub fn new(structure_chance: f64) -> Self {
        Self {
            structure_chance: structure_chance.clamp(0.0, 1.0),
        }
    }

    pub fn populate<R: Rng>(&self, chunk: &mut Chunk, rng: &mut R) {
        let biome = chunk.biome();
        let odds = density(biome);
        let (origin_x, origin_y) = chunk.pos().tile_origin();

        for y in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let Some(tile) = chunk.get(x, y) else {
                    continue;
                };
                if !tile.walkable {
                    continue;
                }

                let kind = if rng.gen_bool(odds.tree) {
                    tree_kind(biome)
                } else if rng.gen_bool(odds.rock) {
                    PlacementKind::Rock
                } else if rng.gen_bool(odds.plant) {
                    plant_kind(biome)
                } else {
                    continue;
                };

                let blocks = kind.is_obstacle();
                if blocks {
                    if let Some(tile) = chunk.get_mut(x, y) {
                        tile.block();
                    }
                }
                chunk.push_placement(Placement {
                    kind,
                    x,
                    y,
                    world_x: origin_x + x as i32,
                    world_y: origin_y + y as i32,
                    walkable: !blocks,
                    variant: rng.gen_range(0..3),
                    size: 1,
                });
            }
        }

        if rng.gen_bool(self.structure_chance) {
            self.place_structure(chunk, rng);
        }
    }

    fn place_structure<R: Rng>(&self, chunk: &mut Chunk, rng: &mut R) {
        let kind = StructureKind::ALL[rng.gen_range(0..StructureKind::ALL.len())];
        let cx = rng.gen_range(2..CHUNK_SIZE - 2).clamp(1, CHUNK_SIZE - 2);
        let cy = rng.gen_range(2..CHUNK_SIZE - 2).clamp(1, CHUNK_SIZE - 2);
        let size = rng.gen_range(2..=4u8);

        // Footprint is always 3x3 regardless of the drawn size.
        let in_footprint = |p: &Placement| p.x.abs_diff(cx) <= 1 && p.y.abs_diff(cy) <= 1;
        chunk.retain_placements(|p| !in_footprint(p));
        for y in cy - 1..=cy + 1 {
            for x in cx - 1..=cx + 1 {
                if let Some(tile) = chunk.get_mut(x, y) {
                    tile.block();
                    tile.structure = Some(kind);
                }
            }
        }

        let (origin_x, origin_y) = chunk.pos().tile_origin();
        let world_x = origin_x + cx as i32;
        let world_y = origin_y + cy as i32;
        chunk.push_placement(Placement {
            kind: PlacementKind::Structure(kind),
            x: cx,
            y: cy,
            world_x,
            world_y,
            walkable: false,
            variant: 0,
            size,
        });
        log::info!(
            "Placed {} at tile ({world_x}, {world_y}) in chunk {}",
            kind.name(),
            chunk.pos()
        );
    }
}
