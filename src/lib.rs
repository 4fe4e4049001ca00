//! World core for a top-down pixel-art game: an infinite chunked tile world,
//! light sources with a smoothed ambient level, a flashlight and darkness
//! overlay, and weather particles.

pub mod ambient;
pub mod biome;
pub mod chunk;
pub mod config;
pub mod darkness;
pub mod error;
pub mod flashlight;
pub mod light_source;
pub mod lighting;
pub mod noise_field;
pub mod scatter;
pub mod session;
pub mod terrain;
pub mod tile;
pub mod weather;
pub mod world;

pub use biome::Biome;
pub use chunk::{Chunk, Placement, PlacementKind, CHUNK_SIZE, TILE_SIZE};
pub use config::Config;
pub use light_source::{LightConfig, LightId, LightKind, ObjectId, WorldObject};
pub use session::GameSession;
pub use tile::{Rgb, Tile, TileKind};
pub use weather::{WeatherKind, WeatherState};
pub use world::{ChunkGenerator, ChunkPos, ChunkStore, WorldGenerator};
