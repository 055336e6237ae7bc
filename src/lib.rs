pub mod config;
pub mod entity;
pub mod error;
pub mod generator;
pub mod graph;
pub mod kdtree;
pub mod map;
pub mod map_types;
pub mod pattern;
pub mod persist;
pub mod point;
pub mod room;
pub mod sampling;
pub mod separation;
pub mod shape;

mod symmetric_map;

pub use config::{DungeonType, GenerationMode, StreamingSettings};
pub use entity::{Entity, EntityKind, Interaction, Orientation};
pub use error::{GenerationError, Result};
pub use generator::Generator;
pub use map::{CellType, Chunk, ExplorationMap, CHUNK_SIZE};
pub use point::Point;

/// Implement this to let the generation algorithms rasterize into your map.
pub trait CellEncoder {
    /// Writes `cell` at `point`.
    fn encode_cell(&mut self, point: &Point, cell: CellType);

    /// What is currently at `point`. Unknown locations are `CellType::Empty`.
    fn cell_at(&self, point: &Point) -> CellType;
}
