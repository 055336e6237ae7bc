use crate::{
    config::GenerationMode,
    entity::Entity,
    error::Result,
    map::{CellType, Chunk, DenseMap, ExplorationMap, CHUNK_SIZE},
    map_types::{
        dungeon::{generate_level, Level},
        infinite::ChunkedGenerator,
    },
    persist::SaveData,
    point::Point,
    sampling::small_rng,
    CellEncoder,
};

use std::io::{Read, Write};

enum Backend {
    Finite(Level),
    Infinite(ChunkedGenerator),
}

/// Entry point for the game: hands out chunks of cells and their entities, whichever the mode.
pub struct Generator {
    mode: GenerationMode,
    seed: u64,
    backend: Backend,
}

impl Generator {
    /// Finite levels are generated here, in full. Infinite ones start a worker and generate
    /// nothing until asked.
    pub fn new(mode: GenerationMode, seed: u64) -> Result<Self> {
        mode.validate()?;
        log::info!(
            "Starting {} generator with seed {}",
            if mode.infinite { "infinite" } else { "finite" },
            seed
        );

        let backend = if mode.infinite {
            Backend::Infinite(ChunkedGenerator::new(mode.clone(), seed)?)
        } else {
            Backend::Finite(generate_level(&mode, &mut small_rng(seed))?)
        };

        Ok(Generator {
            mode,
            seed,
            backend,
        })
    }

    pub fn mode(&self) -> &GenerationMode {
        &self.mode
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// The finite level, if this is a finite generator.
    pub fn level(&self) -> Option<&Level> {
        match &self.backend {
            Backend::Finite(level) => Some(level),
            Backend::Infinite(_) => None,
        }
    }

    pub fn chunk_cells(&self, x: i32, y: i32) -> Result<Chunk> {
        match &self.backend {
            Backend::Finite(level) => Ok(level.map.chunk(Point::new(x, y))),
            Backend::Infinite(chunks) => chunks.chunk_cells(x, y),
        }
    }

    pub fn chunk_entities(&self, x: i32, y: i32) -> Result<Vec<Entity>> {
        match &self.backend {
            Backend::Finite(level) => {
                let chunk = Point::new(x, y);
                Ok(level
                    .entities
                    .iter()
                    .filter(|e| e.position.split_tile(CHUNK_SIZE).0 == chunk)
                    .copied()
                    .collect())
            }
            Backend::Infinite(chunks) => chunks.chunk_entities(x, y),
        }
    }

    /// Cell at an absolute position. In infinite mode only cached chunks are consulted.
    pub fn cell_at(&self, point: &Point) -> Result<CellType> {
        match &self.backend {
            Backend::Finite(level) => Ok(level.map.cell_at(point)),
            Backend::Infinite(chunks) => chunks.cell_at(point),
        }
    }

    fn save_data(&self, explored: &ExplorationMap) -> Result<SaveData> {
        let (cells, entities) = match &self.backend {
            Backend::Finite(level) => (level.map.to_chunks(), level.entities.clone()),
            Backend::Infinite(chunks) => chunks.snapshot()?,
        };

        Ok(SaveData {
            cells,
            entities,
            explored: explored.clone(),
        })
    }

    pub fn save(&self, writer: &mut impl Write, explored: &ExplorationMap) -> Result<()> {
        let data = self.save_data(explored)?;
        data.write(writer)?;
        log::debug!(
            "Saved {} chunks and {} entities",
            data.cells.len(),
            data.entities.len()
        );

        Ok(())
    }

    /// Rebuilds a generator from a save. An infinite generator carries on generating new chunks
    /// around the saved ones.
    pub fn load(
        mode: GenerationMode,
        seed: u64,
        reader: &mut impl Read,
    ) -> Result<(Self, ExplorationMap)> {
        mode.validate()?;
        let data = SaveData::read(reader)?;
        log::debug!(
            "Loaded {} chunks and {} entities",
            data.cells.len(),
            data.entities.len()
        );

        let backend = if mode.infinite {
            Backend::Infinite(ChunkedGenerator::restore(
                mode.clone(),
                seed,
                data.cells,
                data.entities,
            )?)
        } else {
            Backend::Finite(Level {
                map: DenseMap::from_chunks(&data.cells),
                entities: data.entities,
            })
        };

        Ok((
            Generator {
                mode,
                seed,
                backend,
            },
            data.explored,
        ))
    }
}
