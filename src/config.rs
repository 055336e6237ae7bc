use crate::{
    error::{GenerationError, Result},
    sampling::RangeSpec,
};

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum DungeonType {
    /// Rectangular chambers and mazes joined by straight corridors.
    Flat,
    /// Caves joined by roughened corridors.
    Cave,
}

/// Knobs of the infinite-mode chunk generator.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct StreamingSettings {
    /// Chunks around a requested chunk that must be generated before it is handed out.
    pub border: i32,
    /// Radius generated in the background after a chunk is handed out. 0 disables prefetching.
    pub prefetch_radius: i32,
    /// Longest time a caller waits for a chunk before giving up.
    pub wait_timeout_ms: u64,
}

impl Default for StreamingSettings {
    fn default() -> Self {
        StreamingSettings {
            border: 1,
            prefetch_radius: 1,
            wait_timeout_ms: 30_000,
        }
    }
}

impl StreamingSettings {
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct GenerationMode {
    pub infinite: bool,
    /// Rooms per level, or rooms per chunk in infinite mode.
    pub nb_rooms: i32,
    /// Smallest target room area, in cells.
    pub room_min_size: i32,
    /// Largest target room area, in cells.
    pub room_max_size: i32,
    /// Minimum Manhattan distance between cells of two different rooms.
    pub room_margin: i32,
    /// Expected monsters per 100 room cells.
    pub monster_load: f64,
    /// Probability for a flat room to be a maze.
    pub maze_density: f64,
    #[serde(rename = "type")]
    pub kind: DungeonType,
    #[serde(default)]
    pub streaming: StreamingSettings,
}

impl Default for GenerationMode {
    fn default() -> Self {
        GenerationMode {
            infinite: false,
            nb_rooms: 12,
            room_min_size: 16,
            room_max_size: 64,
            room_margin: 3,
            monster_load: 2.0,
            maze_density: 0.2,
            kind: DungeonType::Flat,
            streaming: StreamingSettings::default(),
        }
    }
}

impl GenerationMode {
    pub fn from_ron(text: &str) -> Result<Self> {
        let mode: GenerationMode =
            ron::de::from_str(text).map_err(|e| GenerationError::Config(e.to_string()))?;
        mode.validate()?;

        Ok(mode)
    }

    pub fn to_ron(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| GenerationError::Config(e.to_string()))
    }

    pub fn room_size(&self) -> RangeSpec {
        RangeSpec {
            min: self.room_min_size,
            max: self.room_max_size,
        }
    }

    /// Rejects parameters the generator cannot honor, before any work is done.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(GenerationError::InvalidParameter(msg));

        if self.nb_rooms < 1 {
            return invalid(format!("nb_rooms must be at least 1, got {}", self.nb_rooms));
        }
        if self.room_min_size < 1 || self.room_max_size < self.room_min_size {
            return invalid(format!(
                "room sizes must satisfy 1 <= min <= max, got {}..{}",
                self.room_min_size, self.room_max_size
            ));
        }
        if self.room_margin < 1 {
            return invalid(format!(
                "room_margin must be at least 1, got {}",
                self.room_margin
            ));
        }
        if !(0.0..=100.0).contains(&self.monster_load) {
            return invalid(format!(
                "monster_load must be in [0, 100], got {}",
                self.monster_load
            ));
        }
        if !(0.0..=1.0).contains(&self.maze_density) {
            return invalid(format!(
                "maze_density must be in [0, 1], got {}",
                self.maze_density
            ));
        }
        if self.streaming.border < 0 || self.streaming.prefetch_radius < 0 {
            return invalid(format!(
                "streaming radii must be non-negative, got border {} and prefetch {}",
                self.streaming.border, self.streaming.prefetch_radius
            ));
        }

        Ok(())
    }
}
