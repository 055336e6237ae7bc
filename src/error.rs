use crate::point::Point;

use thiserror::Error;

/// Everything that can stop a generation call without being a programming error.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Invalid generation parameter: {0}")]
    InvalidParameter(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Room layout did not converge after {steps} steps ({rooms} rooms)")]
    LayoutDidNotConverge { rooms: usize, steps: usize },

    #[error("Timed out waiting for chunk {0:?}")]
    ChunkTimeout(Point),

    #[error("Generation of chunk {chunk:?} failed: {reason}")]
    ChunkFailed { chunk: Point, reason: String },

    #[error("Generation worker is not running")]
    WorkerStopped,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GenerationError>;
