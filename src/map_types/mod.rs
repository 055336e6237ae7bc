pub mod dungeon;
pub mod infinite;
