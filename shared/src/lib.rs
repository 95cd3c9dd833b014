pub mod position;
pub use self::position::{ChunkPos, Position};
