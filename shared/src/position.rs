use std::fmt;
use std::ops;

/// An absolute block coordinate.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Position {
    pub fn new(x: i32, y: i32, z: i32) -> Position {
        Position { x, y, z }
    }

    /// The column containing this block.
    pub fn column(self) -> ChunkPos {
        ChunkPos::new(self.x >> 4, self.z >> 4)
    }

    /// Coordinates inside the 16x16x16 section containing this block.
    pub fn local(self) -> (usize, usize, usize) {
        ((self.x & 0xF) as usize, (self.y & 0xF) as usize, (self.z & 0xF) as usize)
    }

    /// Index of the containing section counted from `min_y`.
    pub fn section_index(self, min_y: i32) -> Option<usize> {
        let rel = self.y - min_y;
        if rel < 0 {
            None
        } else {
            Some((rel >> 4) as usize)
        }
    }
}

impl ops::Add<Position> for Position {
    type Output = Position;

    fn add(self, o: Position) -> Position {
        Position {
            x: self.x + o.x,
            y: self.y + o.y,
            z: self.z + o.z,
        }
    }
}

impl ops::Add<(i32, i32, i32)> for Position {
    type Output = Position;

    fn add(self, (x, y, z): (i32, i32, i32)) -> Position {
        Position {
            x: self.x + x,
            y: self.y + y,
            z: self.z + z,
        }
    }
}

impl ops::Sub<Position> for Position {
    type Output = Position;

    fn sub(self, o: Position) -> Position {
        Position {
            x: self.x - o.x,
            y: self.y - o.y,
            z: self.z - o.z,
        }
    }
}

impl Default for Position {
    fn default() -> Position {
        Position::new(0, 0, 0)
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<{},{},{}>", self.x, self.y, self.z)
    }
}

/// Coordinates of a chunk column.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub fn new(x: i32, z: i32) -> ChunkPos {
        ChunkPos { x, z }
    }

    /// Block position of the lowest corner of the given section.
    pub fn origin(self, min_y: i32, section: usize) -> Position {
        Position::new(self.x << 4, min_y + ((section as i32) << 4), self.z << 4)
    }
}

impl fmt::Debug for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{},{}]", self.x, self.z)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn negative_coordinates_map_to_columns() {
        let pos = Position::new(-1, 70, -17);
        assert_eq!(pos.column(), ChunkPos::new(-1, -2));
        assert_eq!(pos.local(), (15, 6, 15));
    }

    #[test]
    fn section_index_respects_min_y() {
        assert_eq!(Position::new(0, -64, 0).section_index(-64), Some(0));
        assert_eq!(Position::new(0, 0, 0).section_index(-64), Some(4));
        assert_eq!(Position::new(0, -65, 0).section_index(-64), None);
        assert_eq!(ChunkPos::new(2, -1).origin(-64, 4), Position::new(32, 0, -16));
    }
}
