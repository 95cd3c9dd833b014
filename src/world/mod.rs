// Copyright 2016 Matthew Collins
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

pub mod column;
pub mod section;

use std::collections::HashMap;

pub use self::column::{ColumnJob, DecodedColumn};
pub use self::section::ChunkSection;
use crate::server::dimension::DimensionInfo;
use crate::shared::{ChunkPos, Position};

/// Receives terrain from the play session. Every call happens on the thread
/// that ticks the session.
pub trait WorldSink {
    fn set_block(&mut self, pos: Position, block: u16);

    fn store_chunk_section(&mut self, x: i32, z: i32, section_index: usize, section: ChunkSection);

    fn unload_column(&mut self, x: i32, z: i32);

    /// Called before any terrain of a new dimension arrives.
    fn set_dimension(&mut self, _dimension: &DimensionInfo) {}

    /// Applies a decoded column in one step. A full column replaces the old
    /// one entirely.
    fn commit_column(&mut self, column: DecodedColumn) {
        if column.full {
            self.unload_column(column.pos.x, column.pos.z);
        }
        for (index, section) in column.sections {
            self.store_chunk_section(column.pos.x, column.pos.z, index, section);
        }
    }
}

/// A plain in-memory world.
#[derive(Default)]
pub struct World {
    chunks: HashMap<ChunkPos, Chunk>,
    min_y: i32,
}

#[derive(Default)]
struct Chunk {
    sections: HashMap<usize, ChunkSection>,
}

impl World {
    pub fn new() -> World {
        Default::default()
    }

    pub fn get_block(&self, pos: Position) -> u16 {
        let index = match pos.section_index(self.min_y) {
            Some(index) => index,
            None => return 0,
        };
        let (x, y, z) = pos.local();
        self.chunks
            .get(&pos.column())
            .and_then(|chunk| chunk.sections.get(&index))
            .map_or(0, |section| section.get(x, y, z))
    }

    pub fn is_loaded(&self, x: i32, z: i32) -> bool {
        self.chunks.contains_key(&ChunkPos::new(x, z))
    }

    pub fn loaded_columns(&self) -> usize {
        self.chunks.len()
    }

    pub fn section_count(&self) -> usize {
        self.chunks.values().map(|c| c.sections.len()).sum()
    }
}

impl WorldSink for World {
    /// Blocks in columns that aren't loaded are dropped.
    fn set_block(&mut self, pos: Position, block: u16) {
        let index = match pos.section_index(self.min_y) {
            Some(index) => index,
            None => return,
        };
        let chunk = match self.chunks.get_mut(&pos.column()) {
            Some(chunk) => chunk,
            None => return,
        };
        let (x, y, z) = pos.local();
        if !chunk.sections.contains_key(&index) && block == 0 {
            return;
        }
        chunk
            .sections
            .entry(index)
            .or_insert_with(ChunkSection::new)
            .set(x, y, z, block);
    }

    fn store_chunk_section(&mut self, x: i32, z: i32, section_index: usize, section: ChunkSection) {
        self.chunks
            .entry(ChunkPos::new(x, z))
            .or_default()
            .sections
            .insert(section_index, section);
    }

    fn unload_column(&mut self, x: i32, z: i32) {
        self.chunks.remove(&ChunkPos::new(x, z));
    }

    fn set_dimension(&mut self, dimension: &DimensionInfo) {
        self.chunks.clear();
        self.min_y = dimension.min_y;
    }

    fn commit_column(&mut self, column: DecodedColumn) {
        let chunk = self.chunks.entry(column.pos).or_default();
        if column.full {
            chunk.sections.clear();
        }
        chunk.sections.extend(column.sections);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn set_block_needs_a_loaded_column() {
        let mut world = World::new();
        world.set_block(Position::new(1, 2, 3), 5);
        assert_eq!(world.get_block(Position::new(1, 2, 3)), 0);

        world.commit_column(DecodedColumn {
            pos: ChunkPos::new(0, 0),
            full: true,
            sections: vec![],
        });
        world.set_block(Position::new(1, 2, 3), 5);
        assert_eq!(world.get_block(Position::new(1, 2, 3)), 5);
    }

    #[test]
    fn negative_coordinates_and_min_y() {
        let mut world = World::new();
        world.set_dimension(&DimensionInfo {
            name: "minecraft:overworld".to_owned(),
            min_y: -64,
            height: Some(384),
            has_skylight: true,
        });
        world.store_chunk_section(-1, -1, 0, ChunkSection::filled(7));
        assert_eq!(world.get_block(Position::new(-1, -64, -16)), 7);
        assert_eq!(world.get_block(Position::new(-1, -48, -16)), 0);
        assert_eq!(world.get_block(Position::new(-1, -65, -16)), 0);
    }

    #[test]
    fn full_commit_replaces_sections() {
        let mut world = World::new();
        world.store_chunk_section(0, 0, 3, ChunkSection::filled(1));
        world.commit_column(DecodedColumn {
            pos: ChunkPos::new(0, 0),
            full: true,
            sections: vec![(0, ChunkSection::filled(2))],
        });
        assert_eq!(world.section_count(), 1);
        world.commit_column(DecodedColumn {
            pos: ChunkPos::new(0, 0),
            full: false,
            sections: vec![(1, ChunkSection::filled(3))],
        });
        assert_eq!(world.section_count(), 2);
        world.unload_column(0, 0);
        assert!(!world.is_loaded(0, 0));
    }
}
