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

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

use log::trace;

use super::section::{self, ChunkSection, SectionFormat};
use crate::protocol::{self, packet, versions};
use crate::server::dimension::DimensionInfo;
use crate::shared::ChunkPos;

/// Everything a worker needs to unpack one ChunkData packet.
#[derive(Debug, Clone)]
pub struct ColumnJob {
    pub pos: ChunkPos,
    pub version: i32,
    /// A full column replaces whatever was loaded; otherwise only the sent
    /// sections change.
    pub full: bool,
    /// Sections present in the data, lowest first. `None` means every
    /// section from the bottom of the world is sent.
    pub mask: Option<Vec<u64>>,
    /// Known section count of the dimension.
    pub section_count: Option<usize>,
    pub has_skylight: bool,
    pub data: Vec<u8>,
}

impl ColumnJob {
    pub fn from_packet(
        chunk: packet::play::clientbound::ChunkData,
        version: i32,
        dimension: &DimensionInfo,
    ) -> ColumnJob {
        let mask = if version < versions::V1_17 {
            Some(vec![chunk.bitmask.0 as u32 as u64])
        } else if version < versions::V1_18 {
            Some(chunk.bitmask_longs.data.iter().map(|l| *l as u64).collect())
        } else {
            None
        };
        ColumnJob {
            pos: ChunkPos::new(chunk.chunk_x, chunk.chunk_z),
            version,
            full: version >= versions::V1_17 || chunk.full_chunk,
            mask,
            section_count: dimension.section_count(),
            has_skylight: dimension.has_skylight,
            data: chunk.data.data,
        }
    }

    fn has_section(&self, index: usize) -> bool {
        match self.mask {
            Some(ref mask) => mask
                .get(index / 64)
                .map_or(false, |word| word & (1 << (index % 64)) != 0),
            None => true,
        }
    }
}

/// The result of decoding a column, applied to the world in one step.
#[derive(Debug)]
pub struct DecodedColumn {
    pub pos: ChunkPos,
    pub full: bool,
    pub sections: Vec<(usize, ChunkSection)>,
}

/// Unpacks every section of the column. Returns `Ok(None)` when `cancel` is
/// raised part way through.
pub fn decode_column(
    job: &ColumnJob,
    cancel: &AtomicBool,
) -> Result<Option<DecodedColumn>, protocol::Error> {
    let format = SectionFormat::for_version(job.version, job.has_skylight);
    let mut cursor = io::Cursor::new(&job.data[..]);
    let mut sections = Vec::new();

    let limit = match job.mask {
        Some(ref mask) => mask.len() * 64,
        None => job.section_count.unwrap_or(usize::MAX),
    };
    for index in 0..limit {
        if job.mask.is_none() && cursor.position() as usize >= job.data.len() {
            break;
        }
        if !job.has_section(index) {
            continue;
        }
        if cancel.load(Ordering::Relaxed) {
            trace!("Decode of {:?} cancelled at section {}", job.pos, index);
            return Ok(None);
        }
        let section = section::decode_section(&mut cursor, format).map_err(|err| match err {
            protocol::Error::PaletteRange { .. } => err,
            err => protocol::Error::Err(format!("column {:?} section {}: {}", job.pos, index, err)),
        })?;
        if job.mask.is_none() && section.is_empty() {
            continue;
        }
        sections.push((index, section));
    }

    Ok(Some(DecodedColumn {
        pos: job.pos,
        full: job.full,
        sections,
    }))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::world::section::test::encode_section;
    use crate::world::section::SECTION_VOLUME;

    fn job(version: i32, mask: Option<Vec<u64>>, data: Vec<u8>) -> ColumnJob {
        ColumnJob {
            pos: ChunkPos::new(2, -3),
            version,
            full: true,
            mask,
            section_count: None,
            has_skylight: true,
            data,
        }
    }

    fn uniform(version: i32, block: i32) -> Vec<u8> {
        let format = SectionFormat::for_version(version, true);
        encode_section(format, 4, &[block], &vec![0; SECTION_VOLUME])
    }

    #[test]
    fn masked_sections_land_at_their_index() {
        let mut data = uniform(versions::V1_12_2, 16);
        data.extend(uniform(versions::V1_12_2, 32));
        // trailing biome bytes are ignored
        data.extend_from_slice(&[0; 256]);
        let column = decode_column(&job(versions::V1_12_2, Some(vec![0b101]), data), &AtomicBool::new(false))
            .unwrap()
            .unwrap();
        assert_eq!(column.sections.len(), 2);
        assert_eq!(column.sections[0].0, 0);
        assert_eq!(column.sections[1].0, 2);
        assert_eq!(column.sections[1].1.get(4, 4, 4), 32);
    }

    #[test]
    fn full_height_reads_until_exhausted() {
        let mut data = Vec::new();
        for block in &[1, 0, 0, 9] {
            data.extend(uniform(versions::V1_18, *block));
        }
        let column = decode_column(&job(versions::V1_18, None, data), &AtomicBool::new(false))
            .unwrap()
            .unwrap();
        let indexes: Vec<usize> = column.sections.iter().map(|(i, _)| *i).collect();
        assert_eq!(indexes, vec![0, 3]);
    }

    #[test]
    fn known_height_stops_early() {
        let mut data = Vec::new();
        for _ in 0..3 {
            data.extend(uniform(versions::V1_19, 5));
        }
        let mut job = job(versions::V1_19, None, data);
        job.section_count = Some(2);
        let column = decode_column(&job, &AtomicBool::new(false)).unwrap().unwrap();
        assert_eq!(column.sections.len(), 2);
    }

    #[test]
    fn cancelled_decode_yields_nothing() {
        let data = uniform(versions::V1_16, 3);
        let cancel = AtomicBool::new(true);
        assert!(decode_column(&job(versions::V1_16, Some(vec![1]), data), &cancel)
            .unwrap()
            .is_none());
    }

    #[test]
    fn truncated_column_is_an_error() {
        let mut data = uniform(versions::V1_16, 3);
        data.truncate(data.len() - 10);
        assert!(decode_column(&job(versions::V1_16, Some(vec![1]), data), &AtomicBool::new(false)).is_err());
    }
}
