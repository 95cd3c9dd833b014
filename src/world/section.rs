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

use std::fmt;
use std::io;

use byteorder::{BigEndian, ReadBytesExt};

use crate::protocol::{self, versions, Serializable, VarInt};
use crate::types::bit;

pub const SECTION_VOLUME: usize = 16 * 16 * 16;

/// Largest data array a section may declare, in words.
const MAX_DATA_WORDS: usize = 8192;

/// A 16x16x16 cube of global block state ids, indexed `(y, z, x)`.
#[derive(Clone, PartialEq, Eq)]
pub struct ChunkSection {
    blocks: Vec<u16>,
}

impl ChunkSection {
    pub fn new() -> ChunkSection {
        ChunkSection::filled(0)
    }

    pub fn filled(block: u16) -> ChunkSection {
        ChunkSection {
            blocks: vec![block; SECTION_VOLUME],
        }
    }

    #[inline]
    pub fn index(x: usize, y: usize, z: usize) -> usize {
        (y << 8) | (z << 4) | x
    }

    pub fn get(&self, x: usize, y: usize, z: usize) -> u16 {
        self.blocks[ChunkSection::index(x, y, z)]
    }

    pub fn set(&mut self, x: usize, y: usize, z: usize, block: u16) {
        self.blocks[ChunkSection::index(x, y, z)] = block;
    }

    /// Number of non-air cells.
    pub fn block_count(&self) -> usize {
        self.blocks.iter().filter(|b| **b != 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|b| *b == 0)
    }

    pub fn blocks(&self) -> &[u16] {
        &self.blocks
    }
}

impl Default for ChunkSection {
    fn default() -> Self {
        ChunkSection::new()
    }
}

impl fmt::Debug for ChunkSection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ChunkSection({} blocks)", self.block_count())
    }
}

/// How sections are laid out on the wire for a protocol version.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SectionFormat {
    /// Entries never straddle two words.
    pub padded: bool,
    /// A bits per entry of 0 carries a single value and no array.
    pub single_valued: bool,
    /// The palette length is sent even for direct palettes.
    pub always_palette_length: bool,
    /// Each section starts with its non-air block count.
    pub block_count: bool,
    /// Block light, and sky light where the dimension has it, follow the
    /// block states.
    pub light_arrays: bool,
    pub has_skylight: bool,
    /// A biome container follows the block states.
    pub biomes: bool,
}

impl SectionFormat {
    pub fn for_version(version: i32, has_skylight: bool) -> SectionFormat {
        SectionFormat {
            padded: version >= versions::PADDED_SECTION_PACKING,
            single_valued: version >= versions::V1_18,
            always_palette_length: version < versions::V1_13,
            block_count: version >= versions::V1_14,
            light_arrays: version < versions::V1_14,
            has_skylight,
            biomes: version >= versions::V1_18,
        }
    }
}

fn read_len<R: io::Read>(buf: &mut R, what: &str, max: usize) -> Result<usize, protocol::Error> {
    let len = VarInt::read_from(buf)?.0;
    if len < 0 || len as usize > max {
        return Err(protocol::Error::Err(format!("bad {} length {}", what, len)));
    }
    Ok(len as usize)
}

fn read_words<R: io::Read>(buf: &mut R, count: usize) -> Result<Vec<u64>, protocol::Error> {
    let mut data = Vec::with_capacity(count);
    for _ in 0..count {
        data.push(buf.read_u64::<BigEndian>()?);
    }
    Ok(data)
}

/// Reads one section's block states, and skips whatever trails them
/// (light arrays or the biome container) so the reader is left at the start
/// of the next section.
pub fn decode_section<R: io::Read>(
    buf: &mut R,
    format: SectionFormat,
) -> Result<ChunkSection, protocol::Error> {
    if format.block_count {
        let _count = buf.read_i16::<BigEndian>()?;
    }

    let section = decode_states(buf, format)?;

    if format.light_arrays {
        skip_bytes(buf, SECTION_VOLUME / 2)?;
        if format.has_skylight {
            skip_bytes(buf, SECTION_VOLUME / 2)?;
        }
    }
    if format.biomes {
        skip_biomes(buf)?;
    }
    Ok(section)
}

fn decode_states<R: io::Read>(
    buf: &mut R,
    format: SectionFormat,
) -> Result<ChunkSection, protocol::Error> {
    let wire_bits = buf.read_u8()?;

    if wire_bits == 0 && format.single_valued {
        let value = VarInt::read_from(buf)?.0;
        let words = read_len(buf, "single value data", MAX_DATA_WORDS)?;
        read_words(buf, words)?;
        return Ok(ChunkSection::filled(global_id(value as i64)?));
    }

    let indirect = wire_bits <= 8;
    let bits = if indirect { wire_bits.max(4) } else { wire_bits };
    if bits > 32 {
        return Err(protocol::Error::Err(format!("bad bits per entry {}", bits)));
    }

    let mut palette = Vec::new();
    if indirect || format.always_palette_length {
        let len = read_len(buf, "palette", SECTION_VOLUME)?;
        if indirect && len == 0 {
            return Err(protocol::Error::Err("empty section palette".to_owned()));
        }
        palette.reserve(len);
        for _ in 0..len {
            palette.push(VarInt::read_from(buf)?.0);
        }
    }

    let words = read_len(buf, "section data", MAX_DATA_WORDS)?;
    let data = read_words(buf, words)?;

    let mut section = ChunkSection::new();
    if data.is_empty() {
        // Every local id is 0.
        if indirect {
            section = ChunkSection::filled(global_id(palette[0] as i64)?);
        }
        return Ok(section);
    }

    let needed = bit::Map::words_needed(SECTION_VOLUME, bits as usize, format.padded);
    if data.len() < needed {
        return Err(protocol::Error::Err(format!(
            "section data has {} words, {} bits per entry needs {}",
            data.len(),
            bits,
            needed
        )));
    }

    let map = bit::Map::from_raw(data, bits as usize, format.padded);
    for i in 0..SECTION_VOLUME {
        let local = map.get(i);
        let value = if indirect {
            match palette.get(local) {
                Some(v) => *v as i64,
                None => {
                    return Err(protocol::Error::PaletteRange {
                        local_id: local,
                        palette_len: palette.len(),
                        bits,
                        x: i & 0xF,
                        y: i >> 8,
                        z: (i >> 4) & 0xF,
                    })
                }
            }
        } else {
            local as i64
        };
        section.blocks[i] = global_id(value)?;
    }
    Ok(section)
}

fn global_id(value: i64) -> Result<u16, protocol::Error> {
    if value < 0 || value > u16::MAX as i64 {
        return Err(protocol::Error::Err(format!(
            "block state {} out of range",
            value
        )));
    }
    Ok(value as u16)
}

/// Skips a 1.18+ biome container: single valued (0 bits), indirect (up to
/// 3 bits) or direct.
fn skip_biomes<R: io::Read>(buf: &mut R) -> Result<(), protocol::Error> {
    let bits = buf.read_u8()?;
    if bits == 0 {
        VarInt::read_from(buf)?;
    } else if bits <= 3 {
        let len = read_len(buf, "biome palette", 64)?;
        for _ in 0..len {
            VarInt::read_from(buf)?;
        }
    }
    let words = read_len(buf, "biome data", MAX_DATA_WORDS)?;
    skip_bytes(buf, words * 8)
}

fn skip_bytes<R: io::Read>(buf: &mut R, count: usize) -> Result<(), protocol::Error> {
    let copied = io::copy(&mut io::Read::take(&mut *buf, count as u64), &mut io::sink())?;
    if copied != count as u64 {
        return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
    }
    Ok(())
}
