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

/// A fixed width integer array packed into 64 bit words.
///
/// In the packed layout entries may straddle two words. In the padded layout
/// each word holds `64 / bit_size` entries and the remaining high bits are
/// unused.
pub struct Map {
    bits: Vec<u64>,
    pub bit_size: usize,
    length: usize,
    padded: bool,
}

/// Packs `values` the way a server lays out a data array.
#[cfg(test)]
pub(crate) fn pack(values: &[usize], size: usize, padded: bool) -> Vec<u64> {
    let mut raw = vec![0u64; Map::words_needed(values.len(), size, padded)];
    for (i, v) in values.iter().enumerate() {
        let v = *v as u64;
        if padded {
            let per = 64 / size;
            raw[i / per] |= v << ((i % per) * size);
        } else {
            let start = i * size;
            raw[start / 64] |= v << (start % 64);
            if start % 64 + size > 64 {
                raw[start / 64 + 1] |= v >> (64 - start % 64);
            }
        }
    }
    raw
}

#[test]
fn test_map() {
    for &padded in &[false, true] {
        let values: Vec<usize> = (0..4096).map(|i| (i * 7) % 16).collect();
        let map = Map::from_raw(pack(&values, 4, padded), 4, padded);
        for (i, v) in values.iter().enumerate() {
            assert_eq!(map.get(i), *v);
        }
    }
}

#[test]
fn test_map_odd() {
    for &padded in &[false, true] {
        for size in 1..16 {
            let max = (1 << size) - 1;
            let values: Vec<usize> = (0..64 * 3).map(|i| (i * 31 + max) % (max + 1)).collect();
            let map = Map::from_raw(pack(&values, size, padded), size, padded);
            for (i, v) in values.iter().enumerate() {
                assert_eq!(map.get(i), *v, "index {} size {}", i, size);
            }
            assert_eq!(map.get(0), max);
        }
    }
}

#[test]
fn test_map_word_counts() {
    assert_eq!(Map::words_needed(4096, 4, false), 256);
    assert_eq!(Map::words_needed(4096, 5, false), 320);
    assert_eq!(Map::words_needed(4096, 5, true), 342);
    assert_eq!(Map::words_needed(4096, 15, true), 1024);
    assert_eq!(Map::words_needed(4096, 15, false), 960);
}

#[test]
fn test_map_padded_never_straddles() {
    // 5 bit entries, 12 per word. Entry 12 starts the second word.
    let map = Map::from_raw(vec![0, 0b10101], 5, true);
    assert_eq!(map.get(11), 0);
    assert_eq!(map.get(12), 0b10101);

    // The packed layout puts entry 12 at bit 60, across both words.
    let map = Map::from_raw(vec![0xA << 60, 0b1], 5, false);
    assert_eq!(map.get(12), 0b11010);
}

impl Map {
    pub fn from_raw(bits: Vec<u64>, size: usize, padded: bool) -> Map {
        let length = if padded {
            bits.len() * (64 / size)
        } else {
            (bits.len() * 64) / size
        };
        Map {
            length,
            bit_size: size,
            bits,
            padded,
        }
    }

    /// Number of words the wire carries for `len` entries of `size` bits.
    pub fn words_needed(len: usize, size: usize, padded: bool) -> usize {
        if padded {
            let per_word = 64 / size;
            (len + per_word - 1) / per_word
        } else {
            (len * size + 63) / 64
        }
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    fn locate(&self, i: usize) -> (usize, usize) {
        if self.padded {
            let per_word = 64 / self.bit_size;
            (i / per_word, (i % per_word) * self.bit_size)
        } else {
            let i = i * self.bit_size;
            (i / 64, i % 64)
        }
    }

    pub fn get(&self, i: usize) -> usize {
        let (pos, ii) = self.locate(i);
        let mask = (1u64 << self.bit_size) - 1;
        if ii + self.bit_size <= 64 {
            ((self.bits[pos] >> ii) & mask) as usize
        } else {
            let used = 64 - ii;
            (((self.bits[pos] >> ii) | (self.bits[pos + 1] << used)) & mask) as usize
        }
    }
}
