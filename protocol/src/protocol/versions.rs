use crate::protocol::*;
use crate::types::hash::FNVHash;
use std::collections::HashMap;
use std::hash::BuildHasherDefault;

type IdMap<K, V> = HashMap<K, V, BuildHasherDefault<FNVHash>>;

// https://wiki.vg/Protocol_version_numbers
pub const V1_12_2: i32 = 340;
pub const V1_13: i32 = 393;
pub const V1_14: i32 = 477;
pub const V1_15: i32 = 573;
pub const V1_16: i32 = 735;
pub const V1_16_2: i32 = 751;
pub const V1_17: i32 = 755;
pub const V1_17_1: i32 = 756;
pub const V1_18: i32 = 757;
pub const V1_19: i32 = 759;
pub const V1_19_2: i32 = 760;
pub const V1_19_3: i32 = 761;
pub const V1_19_4: i32 = 762;
pub const V1_20: i32 = 763;

pub const LOWEST_SUPPORTED: i32 = V1_12_2;
pub const HIGHEST_SUPPORTED: i32 = V1_20;

/// Chunk data long arrays stop letting entries straddle two longs.
pub const PADDED_SECTION_PACKING: i32 = V1_16;

/// Multi block change switches to a packed section position and VarLong
/// records. Kept separate from the chunk data switch.
pub const SECTION_BLOCK_CHANGE: i32 = V1_16_2;

/// Release names for the protocol numbers the client was tested against.
pub fn release_name(version: i32) -> Option<&'static str> {
    Some(match version {
        340 => "1.12.2",
        393 => "1.13",
        401 => "1.13.1",
        404 => "1.13.2",
        477 => "1.14",
        480 => "1.14.1",
        485 => "1.14.2",
        490 => "1.14.3",
        498 => "1.14.4",
        573 => "1.15",
        575 => "1.15.1",
        578 => "1.15.2",
        735 => "1.16",
        736 => "1.16.1",
        751 => "1.16.2",
        753 => "1.16.3",
        754 => "1.16.5",
        755 => "1.17",
        756 => "1.17.1",
        757 => "1.18.1",
        758 => "1.18.2",
        759 => "1.19",
        760 => "1.19.2",
        761 => "1.19.3",
        762 => "1.19.4",
        763 => "1.20.1",
        _ => return None,
    })
}

/// Fields present from `min` onwards.
pub fn since<T>(min: i32) -> impl Fn(&T, i32) -> bool {
    move |_, version| version >= min
}

/// Fields present before `max`.
pub fn until<T>(max: i32) -> impl Fn(&T, i32) -> bool {
    move |_, version| version < max
}

/// Fields present in `[min, max)`.
pub fn between<T>(min: i32, max: i32) -> impl Fn(&T, i32) -> bool {
    move |_, version| version >= min && version < max
}

macro_rules! packet_ids {
    ($($id:expr => $kind:ident)*) => {
        &[$((PacketKind::$kind, $id),)*]
    };
}

mod v1_12_2;
mod v1_13;
mod v1_14;
mod v1_15;
mod v1_16;
mod v1_16_2;
mod v1_17;
mod v1_18;
mod v1_19;
mod v1_19_2;
mod v1_19_3;
mod v1_19_4;

struct PaletteEntry {
    min: i32,
    max: i32,
    ids: &'static [(PacketKind, i32)],
    mod_ids: &'static [(PacketKind, i32)],
    removed: &'static [PacketKind],
}

macro_rules! entry {
    ($min:expr, $module:ident) => {
        PaletteEntry {
            min: $min,
            max: HIGHEST_SUPPORTED,
            ids: $module::IDS,
            mod_ids: $module::MOD_IDS,
            removed: $module::REMOVED,
        }
    };
}

/// Applied in order; each boundary only lists what it changes.
const PALETTE_TABLE: &[PaletteEntry] = &[
    entry!(V1_12_2, v1_12_2),
    entry!(V1_13, v1_13),
    entry!(V1_14, v1_14),
    entry!(V1_15, v1_15),
    entry!(V1_16, v1_16),
    entry!(V1_16_2, v1_16_2),
    entry!(V1_17, v1_17),
    entry!(V1_18, v1_18),
    entry!(V1_19, v1_19),
    entry!(V1_19_2, v1_19_2),
    entry!(V1_19_3, v1_19_3),
    entry!(V1_19_4, v1_19_4),
];

/// Bidirectional packet id table for one protocol version.
#[derive(Debug, Clone)]
pub struct PacketPalette {
    version: i32,
    mod_layer: bool,
    by_kind: IdMap<PacketKind, i32>,
    by_raw: IdMap<(State, Direction, i32), PacketKind>,
}

impl PacketPalette {
    pub fn for_version(version: i32, mod_layer: bool) -> Result<PacketPalette, Error> {
        if !(LOWEST_SUPPORTED..=HIGHEST_SUPPORTED).contains(&version) {
            return Err(Error::UnsupportedVersion(version));
        }

        let mut by_kind = IdMap::default();
        for entry in PALETTE_TABLE {
            if version < entry.min || version > entry.max {
                continue;
            }
            for kind in entry.removed {
                by_kind.remove(kind);
            }
            by_kind.extend(entry.ids.iter().copied());
            if mod_layer {
                by_kind.extend(entry.mod_ids.iter().copied());
            }
        }

        let mut by_raw = IdMap::with_capacity_and_hasher(by_kind.len(), Default::default());
        for (&kind, &id) in &by_kind {
            if let Some(other) = by_raw.insert((kind.state(), kind.direction(), id), kind) {
                return Err(Error::Err(format!(
                    "packet id 0x{:02X} claimed by both {:?} and {:?} in protocol {}",
                    id, kind, other, version
                )));
            }
        }

        Ok(PacketPalette {
            version,
            mod_layer,
            by_kind,
            by_raw,
        })
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn mod_layer(&self) -> bool {
        self.mod_layer
    }

    pub fn symbolic_id_for(&self, state: State, dir: Direction, raw: i32) -> Option<PacketKind> {
        self.by_raw.get(&(state, dir, raw)).copied()
    }

    pub fn raw_id_for(&self, kind: PacketKind) -> Option<i32> {
        self.by_kind.get(&kind).copied()
    }
}
