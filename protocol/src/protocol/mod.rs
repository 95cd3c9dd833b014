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

use aes::Aes128;
use cfb8::cipher::{AsyncStreamCipher, NewCipher};
use cfb8::Cfb8;

pub mod mojang;

use crate::format;
use crate::nbt;
use crate::shared::Position;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use log::{debug, trace};
use std::convert;
use std::default;
use std::fmt;
use std::io;
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::str::FromStr;
use std::time::Duration;

pub type Aes128Cfb = Cfb8<Aes128>;

/// Largest frame the vanilla server will ever send (3 byte VarInt).
pub const MAX_PACKET_SIZE: i32 = 2_097_151;

/// Upper bound for a single decompressed packet.
pub const MAX_UNCOMPRESSED_SIZE: i32 = 8_388_608;

/// Helper macro for defining packets.
///
/// Each field may carry a predicate, `field name: Type = pred,` where `pred` is
/// anything callable as `pred(&packet, protocol_version) -> bool`. Fields whose
/// predicate is false are neither read nor written for that version. The
/// helpers in `versions` (`since`, `until`, `between`) cover plain version
/// ranges; closures over the partially read packet cover fields that depend on
/// an earlier flag.
#[macro_export]
macro_rules! state_packets {
     ($($state:ident $stateName:ident {
        $($dir:ident $dirName:ident {
            $(
                $(#[$attr:meta])*
                packet $name:ident {
                    $($(#[$fattr:meta])* field $field:ident: $field_type:ty $(= $cond:expr)?, )*
                }
            )*
        })+
    })+) => {
        use crate::protocol::*;
        use std::io;

        #[derive(Debug, Clone)]
        pub enum Packet {
        $(
            $(
                $(
        $name($state::$dir::$name),
                )*
            )+
        )+
        }

        /// Symbolic name of every packet the client understands.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum PacketKind {
        $(
            $(
                $(
        $name,
                )*
            )+
        )+
        }

        impl PacketKind {
            pub fn state(self) -> State {
                match self {
                $($($(
                    PacketKind::$name => State::$stateName,
                )*)+)+
                }
            }

            pub fn direction(self) -> Direction {
                match self {
                $($($(
                    PacketKind::$name => Direction::$dirName,
                )*)+)+
                }
            }
        }

        impl Packet {
            pub fn kind(&self) -> PacketKind {
                match *self {
                $($($(
                    Packet::$name(_) => PacketKind::$name,
                )*)+)+
                }
            }
        }

        $(
        pub mod $state {

            $(
            pub mod $dir {
                #![allow(unused_imports)]
                use crate::protocol::*;
                use crate::protocol::versions::*;
                use crate::protocol::packet::*;
                use crate::format;
                use crate::nbt;
                use crate::shared::Position;
                use std::io;

                $(
                    #[derive(Default, Debug, Clone)]
                    $(#[$attr])*
                    pub struct $name {
                        $($(#[$fattr])* pub $field: $field_type,)*
                    }

                    impl $name {
                        #[allow(unused_variables)]
                        pub fn read_versioned<R: io::Read>(buf: &mut R, version: i32) -> Result<$name, Error> {
                            #[allow(unused_mut)]
                            let mut packet = $name::default();
                            $(
                                if $crate::field_present!(packet, version $(, $cond)?) {
                                    packet.$field = Serializable::read_from(buf)?;
                                }
                            )*
                            Ok(packet)
                        }
                    }

                    impl PacketType for $name {
                        fn kind(&self) -> PacketKind {
                            PacketKind::$name
                        }

                        #[allow(unused_variables)]
                        fn write<W: io::Write>(&self, buf: &mut W, version: i32) -> Result<(), Error> {
                            $(
                                if $crate::field_present!(*self, version $(, $cond)?) {
                                    self.$field.write_to(buf)?;
                                }
                            )*
                            Ok(())
                        }
                    }
                )*
            }
            )+
        }
        )+

        /// Parses the fields of `kind` from the buffer using the layout of
        /// the given protocol version.
        pub fn read_packet<R: io::Read>(kind: PacketKind, buf: &mut R, version: i32) -> Result<Packet, Error> {
            match kind {
            $($($(
                PacketKind::$name => Ok(Packet::$name($state::$dir::$name::read_versioned(buf, version)?)),
            )*)+)+
            }
        }
    }
}

/// Evaluates an optional field predicate for `state_packets!`.
#[macro_export]
macro_rules! field_present {
    ($packet:expr, $version:expr) => {
        true
    };
    ($packet:expr, $version:expr, $cond:expr) => {
        ($cond)(&$packet, $version)
    };
}

pub mod packet;
pub mod versions;

pub use self::packet::{Packet, PacketKind};
pub use self::versions::PacketPalette;

pub trait Serializable: Sized {
    fn read_from<R: io::Read>(buf: &mut R) -> Result<Self, Error>;
    fn write_to<W: io::Write>(&self, buf: &mut W) -> Result<(), Error>;
}

/// Consumes the rest of the payload.
impl Serializable for Vec<u8> {
    fn read_from<R: io::Read>(buf: &mut R) -> Result<Vec<u8>, Error> {
        let mut v = Vec::new();
        buf.read_to_end(&mut v)?;
        Ok(v)
    }

    fn write_to<W: io::Write>(&self, buf: &mut W) -> Result<(), Error> {
        buf.write_all(&self[..])?;
        Ok(())
    }
}

impl Serializable for Option<nbt::NamedTag> {
    fn read_from<R: io::Read>(buf: &mut R) -> Result<Option<nbt::NamedTag>, Error> {
        let ty = buf.read_u8()?;
        if ty == 0 {
            Ok(None)
        } else {
            let name = nbt::read_string(buf)?;
            let tag = nbt::Tag::read_from(buf)?;
            Ok(Some(nbt::NamedTag(name, tag)))
        }
    }

    fn write_to<W: io::Write>(&self, buf: &mut W) -> Result<(), Error> {
        match *self {
            Some(ref val) => {
                buf.write_u8(10)?;
                nbt::write_string(buf, &val.0)?;
                val.1.write_to(buf)?;
            }
            None => buf.write_u8(0)?,
        }
        Ok(())
    }
}

impl<T> Serializable for Option<T>
where
    T: Serializable,
{
    fn read_from<R: io::Read>(buf: &mut R) -> Result<Option<T>, Error> {
        Ok(Some(T::read_from(buf)?))
    }

    fn write_to<W: io::Write>(&self, buf: &mut W) -> Result<(), Error> {
        if let Some(ref val) = *self {
            val.write_to(buf)?;
        }
        Ok(())
    }
}

fn read_exact_vec<R: io::Read>(buf: &mut R, len: i32) -> Result<Vec<u8>, Error> {
    if !(0..=MAX_PACKET_SIZE).contains(&len) {
        return Err(Error::Err(format!("invalid length prefix {}", len)));
    }
    let mut data = vec![0; len as usize];
    buf.read_exact(&mut data)?;
    Ok(data)
}

impl Serializable for String {
    fn read_from<R: io::Read>(buf: &mut R) -> Result<String, Error> {
        let len = VarInt::read_from(buf)?.0;
        let data = read_exact_vec(buf, len)?;
        String::from_utf8(data).map_err(|_| Error::Err("string is not valid UTF-8".to_owned()))
    }

    fn write_to<W: io::Write>(&self, buf: &mut W) -> Result<(), Error> {
        let bytes = self.as_bytes();
        VarInt(bytes.len() as i32).write_to(buf)?;
        buf.write_all(bytes)?;
        Ok(())
    }
}

impl Serializable for format::Component {
    fn read_from<R: io::Read>(buf: &mut R) -> Result<Self, Error> {
        let raw = String::read_from(buf)?;
        Ok(Self::from_string(&raw))
    }

    fn write_to<W: io::Write>(&self, buf: &mut W) -> Result<(), Error> {
        serde_json::to_string(&self.to_value())?.write_to(buf)
    }
}

impl Serializable for () {
    fn read_from<R: io::Read>(_: &mut R) -> Result<(), Error> {
        Ok(())
    }

    fn write_to<W: io::Write>(&self, _: &mut W) -> Result<(), Error> {
        Ok(())
    }
}

impl Serializable for bool {
    fn read_from<R: io::Read>(buf: &mut R) -> Result<bool, Error> {
        Ok(buf.read_u8()? != 0)
    }

    fn write_to<W: io::Write>(&self, buf: &mut W) -> Result<(), Error> {
        buf.write_u8(u8::from(*self))?;
        Ok(())
    }
}

macro_rules! big_endian_primitive {
    ($($ty:ty => $read:ident, $write:ident;)*) => {
        $(
        impl Serializable for $ty {
            fn read_from<R: io::Read>(buf: &mut R) -> Result<$ty, Error> {
                Ok(buf.$read::<BigEndian>()?)
            }

            fn write_to<W: io::Write>(&self, buf: &mut W) -> Result<(), Error> {
                buf.$write::<BigEndian>(*self)?;
                Ok(())
            }
        }
        )*
    }
}

big_endian_primitive! {
    i16 => read_i16, write_i16;
    i32 => read_i32, write_i32;
    i64 => read_i64, write_i64;
    u16 => read_u16, write_u16;
    u64 => read_u64, write_u64;
    f32 => read_f32, write_f32;
    f64 => read_f64, write_f64;
}

impl Serializable for i8 {
    fn read_from<R: io::Read>(buf: &mut R) -> Result<i8, Error> {
        Ok(buf.read_i8()?)
    }

    fn write_to<W: io::Write>(&self, buf: &mut W) -> Result<(), Error> {
        buf.write_i8(*self)?;
        Ok(())
    }
}

impl Serializable for u8 {
    fn read_from<R: io::Read>(buf: &mut R) -> Result<u8, Error> {
        Ok(buf.read_u8()?)
    }

    fn write_to<W: io::Write>(&self, buf: &mut W) -> Result<(), Error> {
        buf.write_u8(*self)?;
        Ok(())
    }
}

/// Block position packed into a long as `x:26 z:26 y:12` (1.14 onwards).
impl Serializable for Position {
    fn read_from<R: io::Read>(buf: &mut R) -> Result<Position, Error> {
        let val = buf.read_i64::<BigEndian>()?;
        Ok(Position::new(
            (val >> 38) as i32,
            ((val << 52) >> 52) as i32,
            ((val << 26) >> 38) as i32,
        ))
    }

    fn write_to<W: io::Write>(&self, buf: &mut W) -> Result<(), Error> {
        let val = ((self.x as u64 & 0x3FF_FFFF) << 38)
            | ((self.z as u64 & 0x3FF_FFFF) << 12)
            | (self.y as u64 & 0xFFF);
        buf.write_u64::<BigEndian>(val)?;
        Ok(())
    }
}

/// Block position packed as `x:26 y:12 z:26`, used before 1.14.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct LegacyPosition(pub Position);

impl Serializable for LegacyPosition {
    fn read_from<R: io::Read>(buf: &mut R) -> Result<LegacyPosition, Error> {
        let val = buf.read_i64::<BigEndian>()?;
        Ok(LegacyPosition(Position::new(
            (val >> 38) as i32,
            ((val << 26) >> 52) as i32,
            ((val << 38) >> 38) as i32,
        )))
    }

    fn write_to<W: io::Write>(&self, buf: &mut W) -> Result<(), Error> {
        let pos = self.0;
        let val = ((pos.x as u64 & 0x3FF_FFFF) << 38)
            | ((pos.y as u64 & 0xFFF) << 26)
            | (pos.z as u64 & 0x3FF_FFFF);
        buf.write_u64::<BigEndian>(val)?;
        Ok(())
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct UUID(pub u64, pub u64);

impl fmt::Debug for UUID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for UUID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:04x}-{:012x}",
            self.0 >> 32,
            (self.0 >> 16) & 0xFFFF,
            self.0 & 0xFFFF,
            self.1 >> 48,
            self.1 & 0xFFFF_FFFF_FFFF
        )
    }
}

impl FromStr for UUID {
    type Err = Error;

    /// Accepts both the hyphenated and the bare 32 digit form.
    fn from_str(s: &str) -> Result<UUID, Error> {
        let digits: String = s.chars().filter(|c| *c != '-').collect();
        if digits.len() != 32 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::Err(format!("invalid UUID {:?}", s)));
        }
        let parse = |part: &str| {
            u64::from_str_radix(part, 16).map_err(|_| Error::Err(format!("invalid UUID {:?}", s)))
        };
        Ok(UUID(parse(&digits[..16])?, parse(&digits[16..])?))
    }
}

impl Serializable for UUID {
    fn read_from<R: io::Read>(buf: &mut R) -> Result<UUID, Error> {
        Ok(UUID(
            buf.read_u64::<BigEndian>()?,
            buf.read_u64::<BigEndian>()?,
        ))
    }

    fn write_to<W: io::Write>(&self, buf: &mut W) -> Result<(), Error> {
        buf.write_u64::<BigEndian>(self.0)?;
        buf.write_u64::<BigEndian>(self.1)?;
        Ok(())
    }
}

pub trait Lengthable: Serializable + Copy + Default {
    fn into_len(self) -> usize;
    fn from_len(_: usize) -> Self;
}

#[derive(Clone)]
pub struct LenPrefixed<L: Lengthable, V> {
    len: L,
    pub data: Vec<V>,
}

impl<L: Lengthable, V> LenPrefixed<L, V> {
    pub fn new(data: Vec<V>) -> LenPrefixed<L, V> {
        LenPrefixed {
            len: Default::default(),
            data,
        }
    }
}

impl<L: Lengthable, V: Serializable> Serializable for LenPrefixed<L, V> {
    fn read_from<R: io::Read>(buf: &mut R) -> Result<LenPrefixed<L, V>, Error> {
        let len_data: L = Serializable::read_from(buf)?;
        let len: usize = len_data.into_len();
        if len > MAX_PACKET_SIZE as usize {
            return Err(Error::Err(format!("array length {} out of range", len)));
        }
        let mut data: Vec<V> = Vec::with_capacity(len.min(4096));
        for _ in 0..len {
            data.push(Serializable::read_from(buf)?);
        }
        Ok(LenPrefixed {
            len: len_data,
            data,
        })
    }

    fn write_to<W: io::Write>(&self, buf: &mut W) -> Result<(), Error> {
        let len_data: L = L::from_len(self.data.len());
        len_data.write_to(buf)?;
        for val in &self.data {
            val.write_to(buf)?;
        }
        Ok(())
    }
}

impl<L: Lengthable, V> Default for LenPrefixed<L, V> {
    fn default() -> Self {
        LenPrefixed {
            len: default::Default::default(),
            data: default::Default::default(),
        }
    }
}

impl<L: Lengthable, V: fmt::Debug> fmt::Debug for LenPrefixed<L, V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.data.fmt(f)
    }
}

// Optimization
#[derive(Clone)]
pub struct LenPrefixedBytes<L: Lengthable> {
    len: L,
    pub data: Vec<u8>,
}

impl<L: Lengthable> LenPrefixedBytes<L> {
    pub fn new(data: Vec<u8>) -> LenPrefixedBytes<L> {
        LenPrefixedBytes {
            len: Default::default(),
            data,
        }
    }
}

impl<L: Lengthable> Serializable for LenPrefixedBytes<L> {
    fn read_from<R: io::Read>(buf: &mut R) -> Result<LenPrefixedBytes<L>, Error> {
        let len_data: L = Serializable::read_from(buf)?;
        let data = read_exact_vec(buf, len_data.into_len() as i32)?;
        Ok(LenPrefixedBytes {
            len: len_data,
            data,
        })
    }

    fn write_to<W: io::Write>(&self, buf: &mut W) -> Result<(), Error> {
        let len_data: L = L::from_len(self.data.len());
        len_data.write_to(buf)?;
        buf.write_all(&self.data[..])?;
        Ok(())
    }
}

impl<L: Lengthable> Default for LenPrefixedBytes<L> {
    fn default() -> Self {
        LenPrefixedBytes {
            len: default::Default::default(),
            data: default::Default::default(),
        }
    }
}

impl<L: Lengthable> fmt::Debug for LenPrefixedBytes<L> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<{} bytes>", self.data.len())
    }
}

impl Lengthable for i16 {
    fn into_len(self) -> usize {
        self.max(0) as usize
    }

    fn from_len(u: usize) -> i16 {
        u as i16
    }
}

impl Lengthable for i32 {
    fn into_len(self) -> usize {
        self.max(0) as usize
    }

    fn from_len(u: usize) -> i32 {
        u as i32
    }
}

/// `VarInt` have a variable size (between 1 and 5 bytes) when encoded based
/// on the size of the number
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct VarInt(pub i32);

impl Lengthable for VarInt {
    fn into_len(self) -> usize {
        self.0.max(0) as usize
    }

    fn from_len(u: usize) -> VarInt {
        VarInt(u as i32)
    }
}

impl Serializable for VarInt {
    /// Decodes a `VarInt` from the Reader
    fn read_from<R: io::Read>(buf: &mut R) -> Result<VarInt, Error> {
        const PART: u32 = 0x7F;
        let mut size = 0;
        let mut val = 0u32;
        loop {
            let b = buf.read_u8()? as u32;
            val |= (b & PART) << (size * 7);
            size += 1;
            if (b & 0x80) == 0 {
                break;
            }
            if size >= 5 {
                return Err(Error::Err("VarInt too big".to_owned()));
            }
        }

        Ok(VarInt(val as i32))
    }

    /// Encodes a `VarInt` into the Writer
    fn write_to<W: io::Write>(&self, buf: &mut W) -> Result<(), Error> {
        const PART: u32 = 0x7F;
        let mut val = self.0 as u32;
        loop {
            if (val & !PART) == 0 {
                buf.write_u8(val as u8)?;
                return Ok(());
            }
            buf.write_u8(((val & PART) | 0x80) as u8)?;
            val >>= 7;
        }
    }
}

impl fmt::Debug for VarInt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `VarLong` have a variable size (between 1 and 10 bytes) when encoded based
/// on the size of the number
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct VarLong(pub i64);

impl Lengthable for VarLong {
    fn into_len(self) -> usize {
        self.0.max(0) as usize
    }

    fn from_len(u: usize) -> VarLong {
        VarLong(u as i64)
    }
}

impl Serializable for VarLong {
    /// Decodes a `VarLong` from the Reader
    fn read_from<R: io::Read>(buf: &mut R) -> Result<VarLong, Error> {
        const PART: u64 = 0x7F;
        let mut size = 0;
        let mut val = 0u64;
        loop {
            let b = buf.read_u8()? as u64;
            val |= (b & PART) << (size * 7);
            size += 1;
            if (b & 0x80) == 0 {
                break;
            }
            if size >= 10 {
                return Err(Error::Err("VarLong too big".to_owned()));
            }
        }

        Ok(VarLong(val as i64))
    }

    /// Encodes a `VarLong` into the Writer
    fn write_to<W: io::Write>(&self, buf: &mut W) -> Result<(), Error> {
        const PART: u64 = 0x7F;
        let mut val = self.0 as u64;
        loop {
            if (val & !PART) == 0 {
                buf.write_u8(val as u8)?;
                return Ok(());
            }
            buf.write_u8(((val & PART) | 0x80) as u8)?;
            val >>= 7;
        }
    }
}

impl fmt::Debug for VarLong {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Direction is used to define whether packets are going to the
/// server or the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Serverbound,
    Clientbound,
}

impl Direction {
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Serverbound => Direction::Clientbound,
            Direction::Clientbound => Direction::Serverbound,
        }
    }
}

/// The protocol has multiple 'sub-protocols' or states which control which
/// packet an id points to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum State {
    Handshaking,
    Login,
    Play,
}

/// Return for any protocol related error.
#[derive(Debug)]
pub enum Error {
    Err(String),
    Disconnect(format::Component),
    IOError(io::Error),
    Json(serde_json::Error),
    #[cfg(not(target_arch = "wasm32"))]
    Reqwest(reqwest::Error),
    UnsupportedVersion(i32),
    UnknownPacketKind {
        kind: PacketKind,
        version: i32,
    },
    PaletteRange {
        local_id: usize,
        palette_len: usize,
        bits: u8,
        x: usize,
        y: usize,
        z: usize,
    },
    Decode {
        packet_id: i32,
        version: i32,
        state: State,
        cause: Box<Error>,
    },
    Authentication(String),
    Config(String),
}

impl Error {
    /// Transport level failures end the connection rather than a single
    /// packet.
    pub fn is_connection_lost(&self) -> bool {
        matches!(*self, Error::IOError(_))
    }

    /// Errors the server sent or caused on purpose while logging in.
    pub fn is_login_rejection(&self) -> bool {
        matches!(*self, Error::Disconnect(_) | Error::Authentication(_))
    }

    pub fn with_context(self, packet_id: i32, version: i32, state: State) -> Error {
        Error::Decode {
            packet_id,
            version,
            state,
            cause: Box::new(self),
        }
    }
}

impl convert::From<io::Error> for Error {
    fn from(e: io::Error) -> Error {
        Error::IOError(e)
    }
}

impl convert::From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Error {
        Error::Json(e)
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl convert::From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Error {
        Error::Reqwest(e)
    }
}

impl ::std::error::Error for Error {}

impl ::std::fmt::Display for Error {
    fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
        match *self {
            Error::Err(ref val) => write!(f, "protocol error: {}", val),
            Error::Disconnect(ref val) => write!(f, "{}", val),
            Error::IOError(ref e) => e.fmt(f),
            Error::Json(ref e) => e.fmt(f),
            #[cfg(not(target_arch = "wasm32"))]
            Error::Reqwest(ref e) => e.fmt(f),
            Error::UnsupportedVersion(version) => {
                write!(f, "unsupported protocol version {}", version)
            }
            Error::UnknownPacketKind { kind, version } => {
                write!(f, "{:?} does not exist in protocol {}", kind, version)
            }
            Error::PaletteRange {
                local_id,
                palette_len,
                bits,
                x,
                y,
                z,
            } => write!(
                f,
                "palette index {} out of range (palette has {} entries, {} bits) at {},{},{}",
                local_id, palette_len, bits, x, y, z
            ),
            Error::Decode {
                packet_id,
                version,
                state,
                ref cause,
            } => write!(
                f,
                "failed to decode packet 0x{:X} ({:?}, protocol {}): {}",
                packet_id, state, version, cause
            ),
            Error::Authentication(ref msg) => write!(f, "authentication failed: {}", msg),
            Error::Config(ref msg) => write!(f, "invalid configuration: {}", msg),
        }
    }
}

pub trait PacketType {
    fn kind(&self) -> PacketKind;

    fn write<W: io::Write>(&self, buf: &mut W, version: i32) -> Result<(), Error>;
}

/// Wraps a packet body (`VarInt id ++ payload`) in its frame.
///
/// With compression active (`threshold > 0`) the body is preceded by its
/// uncompressed length and deflated when it is at least `threshold` bytes;
/// shorter bodies carry a zero length marker instead.
pub fn frame_packet(body: &[u8], threshold: i32) -> Result<Vec<u8>, Error> {
    let mut inner = Vec::with_capacity(body.len() + 5);
    if threshold > 0 {
        if body.len() >= threshold as usize {
            VarInt(body.len() as i32).write_to(&mut inner)?;
            let mut encoder = ZlibEncoder::new(inner, Compression::default());
            encoder.write_all(body)?;
            inner = encoder.finish()?;
        } else {
            VarInt(0).write_to(&mut inner)?;
            inner.extend_from_slice(body);
        }
    } else {
        inner.extend_from_slice(body);
    }

    let mut frame = Vec::with_capacity(inner.len() + 5);
    VarInt(inner.len() as i32).write_to(&mut frame)?;
    frame.extend_from_slice(&inner);
    Ok(frame)
}

/// Reverses the compression half of `frame_packet` for an already length
/// delimited frame.
pub fn unframe_body(frame: Vec<u8>, threshold: i32) -> Result<Vec<u8>, Error> {
    if threshold <= 0 {
        return Ok(frame);
    }
    let mut cursor = io::Cursor::new(frame);
    let uncompressed_size = VarInt::read_from(&mut cursor)?.0;
    let start = cursor.position() as usize;
    let frame = cursor.into_inner();
    if uncompressed_size == 0 {
        return Ok(frame[start..].to_vec());
    }
    if !(0..=MAX_UNCOMPRESSED_SIZE).contains(&uncompressed_size) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("bad uncompressed length {}", uncompressed_size),
        )
        .into());
    }

    let mut body = Vec::with_capacity(uncompressed_size as usize);
    ZlibDecoder::new(&frame[start..])
        .take(uncompressed_size as u64 + 1)
        .read_to_end(&mut body)?;
    if body.len() != uncompressed_size as usize {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "inflated {} bytes but the frame declared {}",
                body.len(),
                uncompressed_size
            ),
        )
        .into());
    }
    Ok(body)
}

/// A framed, optionally compressed and encrypted packet stream.
///
/// `direction` is the direction of packets this end writes, so a client
/// connection is `Serverbound` and reads `Clientbound` packets.
pub struct Conn<S = TcpStream> {
    stream: S,
    pub host: String,
    pub port: u16,
    direction: Direction,
    pub state: State,

    cipher_read: Option<Aes128Cfb>,
    cipher_write: Option<Aes128Cfb>,

    compression_threshold: i32,
}

impl Conn<TcpStream> {
    pub fn connect(target: &str, read_timeout: Option<Duration>) -> Result<Conn, Error> {
        let (host, port) = match target.rsplit_once(':') {
            Some((host, port)) => (
                host.to_owned(),
                port.parse()
                    .map_err(|_| Error::Config(format!("invalid port in {:?}", target)))?,
            ),
            None => (target.to_owned(), 25565),
        };
        let addr = (host.as_str(), port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| Error::Err(format!("could not resolve {}", host)))?;
        let stream = match read_timeout {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout)?,
            None => TcpStream::connect(addr)?,
        };
        stream.set_read_timeout(read_timeout)?;
        stream.set_nodelay(true)?;
        debug!("Connected to {} ({})", target, addr);
        let mut conn = Conn::new(stream, Direction::Serverbound);
        conn.host = host;
        conn.port = port;
        Ok(conn)
    }

    /// Splits the connection into a read half and a write half, each owning
    /// its own cipher state.
    pub fn split(self) -> Result<(Conn, Conn), Error> {
        let write_stream = self.stream.try_clone()?;
        let write = Conn {
            stream: write_stream,
            host: self.host.clone(),
            port: self.port,
            direction: self.direction,
            state: self.state,
            cipher_read: None,
            cipher_write: self.cipher_write,
            compression_threshold: self.compression_threshold,
        };
        let read = Conn {
            stream: self.stream,
            host: self.host,
            port: self.port,
            direction: self.direction,
            state: self.state,
            cipher_read: self.cipher_read,
            cipher_write: None,
            compression_threshold: self.compression_threshold,
        };
        Ok((read, write))
    }
}

impl<S> Conn<S> {
    pub fn new(stream: S, direction: Direction) -> Conn<S> {
        Conn {
            stream,
            host: String::new(),
            port: 0,
            direction,
            state: State::Handshaking,
            cipher_read: None,
            cipher_write: None,
            compression_threshold: 0,
        }
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn compression_threshold(&self) -> i32 {
        self.compression_threshold
    }

    pub fn is_encrypted(&self) -> bool {
        self.cipher_read.is_some() || self.cipher_write.is_some()
    }

    pub fn enable_encyption(&mut self, key: &[u8]) -> Result<(), Error> {
        let new_cipher = || {
            Aes128Cfb::new_from_slices(key, key)
                .map_err(|_| Error::Err(format!("bad shared secret length {}", key.len())))
        };
        self.cipher_read = Some(new_cipher()?);
        self.cipher_write = Some(new_cipher()?);
        Ok(())
    }

    pub fn set_compresssion(&mut self, threshold: i32) {
        self.compression_threshold = threshold;
    }
}

impl<S: Write> Conn<S> {
    pub fn write_raw_packet(&mut self, id: i32, payload: &[u8]) -> Result<(), Error> {
        let mut body = Vec::with_capacity(payload.len() + 5);
        VarInt(id).write_to(&mut body)?;
        body.extend_from_slice(payload);
        let frame = frame_packet(&body, self.compression_threshold)?;
        self.write_all(&frame)?;
        self.flush()?;
        Ok(())
    }

    pub fn write_packet<T: PacketType>(
        &mut self,
        palette: &PacketPalette,
        packet: &T,
    ) -> Result<(), Error> {
        let kind = packet.kind();
        let id = palette
            .raw_id_for(kind)
            .ok_or(Error::UnknownPacketKind {
                kind,
                version: palette.version(),
            })?;
        let mut payload = Vec::new();
        packet.write(&mut payload, palette.version())?;
        trace!("-> {:?} (0x{:02X}, {} bytes)", kind, id, payload.len());
        self.write_raw_packet(id, &payload)
    }
}

impl<S: Read> Conn<S> {
    /// Reads one frame and returns its raw id and payload.
    pub fn read_raw_packet(&mut self) -> Result<(i32, Vec<u8>), Error> {
        let len = VarInt::read_from(self)?.0;
        if !(1..=MAX_PACKET_SIZE).contains(&len) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("bad frame length {}", len),
            )
            .into());
        }
        let mut frame = vec![0; len as usize];
        self.read_exact(&mut frame)?;

        let body = unframe_body(frame, self.compression_threshold)?;
        let mut cursor = io::Cursor::new(body);
        let id = VarInt::read_from(&mut cursor)?.0;
        let start = cursor.position() as usize;
        let mut payload = cursor.into_inner();
        payload.drain(..start);
        Ok((id, payload))
    }

    /// Reads the next packet. Packets whose id has no kind in the palette are
    /// skipped and reported as `None`.
    pub fn read_packet(&mut self, palette: &PacketPalette) -> Result<Option<Packet>, Error> {
        let (id, payload) = self.read_raw_packet()?;
        packet::decode_payload(palette, self.state, self.direction.opposite(), id, &payload)
    }
}

impl<S: Read> Read for Conn<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.cipher_read.as_mut() {
            Option::None => self.stream.read(buf),
            Option::Some(cipher) => {
                let ret = self.stream.read(buf)?;
                cipher.decrypt(&mut buf[..ret]);
                Ok(ret)
            }
        }
    }
}

impl<S: Write> Write for Conn<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.cipher_write.as_mut() {
            Option::None => self.stream.write(buf),
            Option::Some(cipher) => {
                let mut data = buf.to_vec();
                cipher.encrypt(&mut data);
                self.stream.write_all(&data)?;
                Ok(buf.len())
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn encode<T: Serializable>(val: &T) -> Vec<u8> {
        let mut buf = Vec::new();
        val.write_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn varint_boundaries() {
        let cases: &[(i32, &[u8])] = &[
            (0, &[0x00]),
            (127, &[0x7F]),
            (128, &[0x80, 0x01]),
            (255, &[0xFF, 0x01]),
            (2_147_483_647, &[0xFF, 0xFF, 0xFF, 0xFF, 0x07]),
            (-1, &[0xFF, 0xFF, 0xFF, 0xFF, 0x0F]),
        ];
        for &(val, bytes) in cases {
            assert_eq!(encode(&VarInt(val)), bytes, "encoding {}", val);
            let decoded = VarInt::read_from(&mut io::Cursor::new(bytes)).unwrap();
            assert_eq!(decoded.0, val);
        }
    }

    #[test]
    fn varint_round_trips_unsigned_range() {
        let mut n: u64 = 0;
        while n <= u32::MAX as u64 {
            let val = n as u32 as i32;
            let buf = encode(&VarInt(val));
            assert!(buf.len() <= 5);
            let decoded = VarInt::read_from(&mut io::Cursor::new(&buf)).unwrap();
            assert_eq!(decoded.0 as u32, n as u32);
            n = n * 3 + 1;
        }
    }

    #[test]
    fn varint_rejects_six_bytes() {
        let bytes = [0x80, 0x80, 0x80, 0x80, 0x80, 0x01];
        assert!(VarInt::read_from(&mut io::Cursor::new(&bytes[..])).is_err());
    }

    #[test]
    fn varlong_negative() {
        let buf = encode(&VarLong(-1));
        assert_eq!(buf.len(), 10);
        let decoded = VarLong::read_from(&mut io::Cursor::new(&buf)).unwrap();
        assert_eq!(decoded.0, -1);
    }

    #[test]
    fn truncated_string_is_an_error() {
        let mut buf = encode(&"hello".to_owned());
        buf.truncate(4);
        assert!(String::read_from(&mut io::Cursor::new(&buf)).is_err());
    }

    #[test]
    fn uuid_text_forms() {
        let uuid: UUID = "069a79f4-44e9-4726-a5be-fca90e38aaf5".parse().unwrap();
        assert_eq!(uuid, "069a79f444e94726a5befca90e38aaf5".parse().unwrap());
        assert_eq!(uuid.to_string(), "069a79f4-44e9-4726-a5be-fca90e38aaf5");
        let bytes = encode(&uuid);
        assert_eq!(&bytes[..4], &[0x06, 0x9a, 0x79, 0xf4]);
        assert!("nope".parse::<UUID>().is_err());
    }

    #[test]
    fn uuid_rejects_non_hex_text() {
        let wide = format!("a{}a", "\u{e9}".repeat(15));
        assert_eq!(wide.len(), 32);
        assert!(wide.parse::<UUID>().is_err());
        assert!("+69a79f444e94726a5befca90e38aaf5".parse::<UUID>().is_err());
    }

    #[test]
    fn position_packing() {
        let pos = Position::new(-33, -60, 1_000_000);
        let modern = encode(&pos);
        assert_eq!(Position::read_from(&mut io::Cursor::new(&modern)).unwrap(), pos);

        let legacy = encode(&LegacyPosition(Position::new(18357644, 831, -20882616)));
        assert_eq!(
            legacy,
            [0x46, 0x07, 0x63, 0x0C, 0xFE, 0xC1, 0x5B, 0x48]
        );
        let back = LegacyPosition::read_from(&mut io::Cursor::new(&legacy)).unwrap();
        assert_eq!(back.0, Position::new(18357644, 831, -20882616));
    }

    #[test]
    fn framing_round_trip_with_compression() {
        let threshold = 256;
        for size in [0usize, 1, 255, 256, 257, 5000] {
            let body: Vec<u8> = (0..size).map(|i| (i % 7) as u8).collect();
            let frame = frame_packet(&body, threshold).unwrap();

            let mut cursor = io::Cursor::new(&frame);
            let len = VarInt::read_from(&mut cursor).unwrap().0 as usize;
            let start = cursor.position() as usize;
            assert_eq!(frame.len() - start, len);

            let inner = frame[start..].to_vec();
            let marker = VarInt::read_from(&mut io::Cursor::new(&inner)).unwrap().0;
            if size >= threshold as usize {
                assert_eq!(marker as usize, size);
            } else {
                assert_eq!(marker, 0);
            }
            assert_eq!(unframe_body(inner, threshold).unwrap(), body);
        }
    }

    #[test]
    fn framing_without_compression_has_no_marker() {
        let frame = frame_packet(&[0x01, 0x02], 0).unwrap();
        assert_eq!(frame, [0x02, 0x01, 0x02]);
        let frame = frame_packet(&[0x01, 0x02], -1).unwrap();
        assert_eq!(frame, [0x02, 0x01, 0x02]);
    }

    #[test]
    fn bad_zlib_data_is_a_transport_error() {
        let mut inner = encode(&VarInt(300));
        inner.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
        let err = unframe_body(inner, 64).unwrap_err();
        assert!(err.is_connection_lost(), "{:?}", err);
    }

    #[test]
    fn inflated_length_must_match() {
        let body = vec![7u8; 400];
        let frame = frame_packet(&body, 64).unwrap();
        let mut cursor = io::Cursor::new(&frame);
        VarInt::read_from(&mut cursor).unwrap();
        let start = cursor.position() as usize;
        let mut inner = frame[start..].to_vec();
        // Claim one byte more than the stream inflates to.
        let mut lying = encode(&VarInt(401));
        let mut marker_len = 0;
        while inner[marker_len] & 0x80 != 0 {
            marker_len += 1;
        }
        lying.extend_from_slice(&inner.split_off(marker_len + 1));
        assert!(unframe_body(lying, 64).is_err());
    }

    #[test]
    fn encrypted_stream_round_trip() {
        let key = [0x2Au8; 16];
        let mut writer = Conn::new(Vec::new(), Direction::Serverbound);
        writer.enable_encyption(&key).unwrap();
        writer.set_compresssion(16);
        writer.write_raw_packet(0x05, &[9u8; 40]).unwrap();
        writer.write_raw_packet(0x06, b"hi").unwrap();
        let wire = writer.stream.clone();
        assert!(!wire.windows(2).any(|w| w == b"hi"));

        let mut reader = Conn::new(io::Cursor::new(wire), Direction::Clientbound);
        reader.enable_encyption(&key).unwrap();
        reader.set_compresssion(16);
        assert_eq!(reader.read_raw_packet().unwrap(), (0x05, vec![9u8; 40]));
        assert_eq!(reader.read_raw_packet().unwrap(), (0x06, b"hi".to_vec()));
        assert!(reader.read_raw_packet().unwrap_err().is_connection_lost());
    }
}
