//! NBT (Named Binary Tag) for the Bedrock protocol.
//!
//! Bedrock uses two encodings of the same tag tree: the network flavor (var-int
//! lengths and zigzag var-int ints/longs) used inside packets, and the plain
//! little-endian flavor used on disk and for block state hashing.

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt};
use serde::{Deserialize, Serialize};

use crate::{
    Decode, Encode, ProtocolError, Result, read_bytes, read_varint32, read_varint64, read_varuint32,
};

/// Deepest tag nesting accepted while reading
pub const MAX_DEPTH: usize = 512;

/// NBT tag type IDs
mod tag_type {
    pub const END: u8 = 0;
    pub const BYTE: u8 = 1;
    pub const SHORT: u8 = 2;
    pub const INT: u8 = 3;
    pub const LONG: u8 = 4;
    pub const FLOAT: u8 = 5;
    pub const DOUBLE: u8 = 6;
    pub const BYTE_ARRAY: u8 = 7;
    pub const STRING: u8 = 8;
    pub const LIST: u8 = 9;
    pub const COMPOUND: u8 = 10;
    pub const INT_ARRAY: u8 = 11;
    pub const LONG_ARRAY: u8 = 12;
}

/// Which of the two Bedrock NBT encodings to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NbtFlavor {
    /// Var-int lengths, zigzag ints and longs (packets)
    Network,
    /// Fixed-width little-endian (files, block hashing)
    LittleEndian,
}

/// An NBT value
#[derive(Debug, Clone, PartialEq)]
pub enum NbtValue {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<i8>),
    String(String),
    List(NbtList),
    Compound(NbtCompound),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

/// An NBT list (all elements must be same type)
#[derive(Debug, Clone, PartialEq)]
pub enum NbtList {
    Empty,
    Byte(Vec<i8>),
    Short(Vec<i16>),
    Int(Vec<i32>),
    Long(Vec<i64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    ByteArray(Vec<Vec<i8>>),
    String(Vec<String>),
    List(Vec<NbtList>),
    Compound(Vec<NbtCompound>),
    IntArray(Vec<Vec<i32>>),
    LongArray(Vec<Vec<i64>>),
}

/// An NBT compound (ordered map of string -> value)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NbtCompound {
    entries: Vec<(String, NbtValue)>,
}

impl NbtCompound {
    /// Create a new empty compound
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Insert a value into the compound
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<NbtValue>) {
        self.entries.push((key.into(), value.into()));
    }

    /// Build a compound from entries
    #[must_use]
    pub fn from_entries(entries: Vec<(String, NbtValue)>) -> Self {
        Self { entries }
    }

    /// Look up the first value stored under `key`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&NbtValue> {
        self.entries
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }

    #[must_use]
    pub fn entries(&self) -> &[(String, NbtValue)] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy of this compound with its entries ordered by key
    #[must_use]
    pub fn sorted(&self) -> Self {
        let mut entries = self.entries.clone();
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));
        Self { entries }
    }

    /// Serialize as a nameless root tag (type byte + empty name + content).
    ///
    /// Fails when a string or array is longer than the flavor's length prefix
    /// can express.
    pub fn to_bytes(&self, flavor: NbtFlavor) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        buf.push(tag_type::COMPOUND);
        write_nbt_string(&mut buf, flavor, "")?;
        self.write_content(&mut buf, flavor)?;
        Ok(buf)
    }

    /// Serialize to network NBT format
    pub fn to_network_bytes(&self) -> Result<Vec<u8>> {
        self.to_bytes(NbtFlavor::Network)
    }

    /// Read a root tag that must be a compound; returns the root name as well
    pub fn read_root<R: Read>(reader: &mut R, flavor: NbtFlavor) -> Result<(String, Self)> {
        let (name, value) = read_root_value(reader, flavor)?;
        match value {
            NbtValue::Compound(compound) => Ok((name, compound)),
            other => Err(ProtocolError::InvalidNbtTag(other.type_id())),
        }
    }

    /// Write compound content (entries + end tag)
    fn write_content(&self, buf: &mut Vec<u8>, flavor: NbtFlavor) -> Result<()> {
        for (name, value) in &self.entries {
            value.write_named(buf, flavor, name)?;
        }
        buf.push(tag_type::END);
        Ok(())
    }

    fn read_content<R: Read>(reader: &mut R, flavor: NbtFlavor, depth: usize) -> Result<Self> {
        let mut entries = Vec::new();
        loop {
            let tag = reader.read_u8()?;
            if tag == tag_type::END {
                return Ok(Self { entries });
            }
            let name = read_nbt_string(reader, flavor)?;
            let value = NbtValue::read_content(reader, flavor, tag, depth + 1)?;
            entries.push((name, value));
        }
    }
}

/// Read any root tag (type byte + name + content)
pub fn read_root_value<R: Read>(reader: &mut R, flavor: NbtFlavor) -> Result<(String, NbtValue)> {
    let tag = reader.read_u8()?;
    if tag == tag_type::END {
        return Err(ProtocolError::InvalidNbtTag(tag));
    }
    let name = read_nbt_string(reader, flavor)?;
    let value = NbtValue::read_content(reader, flavor, tag, 0)?;
    Ok((name, value))
}

impl NbtValue {
    /// Get the type ID for this value
    fn type_id(&self) -> u8 {
        match self {
            Self::Byte(_) => tag_type::BYTE,
            Self::Short(_) => tag_type::SHORT,
            Self::Int(_) => tag_type::INT,
            Self::Long(_) => tag_type::LONG,
            Self::Float(_) => tag_type::FLOAT,
            Self::Double(_) => tag_type::DOUBLE,
            Self::ByteArray(_) => tag_type::BYTE_ARRAY,
            Self::String(_) => tag_type::STRING,
            Self::List(_) => tag_type::LIST,
            Self::Compound(_) => tag_type::COMPOUND,
            Self::IntArray(_) => tag_type::INT_ARRAY,
            Self::LongArray(_) => tag_type::LONG_ARRAY,
        }
    }

    /// Write a named tag (type + name + value)
    fn write_named(&self, buf: &mut Vec<u8>, flavor: NbtFlavor, name: &str) -> Result<()> {
        buf.push(self.type_id());
        write_nbt_string(buf, flavor, name)?;
        self.write_content(buf, flavor)
    }

    /// Write the tag content (no type, no name)
    fn write_content(&self, buf: &mut Vec<u8>, flavor: NbtFlavor) -> Result<()> {
        match self {
            Self::Byte(v) => buf.push(*v as u8),
            Self::Short(v) => buf.extend_from_slice(&v.to_le_bytes()),
            Self::Int(v) => write_int(buf, flavor, *v),
            Self::Long(v) => write_long(buf, flavor, *v),
            Self::Float(v) => buf.extend_from_slice(&v.to_le_bytes()),
            Self::Double(v) => buf.extend_from_slice(&v.to_le_bytes()),
            Self::ByteArray(v) => {
                write_len(buf, flavor, v.len())?;
                buf.extend(v.iter().map(|b| *b as u8));
            }
            Self::String(v) => write_nbt_string(buf, flavor, v)?,
            Self::List(list) => list.write_content(buf, flavor)?,
            Self::Compound(compound) => compound.write_content(buf, flavor)?,
            Self::IntArray(v) => {
                write_len(buf, flavor, v.len())?;
                for i in v {
                    write_int(buf, flavor, *i);
                }
            }
            Self::LongArray(v) => {
                write_len(buf, flavor, v.len())?;
                for l in v {
                    write_long(buf, flavor, *l);
                }
            }
        }
        Ok(())
    }

    fn read_content<R: Read>(
        reader: &mut R,
        flavor: NbtFlavor,
        tag: u8,
        depth: usize,
    ) -> Result<Self> {
        if depth > MAX_DEPTH {
            return Err(ProtocolError::NbtTooDeep(MAX_DEPTH));
        }

        Ok(match tag {
            tag_type::BYTE => Self::Byte(reader.read_i8()?),
            tag_type::SHORT => Self::Short(reader.read_i16::<LittleEndian>()?),
            tag_type::INT => Self::Int(read_int(reader, flavor)?),
            tag_type::LONG => Self::Long(read_long(reader, flavor)?),
            tag_type::FLOAT => Self::Float(reader.read_f32::<LittleEndian>()?),
            tag_type::DOUBLE => Self::Double(reader.read_f64::<LittleEndian>()?),
            tag_type::BYTE_ARRAY => Self::ByteArray(read_byte_array(reader, flavor)?),
            tag_type::STRING => Self::String(read_nbt_string(reader, flavor)?),
            tag_type::LIST => Self::List(NbtList::read_content(reader, flavor, depth)?),
            tag_type::COMPOUND => {
                Self::Compound(NbtCompound::read_content(reader, flavor, depth)?)
            }
            tag_type::INT_ARRAY => {
                let len = read_len(reader, flavor)?;
                Self::IntArray(read_n(len, || read_int(reader, flavor))?)
            }
            tag_type::LONG_ARRAY => {
                let len = read_len(reader, flavor)?;
                Self::LongArray(read_n(len, || read_long(reader, flavor))?)
            }
            other => return Err(ProtocolError::InvalidNbtTag(other)),
        })
    }
}

impl NbtList {
    /// Get the element type ID
    fn element_type_id(&self) -> u8 {
        match self {
            Self::Empty => tag_type::END,
            Self::Byte(_) => tag_type::BYTE,
            Self::Short(_) => tag_type::SHORT,
            Self::Int(_) => tag_type::INT,
            Self::Long(_) => tag_type::LONG,
            Self::Float(_) => tag_type::FLOAT,
            Self::Double(_) => tag_type::DOUBLE,
            Self::ByteArray(_) => tag_type::BYTE_ARRAY,
            Self::String(_) => tag_type::STRING,
            Self::List(_) => tag_type::LIST,
            Self::Compound(_) => tag_type::COMPOUND,
            Self::IntArray(_) => tag_type::INT_ARRAY,
            Self::LongArray(_) => tag_type::LONG_ARRAY,
        }
    }

    /// Get the length
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Byte(v) => v.len(),
            Self::Short(v) => v.len(),
            Self::Int(v) => v.len(),
            Self::Long(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Double(v) => v.len(),
            Self::ByteArray(v) => v.len(),
            Self::String(v) => v.len(),
            Self::List(v) => v.len(),
            Self::Compound(v) => v.len(),
            Self::IntArray(v) => v.len(),
            Self::LongArray(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write list content (element type + length + elements)
    fn write_content(&self, buf: &mut Vec<u8>, flavor: NbtFlavor) -> Result<()> {
        buf.push(self.element_type_id());
        write_len(buf, flavor, self.len())?;

        match self {
            Self::Empty => {}
            Self::Byte(v) => buf.extend(v.iter().map(|b| *b as u8)),
            Self::Short(v) => {
                for s in v {
                    buf.extend_from_slice(&s.to_le_bytes());
                }
            }
            Self::Int(v) => {
                for i in v {
                    write_int(buf, flavor, *i);
                }
            }
            Self::Long(v) => {
                for l in v {
                    write_long(buf, flavor, *l);
                }
            }
            Self::Float(v) => {
                for f in v {
                    buf.extend_from_slice(&f.to_le_bytes());
                }
            }
            Self::Double(v) => {
                for d in v {
                    buf.extend_from_slice(&d.to_le_bytes());
                }
            }
            Self::ByteArray(v) => {
                for arr in v {
                    write_len(buf, flavor, arr.len())?;
                    buf.extend(arr.iter().map(|b| *b as u8));
                }
            }
            Self::String(v) => {
                for s in v {
                    write_nbt_string(buf, flavor, s)?;
                }
            }
            Self::List(v) => {
                for list in v {
                    list.write_content(buf, flavor)?;
                }
            }
            Self::Compound(v) => {
                for compound in v {
                    compound.write_content(buf, flavor)?;
                }
            }
            Self::IntArray(v) => {
                for arr in v {
                    write_len(buf, flavor, arr.len())?;
                    for i in arr {
                        write_int(buf, flavor, *i);
                    }
                }
            }
            Self::LongArray(v) => {
                for arr in v {
                    write_len(buf, flavor, arr.len())?;
                    for l in arr {
                        write_long(buf, flavor, *l);
                    }
                }
            }
        }
        Ok(())
    }

    fn read_content<R: Read>(reader: &mut R, flavor: NbtFlavor, depth: usize) -> Result<Self> {
        let element = reader.read_u8()?;
        let len = read_len(reader, flavor)?;

        Ok(match element {
            tag_type::END => Self::Empty,
            tag_type::BYTE => Self::Byte(read_n(len, || Ok(reader.read_i8()?))?),
            tag_type::SHORT => {
                Self::Short(read_n(len, || Ok(reader.read_i16::<LittleEndian>()?))?)
            }
            tag_type::INT => Self::Int(read_n(len, || read_int(reader, flavor))?),
            tag_type::LONG => Self::Long(read_n(len, || read_long(reader, flavor))?),
            tag_type::FLOAT => {
                Self::Float(read_n(len, || Ok(reader.read_f32::<LittleEndian>()?))?)
            }
            tag_type::DOUBLE => {
                Self::Double(read_n(len, || Ok(reader.read_f64::<LittleEndian>()?))?)
            }
            tag_type::BYTE_ARRAY => {
                Self::ByteArray(read_n(len, || read_byte_array(reader, flavor))?)
            }
            tag_type::STRING => Self::String(read_n(len, || read_nbt_string(reader, flavor))?),
            tag_type::LIST => {
                Self::List(read_n(len, || Self::read_content(reader, flavor, depth + 1))?)
            }
            tag_type::COMPOUND => Self::Compound(read_n(len, || {
                NbtCompound::read_content(reader, flavor, depth + 1)
            })?),
            tag_type::INT_ARRAY => Self::IntArray(read_n(len, || {
                let inner = read_len(reader, flavor)?;
                read_n(inner, || read_int(reader, flavor))
            })?),
            tag_type::LONG_ARRAY => Self::LongArray(read_n(len, || {
                let inner = read_len(reader, flavor)?;
                read_n(inner, || read_long(reader, flavor))
            })?),
            other => return Err(ProtocolError::InvalidNbtTag(other)),
        })
    }
}

fn write_int(buf: &mut Vec<u8>, flavor: NbtFlavor, value: i32) {
    match flavor {
        NbtFlavor::Network => push_varuint(buf, u64::from(((value << 1) ^ (value >> 31)) as u32)),
        NbtFlavor::LittleEndian => buf.extend_from_slice(&value.to_le_bytes()),
    }
}

fn write_long(buf: &mut Vec<u8>, flavor: NbtFlavor, value: i64) {
    match flavor {
        NbtFlavor::Network => push_varuint(buf, ((value << 1) ^ (value >> 63)) as u64),
        NbtFlavor::LittleEndian => buf.extend_from_slice(&value.to_le_bytes()),
    }
}

/// Array and list lengths share the int encoding of the flavor
fn write_len(buf: &mut Vec<u8>, flavor: NbtFlavor, len: usize) -> Result<()> {
    let len = i32::try_from(len).map_err(|_| ProtocolError::LengthTooLarge {
        len,
        max: i32::MAX as usize,
    })?;
    write_int(buf, flavor, len);
    Ok(())
}

/// Write an NBT string (var-uint or u16 length + UTF-8)
fn write_nbt_string(buf: &mut Vec<u8>, flavor: NbtFlavor, s: &str) -> Result<()> {
    let bytes = s.as_bytes();
    match flavor {
        NbtFlavor::Network => {
            let len = u32::try_from(bytes.len()).map_err(|_| ProtocolError::StringTooLong {
                len: bytes.len(),
                max: u32::MAX as usize,
            })?;
            push_varuint(buf, u64::from(len));
        }
        NbtFlavor::LittleEndian => {
            let len = u16::try_from(bytes.len()).map_err(|_| ProtocolError::StringTooLong {
                len: bytes.len(),
                max: usize::from(u16::MAX),
            })?;
            buf.extend_from_slice(&len.to_le_bytes());
        }
    }
    buf.extend_from_slice(bytes);
    Ok(())
}

/// LEB128 straight into a byte buffer
fn push_varuint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            return;
        }
        buf.push(byte | 0x80);
    }
}

fn read_int<R: Read>(reader: &mut R, flavor: NbtFlavor) -> Result<i32> {
    match flavor {
        NbtFlavor::Network => read_varint32(reader),
        NbtFlavor::LittleEndian => Ok(reader.read_i32::<LittleEndian>()?),
    }
}

fn read_long<R: Read>(reader: &mut R, flavor: NbtFlavor) -> Result<i64> {
    match flavor {
        NbtFlavor::Network => read_varint64(reader),
        NbtFlavor::LittleEndian => Ok(reader.read_i64::<LittleEndian>()?),
    }
}

fn read_len<R: Read>(reader: &mut R, flavor: NbtFlavor) -> Result<usize> {
    let len = read_int(reader, flavor)?;
    usize::try_from(len).map_err(|_| ProtocolError::NegativeLength(len))
}

fn read_nbt_string<R: Read>(reader: &mut R, flavor: NbtFlavor) -> Result<String> {
    let len = match flavor {
        NbtFlavor::Network => read_varuint32(reader)? as usize,
        NbtFlavor::LittleEndian => usize::from(reader.read_u16::<LittleEndian>()?),
    };
    Ok(String::from_utf8(read_bytes(reader, len)?)?)
}

fn read_byte_array<R: Read>(reader: &mut R, flavor: NbtFlavor) -> Result<Vec<i8>> {
    let len = read_len(reader, flavor)?;
    read_n(len, || Ok(reader.read_i8()?))
}

fn read_n<T>(len: usize, mut read: impl FnMut() -> Result<T>) -> Result<Vec<T>> {
    let mut out = Vec::with_capacity(len.min(1024));
    for _ in 0..len {
        out.push(read()?);
    }
    Ok(out)
}

/// A complete network NBT root tag kept as raw bytes.
///
/// Decoding parses the tag to find where it ends but keeps the exact bytes,
/// so the blob can be passed through or written out untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nbt(pub Vec<u8>);

impl Nbt {
    pub fn from_compound(compound: &NbtCompound) -> Result<Self> {
        Ok(Self(compound.to_network_bytes()?))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Parse the blob back into a tag tree
    pub fn parse(&self) -> Result<(String, NbtValue)> {
        read_root_value(&mut self.0.as_slice(), NbtFlavor::Network)
    }
}

impl Encode for Nbt {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.0)?;
        Ok(())
    }
}

impl Decode for Nbt {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        let mut recorder = Recorder {
            inner: reader,
            consumed: Vec::new(),
        };
        read_root_value(&mut recorder, NbtFlavor::Network)?;
        Ok(Self(recorder.consumed))
    }
}

/// Reader adapter that keeps a copy of every byte it hands out
struct Recorder<'r, R> {
    inner: &'r mut R,
    consumed: Vec<u8>,
}

impl<R: Read> Read for Recorder<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.consumed.extend_from_slice(&buf[..n]);
        Ok(n)
    }
}

// Convenient From implementations
impl From<bool> for NbtValue {
    fn from(v: bool) -> Self {
        Self::Byte(i8::from(v))
    }
}

impl From<i8> for NbtValue {
    fn from(v: i8) -> Self {
        Self::Byte(v)
    }
}

impl From<i16> for NbtValue {
    fn from(v: i16) -> Self {
        Self::Short(v)
    }
}

impl From<i32> for NbtValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for NbtValue {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<f32> for NbtValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<f64> for NbtValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for NbtValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for NbtValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<NbtCompound> for NbtValue {
    fn from(v: NbtCompound) -> Self {
        Self::Compound(v)
    }
}

impl From<NbtList> for NbtValue {
    fn from(v: NbtList) -> Self {
        Self::List(v)
    }
}

/// Macro for building NBT compounds ergonomically
///
/// # Example
/// ```
/// use bedrock_protocol::nbt;
///
/// let compound = nbt! {
///     "name" => "minecraft:stone",
///     "version" => 18_100_737i32,
///     "states" => nbt! {
///         "stone_type" => "granite",
///     },
/// };
/// assert_eq!(compound.len(), 3);
/// ```
#[macro_export]
macro_rules! nbt {
    // Empty compound
    () => {
        $crate::nbt::NbtCompound::new()
    };

    // Compound with entries
    ($($key:expr => $value:expr),* $(,)?) => {{
        let mut compound = $crate::nbt::NbtCompound::new();
        $(
            compound.insert($key, $value);
        )*
        compound
    }};
}
