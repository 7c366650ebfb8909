use std::borrow::Cow;
use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod nbt;

pub use nbt::{Nbt, NbtCompound, NbtFlavor, NbtList, NbtValue};

/// Upper bound for var-uint prefixed strings. Login chains are the largest
/// strings on the wire and stay far below this.
pub const MAX_STRING_LEN: usize = 0x7F_FFFF;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("VarInt too large")]
    VarIntTooLarge,
    #[error("String too long: {len} > {max}")]
    StringTooLong { len: usize, max: usize },
    #[error("Length too large: {len} > {max}")]
    LengthTooLarge { len: usize, max: usize },
    #[error("Invalid enum variant: {0}")]
    InvalidEnumVariant(i32),
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("Invalid NBT tag type: {0}")]
    InvalidNbtTag(u8),
    #[error("NBT nested deeper than {0} levels")]
    NbtTooDeep(usize),
    #[error("Negative length: {0}")]
    NegativeLength(i32),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Packet direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Clientbound,
    Serverbound,
}

/// Trait for typed packets - provides the wire ID and a display name
pub trait BedrockPacket {
    /// The packet ID (lower 10 bits of the header)
    const ID: u32;
    /// The packet name (e.g., "NetworkSettings")
    const NAME: &'static str;
}

pub trait Encode {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()>;
}

pub trait Decode: Sized {
    fn decode<R: Read>(reader: &mut R) -> Result<Self>;
}

// Unsigned var-int (LEB128) encoding/decoding
pub fn read_varuint32<R: Read>(reader: &mut R) -> Result<u32> {
    let mut result = 0u32;
    let mut shift = 0;
    loop {
        let byte = reader.read_u8()?;
        result |= u32::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
        if shift >= 35 {
            return Err(ProtocolError::VarIntTooLarge);
        }
    }
}

pub fn write_varuint32<W: Write>(writer: &mut W, mut value: u32) -> Result<()> {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        writer.write_u8(byte)?;
        if value == 0 {
            return Ok(());
        }
    }
}

pub fn read_varuint64<R: Read>(reader: &mut R) -> Result<u64> {
    let mut result = 0u64;
    let mut shift = 0;
    loop {
        let byte = reader.read_u8()?;
        result |= u64::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
        if shift >= 70 {
            return Err(ProtocolError::VarIntTooLarge);
        }
    }
}

// Signed var-ints are zigzag encoded on top of the unsigned form
pub fn read_varint32<R: Read>(reader: &mut R) -> Result<i32> {
    let raw = read_varuint32(reader)?;
    Ok(((raw >> 1) as i32) ^ -((raw & 1) as i32))
}

pub fn write_varint32<W: Write>(writer: &mut W, value: i32) -> Result<()> {
    write_varuint32(writer, ((value << 1) ^ (value >> 31)) as u32)
}

pub fn read_varint64<R: Read>(reader: &mut R) -> Result<i64> {
    let raw = read_varuint64(reader)?;
    Ok(((raw >> 1) as i64) ^ -((raw & 1) as i64))
}

/// Read a var-uint length and make sure it fits the given maximum
pub fn read_length<R: Read>(reader: &mut R, max: usize) -> Result<usize> {
    let len = read_varuint32(reader)? as usize;
    if len > max {
        return Err(ProtocolError::StringTooLong { len, max });
    }
    Ok(len)
}

/// Read exactly `len` bytes, growing the buffer only as data arrives
pub fn read_bytes<R: Read>(reader: &mut R, len: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(len.min(4096));
    reader.by_ref().take(len as u64).read_to_end(&mut buf)?;
    if buf.len() < len {
        return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
    }
    Ok(buf)
}

// Primitive implementations (Bedrock is little-endian throughout)
impl Encode for bool {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(u8::from(*self))?;
        Ok(())
    }
}

impl Decode for bool {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(reader.read_u8()? != 0)
    }
}

impl Encode for u8 {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(*self)?;
        Ok(())
    }
}

impl Decode for u8 {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(reader.read_u8()?)
    }
}

impl Encode for i8 {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_i8(*self)?;
        Ok(())
    }
}

impl Decode for i8 {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(reader.read_i8()?)
    }
}

impl Encode for u16 {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u16::<LittleEndian>(*self)?;
        Ok(())
    }
}

impl Decode for u16 {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(reader.read_u16::<LittleEndian>()?)
    }
}

impl Encode for i16 {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_i16::<LittleEndian>(*self)?;
        Ok(())
    }
}

impl Decode for i16 {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(reader.read_i16::<LittleEndian>()?)
    }
}

impl Encode for u32 {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<LittleEndian>(*self)?;
        Ok(())
    }
}

impl Decode for u32 {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(reader.read_u32::<LittleEndian>()?)
    }
}

impl Encode for i32 {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_i32::<LittleEndian>(*self)?;
        Ok(())
    }
}

impl Decode for i32 {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(reader.read_i32::<LittleEndian>()?)
    }
}

impl Encode for i64 {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_i64::<LittleEndian>(*self)?;
        Ok(())
    }
}

impl Decode for i64 {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(reader.read_i64::<LittleEndian>()?)
    }
}

impl Encode for f32 {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_f32::<LittleEndian>(*self)?;
        Ok(())
    }
}

impl Decode for f32 {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(reader.read_f32::<LittleEndian>()?)
    }
}

/// Zigzag encoded signed 32-bit var-int
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VarInt(pub i32);

impl Encode for VarInt {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_varint32(writer, self.0)
    }
}

impl Decode for VarInt {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(Self(read_varint32(reader)?))
    }
}

impl From<i32> for VarInt {
    fn from(v: i32) -> Self {
        Self(v)
    }
}

impl From<VarInt> for i32 {
    fn from(v: VarInt) -> Self {
        v.0
    }
}

// String encoding (length-prefixed with var-uint)
impl Encode for str {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        let bytes = self.as_bytes();
        write_varuint32(writer, bytes.len() as u32)?;
        writer.write_all(bytes)?;
        Ok(())
    }
}

impl Encode for String {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.as_str().encode(writer)
    }
}

impl Decode for String {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        let len = read_length(reader, MAX_STRING_LEN)?;
        Ok(Self::from_utf8(read_bytes(reader, len)?)?)
    }
}

impl Encode for Cow<'_, str> {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.as_ref().encode(writer)
    }
}

// Option<T> encoding (bool prefix)
impl<T: Encode> Encode for Option<T> {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            Some(v) => {
                true.encode(writer)?;
                v.encode(writer)
            }
            None => false.encode(writer),
        }
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        if bool::decode(reader)? {
            Ok(Some(T::decode(reader)?))
        } else {
            Ok(None)
        }
    }
}

// Vec<T> encoding (var-uint length prefix)
impl<T: Encode> Encode for Vec<T> {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_varuint32(writer, self.len() as u32)?;
        for item in self {
            item.encode(writer)?;
        }
        Ok(())
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        let len = read_varuint32(reader)? as usize;
        // Do not trust the prefix for the allocation size
        let mut vec = Vec::with_capacity(len.min(1024));
        for _ in 0..len {
            vec.push(T::decode(reader)?);
        }
        Ok(vec)
    }
}

/// Header preceding every packet inside a batch.
///
/// Packed into one var-uint: the low 10 bits carry the packet ID, followed by
/// two bits each for the sender and target sub-client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PacketHeader {
    pub packet_id: u32,
    pub sender_sub_client: u8,
    pub target_sub_client: u8,
}

impl PacketHeader {
    pub const ID_MASK: u32 = 0x3FF;
    const SUB_CLIENT_MASK: u32 = 0x3;
    const SENDER_SHIFT: u32 = 10;
    const TARGET_SHIFT: u32 = 12;

    #[must_use]
    pub fn new(packet_id: u32) -> Self {
        Self {
            packet_id,
            sender_sub_client: 0,
            target_sub_client: 0,
        }
    }

    fn packed(self) -> u32 {
        (self.packet_id & Self::ID_MASK)
            | ((u32::from(self.sender_sub_client) & Self::SUB_CLIENT_MASK) << Self::SENDER_SHIFT)
            | ((u32::from(self.target_sub_client) & Self::SUB_CLIENT_MASK) << Self::TARGET_SHIFT)
    }
}

impl Encode for PacketHeader {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_varuint32(writer, self.packed())
    }
}

impl Decode for PacketHeader {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        let raw = read_varuint32(reader)?;
        Ok(Self {
            packet_id: raw & Self::ID_MASK,
            sender_sub_client: ((raw >> Self::SENDER_SHIFT) & Self::SUB_CLIENT_MASK) as u8,
            target_sub_client: ((raw >> Self::TARGET_SHIFT) & Self::SUB_CLIENT_MASK) as u8,
        })
    }
}
