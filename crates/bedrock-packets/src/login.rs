// Transport negotiation and session lifecycle packets

use std::io::{Read, Write};

use bedrock_protocol::{BedrockPacket, Decode, Encode, ProtocolError, Result, VarInt};
use serde::{Deserialize, Serialize};

/// RequestNetworkSettings (ID: 193)
pub const REQUEST_NETWORK_SETTINGS_ID: u32 = 0xC1;

/// NetworkSettings (ID: 143)
pub const NETWORK_SETTINGS_ID: u32 = 0x8F;

/// ServerToClientHandshake (ID: 3)
pub const SERVER_TO_CLIENT_HANDSHAKE_ID: u32 = 0x03;

/// ClientToServerHandshake (ID: 4)
pub const CLIENT_TO_SERVER_HANDSHAKE_ID: u32 = 0x04;

/// Disconnect (ID: 5)
pub const DISCONNECT_ID: u32 = 0x05;

/// Batch compression algorithm negotiated by `NetworkSettings`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CompressionAlgorithm {
    #[default]
    Zlib,
    Snappy,
    None,
}

impl CompressionAlgorithm {
    /// Value used inside `NetworkSettings`
    #[must_use]
    pub const fn wire_id(self) -> u16 {
        match self {
            Self::Zlib => 0,
            Self::Snappy => 1,
            Self::None => 0xFFFF,
        }
    }

    /// Marker byte that prefixes a compressed batch
    #[must_use]
    pub const fn batch_marker(self) -> u8 {
        match self {
            Self::Zlib => 0x00,
            Self::Snappy => 0x01,
            Self::None => 0xFF,
        }
    }

    #[must_use]
    pub const fn from_batch_marker(marker: u8) -> Option<Self> {
        match marker {
            0x00 => Some(Self::Zlib),
            0x01 => Some(Self::Snappy),
            0xFF => Some(Self::None),
            _ => None,
        }
    }
}

impl Encode for CompressionAlgorithm {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.wire_id().encode(writer)
    }
}

impl Decode for CompressionAlgorithm {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        match u16::decode(reader)? {
            0 => Ok(Self::Zlib),
            1 => Ok(Self::Snappy),
            0xFFFF => Ok(Self::None),
            other => Err(ProtocolError::InvalidEnumVariant(i32::from(other))),
        }
    }
}

/// Sent by the client before login to ask for the compression settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RequestNetworkSettings {
    pub client_protocol: i32,
}

impl BedrockPacket for RequestNetworkSettings {
    const ID: u32 = REQUEST_NETWORK_SETTINGS_ID;
    const NAME: &'static str = "RequestNetworkSettings";
}

impl Encode for RequestNetworkSettings {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        // The only big-endian field in the protocol
        writer.write_all(&self.client_protocol.to_be_bytes())?;
        Ok(())
    }
}

impl Decode for RequestNetworkSettings {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        let mut raw = [0u8; 4];
        reader.read_exact(&mut raw)?;
        Ok(Self {
            client_protocol: i32::from_be_bytes(raw),
        })
    }
}

/// Compression negotiation sent by the server
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NetworkSettings {
    /// Batches smaller than this many bytes are sent uncompressed
    pub compression_threshold: u16,
    pub compression_algorithm: CompressionAlgorithm,
    pub client_throttle: bool,
    pub client_throttle_threshold: u8,
    pub client_throttle_scalar: f32,
}

impl BedrockPacket for NetworkSettings {
    const ID: u32 = NETWORK_SETTINGS_ID;
    const NAME: &'static str = "NetworkSettings";
}

impl Encode for NetworkSettings {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.compression_threshold.encode(writer)?;
        self.compression_algorithm.encode(writer)?;
        self.client_throttle.encode(writer)?;
        self.client_throttle_threshold.encode(writer)?;
        self.client_throttle_scalar.encode(writer)
    }
}

impl Decode for NetworkSettings {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(Self {
            compression_threshold: u16::decode(reader)?,
            compression_algorithm: CompressionAlgorithm::decode(reader)?,
            client_throttle: bool::decode(reader)?,
            client_throttle_threshold: u8::decode(reader)?,
            client_throttle_scalar: f32::decode(reader)?,
        })
    }
}

/// Carries the signed token the encryption key is derived from
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServerToClientHandshake {
    pub jwt: String,
}

impl BedrockPacket for ServerToClientHandshake {
    const ID: u32 = SERVER_TO_CLIENT_HANDSHAKE_ID;
    const NAME: &'static str = "ServerToClientHandshake";
}

impl Encode for ServerToClientHandshake {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.jwt.encode(writer)
    }
}

impl Decode for ServerToClientHandshake {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(Self {
            jwt: String::decode(reader)?,
        })
    }
}

/// Empty confirmation that encryption is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClientToServerHandshake;

impl BedrockPacket for ClientToServerHandshake {
    const ID: u32 = CLIENT_TO_SERVER_HANDSHAKE_ID;
    const NAME: &'static str = "ClientToServerHandshake";
}

impl Encode for ClientToServerHandshake {
    fn encode<W: Write>(&self, _writer: &mut W) -> Result<()> {
        Ok(())
    }
}

impl Decode for ClientToServerHandshake {
    fn decode<R: Read>(_reader: &mut R) -> Result<Self> {
        Ok(Self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Disconnect {
    pub reason: i32,
    /// When set the message fields are absent from the wire
    pub hide_message: bool,
    pub message: String,
    pub filtered_message: String,
}

impl BedrockPacket for Disconnect {
    const ID: u32 = DISCONNECT_ID;
    const NAME: &'static str = "Disconnect";
}

impl Encode for Disconnect {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        VarInt(self.reason).encode(writer)?;
        self.hide_message.encode(writer)?;
        if !self.hide_message {
            self.message.encode(writer)?;
            self.filtered_message.encode(writer)?;
        }
        Ok(())
    }
}

impl Decode for Disconnect {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        let reason = VarInt::decode(reader)?.into();
        let hide_message = bool::decode(reader)?;
        let (message, filtered_message) = if hide_message {
            (String::new(), String::new())
        } else {
            (String::decode(reader)?, String::decode(reader)?)
        };
        Ok(Self {
            reason,
            hide_message,
            message,
            filtered_message,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn test_network_settings_layout() {
        let settings = NetworkSettings {
            compression_threshold: 256,
            compression_algorithm: CompressionAlgorithm::Zlib,
            client_throttle: false,
            client_throttle_threshold: 0,
            client_throttle_scalar: 0.0,
        };
        let mut buf = Vec::new();
        settings.encode(&mut buf).unwrap();
        assert_eq!(&buf[..4], [0x00, 0x01, 0x00, 0x00]);
        assert_eq!(buf.len(), 10);

        let decoded = NetworkSettings::decode(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(decoded, settings);
    }

    #[test]
    fn test_unknown_compression_rejected() {
        let buf = 7u16.to_le_bytes();
        let err = CompressionAlgorithm::decode(&mut Cursor::new(&buf[..])).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidEnumVariant(7)));
    }

    #[test]
    fn test_hidden_disconnect_has_no_message() {
        let disconnect = Disconnect {
            reason: 12,
            hide_message: true,
            ..Default::default()
        };
        let mut buf = Vec::new();
        disconnect.encode(&mut buf).unwrap();
        assert_eq!(buf, [24, 1]);
    }

    #[test]
    fn test_request_network_settings_is_big_endian() {
        let request = RequestNetworkSettings {
            client_protocol: 766,
        };
        let mut buf = Vec::new();
        request.encode(&mut buf).unwrap();
        assert_eq!(buf, [0, 0, 0x02, 0xFE]);
    }
}
