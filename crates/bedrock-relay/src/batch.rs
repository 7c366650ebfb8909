//! Game packet batches.
//!
//! A frame is `0xfe` followed by the batch. Once a leg is encrypted the batch
//! is cipher output; once compression is negotiated the plaintext starts with
//! an algorithm marker. Inside is a run of var-uint length-prefixed packets.

use std::io::{self, Read, Write};

use bedrock_packets::CompressionAlgorithm;
use bedrock_protocol::{
    Decode, Encode, PacketHeader, ProtocolError, read_varuint32, write_varuint32,
};
use bytes::Bytes;
use flate2::Compression;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use thiserror::Error;

use crate::cipher::{CipherError, FrameCipher};

/// First byte of every game packet frame
pub const BATCH_PREFIX: u8 = 0xFE;

/// Inflated batches larger than this are rejected
pub const MAX_BATCH_SIZE: usize = 16 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("frame does not start with 0xfe (got {0:?})")]
    MissingPrefix(Option<u8>),
    #[error("compressed batch is empty")]
    Empty,
    #[error("unknown compression marker 0x{0:02x}")]
    UnknownCompression(u8),
    #[error("{0:?} compression is not supported")]
    UnsupportedCompression(CompressionAlgorithm),
    #[error("batch inflates past {max} bytes")]
    TooLarge { max: usize },
    #[error("packet claims {expected} bytes but only {available} remain")]
    Truncated { expected: usize, available: usize },
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Cipher(#[from] CipherError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Negotiated compression for one leg
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionState {
    pub algorithm: CompressionAlgorithm,
    /// Batches below this size go out with the `none` marker
    pub threshold: u16,
}

/// One packet inside a batch: the header plus the byte-exact payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPacket {
    pub header: PacketHeader,
    pub payload: Bytes,
}

impl RawPacket {
    #[must_use]
    pub fn new(header: PacketHeader, payload: impl Into<Bytes>) -> Self {
        Self {
            header,
            payload: payload.into(),
        }
    }

    /// Encode a typed packet with a default header
    pub fn from_packet<P: bedrock_protocol::BedrockPacket + Encode>(
        packet: &P,
    ) -> Result<Self, BatchError> {
        let mut payload = Vec::new();
        packet.encode(&mut payload)?;
        Ok(Self::new(PacketHeader::new(P::ID), payload))
    }

    #[must_use]
    pub const fn id(&self) -> u32 {
        self.header.packet_id
    }
}

/// Concatenate packets into an uncompressed batch body
pub fn encode_packets(packets: &[RawPacket]) -> Result<Vec<u8>, BatchError> {
    let mut body = Vec::new();
    let mut header = Vec::with_capacity(3);
    for packet in packets {
        header.clear();
        packet.header.encode(&mut header)?;
        write_varuint32(&mut body, (header.len() + packet.payload.len()) as u32)?;
        body.extend_from_slice(&header);
        body.extend_from_slice(&packet.payload);
    }
    Ok(body)
}

/// Split an uncompressed batch body back into packets
pub fn decode_packets(mut body: &[u8]) -> Result<Vec<RawPacket>, BatchError> {
    let mut packets = Vec::new();
    while !body.is_empty() {
        let len = read_varuint32(&mut body)? as usize;
        if len > body.len() {
            return Err(BatchError::Truncated {
                expected: len,
                available: body.len(),
            });
        }
        let (mut packet, rest) = body.split_at(len);
        let header = PacketHeader::decode(&mut packet)?;
        packets.push(RawPacket::new(header, Bytes::copy_from_slice(packet)));
        body = rest;
    }
    Ok(packets)
}

fn compress(body: Vec<u8>, compression: Option<CompressionState>) -> Result<Vec<u8>, BatchError> {
    let Some(state) = compression else {
        return Ok(body);
    };

    let algorithm = if body.len() < usize::from(state.threshold) {
        CompressionAlgorithm::None
    } else {
        state.algorithm
    };

    match algorithm {
        CompressionAlgorithm::None => {
            let mut out = Vec::with_capacity(body.len() + 1);
            out.push(CompressionAlgorithm::None.batch_marker());
            out.extend_from_slice(&body);
            Ok(out)
        }
        CompressionAlgorithm::Zlib => {
            let mut encoder = DeflateEncoder::new(
                vec![CompressionAlgorithm::Zlib.batch_marker()],
                Compression::default(),
            );
            encoder.write_all(&body)?;
            Ok(encoder.finish()?)
        }
        CompressionAlgorithm::Snappy => Err(BatchError::UnsupportedCompression(algorithm)),
    }
}

fn decompress(data: &[u8], compression: Option<CompressionState>) -> Result<Vec<u8>, BatchError> {
    if compression.is_none() {
        return Ok(data.to_vec());
    }

    let (&marker, rest) = data.split_first().ok_or(BatchError::Empty)?;
    match CompressionAlgorithm::from_batch_marker(marker) {
        Some(CompressionAlgorithm::None) => Ok(rest.to_vec()),
        Some(CompressionAlgorithm::Zlib) => {
            let mut out = Vec::new();
            DeflateDecoder::new(rest)
                .take(MAX_BATCH_SIZE as u64 + 1)
                .read_to_end(&mut out)?;
            if out.len() > MAX_BATCH_SIZE {
                return Err(BatchError::TooLarge {
                    max: MAX_BATCH_SIZE,
                });
            }
            Ok(out)
        }
        Some(algorithm @ CompressionAlgorithm::Snappy) => {
            Err(BatchError::UnsupportedCompression(algorithm))
        }
        None => Err(BatchError::UnknownCompression(marker)),
    }
}

/// Per-leg framing state: compression and, once enabled, the cipher
#[derive(Default)]
pub struct FrameCodec {
    compression: Option<CompressionState>,
    cipher: Option<Box<dyn FrameCipher>>,
}

impl FrameCodec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn compression(&self) -> Option<CompressionState> {
        self.compression
    }

    #[must_use]
    pub const fn is_encrypted(&self) -> bool {
        self.cipher.is_some()
    }

    pub fn set_compression(&mut self, state: CompressionState) {
        self.compression = Some(state);
    }

    pub fn enable_encryption(&mut self, cipher: Box<dyn FrameCipher>) {
        self.cipher = Some(cipher);
    }

    pub fn encode(&mut self, packets: &[RawPacket]) -> Result<Bytes, BatchError> {
        let plaintext = compress(encode_packets(packets)?, self.compression)?;
        let body = match self.cipher.as_mut() {
            Some(cipher) => cipher.encrypt(&plaintext)?,
            None => plaintext,
        };

        let mut frame = Vec::with_capacity(body.len() + 1);
        frame.push(BATCH_PREFIX);
        frame.extend_from_slice(&body);
        Ok(Bytes::from(frame))
    }

    pub fn decode(&mut self, frame: &[u8]) -> Result<Vec<RawPacket>, BatchError> {
        let body = match frame.split_first() {
            Some((&BATCH_PREFIX, body)) => body,
            other => return Err(BatchError::MissingPrefix(other.map(|(first, _)| *first))),
        };

        let plaintext = match self.cipher.as_mut() {
            Some(cipher) => cipher.decrypt(body)?,
            None => body.to_vec(),
        };
        decode_packets(&decompress(&plaintext, self.compression)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct XorCipher(u8);

    impl FrameCipher for XorCipher {
        fn encrypt(&mut self, plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
            Ok(plaintext.iter().map(|b| b ^ self.0).collect())
        }

        fn decrypt(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>, CipherError> {
            self.encrypt(ciphertext)
        }
    }

    fn sample_packets() -> Vec<RawPacket> {
        vec![
            RawPacket::new(PacketHeader::new(0x05), vec![1, 2, 3]),
            RawPacket::new(
                PacketHeader {
                    packet_id: 0x1FF,
                    sender_sub_client: 1,
                    target_sub_client: 3,
                },
                vec![0xAB; 600],
            ),
        ]
    }

    #[test]
    fn test_plain_frame_layout() {
        let mut codec = FrameCodec::new();
        let frame = codec
            .encode(&[RawPacket::new(PacketHeader::new(0x05), vec![9])])
            .unwrap();
        // prefix, packet length, header, payload
        assert_eq!(frame.as_ref(), [0xFE, 2, 0x05, 9]);
    }

    #[test]
    fn test_small_batch_uses_none_marker() {
        let mut codec = FrameCodec::new();
        codec.set_compression(CompressionState {
            algorithm: CompressionAlgorithm::Zlib,
            threshold: 256,
        });
        let frame = codec
            .encode(&[RawPacket::new(PacketHeader::new(0x05), vec![9])])
            .unwrap();
        assert_eq!(frame.as_ref(), [0xFE, 0xFF, 2, 0x05, 9]);
    }

    #[test]
    fn test_compressed_and_encrypted_frames_decode() {
        let mut sender = FrameCodec::new();
        let mut receiver = FrameCodec::new();
        let state = CompressionState {
            algorithm: CompressionAlgorithm::Zlib,
            threshold: 1,
        };
        for codec in [&mut sender, &mut receiver] {
            codec.set_compression(state);
            codec.enable_encryption(Box::new(XorCipher(0x5A)));
        }

        let frame = sender.encode(&sample_packets()).unwrap();
        assert_eq!(frame[0], BATCH_PREFIX);
        assert_ne!(frame[1], 0x00, "marker must be encrypted");
        assert_eq!(receiver.decode(&frame).unwrap(), sample_packets());
    }

    #[test]
    fn test_snappy_is_rejected() {
        let mut codec = FrameCodec::new();
        codec.set_compression(CompressionState {
            algorithm: CompressionAlgorithm::Zlib,
            threshold: 0,
        });
        let err = codec.decode(&[0xFE, 0x01, 0x00]).unwrap_err();
        assert!(matches!(
            err,
            BatchError::UnsupportedCompression(CompressionAlgorithm::Snappy)
        ));
    }

    #[test]
    fn test_missing_prefix() {
        let err = FrameCodec::new().decode(&[0x00, 0x01]).unwrap_err();
        assert!(matches!(err, BatchError::MissingPrefix(Some(0x00))));
        let err = FrameCodec::new().decode(&[]).unwrap_err();
        assert!(matches!(err, BatchError::MissingPrefix(None)));
    }

    #[test]
    fn test_truncated_packet() {
        let err = decode_packets(&[10, 0x05, 1]).unwrap_err();
        assert!(matches!(
            err,
            BatchError::Truncated {
                expected: 10,
                available: 2
            }
        ));
    }
}
