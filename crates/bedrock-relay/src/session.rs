use std::collections::VecDeque;
use std::net::SocketAddr;

use bedrock_packets::{DecoderDefinitions, Packet, PacketDecoder};
use bytes::Bytes;
use eyre::WrapErr;
use tracing::{debug, info};

use crate::batch::{BatchError, CompressionState, FrameCodec, RawPacket};
use crate::cipher::{CipherFactory, EncryptionKey};
use crate::handler::{Leg, PacketHandler, PacketSignal, RelayContext, TransportAction};

/// What happened to one received packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// No handler registered on the leg
    Dropped,
    Handled,
    /// Queue these bytes on the opposite leg
    Forwarded(RawPacket),
}

/// Result of dispatching a single packet
#[derive(Debug)]
pub struct Dispatched {
    pub packet: Packet,
    pub outcome: Dispatch,
    pub actions: Vec<TransportAction>,
}

/// One protocol connection of the relay pair
pub struct ProtocolSession {
    leg: Leg,
    remote_addr: SocketAddr,
    sub_client_id: u8,
    codec: FrameCodec,
    encryption_key: Option<EncryptionKey>,
    send_queue: VecDeque<RawPacket>,
    decoder: Box<dyn PacketDecoder>,
    handler: Option<Box<dyn PacketHandler>>,
}

impl ProtocolSession {
    #[must_use]
    pub fn new(leg: Leg, remote_addr: SocketAddr, decoder: Box<dyn PacketDecoder>) -> Self {
        Self {
            leg,
            remote_addr,
            sub_client_id: 0,
            codec: FrameCodec::new(),
            encryption_key: None,
            send_queue: VecDeque::new(),
            decoder,
            handler: None,
        }
    }

    #[must_use]
    pub fn with_handler(mut self, handler: Box<dyn PacketHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    #[must_use]
    pub const fn with_sub_client_id(mut self, sub_client_id: u8) -> Self {
        self.sub_client_id = sub_client_id;
        self
    }

    #[must_use]
    pub const fn leg(&self) -> Leg {
        self.leg
    }

    #[must_use]
    pub const fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    #[must_use]
    pub const fn sub_client_id(&self) -> u8 {
        self.sub_client_id
    }

    #[must_use]
    pub const fn compression(&self) -> Option<CompressionState> {
        self.codec.compression()
    }

    #[must_use]
    pub const fn encryption_key(&self) -> Option<&EncryptionKey> {
        self.encryption_key.as_ref()
    }

    #[must_use]
    pub const fn is_encrypted(&self) -> bool {
        self.codec.is_encrypted()
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.send_queue.len()
    }

    pub fn set_compression(&mut self, state: CompressionState) {
        self.codec.set_compression(state);
    }

    pub fn enable_encryption(&mut self, key: EncryptionKey, ciphers: &dyn CipherFactory) {
        self.codec.enable_encryption(ciphers.create(&key));
        self.encryption_key = Some(key);
    }

    pub fn install_definitions(&mut self, definitions: &DecoderDefinitions) {
        self.decoder.install_definitions(definitions);
    }

    /// Split a received frame into packets
    pub fn receive_frame(&mut self, frame: &[u8]) -> Result<Vec<RawPacket>, BatchError> {
        self.codec.decode(frame)
    }

    pub fn queue(&mut self, packet: RawPacket) {
        self.send_queue.push_back(packet);
    }

    /// Drain the send queue into one frame, if anything is queued
    pub fn flush(&mut self) -> Result<Option<Bytes>, BatchError> {
        if self.send_queue.is_empty() {
            return Ok(None);
        }
        let packets: Vec<RawPacket> = self.send_queue.drain(..).collect();
        self.codec.encode(&packets).map(Some)
    }

    /// Frame a single packet with the current framing, bypassing the queue
    pub fn encode_now(&mut self, packet: RawPacket) -> Result<Bytes, BatchError> {
        self.codec.encode(&[packet])
    }

    /// Decode one packet and hand it to the handler
    pub fn dispatch(&mut self, raw: RawPacket) -> eyre::Result<Dispatched> {
        let packet = self
            .decoder
            .decode(raw.header, &raw.payload)
            .wrap_err_with(|| format!("decoding packet 0x{:02X} on {}", raw.id(), self.leg))?;

        let Some(handler) = self.handler.as_mut() else {
            info!(
                "No handler on {} for {} (sub-client {}): dropping {} (0x{:02X})",
                self.leg,
                self.remote_addr,
                self.sub_client_id,
                packet.name(),
                raw.id()
            );
            return Ok(Dispatched {
                packet,
                outcome: Dispatch::Dropped,
                actions: Vec::new(),
            });
        };

        let mut ctx = RelayContext::new(self.leg, &raw);
        let signal = handler
            .handle(&packet, &mut ctx)
            .wrap_err_with(|| format!("handling {} on {}", packet.name(), self.leg))?;
        let actions = ctx.into_actions();

        let outcome = match signal {
            PacketSignal::Handled => Dispatch::Handled,
            PacketSignal::Unhandled => {
                debug!(
                    "{} -> {}: 0x{:02X} {} ({} bytes)",
                    self.leg,
                    self.leg.opposite(),
                    raw.id(),
                    packet.name(),
                    raw.payload.len()
                );
                Dispatch::Forwarded(raw)
            }
        };

        Ok(Dispatched {
            packet,
            outcome,
            actions,
        })
    }
}
