use std::fmt;

use bedrock_packets::{DecoderDefinitions, Packet};

use crate::batch::{CompressionState, RawPacket};
use crate::cipher::EncryptionKey;

/// One side of the relay pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Leg {
    /// Faces the real server; receives clientbound packets
    Upstream,
    /// Faces the real client; receives serverbound packets
    Downstream,
}

impl Leg {
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Upstream => Self::Downstream,
            Self::Downstream => Self::Upstream,
        }
    }
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upstream => f.write_str("upstream"),
            Self::Downstream => f.write_str("downstream"),
        }
    }
}

/// What a handler did with a packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketSignal {
    /// Consumed; nothing is forwarded
    Handled,
    /// Forward the original bytes to the opposite leg
    Unhandled,
}

/// Side effect a handler asks the relay to perform, applied in order once the
/// handler returns
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportAction {
    /// Flush with the leg's current framing before anything else changes
    SendImmediately { leg: Leg, packet: RawPacket },
    Send { leg: Leg, packet: RawPacket },
    /// Applies to both legs
    SetCompression(CompressionState),
    EnableEncryption { leg: Leg, key: EncryptionKey },
    InstallDefinitions { leg: Leg, definitions: DecoderDefinitions },
    Disconnect { leg: Leg },
}

/// Per-packet context handed to a [`PacketHandler`]
#[derive(Debug)]
pub struct RelayContext<'a> {
    leg: Leg,
    raw: &'a RawPacket,
    actions: Vec<TransportAction>,
}

impl<'a> RelayContext<'a> {
    #[must_use]
    pub const fn new(leg: Leg, raw: &'a RawPacket) -> Self {
        Self {
            leg,
            raw,
            actions: Vec::new(),
        }
    }

    /// Leg the packet arrived on
    #[must_use]
    pub const fn leg(&self) -> Leg {
        self.leg
    }

    /// The packet exactly as it came off the wire
    #[must_use]
    pub const fn raw(&self) -> &RawPacket {
        self.raw
    }

    #[must_use]
    pub fn actions(&self) -> &[TransportAction] {
        &self.actions
    }

    pub fn push(&mut self, action: TransportAction) {
        self.actions.push(action);
    }

    pub fn send_immediately(&mut self, leg: Leg, packet: RawPacket) {
        self.push(TransportAction::SendImmediately { leg, packet });
    }

    pub fn send(&mut self, leg: Leg, packet: RawPacket) {
        self.push(TransportAction::Send { leg, packet });
    }

    pub fn set_compression(&mut self, state: CompressionState) {
        self.push(TransportAction::SetCompression(state));
    }

    pub fn enable_encryption(&mut self, leg: Leg, key: EncryptionKey) {
        self.push(TransportAction::EnableEncryption { leg, key });
    }

    pub fn install_definitions(&mut self, leg: Leg, definitions: DecoderDefinitions) {
        self.push(TransportAction::InstallDefinitions { leg, definitions });
    }

    pub fn disconnect(&mut self, leg: Leg) {
        self.push(TransportAction::Disconnect { leg });
    }

    #[must_use]
    pub fn into_actions(self) -> Vec<TransportAction> {
        self.actions
    }
}

/// Reacts to decoded packets on one leg.
///
/// Returning an error is fatal for the whole relay pair.
pub trait PacketHandler: Send {
    fn handle(&mut self, packet: &Packet, ctx: &mut RelayContext<'_>) -> eyre::Result<PacketSignal>;
}

/// Passes every packet through unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct ForwardAll;

impl PacketHandler for ForwardAll {
    fn handle(
        &mut self,
        _packet: &Packet,
        _ctx: &mut RelayContext<'_>,
    ) -> eyre::Result<PacketSignal> {
        Ok(PacketSignal::Unhandled)
    }
}
