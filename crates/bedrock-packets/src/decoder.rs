use bedrock_protocol::{Decode, PacketHeader, Result};

use crate::Packet;
use crate::login::{
    CLIENT_TO_SERVER_HANDSHAKE_ID, ClientToServerHandshake, DISCONNECT_ID, Disconnect,
    NETWORK_SETTINGS_ID, NetworkSettings, REQUEST_NETWORK_SETTINGS_ID, RequestNetworkSettings,
    SERVER_TO_CLIENT_HANDSHAKE_ID, ServerToClientHandshake,
};
use crate::registry::{
    AVAILABLE_ENTITY_IDENTIFIERS_ID, AvailableEntityIdentifiers, BIOME_DEFINITION_LIST_ID,
    BiomeDefinitionList, ItemDefinition,
};

/// Session-specific tables a decoder needs once `StartGame` has arrived
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DecoderDefinitions {
    pub item_definitions: Vec<ItemDefinition>,
    pub block_network_ids_hashed: bool,
}

/// Turns a header-stripped payload into a [`Packet`].
///
/// Implementations are version codecs. Anything they do not model must come
/// back as [`Packet::Unknown`] so the relay can pass it through untouched.
pub trait PacketDecoder: Send {
    fn decode(&mut self, header: PacketHeader, payload: &[u8]) -> Result<Packet>;

    /// Called when the item palette and block id mode become known
    fn install_definitions(&mut self, _definitions: &DecoderDefinitions) {}
}

/// Decodes the packets whose layout does not change between versions.
///
/// That covers transport negotiation, disconnects and the two opaque NBT
/// tables. `StartGame`, `CreativeContent` and `CraftingData` need a version
/// codec and come back as [`Packet::Unknown`].
#[derive(Debug, Default)]
pub struct TransportDecoder {
    definitions: Option<DecoderDefinitions>,
}

impl TransportDecoder {
    #[must_use]
    pub const fn new() -> Self {
        Self { definitions: None }
    }

    #[must_use]
    pub const fn definitions(&self) -> Option<&DecoderDefinitions> {
        self.definitions.as_ref()
    }
}

impl PacketDecoder for TransportDecoder {
    fn decode(&mut self, header: PacketHeader, payload: &[u8]) -> Result<Packet> {
        let mut reader = payload;
        let packet = match header.packet_id {
            REQUEST_NETWORK_SETTINGS_ID => {
                Packet::RequestNetworkSettings(RequestNetworkSettings::decode(&mut reader)?)
            }
            NETWORK_SETTINGS_ID => Packet::NetworkSettings(NetworkSettings::decode(&mut reader)?),
            SERVER_TO_CLIENT_HANDSHAKE_ID => {
                Packet::ServerToClientHandshake(ServerToClientHandshake::decode(&mut reader)?)
            }
            CLIENT_TO_SERVER_HANDSHAKE_ID => {
                Packet::ClientToServerHandshake(ClientToServerHandshake::decode(&mut reader)?)
            }
            DISCONNECT_ID => Packet::Disconnect(Disconnect::decode(&mut reader)?),
            AVAILABLE_ENTITY_IDENTIFIERS_ID => Packet::AvailableEntityIdentifiers(
                AvailableEntityIdentifiers::decode(&mut reader)?,
            ),
            BIOME_DEFINITION_LIST_ID => {
                Packet::BiomeDefinitionList(BiomeDefinitionList::decode(&mut reader)?)
            }
            other => Packet::Unknown(other),
        };
        Ok(packet)
    }

    fn install_definitions(&mut self, definitions: &DecoderDefinitions) {
        self.definitions = Some(definitions.clone());
    }
}

#[cfg(test)]
mod tests {
    use bedrock_protocol::Encode;

    use super::*;
    use crate::registry::START_GAME_ID;

    #[test]
    fn test_decodes_disconnect() {
        let disconnect = Disconnect {
            reason: 0,
            hide_message: false,
            message: "bye".into(),
            filtered_message: String::new(),
        };
        let mut payload = Vec::new();
        disconnect.encode(&mut payload).unwrap();

        let packet = TransportDecoder::new()
            .decode(PacketHeader::new(DISCONNECT_ID), &payload)
            .unwrap();
        assert_eq!(packet, Packet::Disconnect(disconnect));
    }

    #[test]
    fn test_version_specific_packets_are_unknown() {
        let packet = TransportDecoder::new()
            .decode(PacketHeader::new(START_GAME_ID), &[1, 2, 3])
            .unwrap();
        assert_eq!(packet, Packet::Unknown(START_GAME_ID));
    }

    #[test]
    fn test_truncated_payload_is_an_error() {
        let result = TransportDecoder::new().decode(PacketHeader::new(NETWORK_SETTINGS_ID), &[0]);
        assert!(result.is_err());
    }

    #[test]
    fn test_install_definitions_is_kept() {
        let mut decoder = TransportDecoder::new();
        let definitions = DecoderDefinitions {
            item_definitions: vec![ItemDefinition::new("minecraft:stick", 1)],
            block_network_ids_hashed: true,
        };
        decoder.install_definitions(&definitions);
        assert_eq!(decoder.definitions(), Some(&definitions));
    }
}
