//! Packet handling for the upstream leg: transport negotiation plus the
//! extractors.

use bedrock_packets::{
    AvailableEntityIdentifiers, BedrockPacket, BiomeDefinitionList, CraftingData, CreativeContent,
    DecoderDefinitions, GameVersion, Packet, StartGame,
};
use bedrock_relay::{Leg, PacketHandler, PacketSignal, RelayContext, TransportNegotiator};
use serde::Serialize;
use tracing::{info, warn};

use crate::blocks::BlockPalette;
use crate::creative::{BlockLookup, creative_items};
use crate::error::{ExtractError, Result};
use crate::identifiers::LegacyIdentifierTable;
use crate::palette::item_palette;
use crate::recipes::normalize;
use crate::sink::{ArtifactKind, ArtifactSink};

/// Turns data packets into artifacts. Usable without a live session.
pub struct Extractor<S> {
    version: GameVersion,
    sink: S,
    blocks: Option<BlockPalette>,
    identifiers: Option<LegacyIdentifierTable>,
    block_ids_hashed: bool,
}

impl<S: ArtifactSink> Extractor<S> {
    #[must_use]
    pub fn new(version: GameVersion, sink: S) -> Self {
        Self {
            version,
            sink,
            blocks: None,
            identifiers: None,
            block_ids_hashed: false,
        }
    }

    #[must_use]
    pub fn with_block_palette(mut self, blocks: BlockPalette) -> Self {
        self.blocks = Some(blocks);
        self
    }

    #[must_use]
    pub const fn version(&self) -> &GameVersion {
        &self.version
    }

    #[must_use]
    pub const fn identifiers(&self) -> Option<&LegacyIdentifierTable> {
        self.identifiers.as_ref()
    }

    #[must_use]
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    #[must_use]
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Run the matching extractor; packets without one are ignored
    pub fn extract(&mut self, packet: &Packet) -> Result<()> {
        match packet {
            Packet::BiomeDefinitionList(list) => self.biome_definitions(list),
            Packet::AvailableEntityIdentifiers(ids) => self.entity_identifiers(ids),
            Packet::StartGame(start) => self.start_game(start),
            Packet::CreativeContent(content) => self.creative_content(content),
            Packet::CraftingData(data) => self.crafting_data(data),
            _ => Ok(()),
        }
    }

    fn biome_definitions(&mut self, list: &BiomeDefinitionList) -> Result<()> {
        self.write(ArtifactKind::BiomeDefinitions, list.definitions.as_bytes())
    }

    fn entity_identifiers(&mut self, ids: &AvailableEntityIdentifiers) -> Result<()> {
        self.write(ArtifactKind::EntityIdentifiers, ids.identifiers.as_bytes())
    }

    fn start_game(&mut self, start: &StartGame) -> Result<()> {
        if self.identifiers.is_some() {
            return Err(ExtractError::PaletteAlreadyLoaded);
        }
        info!(
            "Item palette with {} entries (block ids hashed: {})",
            start.item_definitions.len(),
            start.block_network_ids_hashed
        );

        let table = LegacyIdentifierTable::from_definitions(&start.item_definitions);
        let palette = item_palette(&table)?;
        self.block_ids_hashed = start.block_network_ids_hashed;
        self.identifiers = Some(table);
        self.write_json(ArtifactKind::ItemPalette, &palette)
    }

    fn creative_content(&mut self, content: &CreativeContent) -> Result<()> {
        let table = self.table(CreativeContent::NAME)?;
        let blocks = self.blocks.as_ref().map(|palette| BlockLookup {
            palette,
            hashed: self.block_ids_hashed,
        });
        if blocks.is_none() {
            warn!("No block palette loaded; creative block states are left out");
        }

        let items = creative_items(content, table, blocks)?;
        self.write_json(ArtifactKind::CreativeItems, &items)
    }

    fn crafting_data(&mut self, data: &CraftingData) -> Result<()> {
        let table = self.table(CraftingData::NAME)?;
        let document = normalize(data, table, self.version.protocol_version)?;
        self.write_json(ArtifactKind::Recipes, &document)
    }

    fn table(&self, packet: &'static str) -> Result<&LegacyIdentifierTable> {
        self.identifiers
            .as_ref()
            .ok_or(ExtractError::PaletteMissing { packet })
    }

    fn write_json<T: Serialize>(&mut self, kind: ArtifactKind, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write(kind, &bytes)
    }

    fn write(&mut self, kind: ArtifactKind, bytes: &[u8]) -> Result<()> {
        let path = kind.path(&self.version);
        self.sink.write(&path, bytes)?;
        info!("Extracted {} to {}", kind.name(), path.display());
        Ok(())
    }
}

/// Upstream leg handler: negotiates the transport and runs the extractors.
///
/// Data packets are always passed on to the client after extraction.
pub struct ExtractionHandler<S> {
    negotiator: TransportNegotiator,
    extractor: Extractor<S>,
}

impl<S: ArtifactSink> ExtractionHandler<S> {
    #[must_use]
    pub fn new(negotiator: TransportNegotiator, extractor: Extractor<S>) -> Self {
        Self {
            negotiator,
            extractor,
        }
    }

    #[must_use]
    pub const fn extractor(&self) -> &Extractor<S> {
        &self.extractor
    }

    #[must_use]
    pub const fn negotiator(&self) -> &TransportNegotiator {
        &self.negotiator
    }
}

impl<S: ArtifactSink> PacketHandler for ExtractionHandler<S> {
    fn handle(
        &mut self,
        packet: &Packet,
        ctx: &mut RelayContext<'_>,
    ) -> eyre::Result<PacketSignal> {
        match packet {
            Packet::NetworkSettings(settings) => {
                self.negotiator.negotiate_compression(settings, ctx)?;
                Ok(PacketSignal::Handled)
            }
            Packet::ServerToClientHandshake(handshake) => {
                self.negotiator.complete_handshake(handshake, ctx)?;
                Ok(PacketSignal::Handled)
            }
            Packet::Disconnect(disconnect) => {
                info!(
                    "Server disconnected (reason {}): {}",
                    disconnect.reason, disconnect.message
                );
                ctx.disconnect(Leg::Upstream);
                Ok(PacketSignal::Unhandled)
            }
            Packet::StartGame(start) => {
                self.extractor.extract(packet)?;
                ctx.install_definitions(
                    Leg::Upstream,
                    DecoderDefinitions {
                        item_definitions: start.item_definitions.clone(),
                        block_network_ids_hashed: start.block_network_ids_hashed,
                    },
                );
                Ok(PacketSignal::Unhandled)
            }
            _ => {
                self.extractor.extract(packet)?;
                Ok(PacketSignal::Unhandled)
            }
        }
    }
}
