// Bedrock packet model for the relay and the extractors

use serde::{Deserialize, Serialize};

/// Protocol version for this build
pub const PROTOCOL_VERSION: i32 = 766;

/// Minecraft version name for this build
pub const MINECRAFT_VERSION: &str = "1.21.50";

// Re-export protocol types
pub use bedrock_protocol::{BedrockPacket, Direction, Nbt, PacketHeader};

pub mod crafting;
pub mod decoder;
pub mod login;
pub mod registry;

pub use crafting::{
    ContainerMixData, CraftingData, CraftingDataType, CraftingRecipe, FurnaceInput,
    ItemDescriptor, ItemDescriptorWithCount, PotionMixData, RecipeData, ShapedIngredients,
};
pub use decoder::{DecoderDefinitions, PacketDecoder, TransportDecoder};
pub use login::{
    ClientToServerHandshake, CompressionAlgorithm, Disconnect, NetworkSettings,
    RequestNetworkSettings, ServerToClientHandshake,
};
pub use registry::{
    AIR_IDENTIFIER, AvailableEntityIdentifiers, BiomeDefinitionList, CreativeContent, ItemData,
    ItemDefinition, StartGame,
};

/// The protocol and game version a session speaks
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameVersion {
    pub protocol_version: i32,
    pub minecraft_version: String,
}

impl GameVersion {
    #[must_use]
    pub fn new(protocol_version: i32, minecraft_version: impl Into<String>) -> Self {
        Self {
            protocol_version,
            minecraft_version: minecraft_version.into(),
        }
    }

    /// Version string as used in artifact file names (`1.21.50` -> `1_21_50`)
    #[must_use]
    pub fn file_suffix(&self) -> String {
        self.minecraft_version.replace('.', "_")
    }
}

impl Default for GameVersion {
    fn default() -> Self {
        Self::new(PROTOCOL_VERSION, MINECRAFT_VERSION)
    }
}

/// Every packet the relay knows how to look inside
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Packet {
    RequestNetworkSettings(RequestNetworkSettings),
    NetworkSettings(NetworkSettings),
    ServerToClientHandshake(ServerToClientHandshake),
    ClientToServerHandshake(ClientToServerHandshake),
    Disconnect(Disconnect),
    StartGame(StartGame),
    AvailableEntityIdentifiers(AvailableEntityIdentifiers),
    BiomeDefinitionList(BiomeDefinitionList),
    CreativeContent(CreativeContent),
    CraftingData(CraftingData),
    /// Packet the decoder does not model, by id
    Unknown(u32),
}

impl Packet {
    #[must_use]
    pub const fn id(&self) -> u32 {
        match self {
            Self::RequestNetworkSettings(_) => RequestNetworkSettings::ID,
            Self::NetworkSettings(_) => NetworkSettings::ID,
            Self::ServerToClientHandshake(_) => ServerToClientHandshake::ID,
            Self::ClientToServerHandshake(_) => ClientToServerHandshake::ID,
            Self::Disconnect(_) => Disconnect::ID,
            Self::StartGame(_) => StartGame::ID,
            Self::AvailableEntityIdentifiers(_) => AvailableEntityIdentifiers::ID,
            Self::BiomeDefinitionList(_) => BiomeDefinitionList::ID,
            Self::CreativeContent(_) => CreativeContent::ID,
            Self::CraftingData(_) => CraftingData::ID,
            Self::Unknown(id) => *id,
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::RequestNetworkSettings(_) => RequestNetworkSettings::NAME,
            Self::NetworkSettings(_) => NetworkSettings::NAME,
            Self::ServerToClientHandshake(_) => ServerToClientHandshake::NAME,
            Self::ClientToServerHandshake(_) => ClientToServerHandshake::NAME,
            Self::Disconnect(_) => Disconnect::NAME,
            Self::StartGame(_) => StartGame::NAME,
            Self::AvailableEntityIdentifiers(_) => AvailableEntityIdentifiers::NAME,
            Self::BiomeDefinitionList(_) => BiomeDefinitionList::NAME,
            Self::CreativeContent(_) => CreativeContent::NAME,
            Self::CraftingData(_) => CraftingData::NAME,
            Self::Unknown(_) => "Unknown",
        }
    }

    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }
}
