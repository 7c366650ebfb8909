// Registry and inventory packets: entity/biome tables, item palette, creative content

use std::io::{Read, Write};

use bedrock_protocol::{BedrockPacket, Decode, Encode, Nbt, Result};
use serde::{Deserialize, Serialize};

/// StartGame (ID: 11)
pub const START_GAME_ID: u32 = 0x0B;

/// AvailableEntityIdentifiers (ID: 119)
pub const AVAILABLE_ENTITY_IDENTIFIERS_ID: u32 = 0x77;

/// BiomeDefinitionList (ID: 122)
pub const BIOME_DEFINITION_LIST_ID: u32 = 0x7A;

/// CreativeContent (ID: 145)
pub const CREATIVE_CONTENT_ID: u32 = 0x91;

/// Stable identifier the protocol uses for network id 0
pub const AIR_IDENTIFIER: &str = "minecraft:air";

/// Entity identifier table, kept as the server sent it
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AvailableEntityIdentifiers {
    pub identifiers: Nbt,
}

impl BedrockPacket for AvailableEntityIdentifiers {
    const ID: u32 = AVAILABLE_ENTITY_IDENTIFIERS_ID;
    const NAME: &'static str = "AvailableEntityIdentifiers";
}

impl Encode for AvailableEntityIdentifiers {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.identifiers.encode(writer)
    }
}

impl Decode for AvailableEntityIdentifiers {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(Self {
            identifiers: Nbt::decode(reader)?,
        })
    }
}

/// Biome definitions, kept as the server sent them
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BiomeDefinitionList {
    pub definitions: Nbt,
}

impl BedrockPacket for BiomeDefinitionList {
    const ID: u32 = BIOME_DEFINITION_LIST_ID;
    const NAME: &'static str = "BiomeDefinitionList";
}

impl Encode for BiomeDefinitionList {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.definitions.encode(writer)
    }
}

impl Decode for BiomeDefinitionList {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(Self {
            definitions: Nbt::decode(reader)?,
        })
    }
}

/// One entry of the item palette carried by `StartGame`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemDefinition {
    pub identifier: String,
    /// Transient numeric id, only valid for this session
    pub runtime_id: i32,
    pub component_based: bool,
}

impl ItemDefinition {
    #[must_use]
    pub fn new(identifier: impl Into<String>, runtime_id: i32) -> Self {
        Self {
            identifier: identifier.into(),
            runtime_id,
            component_based: false,
        }
    }
}

/// The parts of `StartGame` the relay cares about.
///
/// The full packet is several hundred fields that change every release; the
/// version codec that decodes it only hands over the item palette and the
/// block id mode.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StartGame {
    /// Block runtime ids are FNV-1a hashes of the block state instead of
    /// palette indices
    pub block_network_ids_hashed: bool,
    pub item_definitions: Vec<ItemDefinition>,
}

impl BedrockPacket for StartGame {
    const ID: u32 = START_GAME_ID;
    const NAME: &'static str = "StartGame";
}

/// An item stack as the protocol describes it
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ItemData {
    /// Runtime id from the item palette, 0 means air
    pub network_id: i32,
    pub count: u16,
    pub damage: i32,
    pub tag: Option<Nbt>,
    /// Block runtime id, 0 when the item places no block
    pub block_runtime_id: i32,
}

impl ItemData {
    #[must_use]
    pub fn new(network_id: i32, count: u16) -> Self {
        Self {
            network_id,
            count,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_damage(mut self, damage: i32) -> Self {
        self.damage = damage;
        self
    }

    #[must_use]
    pub fn with_tag(mut self, tag: Nbt) -> Self {
        self.tag = Some(tag);
        self
    }

    #[must_use]
    pub fn with_block_runtime_id(mut self, block_runtime_id: i32) -> Self {
        self.block_runtime_id = block_runtime_id;
        self
    }

    #[must_use]
    pub const fn is_air(&self) -> bool {
        self.network_id == 0
    }
}

/// Creative inventory, in the order the client displays it
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CreativeContent {
    pub contents: Vec<ItemData>,
}

impl BedrockPacket for CreativeContent {
    const ID: u32 = CREATIVE_CONTENT_ID;
    const NAME: &'static str = "CreativeContent";
}
