use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bedrock_packets::CreativeContent;
use serde::{Deserialize, Serialize};

use crate::blocks::BlockPalette;
use crate::error::Result;
use crate::identifiers::LegacyIdentifierTable;

/// One entry of `creative_items/creative_items.<version>.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreativeItem {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbt_b64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_state_b64: Option<String>,
}

/// Block runtime ids are looked up in `blocks`, hashed or by index
#[derive(Debug, Clone, Copy)]
pub struct BlockLookup<'a> {
    pub palette: &'a BlockPalette,
    pub hashed: bool,
}

/// Creative entries in wire order, nothing filtered
pub fn creative_items(
    content: &CreativeContent,
    table: &LegacyIdentifierTable,
    blocks: Option<BlockLookup<'_>>,
) -> Result<Vec<CreativeItem>> {
    content
        .contents
        .iter()
        .map(|item| {
            let block_state_b64 = blocks
                .filter(|_| item.block_runtime_id != 0)
                .and_then(|lookup| lookup.palette.resolve(item.block_runtime_id, lookup.hashed))
                .map(|state| state.to_network_bytes().map(|bytes| STANDARD.encode(bytes)))
                .transpose()?;

            Ok(CreativeItem {
                id: table.resolve_item(item)?.to_string(),
                nbt_b64: item.tag.as_ref().map(|tag| STANDARD.encode(tag.as_bytes())),
                block_state_b64,
            })
        })
        .collect()
}
