//! Version-independent item stacks and ingredient descriptors.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bedrock_packets::{ItemData, ItemDescriptor, ItemDescriptorWithCount};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::identifiers::LegacyIdentifierTable;

/// Damage value meaning "no damage" besides 0
const NO_DAMAGE: i32 = -1;

/// An item stack as written to the recipes file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeItem {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub damage: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbt_b64: Option<String>,
}

impl RecipeItem {
    pub fn from_item(item: &ItemData, table: &LegacyIdentifierTable) -> Result<Self> {
        let damage = match item.damage {
            0 | NO_DAMAGE => None,
            damage => Some(damage),
        };
        Ok(Self {
            id: table.resolve_item(item)?.to_string(),
            count: Some(item.count),
            damage,
            nbt_b64: item.tag.as_ref().map(|tag| STANDARD.encode(tag.as_bytes())),
        })
    }
}

/// An ingredient descriptor with numeric ids resolved to identifiers.
///
/// Equality covers the type, every variant field and the count; shaped
/// recipes give equal descriptors the same letter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeItemDescriptor {
    #[serde(rename = "type")]
    pub kind: String,
    pub count: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aux_value: Option<i16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_expression: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub molang_version: Option<u8>,
}

impl RecipeItemDescriptor {
    fn empty(descriptor: &ItemDescriptor, count: i32) -> Self {
        Self {
            kind: descriptor.type_name().to_string(),
            count,
            name: None,
            item_id: None,
            aux_value: None,
            full_name: None,
            item_tag: None,
            tag_expression: None,
            molang_version: None,
        }
    }

    pub fn from_network(
        input: &ItemDescriptorWithCount,
        table: &LegacyIdentifierTable,
    ) -> Result<Self> {
        let mut out = Self::empty(&input.descriptor, input.count);
        match &input.descriptor {
            ItemDescriptor::Invalid => {}
            ItemDescriptor::Default { item_id, aux_value } => {
                out.item_id = Some(table.resolve(*item_id)?.to_string());
                out.aux_value = Some(*aux_value);
            }
            ItemDescriptor::Molang {
                tag_expression,
                molang_version,
            } => {
                out.tag_expression = Some(tag_expression.clone());
                out.molang_version = Some(*molang_version);
            }
            ItemDescriptor::ItemTag { item_tag } => out.item_tag = Some(item_tag.clone()),
            ItemDescriptor::Deferred { full_name, .. } => out.full_name = Some(full_name.clone()),
            ItemDescriptor::ComplexAlias { name } => out.name = Some(name.clone()),
        }
        Ok(out)
    }

    #[must_use]
    pub fn is_invalid(&self) -> bool {
        self.kind == "invalid"
    }
}

/// Resolve a descriptor list, leaving out invalid entries
pub fn resolve_descriptors(
    inputs: &[ItemDescriptorWithCount],
    table: &LegacyIdentifierTable,
) -> Result<Vec<RecipeItemDescriptor>> {
    inputs
        .iter()
        .filter(|input| !input.descriptor.is_invalid())
        .map(|input| RecipeItemDescriptor::from_network(input, table))
        .collect()
}
