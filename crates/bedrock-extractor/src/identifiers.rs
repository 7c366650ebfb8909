use std::collections::HashMap;

use bedrock_packets::{AIR_IDENTIFIER, ItemData, ItemDefinition};

use crate::error::{ExtractError, Result};

/// Session item runtime id -> stable identifier, built from the item palette
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyIdentifierTable {
    ids: HashMap<i32, String>,
}

impl LegacyIdentifierTable {
    /// Later definitions win when the palette repeats a runtime id
    #[must_use]
    pub fn from_definitions(definitions: &[ItemDefinition]) -> Self {
        let ids = definitions
            .iter()
            .map(|definition| (definition.runtime_id, definition.identifier.clone()))
            .collect();
        Self { ids }
    }

    #[must_use]
    pub fn get(&self, runtime_id: i32) -> Option<&str> {
        self.ids.get(&runtime_id).map(String::as_str)
    }

    pub fn resolve(&self, runtime_id: i32) -> Result<&str> {
        self.get(runtime_id)
            .ok_or(ExtractError::UnknownItemId(runtime_id))
    }

    /// Identifier of an item stack; network id 0 is always air
    pub fn resolve_item(&self, item: &ItemData) -> Result<&str> {
        if item.is_air() {
            return Ok(AIR_IDENTIFIER);
        }
        self.resolve(item.network_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// All entries, ordered by runtime id
    #[must_use]
    pub fn entries(&self) -> Vec<(i32, &str)> {
        let mut entries: Vec<_> = self
            .ids
            .iter()
            .map(|(id, name)| (*id, name.as_str()))
            .collect();
        entries.sort_unstable_by_key(|(id, _)| *id);
        entries
    }
}
