use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{ExtractError, Result};
use crate::identifiers::LegacyIdentifierTable;

/// One row of `item_palette/item_palette.<version>.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaletteEntry {
    pub name: String,
    pub id: i32,
}

/// The item palette sorted case-insensitively by name, then by id.
///
/// Every id a name appears under is kept. Each entry is looked up again by
/// name and must find its own id among that name's ids.
pub fn item_palette(table: &LegacyIdentifierTable) -> Result<Vec<PaletteEntry>> {
    let mut entries: Vec<PaletteEntry> = table
        .entries()
        .into_iter()
        .map(|(id, name)| PaletteEntry {
            name: name.to_string(),
            id,
        })
        .collect();
    entries.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then(a.id.cmp(&b.id))
    });

    let mut by_name: HashMap<&str, Vec<i32>> = HashMap::with_capacity(entries.len());
    for (id, name) in table.entries() {
        by_name.entry(name).or_default().push(id);
    }

    for entry in &entries {
        let known = by_name
            .get(entry.name.as_str())
            .is_some_and(|ids| ids.contains(&entry.id));
        if !known {
            return Err(ExtractError::PaletteIntegrity {
                name: entry.name.clone(),
                id: entry.id,
            });
        }
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use bedrock_packets::ItemDefinition;

    use super::*;

    #[test]
    fn test_sorted_case_insensitively() {
        let table = LegacyIdentifierTable::from_definitions(&[
            ItemDefinition::new("minecraft:stick", 3),
            ItemDefinition::new("Custom:Widget", 900),
            ItemDefinition::new("minecraft:apple", 1),
        ]);
        let palette = item_palette(&table).unwrap();
        let names: Vec<_> = palette.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Custom:Widget", "minecraft:apple", "minecraft:stick"]);
        assert_eq!(palette[0].id, 900);
        assert_eq!(palette.len(), table.len());
    }

    #[test]
    fn test_shared_identifier_keeps_every_id() {
        let table = LegacyIdentifierTable::from_definitions(&[
            ItemDefinition::new("minecraft:stick", 1),
            ItemDefinition::new("minecraft:planks", 9),
            ItemDefinition::new("minecraft:planks", 2),
        ]);
        let palette = item_palette(&table).unwrap();
        assert_eq!(
            palette,
            [
                PaletteEntry {
                    name: "minecraft:planks".into(),
                    id: 2
                },
                PaletteEntry {
                    name: "minecraft:planks".into(),
                    id: 9
                },
                PaletteEntry {
                    name: "minecraft:stick".into(),
                    id: 1
                },
            ]
        );
    }

    #[test]
    fn test_case_variants_are_distinct_entries() {
        let table = LegacyIdentifierTable::from_definitions(&[
            ItemDefinition::new("minecraft:thing", 1),
            ItemDefinition::new("minecraft:Thing", 2),
        ]);
        let palette = item_palette(&table).unwrap();
        let ids: Vec<_> = palette.iter().map(|e| e.id).collect();
        assert_eq!(ids, [1, 2]);
    }

    #[test]
    fn test_json_shape() {
        let table =
            LegacyIdentifierTable::from_definitions(&[ItemDefinition::new("minecraft:stick", 3)]);
        let json = serde_json::to_string(&item_palette(&table).unwrap()).unwrap();
        assert_eq!(json, r#"[{"name":"minecraft:stick","id":3}]"#);
    }
}
