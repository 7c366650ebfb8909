//! Crafting data normalization.
//!
//! Every wire recipe becomes one [`RecipeRecord`]; shaped grids are reduced to
//! row strings over `A`-`J` plus a letter map.

use std::collections::BTreeMap;

use bedrock_packets::{
    AIR_IDENTIFIER, ContainerMixData, CraftingData, FurnaceInput, PotionMixData, RecipeData,
    ShapedIngredients,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::descriptor::{RecipeItem, RecipeItemDescriptor, resolve_descriptors};
use crate::error::{ExtractError, Result};
use crate::identifiers::LegacyIdentifierTable;

/// Letters handed out to distinct shaped ingredients, in order
pub const SHAPE_LETTERS: [char; 10] = ['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J'];

/// Furnace input data matching any damage value
const WILDCARD_INPUT_DATA: i32 = 0x7FFF;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecipeInput {
    Descriptors(Vec<RecipeItemDescriptor>),
    Item(RecipeItem),
    /// Shape letter -> ingredient
    Shaped(BTreeMap<String, RecipeItemDescriptor>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecipeOutput {
    Items(Vec<RecipeItem>),
    Item(RecipeItem),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Ordinal of the recipe kind
    #[serde(rename = "type")]
    pub kind: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<RecipeInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<RecipeOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PotionMixRecord {
    pub input_id: String,
    pub input_meta: i32,
    pub reagent_id: String,
    pub reagent_meta: i32,
    pub output_id: String,
    pub output_meta: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerMixRecord {
    pub input_id: String,
    pub reagent_id: String,
    pub output_id: String,
}

/// Contents of `recipes/recipes.<version>.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipesDocument {
    /// Protocol version the recipes were captured with
    pub version: i32,
    pub recipes: Vec<RecipeRecord>,
    pub potion_mixes: Vec<PotionMixRecord>,
    pub container_mixes: Vec<ContainerMixRecord>,
}

/// A shaped grid reduced to rows and a letter map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeAssignment {
    pub rows: Vec<String>,
    pub letters: BTreeMap<String, RecipeItemDescriptor>,
}

/// Give each distinct ingredient a letter, first seen in row-major order.
/// Empty (invalid) cells become spaces.
pub fn assign_shape(
    grid: &ShapedIngredients,
    recipe_id: Option<&str>,
    table: &LegacyIdentifierTable,
) -> Result<ShapeAssignment> {
    if grid.ingredients.len() != grid.width * grid.height {
        return Err(ExtractError::MalformedShape {
            width: grid.width,
            height: grid.height,
            len: grid.ingredients.len(),
        });
    }

    let mut seen: Vec<(RecipeItemDescriptor, char)> = Vec::new();
    let mut rows = Vec::with_capacity(grid.height);

    for y in 0..grid.height {
        let mut row = String::with_capacity(grid.width);
        for x in 0..grid.width {
            let cell = &grid.ingredients[y * grid.width + x];
            if cell.descriptor.is_invalid() {
                row.push(' ');
                continue;
            }

            let descriptor = RecipeItemDescriptor::from_network(cell, table)?;
            let letter = match seen.iter().find(|(known, _)| *known == descriptor) {
                Some((_, letter)) => *letter,
                None => {
                    let letter = *SHAPE_LETTERS.get(seen.len()).ok_or_else(|| {
                        ExtractError::ShapeAlphabetExhausted {
                            recipe: recipe_id.map(str::to_string),
                            max: SHAPE_LETTERS.len(),
                        }
                    })?;
                    seen.push((descriptor, letter));
                    letter
                }
            };
            row.push(letter);
        }
        rows.push(row);
    }

    let letters = seen
        .into_iter()
        .map(|(descriptor, letter)| (letter.to_string(), descriptor))
        .collect();
    Ok(ShapeAssignment { rows, letters })
}

fn furnace_input(furnace: &FurnaceInput, table: &LegacyIdentifierTable) -> Result<RecipeItem> {
    let damage = match furnace.input_data {
        WILDCARD_INPUT_DATA => Some(-1),
        0 => None,
        data => Some(data),
    };
    Ok(RecipeItem {
        id: table.resolve(furnace.input_id)?.to_string(),
        count: None,
        damage,
        nbt_b64: None,
    })
}

/// Result items with air removed
fn crafting_results(
    results: &[bedrock_packets::ItemData],
    table: &LegacyIdentifierTable,
) -> Result<Vec<RecipeItem>> {
    let mut items = Vec::with_capacity(results.len());
    for result in results {
        let item = RecipeItem::from_item(result, table)?;
        if item.id != AIR_IDENTIFIER {
            items.push(item);
        }
    }
    Ok(items)
}

pub fn normalize_recipe(
    recipe: &RecipeData,
    table: &LegacyIdentifierTable,
) -> Result<RecipeRecord> {
    let mut record = RecipeRecord {
        id: None,
        kind: recipe.kind.ordinal(),
        input: None,
        output: None,
        shape: None,
        block: recipe.tag.clone(),
        uuid: recipe.uuid,
        priority: None,
    };

    if let Some(crafting) = &recipe.crafting {
        record.id = Some(crafting.id.clone());
        record.priority = Some(crafting.priority);
        record.output = Some(RecipeOutput::Items(crafting_results(&crafting.results, table)?));
    }

    if let Some(grid) = &recipe.shape {
        let shape = assign_shape(grid, record.id.as_deref(), table)?;
        record.shape = Some(shape.rows);
        record.input = Some(RecipeInput::Shaped(shape.letters));
    }

    if let Some(ingredients) = &recipe.ingredients {
        record.input = Some(RecipeInput::Descriptors(resolve_descriptors(ingredients, table)?));
    }

    if let Some(furnace) = &recipe.furnace {
        record.input = Some(RecipeInput::Item(furnace_input(furnace, table)?));
        record.output = Some(RecipeOutput::Item(RecipeItem::from_item(&furnace.result, table)?));
    }

    Ok(record)
}

fn potion_mix(mix: &PotionMixData, table: &LegacyIdentifierTable) -> Result<PotionMixRecord> {
    Ok(PotionMixRecord {
        input_id: table.resolve(mix.input_id)?.to_string(),
        input_meta: mix.input_meta,
        reagent_id: table.resolve(mix.reagent_id)?.to_string(),
        reagent_meta: mix.reagent_meta,
        output_id: table.resolve(mix.output_id)?.to_string(),
        output_meta: mix.output_meta,
    })
}

fn container_mix(
    mix: &ContainerMixData,
    table: &LegacyIdentifierTable,
) -> Result<ContainerMixRecord> {
    Ok(ContainerMixRecord {
        input_id: table.resolve(mix.input_id)?.to_string(),
        reagent_id: table.resolve(mix.reagent_id)?.to_string(),
        output_id: table.resolve(mix.output_id)?.to_string(),
    })
}

/// Normalize a whole `CraftingData` packet
pub fn normalize(
    data: &CraftingData,
    table: &LegacyIdentifierTable,
    protocol_version: i32,
) -> Result<RecipesDocument> {
    Ok(RecipesDocument {
        version: protocol_version,
        recipes: data
            .recipes
            .iter()
            .map(|recipe| normalize_recipe(recipe, table))
            .collect::<Result<_>>()?,
        potion_mixes: data
            .potion_mixes
            .iter()
            .map(|mix| potion_mix(mix, table))
            .collect::<Result<_>>()?,
        container_mixes: data
            .container_mixes
            .iter()
            .map(|mix| container_mix(mix, table))
            .collect::<Result<_>>()?,
    })
}
