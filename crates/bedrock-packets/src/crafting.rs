//! Crafting data as the version codecs hand it over.
//!
//! Every recipe kind on the wire is a different record with a different mix of
//! fields. They are modelled here as one [`RecipeData`] carrying optional
//! capabilities: a crafting block (id, priority, results), a shaped grid, a
//! shapeless ingredient list, a furnace input, a block tag and a unique id.

use bedrock_protocol::BedrockPacket;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::registry::ItemData;

/// CraftingData (ID: 52)
pub const CRAFTING_DATA_ID: u32 = 0x34;

/// Recipe kinds, in wire order (the ordinal is written into the recipes file)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CraftingDataType {
    Shapeless = 0,
    Shaped = 1,
    Furnace = 2,
    FurnaceData = 3,
    Multi = 4,
    ShulkerBox = 5,
    ShapelessChemistry = 6,
    ShapedChemistry = 7,
    SmithingTransform = 8,
    SmithingTrim = 9,
}

impl CraftingDataType {
    #[must_use]
    pub const fn ordinal(self) -> i32 {
        self as i32
    }
}

/// Wire-level ingredient reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemDescriptor {
    Invalid,
    /// Palette item by runtime id
    Default { item_id: i32, aux_value: i16 },
    Molang {
        tag_expression: String,
        molang_version: u8,
    },
    ItemTag { item_tag: String },
    Deferred { full_name: String, aux_value: i16 },
    ComplexAlias { name: String },
}

impl ItemDescriptor {
    /// Lowercase descriptor type name as written to the recipes file
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Invalid => "invalid",
            Self::Default { .. } => "default",
            Self::Molang { .. } => "molang",
            Self::ItemTag { .. } => "item_tag",
            Self::Deferred { .. } => "deferred",
            Self::ComplexAlias { .. } => "complex_alias",
        }
    }

    #[must_use]
    pub const fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemDescriptorWithCount {
    pub descriptor: ItemDescriptor,
    pub count: i32,
}

impl ItemDescriptorWithCount {
    #[must_use]
    pub const fn new(descriptor: ItemDescriptor, count: i32) -> Self {
        Self { descriptor, count }
    }

    /// Empty grid cell
    #[must_use]
    pub const fn empty() -> Self {
        Self::new(ItemDescriptor::Invalid, 0)
    }
}

/// Fields shared by every recipe made at a crafting block
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CraftingRecipe {
    pub id: String,
    pub priority: i32,
    pub results: Vec<ItemData>,
}

/// A `height` x `width` grid, row-major
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapedIngredients {
    pub width: usize,
    pub height: usize,
    pub ingredients: Vec<ItemDescriptorWithCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FurnaceInput {
    pub input_id: i32,
    /// 0x7fff matches any damage value
    pub input_data: i32,
    pub result: ItemData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeData {
    pub kind: CraftingDataType,
    pub crafting: Option<CraftingRecipe>,
    pub shape: Option<ShapedIngredients>,
    /// Shapeless ingredient list
    pub ingredients: Option<Vec<ItemDescriptorWithCount>>,
    pub furnace: Option<FurnaceInput>,
    /// Crafting block tag (e.g. `crafting_table`)
    pub tag: Option<String>,
    pub uuid: Option<Uuid>,
}

impl RecipeData {
    #[must_use]
    pub const fn new(kind: CraftingDataType) -> Self {
        Self {
            kind,
            crafting: None,
            shape: None,
            ingredients: None,
            furnace: None,
            tag: None,
            uuid: None,
        }
    }

    #[must_use]
    pub fn shaped(recipe: CraftingRecipe, grid: ShapedIngredients) -> Self {
        Self::new(CraftingDataType::Shaped)
            .with_crafting(recipe)
            .with_shape(grid)
    }

    #[must_use]
    pub fn shapeless(recipe: CraftingRecipe, ingredients: Vec<ItemDescriptorWithCount>) -> Self {
        Self::new(CraftingDataType::Shapeless)
            .with_crafting(recipe)
            .with_ingredients(ingredients)
    }

    /// Furnace recipe; `FurnaceData` when the input carries a damage value
    #[must_use]
    pub fn furnace(input: FurnaceInput, tag: impl Into<String>) -> Self {
        let kind = if input.input_data == 0 {
            CraftingDataType::Furnace
        } else {
            CraftingDataType::FurnaceData
        };
        Self::new(kind).with_furnace(input).with_tag(tag)
    }

    #[must_use]
    pub fn with_crafting(mut self, recipe: CraftingRecipe) -> Self {
        self.crafting = Some(recipe);
        self
    }

    #[must_use]
    pub fn with_shape(mut self, grid: ShapedIngredients) -> Self {
        self.shape = Some(grid);
        self
    }

    #[must_use]
    pub fn with_ingredients(mut self, ingredients: Vec<ItemDescriptorWithCount>) -> Self {
        self.ingredients = Some(ingredients);
        self
    }

    #[must_use]
    pub fn with_furnace(mut self, input: FurnaceInput) -> Self {
        self.furnace = Some(input);
        self
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    #[must_use]
    pub fn with_uuid(mut self, uuid: Uuid) -> Self {
        self.uuid = Some(uuid);
        self
    }
}

/// Brewing stand recipe that changes the potion type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PotionMixData {
    pub input_id: i32,
    pub input_meta: i32,
    pub reagent_id: i32,
    pub reagent_meta: i32,
    pub output_id: i32,
    pub output_meta: i32,
}

/// Brewing stand recipe that changes the container (splash, lingering)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerMixData {
    pub input_id: i32,
    pub reagent_id: i32,
    pub output_id: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CraftingData {
    pub recipes: Vec<RecipeData>,
    pub potion_mixes: Vec<PotionMixData>,
    pub container_mixes: Vec<ContainerMixData>,
    pub clean_recipes: bool,
}

impl BedrockPacket for CraftingData {
    const ID: u32 = CRAFTING_DATA_ID;
    const NAME: &'static str = "CraftingData";
}
