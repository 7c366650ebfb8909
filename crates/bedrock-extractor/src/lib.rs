//! Extracts version-keyed data tables from a relayed Bedrock session: entity
//! identifiers, biome definitions, the item palette, creative inventory and
//! crafting recipes.

pub mod blocks;
pub mod config;
pub mod creative;
pub mod descriptor;
pub mod error;
pub mod handler;
pub mod identifiers;
pub mod palette;
pub mod recipes;
pub mod sink;

pub use blocks::{BlockPalette, block_state_hash, fnv1a_32};
pub use config::ExtractorConfig;
pub use creative::CreativeItem;
pub use descriptor::{RecipeItem, RecipeItemDescriptor};
pub use error::ExtractError;
pub use handler::{ExtractionHandler, Extractor};
pub use identifiers::LegacyIdentifierTable;
pub use palette::PaletteEntry;
pub use recipes::{RecipeRecord, RecipesDocument};
pub use sink::{ArtifactKind, ArtifactSink, FsSink, MemorySink};
