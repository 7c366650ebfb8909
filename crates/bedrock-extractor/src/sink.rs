//! Where extracted artifacts go.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use bedrock_packets::GameVersion;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    BiomeDefinitions,
    EntityIdentifiers,
    ItemPalette,
    CreativeItems,
    Recipes,
}

impl ArtifactKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::BiomeDefinitions => "biome_definitions",
            Self::EntityIdentifiers => "entity_identifiers",
            Self::ItemPalette => "item_palette",
            Self::CreativeItems => "creative_items",
            Self::Recipes => "recipes",
        }
    }

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::BiomeDefinitions | Self::EntityIdentifiers => "dat",
            Self::ItemPalette | Self::CreativeItems | Self::Recipes => "json",
        }
    }

    /// `<kind>/<kind>.<version>.<ext>`, e.g. `recipes/recipes.1_21_50.json`
    #[must_use]
    pub fn path(self, version: &GameVersion) -> PathBuf {
        let name = self.name();
        PathBuf::from(name).join(format!(
            "{name}.{}.{}",
            version.file_suffix(),
            self.extension()
        ))
    }
}

/// Receives finished artifacts; writing an existing path replaces it
pub trait ArtifactSink: Send {
    fn write(&mut self, path: &Path, bytes: &[u8]) -> Result<()>;
}

/// Writes artifacts below a root directory
#[derive(Debug, Clone)]
pub struct FsSink {
    root: PathBuf,
}

impl FsSink {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ArtifactSink for FsSink {
    fn write(&mut self, path: &Path, bytes: &[u8]) -> Result<()> {
        let target = self.root.join(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(target, bytes)?;
        Ok(())
    }
}

/// Keeps artifacts in memory, keyed by logical path
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    artifacts: BTreeMap<PathBuf, Vec<u8>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, path: &Path) -> Option<&[u8]> {
        self.artifacts.get(path).map(Vec::as_slice)
    }

    #[must_use]
    pub fn paths(&self) -> Vec<&Path> {
        self.artifacts.keys().map(PathBuf::as_path).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

impl ArtifactSink for MemorySink {
    fn write(&mut self, path: &Path, bytes: &[u8]) -> Result<()> {
        self.artifacts.insert(path.to_path_buf(), bytes.to_vec());
        Ok(())
    }
}
