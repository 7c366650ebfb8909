use std::path::PathBuf;

use bedrock_packets::{GameVersion, MINECRAFT_VERSION, PROTOCOL_VERSION};
use eyre::WrapErr;

pub const OUTPUT_DIR_VAR: &str = "BEDROCK_EXTRACT_OUT";
pub const BLOCK_PALETTE_VAR: &str = "BEDROCK_BLOCK_PALETTE";
pub const PROTOCOL_VERSION_VAR: &str = "BEDROCK_PROTOCOL_VERSION";
pub const GAME_VERSION_VAR: &str = "BEDROCK_GAME_VERSION";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorConfig {
    /// Artifacts are written below this directory
    pub output_dir: PathBuf,
    /// Canonical block states (concatenated network NBT)
    pub block_palette: Option<PathBuf>,
    pub version: GameVersion,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("extracted"),
            block_palette: None,
            version: GameVersion::new(PROTOCOL_VERSION, MINECRAFT_VERSION),
        }
    }
}

impl ExtractorConfig {
    /// Defaults overridden by the `BEDROCK_*` environment variables
    pub fn from_env() -> eyre::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> eyre::Result<Self> {
        let mut config = Self::default();

        if let Some(dir) = lookup(OUTPUT_DIR_VAR) {
            config.output_dir = PathBuf::from(dir);
        }
        config.block_palette = lookup(BLOCK_PALETTE_VAR).map(PathBuf::from);
        if let Some(protocol) = lookup(PROTOCOL_VERSION_VAR) {
            config.version.protocol_version = protocol
                .parse()
                .wrap_err_with(|| format!("{PROTOCOL_VERSION_VAR}={protocol} is not a number"))?;
        }
        if let Some(game) = lookup(GAME_VERSION_VAR) {
            config.version.minecraft_version = game;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ExtractorConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ExtractorConfig::default());
        assert_eq!(config.version.protocol_version, PROTOCOL_VERSION);
    }

    #[test]
    fn test_overrides() {
        let config = ExtractorConfig::from_lookup(lookup(&[
            (OUTPUT_DIR_VAR, "/tmp/out"),
            (BLOCK_PALETTE_VAR, "blocks.nbt"),
            (PROTOCOL_VERSION_VAR, "748"),
            (GAME_VERSION_VAR, "1.21.40"),
        ]))
        .unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.block_palette, Some(PathBuf::from("blocks.nbt")));
        assert_eq!(config.version, GameVersion::new(748, "1.21.40"));
    }

    #[test]
    fn test_bad_protocol_version() {
        assert!(ExtractorConfig::from_lookup(lookup(&[(PROTOCOL_VERSION_VAR, "new")])).is_err());
    }
}
