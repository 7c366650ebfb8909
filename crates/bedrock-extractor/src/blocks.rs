//! Canonical block states and the two ways a session numbers them.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use bedrock_protocol::{NbtCompound, NbtFlavor, NbtValue, nbt};

use crate::error::Result;

const FNV1_32_INIT: u32 = 0x811C_9DC5;
const FNV1_32_PRIME: u32 = 0x0100_0193;

/// Hash reserved for `minecraft:unknown`
const UNKNOWN_BLOCK_HASH: i32 = -2;

#[must_use]
pub fn fnv1a_32(data: &[u8]) -> u32 {
    data.iter().fold(FNV1_32_INIT, |hash, byte| {
        (hash ^ u32::from(*byte)).wrapping_mul(FNV1_32_PRIME)
    })
}

/// Runtime id of a block state when the server uses hashed block ids.
///
/// Hashes the little-endian NBT of `{name, states}` with the state keys
/// sorted, so the id stays stable across versions.
pub fn block_state_hash(state: &NbtCompound) -> Result<i32> {
    let name = match state.get("name") {
        Some(NbtValue::String(name)) => name.as_str(),
        _ => "",
    };
    if name == "minecraft:unknown" {
        return Ok(UNKNOWN_BLOCK_HASH);
    }

    let states = match state.get("states") {
        Some(NbtValue::Compound(states)) => states.sorted(),
        _ => NbtCompound::new(),
    };
    let canonical = nbt! {
        "name" => name,
        "states" => states,
    };
    Ok(fnv1a_32(&canonical.to_bytes(NbtFlavor::LittleEndian)?) as i32)
}

/// Block states in palette order
#[derive(Debug, Clone, Default)]
pub struct BlockPalette {
    states: Vec<NbtCompound>,
    by_hash: HashMap<i32, usize>,
}

impl BlockPalette {
    pub fn from_states(states: Vec<NbtCompound>) -> Result<Self> {
        let by_hash = states
            .iter()
            .enumerate()
            .map(|(index, state)| Ok((block_state_hash(state)?, index)))
            .collect::<Result<_>>()?;
        Ok(Self { states, by_hash })
    }

    /// Read concatenated network NBT compounds until the end of input
    pub fn read<R: BufRead>(reader: &mut R) -> Result<Self> {
        let mut states = Vec::new();
        while !reader.fill_buf()?.is_empty() {
            let (_, state) = NbtCompound::read_root(reader, NbtFlavor::Network)?;
            states.push(state);
        }
        Self::from_states(states)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        Self::read(&mut reader)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Look up a block runtime id by hash or by palette index
    #[must_use]
    pub fn resolve(&self, runtime_id: i32, hashed: bool) -> Option<&NbtCompound> {
        let index = if hashed {
            *self.by_hash.get(&runtime_id)?
        } else {
            usize::try_from(runtime_id).ok()?
        };
        self.states.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stone() -> NbtCompound {
        nbt! {
            "name" => "minecraft:stone",
            "states" => nbt! {
                "stone_type" => "granite",
                "a_flag" => 1i8,
            },
            "version" => 18_100_737i32,
        }
    }

    #[test]
    fn test_fnv1a_reference_values() {
        assert_eq!(fnv1a_32(b""), 0x811C_9DC5);
        assert_eq!(fnv1a_32(b"a"), 0xE40C_292C);
    }

    #[test]
    fn test_hash_ignores_state_order_and_version() {
        let reordered = nbt! {
            "version" => 1i32,
            "states" => nbt! {
                "a_flag" => 1i8,
                "stone_type" => "granite",
            },
            "name" => "minecraft:stone",
        };
        assert_eq!(
            block_state_hash(&stone()).unwrap(),
            block_state_hash(&reordered).unwrap()
        );
        let unknown = nbt! { "name" => "minecraft:unknown" };
        assert_eq!(block_state_hash(&unknown).unwrap(), -2);
    }

    #[test]
    fn test_resolve_by_index_and_hash() {
        let air = nbt! { "name" => "minecraft:air", "states" => nbt! {} };
        let palette = BlockPalette::from_states(vec![air.clone(), stone()]).unwrap();

        assert_eq!(palette.resolve(1, false), Some(&stone()));
        assert_eq!(palette.resolve(-1, false), None);
        assert_eq!(palette.resolve(block_state_hash(&air).unwrap(), true), Some(&air));
        assert_eq!(palette.resolve(1, true), None);
    }

    #[test]
    fn test_read_concatenated_states() {
        let mut bytes = stone().to_network_bytes().unwrap();
        bytes.extend(nbt! { "name" => "minecraft:dirt" }.to_network_bytes().unwrap());

        let palette = BlockPalette::read(&mut bytes.as_slice()).unwrap();
        assert_eq!(palette.len(), 2);
        assert_eq!(palette.resolve(0, false), Some(&stone()));
    }
}
