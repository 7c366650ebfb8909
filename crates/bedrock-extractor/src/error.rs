use std::io;

use bedrock_protocol::ProtocolError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("{packet} arrived before the item palette")]
    PaletteMissing { packet: &'static str },
    #[error("item palette received a second time")]
    PaletteAlreadyLoaded,
    #[error("item id {0} is not in the item palette")]
    UnknownItemId(i32),
    #[error("shaped recipe {recipe:?} needs more than {max} ingredient letters")]
    ShapeAlphabetExhausted { recipe: Option<String>, max: usize },
    #[error("shaped recipe is {width}x{height} but carries {len} ingredients")]
    MalformedShape {
        width: usize,
        height: usize,
        len: usize,
    },
    #[error("item palette entry {name} has no id {id} on lookup")]
    PaletteIntegrity { name: String, id: i32 },
    #[error("block palette: {0}")]
    BlockPalette(#[from] ProtocolError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ExtractError>;
