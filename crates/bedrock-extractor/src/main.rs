//! Replays a packet recording through the extractors.
//!
//! Usage: `bedrock-extractor <recording.json> [output_dir]`

use std::path::PathBuf;

use bedrock_extractor::{BlockPalette, Extractor, ExtractorConfig, FsSink};
use bedrock_packets::Direction;
use bedrock_relay::PacketRecording;
use eyre::WrapErr;
use tracing::{info, warn};

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bedrock_extractor=info".parse()?)
                .add_directive("bedrock_relay=info".parse()?),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let Some(recording_path) = args.next().map(PathBuf::from) else {
        eyre::bail!("usage: bedrock-extractor <recording.json> [output_dir]");
    };

    let mut config = ExtractorConfig::from_env()?;
    if let Some(dir) = args.next() {
        config.output_dir = PathBuf::from(dir);
    }

    let recording = PacketRecording::load(&recording_path)?;
    info!(
        "Replaying {} packets recorded for {} (protocol {})",
        recording.packets.len(),
        recording.version.minecraft_version,
        recording.version.protocol_version
    );
    info!("Writing artifacts to {}", config.output_dir.display());

    let mut extractor = Extractor::new(recording.version.clone(), FsSink::new(&config.output_dir));
    if let Some(path) = &config.block_palette {
        let palette = BlockPalette::load(path)
            .wrap_err_with(|| format!("loading block palette {}", path.display()))?;
        info!("Loaded {} block states", palette.len());
        extractor = extractor.with_block_palette(palette);
    }

    for recorded in &recording.packets {
        if recorded.direction != Direction::Clientbound {
            continue;
        }
        extractor
            .extract(&recorded.packet)
            .wrap_err_with(|| format!("extracting {}", recorded.packet_name))?;
    }

    if extractor.identifiers().is_none() {
        warn!("Recording has no item palette; recipes and creative items were not extracted");
    }
    info!("Done");
    Ok(())
}
