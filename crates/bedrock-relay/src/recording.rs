use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use bedrock_packets::{Direction, GameVersion, Packet};
use eyre::WrapErr;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedPacket {
    pub timestamp_ms: u64,
    pub direction: Direction,
    pub packet_id: u32,
    pub packet_name: String,
    pub packet: Packet,
}

/// Decoded packets captured by a relay pair, replayable by the extractors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacketRecording {
    pub start_time: u64,
    pub version: GameVersion,
    pub packets: Vec<RecordedPacket>,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

impl PacketRecording {
    #[must_use]
    pub fn new(version: GameVersion) -> Self {
        Self {
            start_time: now_ms(),
            version,
            packets: Vec::new(),
        }
    }

    pub fn record(&mut self, direction: Direction, packet: &Packet) {
        self.packets.push(RecordedPacket {
            timestamp_ms: now_ms().saturating_sub(self.start_time),
            direction,
            packet_id: packet.id(),
            packet_name: packet.name().to_string(),
            packet: packet.clone(),
        });
    }

    pub fn save(&self, path: &Path) -> eyre::Result<()> {
        let file = File::create(path)
            .wrap_err_with(|| format!("creating recording {}", path.display()))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        info!("Saved {} packets to {}", self.packets.len(), path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> eyre::Result<Self> {
        let file =
            File::open(path).wrap_err_with(|| format!("opening recording {}", path.display()))?;
        let recording = serde_json::from_reader(BufReader::new(file))
            .wrap_err_with(|| format!("parsing recording {}", path.display()))?;
        Ok(recording)
    }
}

#[cfg(test)]
mod tests {
    use bedrock_packets::{AvailableEntityIdentifiers, Nbt};

    use super::*;

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recording.json");

        let mut recording = PacketRecording::new(GameVersion::default());
        recording.record(
            Direction::Clientbound,
            &Packet::AvailableEntityIdentifiers(AvailableEntityIdentifiers {
                identifiers: Nbt(vec![10, 0, 0]),
            }),
        );
        recording.save(&path).unwrap();

        let loaded = PacketRecording::load(&path).unwrap();
        assert_eq!(loaded, recording);
        assert_eq!(loaded.packets[0].packet_name, "AvailableEntityIdentifiers");
        assert_eq!(loaded.packets[0].packet_id, 0x77);
    }
}
