//! End to end: a relay pair with the extraction handler on the upstream leg.

use std::collections::HashMap;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use bedrock_extractor::{ArtifactKind, ExtractionHandler, Extractor, FsSink, MemorySink};
use bedrock_packets::{
    CraftingData, CraftingRecipe, CreativeContent, DecoderDefinitions, Direction, GameVersion,
    ItemData, ItemDefinition, ItemDescriptor, ItemDescriptorWithCount, Nbt, Packet, PacketDecoder,
    PacketHeader, RecipeData, StartGame, TransportDecoder,
};
use bedrock_protocol::{Encode, nbt};
use bedrock_relay::{
    ChannelConnection, CipherFactory, Connection, EncryptionKey, ForwardAll, FrameCipher,
    FrameCodec, HandshakeError, KeyAgreement, Leg, PacketRecording, ProtocolSession, RawPacket,
    RelayPair, TransportNegotiator,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

/// Stands in for a version codec: the large packets come back pre-decoded
struct CannedDecoder {
    inner: TransportDecoder,
    canned: HashMap<u32, Packet>,
}

impl PacketDecoder for CannedDecoder {
    fn decode(&mut self, header: PacketHeader, payload: &[u8]) -> bedrock_protocol::Result<Packet> {
        match self.canned.get(&header.packet_id) {
            Some(packet) => Ok(packet.clone()),
            None => self.inner.decode(header, payload),
        }
    }

    fn install_definitions(&mut self, definitions: &DecoderDefinitions) {
        self.inner.install_definitions(definitions);
    }
}

struct NoCipher;

impl CipherFactory for NoCipher {
    fn create(&self, _key: &EncryptionKey) -> Box<dyn FrameCipher> {
        unreachable!("the test never negotiates encryption")
    }
}

struct NoKeys;

impl KeyAgreement for NoKeys {
    fn shared_secret(&self, _peer: &[u8]) -> Result<Vec<u8>, HandshakeError> {
        Err(HandshakeError::KeyAgreement("unused".into()))
    }
}

fn version() -> GameVersion {
    GameVersion::new(766, "1.21.50")
}

fn start_game() -> Packet {
    Packet::StartGame(StartGame {
        block_network_ids_hashed: false,
        item_definitions: vec![
            ItemDefinition::new("minecraft:stick", 1),
            ItemDefinition::new("minecraft:Planks", 2),
            ItemDefinition::new("minecraft:apple", 3),
        ],
    })
}

fn creative() -> Packet {
    Packet::CreativeContent(CreativeContent {
        contents: vec![ItemData::new(3, 1), ItemData::new(1, 1)],
    })
}

fn crafting() -> Packet {
    Packet::CraftingData(CraftingData {
        recipes: vec![RecipeData::shapeless(
            CraftingRecipe {
                id: "minecraft:stick_from_planks".into(),
                priority: 0,
                results: vec![ItemData::new(1, 4)],
            },
            vec![ItemDescriptorWithCount::new(
                ItemDescriptor::Default {
                    item_id: 2,
                    aux_value: -1,
                },
                2,
            )],
        )],
        ..Default::default()
    })
}

fn entity_identifiers() -> RawPacket {
    let blob = Nbt::from_compound(&nbt! {
        "idlist" => nbt! { "id" => "minecraft:pig" },
    })
    .unwrap();
    let mut payload = Vec::new();
    blob.encode(&mut payload).unwrap();
    RawPacket::new(PacketHeader::new(0x77), payload)
}

fn read_json(root: &Path, kind: ArtifactKind) -> Value {
    let bytes = fs::read(root.join(kind.path(&version()))).unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_relay_extracts_and_forwards() {
    let relay_addr: SocketAddr = "127.0.0.1:19132".parse().unwrap();
    let server_addr: SocketAddr = "127.0.0.1:19133".parse().unwrap();
    let client_addr: SocketAddr = "127.0.0.1:50000".parse().unwrap();
    let (upstream_conn, mut server) = ChannelConnection::pair(relay_addr, server_addr);
    let (downstream_conn, mut client) = ChannelConnection::pair(relay_addr, client_addr);

    let out = tempfile::tempdir().unwrap();
    let canned = [start_game(), creative(), crafting()]
        .into_iter()
        .map(|packet| (packet.id(), packet))
        .collect();
    let decoder = CannedDecoder {
        inner: TransportDecoder::new(),
        canned,
    };
    let handler = ExtractionHandler::new(
        TransportNegotiator::new(Box::new(NoKeys)),
        Extractor::new(version(), FsSink::new(out.path())),
    );

    let upstream = ProtocolSession::new(Leg::Upstream, server_addr, Box::new(decoder))
        .with_handler(Box::new(handler));
    let downstream = ProtocolSession::new(
        Leg::Downstream,
        client_addr,
        Box::new(TransportDecoder::new()),
    )
    .with_handler(Box::new(ForwardAll));
    let pair = RelayPair::new(
        upstream_conn,
        downstream_conn,
        upstream,
        downstream,
        Box::new(NoCipher),
    );
    let task = tokio::spawn(pair.run());

    // Payloads of the pre-decoded packets are opaque to the relay
    let sent = vec![
        RawPacket::new(PacketHeader::new(0x0B), vec![0xAA, 0xBB]),
        entity_identifiers(),
        RawPacket::new(PacketHeader::new(0x91), vec![0xCC]),
        RawPacket::new(PacketHeader::new(0x34), vec![0xDD, 0xEE, 0xFF]),
    ];
    let mut codec = FrameCodec::new();
    server.send(codec.encode(&sent).unwrap()).await.unwrap();

    let frame = client.recv().await.unwrap().unwrap();
    assert_eq!(FrameCodec::new().decode(&frame).unwrap(), sent);

    server.close().await;
    task.await.unwrap().unwrap();

    assert_eq!(
        read_json(out.path(), ArtifactKind::ItemPalette),
        json!([
            {"name": "minecraft:apple", "id": 3},
            {"name": "minecraft:Planks", "id": 2},
            {"name": "minecraft:stick", "id": 1},
        ])
    );
    assert_eq!(
        read_json(out.path(), ArtifactKind::CreativeItems),
        json!([{"id": "minecraft:apple"}, {"id": "minecraft:stick"}])
    );
    assert_eq!(
        read_json(out.path(), ArtifactKind::Recipes),
        json!({
            "version": 766,
            "recipes": [{
                "id": "minecraft:stick_from_planks",
                "type": 0,
                "input": [{"type": "default", "count": 2, "itemId": "minecraft:Planks", "auxValue": -1}],
                "output": [{"id": "minecraft:stick", "count": 4}],
                "priority": 0,
            }],
            "potionMixes": [],
            "containerMixes": [],
        })
    );

    let entities_path = out.path().join(ArtifactKind::EntityIdentifiers.path(&version()));
    let entities = fs::read(entities_path).unwrap();
    assert_eq!(entities, entity_identifiers().payload.as_ref());
}

#[test]
fn test_replay_from_recording() {
    let mut recording = PacketRecording::new(version());
    for packet in [start_game(), creative(), crafting()] {
        recording.record(Direction::Clientbound, &packet);
    }

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recording.json");
    recording.save(&path).unwrap();
    let loaded = PacketRecording::load(&path).unwrap();

    let mut extractor = Extractor::new(loaded.version.clone(), MemorySink::new());
    for recorded in &loaded.packets {
        extractor.extract(&recorded.packet).unwrap();
    }

    let sink = extractor.into_sink();
    assert_eq!(sink.len(), 3);
    assert!(sink.get(&ArtifactKind::Recipes.path(&version())).is_some());
}
