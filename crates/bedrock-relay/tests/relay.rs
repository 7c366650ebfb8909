//! Drives a relay pair over in-process connections, playing both the real
//! server and the real client.

use std::net::SocketAddr;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use bedrock_packets::{
    CompressionAlgorithm, Disconnect, NetworkSettings, Packet, ServerToClientHandshake,
    TransportDecoder,
};
use bedrock_protocol::PacketHeader;
use bedrock_relay::{
    ChannelConnection, CipherError, CipherFactory, CompressionState, Connection, EncryptionKey,
    FrameCipher, FrameCodec, HandshakeError, KeyAgreement, Leg, PacketHandler, PacketRecording,
    PacketSignal, ProtocolSession, RawPacket, RelayContext, RelayPair, TransportNegotiator,
};
use pretty_assertions::assert_eq;

struct XorCipher(u8);

impl FrameCipher for XorCipher {
    fn encrypt(&mut self, plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
        Ok(plaintext.iter().map(|b| b ^ self.0).collect())
    }

    fn decrypt(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>, CipherError> {
        self.encrypt(ciphertext)
    }
}

/// Keys the xor cipher with the first byte of the session key
struct XorFactory;

impl CipherFactory for XorFactory {
    fn create(&self, key: &EncryptionKey) -> Box<dyn FrameCipher> {
        Box::new(XorCipher(key.as_bytes()[0]))
    }
}

struct StaticSecret;

impl KeyAgreement for StaticSecret {
    fn shared_secret(&self, _peer: &[u8]) -> Result<Vec<u8>, HandshakeError> {
        Ok(b"shared".to_vec())
    }
}

/// Minimal upstream handler: negotiate transport, forward the rest
struct Negotiating(TransportNegotiator);

impl PacketHandler for Negotiating {
    fn handle(
        &mut self,
        packet: &Packet,
        ctx: &mut RelayContext<'_>,
    ) -> eyre::Result<PacketSignal> {
        match packet {
            Packet::NetworkSettings(settings) => {
                self.0.negotiate_compression(settings, ctx)?;
                Ok(PacketSignal::Handled)
            }
            Packet::ServerToClientHandshake(handshake) => {
                self.0.complete_handshake(handshake, ctx)?;
                Ok(PacketSignal::Handled)
            }
            Packet::Disconnect(_) => {
                ctx.disconnect(Leg::Upstream);
                Ok(PacketSignal::Unhandled)
            }
            _ => Ok(PacketSignal::Unhandled),
        }
    }
}

fn handshake_jwt() -> String {
    let header = format!(r#"{{"alg":"ES384","x5u":"{}"}}"#, STANDARD.encode("key"));
    let claims = format!(r#"{{"salt":"{}"}}"#, STANDARD.encode("salt"));
    format!(
        "{}.{}.sig",
        URL_SAFE_NO_PAD.encode(header),
        URL_SAFE_NO_PAD.encode(claims)
    )
}

#[tokio::test]
async fn test_full_negotiation_and_disconnect() {
    let relay_addr: SocketAddr = "127.0.0.1:19132".parse().unwrap();
    let server_addr: SocketAddr = "127.0.0.1:19133".parse().unwrap();
    let client_addr: SocketAddr = "127.0.0.1:50000".parse().unwrap();

    let (upstream_conn, mut server) = ChannelConnection::pair(relay_addr, server_addr);
    let (downstream_conn, mut client) = ChannelConnection::pair(relay_addr, client_addr);

    let dir = tempfile::tempdir().unwrap();
    let recording_path = dir.path().join("capture.json");

    let negotiator = TransportNegotiator::new(Box::new(StaticSecret));
    let upstream =
        ProtocolSession::new(Leg::Upstream, server_addr, Box::new(TransportDecoder::new()))
            .with_handler(Box::new(Negotiating(negotiator)));
    let downstream =
        ProtocolSession::new(Leg::Downstream, client_addr, Box::new(TransportDecoder::new()))
            .with_handler(Box::new(bedrock_relay::ForwardAll));
    let relay = RelayPair::new(
        upstream_conn,
        downstream_conn,
        upstream,
        downstream,
        Box::new(XorFactory),
    )
    .with_recording(Default::default(), &recording_path);
    let task = tokio::spawn(relay.run());

    let mut server_codec = FrameCodec::new();
    let mut client_codec = FrameCodec::new();

    // Compression settings reach the client unchanged and uncompressed
    let settings = RawPacket::from_packet(&NetworkSettings {
        compression_threshold: 0,
        compression_algorithm: CompressionAlgorithm::Zlib,
        ..Default::default()
    })
    .unwrap();
    server.send(server_codec.encode(&[settings.clone()]).unwrap()).await.unwrap();
    let frame = client.recv().await.unwrap().unwrap();
    assert_eq!(client_codec.decode(&frame).unwrap(), vec![settings]);

    let state = CompressionState {
        algorithm: CompressionAlgorithm::Zlib,
        threshold: 0,
    };
    server_codec.set_compression(state);
    client_codec.set_compression(state);

    // Client traffic is forwarded byte-exact with the new framing
    let chat = RawPacket::new(
        PacketHeader {
            packet_id: 0x09,
            sender_sub_client: 0,
            target_sub_client: 1,
        },
        vec![1, 2, 3, 4],
    );
    client.send(client_codec.encode(&[chat.clone()]).unwrap()).await.unwrap();
    let frame = server.recv().await.unwrap().unwrap();
    assert_eq!(server_codec.decode(&frame).unwrap(), vec![chat]);

    // Handshake turns on upstream encryption and confirms to the server
    let handshake = RawPacket::from_packet(&ServerToClientHandshake {
        jwt: handshake_jwt(),
    })
    .unwrap();
    server.send(server_codec.encode(&[handshake]).unwrap()).await.unwrap();

    let key = bedrock_relay::derive_session_key(b"salt", b"shared");
    server_codec.enable_encryption(XorFactory.create(&key));
    let frame = server.recv().await.unwrap().unwrap();
    let confirmation = server_codec.decode(&frame).unwrap();
    assert_eq!(confirmation.len(), 1);
    assert_eq!(confirmation[0].id(), 0x04);

    // Disconnect is relayed to the client, then the pair shuts down
    let disconnect = RawPacket::from_packet(&Disconnect {
        reason: 0,
        hide_message: false,
        message: "Server closed".into(),
        filtered_message: String::new(),
    })
    .unwrap();
    server.send(server_codec.encode(&[disconnect.clone()]).unwrap()).await.unwrap();
    let frame = client.recv().await.unwrap().unwrap();
    assert_eq!(client_codec.decode(&frame).unwrap(), vec![disconnect]);

    task.await.unwrap().unwrap();
    assert!(server.recv().await.unwrap().is_none());
    assert!(client.recv().await.unwrap().is_none());

    let recording = PacketRecording::load(&recording_path).unwrap();
    let names: Vec<&str> = recording
        .packets
        .iter()
        .map(|p| p.packet_name.as_str())
        .collect();
    assert_eq!(
        names,
        ["NetworkSettings", "ServerToClientHandshake", "Disconnect"]
    );
}
