//! The relay pair: two sessions, two connections, one event loop.

use std::path::PathBuf;

use bedrock_packets::{Direction, GameVersion, Packet};
use bytes::Bytes;
use eyre::WrapErr;
use tracing::{info, warn};

use crate::batch::RawPacket;
use crate::cipher::CipherFactory;
use crate::connection::Connection;
use crate::handler::{Leg, TransportAction};
use crate::recording::PacketRecording;
use crate::session::{Dispatch, ProtocolSession};

/// Frames produced while processing one received frame
#[derive(Debug, Default, PartialEq, Eq)]
pub struct FrameOutput {
    /// In send order
    pub frames: Vec<(Leg, Bytes)>,
    /// Legs a handler asked to disconnect
    pub disconnect: Vec<Leg>,
}

impl FrameOutput {
    fn push(&mut self, leg: Leg, frame: Option<Bytes>) {
        if let Some(frame) = frame {
            self.frames.push((leg, frame));
        }
    }
}

pub struct RelayPair<U, D> {
    upstream_conn: U,
    downstream_conn: D,
    upstream: ProtocolSession,
    downstream: ProtocolSession,
    ciphers: Box<dyn CipherFactory>,
    recording: Option<(PacketRecording, PathBuf)>,
}

impl<U: Connection, D: Connection> RelayPair<U, D> {
    /// `upstream` faces the real server, `downstream` the real client
    #[must_use]
    pub fn new(
        upstream_conn: U,
        downstream_conn: D,
        upstream: ProtocolSession,
        downstream: ProtocolSession,
        ciphers: Box<dyn CipherFactory>,
    ) -> Self {
        Self {
            upstream_conn,
            downstream_conn,
            upstream,
            downstream,
            ciphers,
            recording: None,
        }
    }

    /// Record recognized clientbound packets and save them to `path` on teardown
    #[must_use]
    pub fn with_recording(mut self, version: GameVersion, path: impl Into<PathBuf>) -> Self {
        self.recording = Some((PacketRecording::new(version), path.into()));
        self
    }

    #[must_use]
    pub const fn session(&self, leg: Leg) -> &ProtocolSession {
        match leg {
            Leg::Upstream => &self.upstream,
            Leg::Downstream => &self.downstream,
        }
    }

    fn session_mut(&mut self, leg: Leg) -> &mut ProtocolSession {
        match leg {
            Leg::Upstream => &mut self.upstream,
            Leg::Downstream => &mut self.downstream,
        }
    }

    #[must_use]
    pub fn recording(&self) -> Option<&PacketRecording> {
        self.recording.as_ref().map(|(recording, _)| recording)
    }

    /// Run until either leg closes, a handler requests a disconnect or a fatal
    /// error occurs. Both connections are closed on the way out.
    pub async fn run(mut self) -> eyre::Result<()> {
        info!(
            "Relaying {} <-> {}",
            self.downstream_conn.remote_addr(),
            self.upstream_conn.remote_addr()
        );

        let result = self.relay().await;
        if let Err(e) = &result {
            warn!("Relay failed: {:#}", e);
        }

        self.upstream_conn.close().await;
        self.downstream_conn.close().await;
        info!("Relay pair closed");

        if let Some((recording, path)) = &self.recording {
            if let Err(e) = recording.save(path) {
                warn!("Failed to save recording: {}", e);
            }
        }

        result
    }

    async fn relay(&mut self) -> eyre::Result<()> {
        loop {
            let (leg, frame) = tokio::select! {
                frame = self.upstream_conn.recv() => (Leg::Upstream, frame),
                frame = self.downstream_conn.recv() => (Leg::Downstream, frame),
            };

            let Some(frame) = frame.wrap_err_with(|| format!("receiving on {leg}"))? else {
                info!("{} leg disconnected", leg);
                return Ok(());
            };

            let output = self.process_frame(leg, &frame)?;
            self.deliver(output.frames).await?;

            if let Some(leg) = output.disconnect.first() {
                info!("Disconnect requested on {} leg", leg);
                return Ok(());
            }
        }
    }

    async fn deliver(&mut self, frames: Vec<(Leg, Bytes)>) -> eyre::Result<()> {
        for (leg, frame) in frames {
            let sent = match leg {
                Leg::Upstream => self.upstream_conn.send(frame).await,
                Leg::Downstream => self.downstream_conn.send(frame).await,
            };
            sent.wrap_err_with(|| format!("sending on {leg}"))?;
        }
        Ok(())
    }

    /// Decode, dispatch and apply one received frame.
    ///
    /// Unhandled packets are queued on the opposite leg, then the handler's
    /// actions run in order. Queues are flushed as one batch per leg at the end.
    pub fn process_frame(&mut self, leg: Leg, frame: &[u8]) -> eyre::Result<FrameOutput> {
        let packets = self
            .session_mut(leg)
            .receive_frame(frame)
            .wrap_err_with(|| format!("reading frame on {leg}"))?;

        let mut output = FrameOutput::default();
        for raw in packets {
            self.process_packet(leg, raw, &mut output)?;
        }

        self.flush(Leg::Upstream, &mut output)?;
        self.flush(Leg::Downstream, &mut output)?;
        Ok(output)
    }

    fn process_packet(
        &mut self,
        leg: Leg,
        raw: RawPacket,
        output: &mut FrameOutput,
    ) -> eyre::Result<()> {
        let dispatched = self.session_mut(leg).dispatch(raw)?;
        self.record(leg, &dispatched.packet);

        if let Dispatch::Forwarded(raw) = dispatched.outcome {
            self.session_mut(leg.opposite()).queue(raw);
        }

        for action in dispatched.actions {
            self.apply(action, output)?;
        }
        Ok(())
    }

    fn record(&mut self, leg: Leg, packet: &Packet) {
        if leg != Leg::Upstream || packet.is_unknown() {
            return;
        }
        if let Some((recording, _)) = self.recording.as_mut() {
            recording.record(Direction::Clientbound, packet);
        }
    }

    fn apply(&mut self, action: TransportAction, output: &mut FrameOutput) -> eyre::Result<()> {
        match action {
            TransportAction::SendImmediately { leg, packet } => {
                self.flush(leg, output)?;
                let frame = self.session_mut(leg).encode_now(packet)?;
                output.push(leg, Some(frame));
            }
            TransportAction::Send { leg, packet } => self.session_mut(leg).queue(packet),
            TransportAction::SetCompression(state) => {
                self.flush(Leg::Upstream, output)?;
                self.flush(Leg::Downstream, output)?;
                self.upstream.set_compression(state);
                self.downstream.set_compression(state);
            }
            TransportAction::EnableEncryption { leg, key } => {
                self.flush(leg, output)?;
                let session = match leg {
                    Leg::Upstream => &mut self.upstream,
                    Leg::Downstream => &mut self.downstream,
                };
                session.enable_encryption(key, self.ciphers.as_ref());
            }
            TransportAction::InstallDefinitions { leg, definitions } => {
                self.session_mut(leg).install_definitions(&definitions);
            }
            TransportAction::Disconnect { leg } => {
                self.flush(Leg::Upstream, output)?;
                self.flush(Leg::Downstream, output)?;
                output.disconnect.push(leg);
            }
        }
        Ok(())
    }

    fn flush(&mut self, leg: Leg, output: &mut FrameOutput) -> eyre::Result<()> {
        let frame = self
            .session_mut(leg)
            .flush()
            .wrap_err_with(|| format!("flushing {leg}"))?;
        output.push(leg, frame);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use bedrock_packets::{CompressionAlgorithm, NetworkSettings, TransportDecoder};
    use bedrock_protocol::PacketHeader;

    use super::*;
    use crate::batch::{CompressionState, FrameCodec};
    use crate::cipher::{CipherError, EncryptionKey, FrameCipher};
    use crate::connection::ChannelConnection;
    use crate::handler::{ForwardAll, PacketHandler, PacketSignal, RelayContext};

    struct Plain;

    impl FrameCipher for Plain {
        fn encrypt(&mut self, plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
            Ok(plaintext.to_vec())
        }

        fn decrypt(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>, CipherError> {
            Ok(ciphertext.to_vec())
        }
    }

    impl CipherFactory for Plain {
        fn create(&self, _key: &EncryptionKey) -> Box<dyn FrameCipher> {
            Box::new(Self)
        }
    }

    /// Switches compression on `NetworkSettings`, forwards the rest
    struct CompressOnSettings;

    impl PacketHandler for CompressOnSettings {
        fn handle(
            &mut self,
            packet: &Packet,
            ctx: &mut RelayContext<'_>,
        ) -> eyre::Result<PacketSignal> {
            if let Packet::NetworkSettings(settings) = packet {
                let raw = ctx.raw().clone();
                ctx.send_immediately(Leg::Downstream, raw);
                ctx.set_compression(CompressionState {
                    algorithm: settings.compression_algorithm,
                    threshold: settings.compression_threshold,
                });
                return Ok(PacketSignal::Handled);
            }
            Ok(PacketSignal::Unhandled)
        }
    }

    fn pair(handler: Box<dyn PacketHandler>) -> RelayPair<ChannelConnection, ChannelConnection> {
        let relay: SocketAddr = "127.0.0.1:19132".parse().unwrap();
        let server: SocketAddr = "127.0.0.1:19133".parse().unwrap();
        let client: SocketAddr = "127.0.0.1:50000".parse().unwrap();
        let (upstream_conn, _server_end) = ChannelConnection::pair(relay, server);
        let (downstream_conn, _client_end) = ChannelConnection::pair(relay, client);

        RelayPair::new(
            upstream_conn,
            downstream_conn,
            ProtocolSession::new(Leg::Upstream, server, Box::new(TransportDecoder::new()))
                .with_handler(handler),
            ProtocolSession::new(Leg::Downstream, client, Box::new(TransportDecoder::new())),
            Box::new(Plain),
        )
    }

    #[test]
    fn test_unhandled_packets_reach_the_other_leg() {
        let mut relay = pair(Box::new(ForwardAll));
        let raw = RawPacket::new(PacketHeader::new(0x1FF), vec![4, 5, 6]);
        let frame = FrameCodec::new().encode(&[raw.clone()]).unwrap();

        let output = relay.process_frame(Leg::Upstream, &frame).unwrap();
        assert_eq!(output.frames, vec![(Leg::Downstream, frame)]);
        assert!(output.disconnect.is_empty());
    }

    #[test]
    fn test_packets_without_handler_are_dropped() {
        let mut relay = pair(Box::new(ForwardAll));
        let frame = FrameCodec::new()
            .encode(&[RawPacket::new(PacketHeader::new(0x1FF), vec![1])])
            .unwrap();

        let output = relay.process_frame(Leg::Downstream, &frame).unwrap();
        assert!(output.frames.is_empty());
    }

    #[test]
    fn test_compression_applies_to_both_legs_after_forwarding() {
        let mut relay = pair(Box::new(CompressOnSettings));
        let settings = RawPacket::from_packet(&NetworkSettings {
            compression_threshold: 1,
            compression_algorithm: CompressionAlgorithm::Zlib,
            ..Default::default()
        })
        .unwrap();
        let trailing = RawPacket::new(PacketHeader::new(0x1FF), vec![7; 64]);
        let frame = FrameCodec::new()
            .encode(&[settings.clone(), trailing.clone()])
            .unwrap();

        let output = relay.process_frame(Leg::Upstream, &frame).unwrap();

        // Settings go out uncompressed, the trailing packet with the new framing
        assert_eq!(output.frames.len(), 2);
        let (leg, first) = &output.frames[0];
        assert_eq!(*leg, Leg::Downstream);
        assert_eq!(FrameCodec::new().decode(first).unwrap(), vec![settings]);

        let mut compressed = FrameCodec::new();
        compressed.set_compression(CompressionState {
            algorithm: CompressionAlgorithm::Zlib,
            threshold: 1,
        });
        let (leg, second) = &output.frames[1];
        assert_eq!(*leg, Leg::Downstream);
        assert_eq!(second[1], 0x00, "zlib marker");
        assert_eq!(compressed.decode(second).unwrap(), vec![trailing]);

        for leg in [Leg::Upstream, Leg::Downstream] {
            assert_eq!(
                relay.session(leg).compression().map(|c| c.algorithm),
                Some(CompressionAlgorithm::Zlib)
            );
        }
    }
}
