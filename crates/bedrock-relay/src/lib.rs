//! Bedrock relay: sits between a client and a server, keeps both connections
//! on the same compression and encryption state, and passes everything a
//! [`PacketHandler`] does not claim through byte-for-byte.

pub mod batch;
pub mod cipher;
pub mod connection;
pub mod handler;
pub mod pair;
pub mod recording;
pub mod session;
pub mod transport;

pub use batch::{BatchError, CompressionState, FrameCodec, RawPacket};
pub use cipher::{CipherError, CipherFactory, EncryptionKey, FrameCipher};
pub use connection::{ChannelConnection, Connection};
pub use handler::{ForwardAll, Leg, PacketHandler, PacketSignal, RelayContext, TransportAction};
pub use pair::{FrameOutput, RelayPair};
pub use recording::{PacketRecording, RecordedPacket};
pub use session::{Dispatch, Dispatched, ProtocolSession};
pub use transport::{
    HandshakeError, HandshakeToken, KeyAgreement, TransportNegotiator, derive_session_key,
};
