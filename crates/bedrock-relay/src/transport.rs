//! Compression and encryption negotiation shared by both legs.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use bedrock_packets::{
    ClientToServerHandshake, CompressionAlgorithm, NetworkSettings, ServerToClientHandshake,
};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{error, info};

use crate::batch::{BatchError, CompressionState, RawPacket};
use crate::cipher::EncryptionKey;
use crate::handler::{Leg, RelayContext};

#[derive(Error, Debug)]
pub enum HandshakeError {
    #[error("handshake token must have three segments, got {0}")]
    MalformedToken(usize),
    #[error("handshake token segment is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("handshake token segment is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("key agreement failed: {0}")]
    KeyAgreement(String),
    #[error("could not encode handshake reply: {0}")]
    Reply(#[from] BatchError),
    #[error("server negotiated {0:?} compression, which the relay cannot frame")]
    UnsupportedCompression(CompressionAlgorithm),
}

/// ECDH over the relay's own key pair
pub trait KeyAgreement: Send {
    /// Shared secret with a peer given its DER encoded public key
    fn shared_secret(&self, peer_public_key_der: &[u8]) -> Result<Vec<u8>, HandshakeError>;
}

#[derive(Deserialize)]
struct TokenHeader {
    x5u: String,
}

#[derive(Deserialize)]
struct TokenClaims {
    salt: String,
}

/// Server public key and salt carried by the handshake token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeToken {
    pub server_public_key: Vec<u8>,
    pub salt: Vec<u8>,
}

impl HandshakeToken {
    /// Parse the signed token without verifying its signature
    pub fn parse(jwt: &str) -> Result<Self, HandshakeError> {
        let segments: Vec<&str> = jwt.split('.').collect();
        let [header, claims, _signature] = segments.as_slice() else {
            return Err(HandshakeError::MalformedToken(segments.len()));
        };

        let header: TokenHeader = serde_json::from_slice(&decode_segment(header)?)?;
        let claims: TokenClaims = serde_json::from_slice(&decode_segment(claims)?)?;

        Ok(Self {
            server_public_key: STANDARD.decode(header.x5u)?,
            salt: STANDARD.decode(claims.salt)?,
        })
    }
}

fn decode_segment(segment: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(segment.trim_end_matches('='))
}

/// `SHA-256(salt || shared_secret)`
#[must_use]
pub fn derive_session_key(salt: &[u8], shared_secret: &[u8]) -> EncryptionKey {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(shared_secret);
    EncryptionKey::from_bytes(hasher.finalize().into())
}

/// Tracks transport state for the pair and turns negotiation packets into
/// transport actions
pub struct TransportNegotiator {
    key_agreement: Box<dyn KeyAgreement>,
    compression: Option<CompressionState>,
    upstream_key: Option<EncryptionKey>,
}

impl TransportNegotiator {
    #[must_use]
    pub fn new(key_agreement: Box<dyn KeyAgreement>) -> Self {
        Self {
            key_agreement,
            compression: None,
            upstream_key: None,
        }
    }

    #[must_use]
    pub const fn compression(&self) -> Option<CompressionState> {
        self.compression
    }

    #[must_use]
    pub const fn upstream_key(&self) -> Option<&EncryptionKey> {
        self.upstream_key.as_ref()
    }

    /// Relay the settings to the client with the old framing, then switch
    /// both legs over. Snappy is refused before anything is relayed.
    pub fn negotiate_compression(
        &mut self,
        settings: &NetworkSettings,
        ctx: &mut RelayContext<'_>,
    ) -> Result<(), HandshakeError> {
        if settings.compression_algorithm == CompressionAlgorithm::Snappy {
            error!("Server negotiated Snappy compression, which the relay cannot frame");
            return Err(HandshakeError::UnsupportedCompression(settings.compression_algorithm));
        }

        let state = CompressionState {
            algorithm: settings.compression_algorithm,
            threshold: settings.compression_threshold,
        };
        info!(
            "Compression negotiated: {:?} (threshold {})",
            state.algorithm, state.threshold
        );

        let raw = ctx.raw().clone();
        ctx.send_immediately(Leg::Downstream, raw);
        ctx.set_compression(state);
        self.compression = Some(state);
        Ok(())
    }

    /// Derive the session key, encrypt the upstream leg and confirm
    pub fn complete_handshake(
        &mut self,
        handshake: &ServerToClientHandshake,
        ctx: &mut RelayContext<'_>,
    ) -> Result<(), HandshakeError> {
        let token = HandshakeToken::parse(&handshake.jwt)?;
        let secret = self.key_agreement.shared_secret(&token.server_public_key)?;
        let key = derive_session_key(&token.salt, &secret);

        ctx.enable_encryption(Leg::Upstream, key.clone());
        ctx.send_immediately(
            Leg::Upstream,
            RawPacket::from_packet(&ClientToServerHandshake)?,
        );
        self.upstream_key = Some(key);
        info!("Upstream encryption enabled");
        Ok(())
    }
}
