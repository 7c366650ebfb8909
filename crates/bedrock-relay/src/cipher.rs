//! Seam for the AES session cipher.
//!
//! The relay only decides when a leg turns encrypted and which key it uses;
//! the cipher itself (AES-256-CFB8 with the frame checksum) comes from the
//! embedding transport through [`CipherFactory`].

use std::fmt;

use thiserror::Error;

#[derive(Error, Debug)]
#[error("frame cipher failed: {0}")]
pub struct CipherError(pub String);

/// Symmetric session key derived during the handshake
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey([u8; 32]);

impl EncryptionKey {
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey(<redacted>)")
    }
}

/// Stateful cipher for one leg; frames must pass through it in wire order
pub trait FrameCipher: Send {
    fn encrypt(&mut self, plaintext: &[u8]) -> Result<Vec<u8>, CipherError>;
    fn decrypt(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>, CipherError>;
}

pub trait CipherFactory: Send + Sync {
    fn create(&self, key: &EncryptionKey) -> Box<dyn FrameCipher>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_debug_is_redacted() {
        let key = EncryptionKey::from_bytes([7; 32]);
        assert_eq!(format!("{key:?}"), "EncryptionKey(<redacted>)");
        assert_eq!(key.as_bytes()[0], 7);
    }
}
