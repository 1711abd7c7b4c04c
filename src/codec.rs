//! Symmetric codec for address fields stored at rest.
//!
//! Encoding is deterministic: the nonce is derived from the key and the
//! plaintext, so the same address always maps to the same ciphertext. The
//! distinct-merchant aggregation relies on this property to count merchants
//! by ciphertext equality without decrypting rows.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use sha2::{Digest, Sha256};
use thiserror::Error;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("ciphertext is not valid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("ciphertext is too short")]
    Truncated,

    #[error("encryption failed")]
    EncryptFailed,

    #[error("ciphertext could not be decrypted with the configured key")]
    DecryptFailed,

    #[error("decrypted payload is not valid utf-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

/// AES-256-GCM codec keyed once at startup from the configured secret.
#[derive(Clone)]
pub struct AddressCodec {
    key: [u8; 32],
}

impl AddressCodec {
    pub fn new(secret: &str) -> Self {
        let key: [u8; 32] = Sha256::digest(secret.as_bytes()).into();
        Self { key }
    }

    // Nonce bound to key and plaintext, which keeps encode deterministic.
    fn nonce_for(&self, plaintext: &[u8]) -> [u8; NONCE_LEN] {
        let mut hasher = Sha256::new();
        hasher.update(self.key);
        hasher.update(plaintext);
        let digest = hasher.finalize();

        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&digest[..NONCE_LEN]);
        nonce
    }

    /// Encrypt a plaintext address to lowercase hex of `nonce || ciphertext`.
    pub fn encode(&self, plaintext: &str) -> Result<String, CodecError> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        let nonce_bytes = self.nonce_for(plaintext.as_bytes());

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|_| CodecError::EncryptFailed)?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(hex::encode(out))
    }

    /// Reverse [`AddressCodec::encode`]. Fails on anything that was not
    /// produced by `encode` under the current key.
    pub fn decode(&self, ciphertext: &str) -> Result<String, CodecError> {
        let raw = hex::decode(ciphertext)?;
        if raw.len() < NONCE_LEN + TAG_LEN {
            return Err(CodecError::Truncated);
        }

        let (nonce, payload) = raw.split_at(NONCE_LEN);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), payload)
            .map_err(|_| CodecError::DecryptFailed)?;

        Ok(String::from_utf8(plaintext)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_encode_decode_roundtrip() {
        let codec = AddressCodec::new("test-ledger-key");
        let plaintext = "aleo1qyqszqgqqyqszqgqqyqszqgqqyqszqgqqyqszqgpq5yc2t";

        let ciphertext = codec.encode(plaintext).unwrap();
        let decrypted = codec.decode(&ciphertext).unwrap();

        assert_eq!(decrypted, plaintext);
        assert_ne!(ciphertext, plaintext);
    }

    #[test]
    fn test_encode_is_deterministic() {
        let codec = AddressCodec::new("test-ledger-key");

        let first = codec.encode("aleo1abc").unwrap();
        let second = codec.encode("aleo1abc").unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_distinct_plaintexts_encode_differently() {
        let codec = AddressCodec::new("test-ledger-key");

        let first = codec.encode("aleo1abc").unwrap();
        let second = codec.encode("aleo1xyz").unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_wrong_key_fails() {
        let codec = AddressCodec::new("test-ledger-key");
        let other = AddressCodec::new("some-other-key");

        let ciphertext = codec.encode("aleo1abc").unwrap();

        assert!(other.decode(&ciphertext).is_err());
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let codec = AddressCodec::new("test-ledger-key");

        let mut raw = hex::decode(codec.encode("aleo1abc").unwrap()).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0xff;

        assert!(codec.decode(&hex::encode(raw)).is_err());
    }

    #[test]
    fn test_plaintext_passed_to_decode_fails() {
        let codec = AddressCodec::new("test-ledger-key");

        assert!(codec.decode("aleo1abc").is_err());
        assert!(codec.decode("deadbeef").is_err());
    }
}
