//! Crypto error types.

use mtkey_proto::WireError;

/// Errors from cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Plaintext too large: {len} bytes exceeds the {max}-byte block")]
    PlaintextTooLarge { len: usize, max: usize },

    #[error("Invalid nonce length: expected {expected}, got {actual}")]
    InvalidNonceLength { expected: usize, actual: usize },

    #[error("Invalid public key: {0}")]
    InvalidKey(String),

    #[error("RSA input is not smaller than the modulus")]
    MessageOutOfRange,

    #[error("Encoding error: {0}")]
    Encoding(#[from] WireError),
}
