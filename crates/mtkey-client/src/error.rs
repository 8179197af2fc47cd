//! Handshake and driver error types.

use mtkey_crypto::CryptoError;
use mtkey_proto::WireError;

use crate::handshake::HandshakeState;
use crate::transport::TransportError;

/// Every way a handshake attempt can fail. All of them are terminal for the
/// instance that produced them.
#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    #[error("Unexpected response tag: expected {expected:#010x}, got {actual:#010x}")]
    UnexpectedResponseTag { expected: u32, actual: u32 },

    #[error("Client nonce echoed by the server does not match ours")]
    NonceMismatch,

    #[error("Invalid composite length: expected 8 bytes, got {actual}")]
    InvalidCompositeLength { actual: usize },

    #[error("Failed to factorize pq = {pq}")]
    FactorizationFailed { pq: u64 },

    #[error("Unsupported fingerprint count: expected exactly 1, got {count}")]
    UnsupportedFingerprintCount { count: usize },

    #[error("No configured public key matches fingerprint {fingerprint:016x}")]
    FingerprintMismatch { fingerprint: u64 },

    #[error("Corrupted packet: declared payload length {declared}, actual {actual}")]
    CorruptedPacket { declared: usize, actual: usize },

    #[error("Malformed length: declared {declared} bytes, {remaining} remaining")]
    MalformedLength { declared: usize, remaining: usize },

    #[error("Truncated input: needed {needed} bytes, {remaining} remaining")]
    TruncatedInput { needed: usize, remaining: usize },

    #[error("Unexpected tag: expected {expected:#010x}, got {actual:#010x}")]
    UnexpectedTag { expected: u32, actual: u32 },

    #[error("Plaintext too large: {len} bytes exceeds the {max}-byte block")]
    PlaintextTooLarge { len: usize, max: usize },

    #[error("Invalid nonce length: expected {expected}, got {actual}")]
    InvalidNonceLength { expected: usize, actual: usize },

    #[error("Operation not valid in state {actual:?} (expected {expected:?})")]
    InvalidState {
        expected: HandshakeState,
        actual: HandshakeState,
    },

    #[error("Handshake was aborted by an earlier error; start a new one")]
    Aborted,

    #[error("Encoding error: {0}")]
    Encoding(WireError),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

impl From<WireError> for HandshakeError {
    fn from(error: WireError) -> Self {
        match error {
            WireError::TruncatedInput { needed, remaining } => {
                Self::TruncatedInput { needed, remaining }
            }
            WireError::MalformedLength {
                declared,
                remaining,
            } => Self::MalformedLength {
                declared,
                remaining,
            },
            WireError::UnexpectedTag { expected, actual } => {
                Self::UnexpectedTag { expected, actual }
            }
            WireError::CorruptedPacket { declared, actual } => {
                Self::CorruptedPacket { declared, actual }
            }
            other @ (WireError::BytesTooLong { .. }
            | WireError::TooManyElements { .. }
            | WireError::PayloadTooLong { .. }) => Self::Encoding(other),
        }
    }
}

impl From<CryptoError> for HandshakeError {
    fn from(error: CryptoError) -> Self {
        match error {
            CryptoError::PlaintextTooLarge { len, max } => Self::PlaintextTooLarge { len, max },
            CryptoError::InvalidNonceLength { expected, actual } => {
                Self::InvalidNonceLength { expected, actual }
            }
            CryptoError::Encoding(wire) => wire.into(),
            other @ (CryptoError::InvalidKey(_) | CryptoError::MessageOutOfRange) => {
                Self::Crypto(other.to_string())
            }
        }
    }
}

/// Errors from running a handshake end to end.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("Handshake failed: {0}")]
    Handshake(#[from] HandshakeError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("No response from server within {secs}s")]
    Timeout { secs: u64 },

    #[error("Server closed the connection")]
    ConnectionClosed,
}
