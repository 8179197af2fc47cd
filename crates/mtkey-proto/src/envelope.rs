//! Plain message envelope used before an auth key exists.
//!
//! Layout: `auth_key_id:u64` (always zero here), `message_id:u64` (a
//! fixed-point timestamp), `length:u32`, then `length` payload bytes.

use crate::codec::{Reader, Writer};
use crate::error::WireError;

/// Size of the envelope header in bytes.
pub const HEADER_LEN: usize = 8 + 8 + 4;

/// A decoded or to-be-encoded plain envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlainEnvelope {
    pub auth_key_id: u64,
    pub message_id: u64,
    pub payload: Vec<u8>,
}

impl PlainEnvelope {
    /// Wrap `payload` with a zero auth key id.
    pub const fn new(message_id: u64, payload: Vec<u8>) -> Self {
        Self {
            auth_key_id: 0,
            message_id,
            payload,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        let length = u32::try_from(self.payload.len()).map_err(|_| WireError::PayloadTooLong {
            len: self.payload.len(),
        })?;
        let mut w = Writer::with_capacity(HEADER_LEN + self.payload.len());
        w.write_u64(self.auth_key_id);
        w.write_u64(self.message_id);
        w.write_u32(length);
        w.write_raw(&self.payload);
        Ok(w.into_inner())
    }

    /// Parse a full inbound package.
    ///
    /// The declared length must match the bytes that follow the header
    /// exactly; anything else is a corrupted packet.
    pub fn decode(package: &[u8]) -> Result<Self, WireError> {
        let mut r = Reader::new(package);
        let auth_key_id = r.read_u64()?;
        let message_id = r.read_u64()?;
        let declared = r.read_u32()? as usize;

        if declared != r.remaining() {
            return Err(WireError::CorruptedPacket {
                declared,
                actual: r.remaining(),
            });
        }

        Ok(Self {
            auth_key_id,
            message_id,
            payload: r.rest().to_vec(),
        })
    }
}
