//! Handshake message schema.
//!
//! Each message is a 32-bit constructor tag followed by its fields. The
//! same types are used to build outgoing requests and to decode responses,
//! and a test server can use them the other way around.

use crate::codec::{Int128, Int256, Reader, Writer};
use crate::error::WireError;

/// `req_pq nonce:int128 = ResPQ`
pub const REQ_PQ: u32 = 0x6046_9778;
/// `resPQ nonce:int128 server_nonce:int128 pq:bytes server_public_key_fingerprints:Vector<long>`
pub const RES_PQ: u32 = 0x0516_2463;
/// `p_q_inner_data pq:bytes p:bytes q:bytes nonce:int128 server_nonce:int128 new_nonce:int256`
pub const P_Q_INNER_DATA: u32 = 0x83c9_5aec;
/// `req_DH_params nonce:int128 server_nonce:int128 p:bytes q:bytes public_key_fingerprint:long encrypted_data:bytes`
pub const REQ_DH_PARAMS: u32 = 0xd712_e4be;

/// A tagged handshake message.
pub trait Message: Sized {
    const TAG: u32;

    /// Write every field after the tag.
    fn write_body(&self, w: &mut Writer) -> Result<(), WireError>;

    /// Read every field after the tag.
    fn read_body(r: &mut Reader<'_>) -> Result<Self, WireError>;

    /// Serialize tag and body.
    fn to_bytes(&self) -> Result<Vec<u8>, WireError> {
        let mut w = Writer::new();
        w.write_u32(Self::TAG);
        self.write_body(&mut w)?;
        Ok(w.into_inner())
    }

    /// Read the tag, check it, then read the body.
    fn read(r: &mut Reader<'_>) -> Result<Self, WireError> {
        let actual = r.read_u32()?;
        if actual != Self::TAG {
            return Err(WireError::UnexpectedTag {
                expected: Self::TAG,
                actual,
            });
        }
        Self::read_body(r)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, WireError> {
        Self::read(&mut Reader::new(bytes))
    }
}

/// First request: ask the server for a composite to factor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReqPq {
    pub nonce: Int128,
}

impl Message for ReqPq {
    const TAG: u32 = REQ_PQ;

    fn write_body(&self, w: &mut Writer) -> Result<(), WireError> {
        w.write_int128(&self.nonce);
        Ok(())
    }

    fn read_body(r: &mut Reader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            nonce: r.read_int128()?,
        })
    }
}

/// Server reply to [`ReqPq`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResPq {
    pub nonce: Int128,
    pub server_nonce: Int128,
    /// Big-endian composite.
    pub pq: Vec<u8>,
    pub server_public_key_fingerprints: Vec<u64>,
}

impl Message for ResPq {
    const TAG: u32 = RES_PQ;

    fn write_body(&self, w: &mut Writer) -> Result<(), WireError> {
        w.write_int128(&self.nonce);
        w.write_int128(&self.server_nonce);
        w.write_bytes(&self.pq)?;
        w.write_vector_u64(&self.server_public_key_fingerprints)
    }

    fn read_body(r: &mut Reader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            nonce: r.read_int128()?,
            server_nonce: r.read_int128()?,
            pq: r.read_bytes()?,
            server_public_key_fingerprints: r.read_vector_u64()?,
        })
    }
}

/// Plaintext that gets hashed, padded and RSA-encrypted.
#[derive(Clone, PartialEq, Eq)]
pub struct PqInnerData {
    pub pq: Vec<u8>,
    pub p: Vec<u8>,
    pub q: Vec<u8>,
    pub nonce: Int128,
    pub server_nonce: Int128,
    pub new_nonce: Int256,
}

impl std::fmt::Debug for PqInnerData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PqInnerData")
            .field("pq", &self.pq)
            .field("p", &self.p)
            .field("q", &self.q)
            .field("nonce", &self.nonce)
            .field("server_nonce", &self.server_nonce)
            .field("new_nonce", &"[REDACTED]")
            .finish()
    }
}

impl Message for PqInnerData {
    const TAG: u32 = P_Q_INNER_DATA;

    fn write_body(&self, w: &mut Writer) -> Result<(), WireError> {
        w.write_bytes(&self.pq)?;
        w.write_bytes(&self.p)?;
        w.write_bytes(&self.q)?;
        w.write_int128(&self.nonce);
        w.write_int128(&self.server_nonce);
        w.write_int256(&self.new_nonce);
        Ok(())
    }

    fn read_body(r: &mut Reader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            pq: r.read_bytes()?,
            p: r.read_bytes()?,
            q: r.read_bytes()?,
            nonce: r.read_int128()?,
            server_nonce: r.read_int128()?,
            new_nonce: r.read_int256()?,
        })
    }
}

/// Second request: prove the factorization and carry the encrypted inner data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReqDhParams {
    pub nonce: Int128,
    pub server_nonce: Int128,
    pub p: Vec<u8>,
    pub q: Vec<u8>,
    pub public_key_fingerprint: u64,
    pub encrypted_data: Vec<u8>,
}

impl Message for ReqDhParams {
    const TAG: u32 = REQ_DH_PARAMS;

    fn write_body(&self, w: &mut Writer) -> Result<(), WireError> {
        w.write_int128(&self.nonce);
        w.write_int128(&self.server_nonce);
        w.write_bytes(&self.p)?;
        w.write_bytes(&self.q)?;
        w.write_u64(self.public_key_fingerprint);
        w.write_bytes(&self.encrypted_data)
    }

    fn read_body(r: &mut Reader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            nonce: r.read_int128()?,
            server_nonce: r.read_int128()?,
            p: r.read_bytes()?,
            q: r.read_bytes()?,
            public_key_fingerprint: r.read_u64()?,
            encrypted_data: r.read_bytes()?,
        })
    }
}
