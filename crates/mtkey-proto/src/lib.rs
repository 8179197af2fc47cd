//! Binary wire format for the auth-key handshake.
//!
//! Only the subset of the protocol's serialization that the unauthenticated
//! key exchange needs lives here:
//!
//! - [`codec`]: little-endian integers, padded byte strings, raw nonces and
//!   vectors of 64-bit values
//! - [`messages`]: constructor tags and the four handshake messages
//! - [`envelope`]: the plain (unencrypted) message envelope
//! - [`timestamp`]: the 32.32 fixed-point timestamp used as message id

pub mod codec;
pub mod envelope;
pub mod error;
pub mod messages;
pub mod timestamp;

pub use codec::{Int128, Int256, Reader, Writer};
pub use envelope::PlainEnvelope;
pub use error::WireError;
pub use messages::{Message, PqInnerData, ReqDhParams, ReqPq, ResPq};
pub use timestamp::{decode_timestamp, encode_timestamp};
