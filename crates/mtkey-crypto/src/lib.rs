//! Crypto for the auth-key handshake.
//!
//! ## Primitives
//!
//! - **Factorization**: Pollard-Brent rho over 64-bit composites
//! - **RSA**: raw `m^e mod n` with server keys selected by 64-bit fingerprint
//! - **Padding**: SHA-1 digest ∥ inner data ∥ random bytes, exactly 255 bytes
//! - **Temporary keys**: SHA-1 mixing of server nonce and new nonce into a
//!   32-byte AES key and 32-byte IV

pub mod error;
pub mod factorize;
pub mod padded;
pub mod rsa;
pub mod tmp_keys;

pub use error::CryptoError;
pub use factorize::factorize;
pub use padded::{PADDED_BLOCK_LEN, PaddedBlock};
pub use rsa::{KeyRing, RsaPublicKey};
pub use tmp_keys::{TmpAesKeys, derive_tmp_aes_keys};
