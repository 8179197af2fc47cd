//! Temporary AES key and IV derived from the handshake nonces.
//!
//! ```text
//! H1 = SHA1(new_nonce ∥ server_nonce)
//! H2 = SHA1(server_nonce ∥ new_nonce)
//! H3 = SHA1(new_nonce ∥ new_nonce)
//! key = H1 ∥ H2[0..12]
//! iv  = H2[12..20] ∥ H3 ∥ new_nonce[0..4]
//! ```

use sha1::{Digest, Sha1};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

/// Required server nonce length.
pub const SERVER_NONCE_LEN: usize = 16;
/// Required new nonce length.
pub const NEW_NONCE_LEN: usize = 32;

/// 32-byte key and 32-byte IV for the encrypted-session layer.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct TmpAesKeys {
    pub key: [u8; 32],
    pub iv: [u8; 32],
}

impl std::fmt::Debug for TmpAesKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TmpAesKeys")
            .field("key", &"[REDACTED]")
            .field("iv", &"[REDACTED]")
            .finish()
    }
}

fn sha1_concat(a: &[u8], b: &[u8]) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update(a);
    hasher.update(b);
    hasher.finalize().into()
}

/// Derive the temporary key material.
pub fn derive_tmp_aes_keys(server_nonce: &[u8], new_nonce: &[u8]) -> Result<TmpAesKeys, CryptoError> {
    if server_nonce.len() != SERVER_NONCE_LEN {
        return Err(CryptoError::InvalidNonceLength {
            expected: SERVER_NONCE_LEN,
            actual: server_nonce.len(),
        });
    }
    if new_nonce.len() != NEW_NONCE_LEN {
        return Err(CryptoError::InvalidNonceLength {
            expected: NEW_NONCE_LEN,
            actual: new_nonce.len(),
        });
    }

    let mut h1 = sha1_concat(new_nonce, server_nonce);
    let mut h2 = sha1_concat(server_nonce, new_nonce);
    let mut h3 = sha1_concat(new_nonce, new_nonce);

    let mut keys = TmpAesKeys {
        key: [0u8; 32],
        iv: [0u8; 32],
    };
    keys.key[..20].copy_from_slice(&h1);
    keys.key[20..].copy_from_slice(&h2[..12]);

    keys.iv[..8].copy_from_slice(&h2[12..]);
    keys.iv[8..28].copy_from_slice(&h3);
    keys.iv[28..].copy_from_slice(&new_nonce[..4]);

    h1.zeroize();
    h2.zeroize();
    h3.zeroize();
    Ok(keys)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn layout_follows_the_three_digests() {
        let server_nonce = [0x11u8; 16];
        let new_nonce: [u8; 32] = core::array::from_fn(|i| i as u8);
        let keys = derive_tmp_aes_keys(&server_nonce, &new_nonce).unwrap();

        let h1 = sha1_concat(&new_nonce, &server_nonce);
        let h2 = sha1_concat(&server_nonce, &new_nonce);
        let h3 = sha1_concat(&new_nonce, &new_nonce);

        assert_eq!(&keys.key[..20], &h1);
        assert_eq!(&keys.key[20..], &h2[..12]);
        assert_eq!(&keys.iv[..8], &h2[12..]);
        assert_eq!(&keys.iv[8..28], &h3);
        assert_eq!(&keys.iv[28..], &[0, 1, 2, 3]);
    }

    #[test]
    fn sha1_of_known_input() {
        // SHA1("abc")
        assert_eq!(
            hex::encode(sha1_concat(b"a", b"bc")),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
    }

    #[test]
    fn same_inputs_same_keys() {
        let a = derive_tmp_aes_keys(&[1; 16], &[2; 32]).unwrap();
        let b = derive_tmp_aes_keys(&[1; 16], &[2; 32]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn new_nonce_changes_key() {
        let a = derive_tmp_aes_keys(&[1; 16], &[2; 32]).unwrap();
        let mut other = [2u8; 32];
        other[31] = 3;
        let b = derive_tmp_aes_keys(&[1; 16], &other).unwrap();
        assert_ne!(a.key, b.key);
        assert_ne!(a.iv, b.iv);
    }

    #[test]
    fn wrong_lengths_are_rejected() {
        assert!(matches!(
            derive_tmp_aes_keys(&[0; 15], &[0; 32]),
            Err(CryptoError::InvalidNonceLength { expected: 16, actual: 15 })
        ));
        assert!(matches!(
            derive_tmp_aes_keys(&[0; 16], &[0; 16]),
            Err(CryptoError::InvalidNonceLength { expected: 32, actual: 16 })
        ));
    }

    #[test]
    fn debug_is_redacted() {
        let keys = derive_tmp_aes_keys(&[1; 16], &[2; 32]).unwrap();
        assert_eq!(
            format!("{keys:?}"),
            r#"TmpAesKeys { key: "[REDACTED]", iv: "[REDACTED]" }"#
        );
    }
}
