//! Fixed-size plaintext block for the RSA-encrypted inner data.
//!
//! Layout: `SHA1(inner) ∥ inner ∥ random padding`, exactly
//! [`PADDED_BLOCK_LEN`] bytes.

use rand::{CryptoRng, RngCore};
use sha1::{Digest, Sha1};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;
use crate::rsa::RsaPublicKey;

/// Size of every block handed to RSA.
pub const PADDED_BLOCK_LEN: usize = 255;

/// SHA-1 output size.
pub const DIGEST_LEN: usize = 20;

/// A padded plaintext block. Wiped on drop since it carries the new nonce.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PaddedBlock([u8; PADDED_BLOCK_LEN]);

impl std::fmt::Debug for PaddedBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PaddedBlock").field(&"[REDACTED]").finish()
    }
}

impl PaddedBlock {
    /// Hash `inner_data`, prepend the digest and fill the rest with
    /// random bytes from `rng`.
    pub fn build<R: RngCore + CryptoRng>(
        inner_data: &[u8],
        rng: &mut R,
    ) -> Result<Self, CryptoError> {
        let used = DIGEST_LEN + inner_data.len();
        if used > PADDED_BLOCK_LEN {
            return Err(CryptoError::PlaintextTooLarge {
                len: used,
                max: PADDED_BLOCK_LEN,
            });
        }

        let mut block = [0u8; PADDED_BLOCK_LEN];
        block[..DIGEST_LEN].copy_from_slice(&Sha1::digest(inner_data));
        block[DIGEST_LEN..used].copy_from_slice(inner_data);
        rng.fill_bytes(&mut block[used..]);
        Ok(Self(block))
    }

    pub const fn as_bytes(&self) -> &[u8; PADDED_BLOCK_LEN] {
        &self.0
    }

    /// Encrypt the block with raw RSA under `key`.
    pub fn seal(&self, key: &RsaPublicKey) -> Result<Vec<u8>, CryptoError> {
        key.encrypt_raw(&self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::rsa::test_public_key;
    use rand::SeedableRng;
    use rand::rngs::{OsRng, StdRng};

    #[test]
    fn block_starts_with_digest_of_inner_data() {
        let inner = b"inner data that would be a p_q_inner_data record";
        let block = PaddedBlock::build(inner, &mut OsRng).unwrap();
        let bytes = block.as_bytes();

        assert_eq!(bytes.len(), PADDED_BLOCK_LEN);
        assert_eq!(&bytes[..DIGEST_LEN], Sha1::digest(inner).as_slice());
        assert_eq!(&bytes[DIGEST_LEN..DIGEST_LEN + inner.len()], inner);
    }

    #[test]
    fn padding_comes_from_rng() {
        let inner = [9u8; 100];
        let a = PaddedBlock::build(&inner, &mut StdRng::seed_from_u64(7)).unwrap();
        let b = PaddedBlock::build(&inner, &mut StdRng::seed_from_u64(7)).unwrap();
        let c = PaddedBlock::build(&inner, &mut StdRng::seed_from_u64(8)).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
        assert_ne!(a.as_bytes()[120..], c.as_bytes()[120..]);
    }

    #[test]
    fn exact_fit_has_no_padding() {
        let inner = [1u8; PADDED_BLOCK_LEN - DIGEST_LEN];
        let block = PaddedBlock::build(&inner, &mut OsRng).unwrap();
        assert_eq!(&block.as_bytes()[DIGEST_LEN..], &inner);
    }

    #[test]
    fn oversized_inner_data_is_rejected() {
        let inner = [1u8; PADDED_BLOCK_LEN - DIGEST_LEN + 1];
        assert!(matches!(
            PaddedBlock::build(&inner, &mut OsRng),
            Err(CryptoError::PlaintextTooLarge { len: 256, max: 255 })
        ));
    }

    #[test]
    fn seal_produces_modulus_sized_ciphertext() {
        let block = PaddedBlock::build(b"abc", &mut OsRng).unwrap();
        let key = test_public_key(65537);
        let sealed = block.seal(&key).unwrap();
        assert_eq!(sealed.len(), key.modulus_len());

        let identity = test_public_key(1);
        assert_eq!(&block.seal(&identity).unwrap()[1..], block.as_bytes());
    }

    #[test]
    fn debug_does_not_leak_contents() {
        let block = PaddedBlock::build(&[0xab; 10], &mut OsRng).unwrap();
        assert!(!format!("{block:?}").contains("171"));
    }
}
