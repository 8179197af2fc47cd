//! Server RSA public keys.
//!
//! The handshake only ever encrypts, and only with raw RSA: the block is
//! already padded by [`crate::padded`]. Keys are looked up by the 64-bit
//! fingerprint the server advertises.

use mtkey_proto::Writer;
use num_bigint::BigUint;
use sha1::{Digest, Sha1};

use crate::error::CryptoError;

/// Smallest accepted modulus, in bytes. A 255-byte block must fit below it.
const MIN_MODULUS_LEN: usize = 256;

/// A server public key.
#[derive(Clone, PartialEq, Eq)]
pub struct RsaPublicKey {
    modulus: BigUint,
    exponent: BigUint,
    fingerprint: u64,
}

impl std::fmt::Debug for RsaPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaPublicKey")
            .field("fingerprint", &format_args!("{:016x}", self.fingerprint))
            .field("modulus_bits", &self.modulus.bits())
            .field("exponent", &self.exponent)
            .finish()
    }
}

impl RsaPublicKey {
    /// Build a key from big-endian modulus and exponent bytes.
    ///
    /// The fingerprint is the low 64 bits of SHA-1 over both numbers
    /// serialized as wire byte strings.
    pub fn from_components(modulus: &[u8], exponent: &[u8]) -> Result<Self, CryptoError> {
        let modulus = BigUint::from_bytes_be(modulus);
        let exponent = BigUint::from_bytes_be(exponent);
        if modulus.to_bytes_be().len() < MIN_MODULUS_LEN {
            return Err(CryptoError::InvalidKey(format!(
                "modulus is {} bits, need at least {}",
                modulus.bits(),
                MIN_MODULUS_LEN * 8
            )));
        }
        if exponent.bits() == 0 {
            return Err(CryptoError::InvalidKey("exponent is zero".to_string()));
        }

        let fingerprint = compute_fingerprint(&modulus, &exponent)?;
        Ok(Self {
            modulus,
            exponent,
            fingerprint,
        })
    }

    /// Build a key from a hex modulus and a numeric exponent.
    pub fn from_hex(modulus_hex: &str, exponent: u32) -> Result<Self, CryptoError> {
        let modulus = hex::decode(modulus_hex.trim())
            .map_err(|e| CryptoError::InvalidKey(format!("modulus is not valid hex: {e}")))?;
        Self::from_components(&modulus, &exponent.to_be_bytes())
    }

    /// Override the computed fingerprint with one supplied out of band.
    #[must_use]
    pub const fn with_fingerprint(mut self, fingerprint: u64) -> Self {
        self.fingerprint = fingerprint;
        self
    }

    pub const fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// Modulus length in bytes; every ciphertext has exactly this length.
    pub fn modulus_len(&self) -> usize {
        self.modulus.to_bytes_be().len()
    }

    /// Raw RSA: interpret `block` as a big-endian integer `m` and return
    /// `m^e mod n`, left-padded with zeros to the modulus length.
    pub fn encrypt_raw(&self, block: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let message = BigUint::from_bytes_be(block);
        if message >= self.modulus {
            return Err(CryptoError::MessageOutOfRange);
        }

        let encrypted = message.modpow(&self.exponent, &self.modulus).to_bytes_be();
        let mut out = vec![0u8; self.modulus_len() - encrypted.len()];
        out.extend_from_slice(&encrypted);
        Ok(out)
    }
}

fn compute_fingerprint(modulus: &BigUint, exponent: &BigUint) -> Result<u64, CryptoError> {
    let mut w = Writer::new();
    w.write_bytes(&modulus.to_bytes_be())?;
    w.write_bytes(&exponent.to_bytes_be())?;

    let digest = Sha1::digest(w.as_slice());
    let mut low = [0u8; 8];
    low.copy_from_slice(&digest[12..20]);
    Ok(u64::from_le_bytes(low))
}

/// The set of server keys the client trusts.
#[derive(Debug, Clone, Default)]
pub struct KeyRing {
    keys: Vec<RsaPublicKey>,
}

impl KeyRing {
    pub const fn new() -> Self {
        Self { keys: Vec::new() }
    }

    /// Add a key, replacing any key with the same fingerprint.
    pub fn insert(&mut self, key: RsaPublicKey) {
        self.keys.retain(|k| k.fingerprint != key.fingerprint);
        self.keys.push(key);
    }

    pub fn contains(&self, fingerprint: u64) -> bool {
        self.get(fingerprint).is_some()
    }

    pub fn get(&self, fingerprint: u64) -> Option<&RsaPublicKey> {
        self.keys.iter().find(|k| k.fingerprint == fingerprint)
    }

    pub fn fingerprints(&self) -> impl Iterator<Item = u64> + '_ {
        self.keys.iter().map(RsaPublicKey::fingerprint)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl FromIterator<RsaPublicKey> for KeyRing {
    fn from_iter<I: IntoIterator<Item = RsaPublicKey>>(iter: I) -> Self {
        let mut ring = Self::new();
        for key in iter {
            ring.insert(key);
        }
        ring
    }
}

/// Deterministic 2048-bit key for tests. Nobody holds its private half.
#[cfg(any(test, feature = "test-utils"))]
pub fn test_public_key(exponent: u32) -> RsaPublicKey {
    let mut modulus = [0xc5u8; MIN_MODULUS_LEN];
    modulus[MIN_MODULUS_LEN - 1] = 0xc7;
    match RsaPublicKey::from_components(&modulus, &exponent.to_be_bytes()) {
        Ok(key) => key,
        Err(e) => unreachable!("fixed test modulus is valid: {e}"),
    }
}
