//! Building the trusted key ring from configuration.

use mtkey_core::KeyConfig;
use mtkey_crypto::{CryptoError, KeyRing, RsaPublicKey};
use tracing::debug;

/// Parse every configured key. An explicit fingerprint overrides the
/// computed one.
pub fn key_ring_from_config(keys: &[KeyConfig]) -> Result<KeyRing, CryptoError> {
    let mut ring = KeyRing::new();
    for (index, entry) in keys.iter().enumerate() {
        let mut key = RsaPublicKey::from_hex(&entry.modulus, entry.exponent)
            .map_err(|e| CryptoError::InvalidKey(format!("keys[{index}]: {e}")))?;
        if let Some(fp) = &entry.fingerprint {
            let fingerprint = u64::from_str_radix(fp.trim(), 16).map_err(|e| {
                CryptoError::InvalidKey(format!("keys[{index}].fingerprint {fp:?}: {e}"))
            })?;
            key = key.with_fingerprint(fingerprint);
        }
        debug!(index, fingerprint = %format!("{:016x}", key.fingerprint()), "Loaded server key");
        ring.insert(key);
    }
    Ok(ring)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use mtkey_crypto::rsa::test_public_key;

    fn modulus_hex() -> String {
        let mut modulus = [0xc5u8; 256];
        modulus[255] = 0xc7;
        hex::encode(modulus)
    }

    #[test]
    fn computed_fingerprint_matches_crypto_crate() {
        let ring = key_ring_from_config(&[KeyConfig {
            modulus: modulus_hex(),
            exponent: 65537,
            fingerprint: None,
        }])
        .unwrap();
        assert_eq!(ring.len(), 1);
        assert!(ring.contains(test_public_key(65537).fingerprint()));
    }

    #[test]
    fn explicit_fingerprint_wins() {
        let ring = key_ring_from_config(&[KeyConfig {
            modulus: modulus_hex(),
            exponent: 65537,
            fingerprint: Some("c3b42b026ce86b21".to_string()),
        }])
        .unwrap();
        assert!(ring.contains(0xc3b4_2b02_6ce8_6b21));
        assert!(!ring.contains(test_public_key(65537).fingerprint()));
    }

    #[test]
    fn bad_entries_name_their_index() {
        let err = key_ring_from_config(&[
            KeyConfig {
                modulus: modulus_hex(),
                exponent: 3,
                fingerprint: None,
            },
            KeyConfig {
                modulus: "abcd".to_string(),
                exponent: 3,
                fingerprint: None,
            },
        ])
        .unwrap_err();
        assert!(err.to_string().contains("keys[1]"), "{err}");

        let err = key_ring_from_config(&[KeyConfig {
            modulus: modulus_hex(),
            exponent: 3,
            fingerprint: Some("not-hex".to_string()),
        }])
        .unwrap_err();
        assert!(err.to_string().contains("keys[0].fingerprint"), "{err}");
    }

    #[test]
    fn empty_config_gives_empty_ring() {
        assert!(key_ring_from_config(&[]).unwrap().is_empty());
    }
}
