use sha2::{Digest, Sha256};
use tutanota_encoding::{B64, B64Url};
use zeroize::Zeroize;

use crate::{CryptoError, Result, SymmetricKey};

const BCRYPT_COST: u32 = 8;

const ARGON2_ITERATIONS: u32 = 4;
const ARGON2_MEMORY_KIB: u32 = 32 * 1024;
const ARGON2_PARALLELISM: u32 = 1;
const ARGON2_OUTPUT_LEN: usize = 32;

/// Which KDF the account's salt was created for.
///
/// The server states the version alongside the salt; the client never
/// chooses. Version `"0"` is the original bcrypt scheme producing 128-bit
/// keys, every later version is Argon2id producing 256-bit keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdfVersion {
    /// Legacy bcrypt KDF, 128-bit output.
    Bcrypt,
    /// Argon2id with fixed parameters, 256-bit output.
    Argon2id,
}

impl KdfVersion {
    /// Parse the wire form of the version.
    pub fn from_wire(version: &str) -> Self {
        if version == "0" {
            KdfVersion::Bcrypt
        } else {
            KdfVersion::Argon2id
        }
    }
}

/// Normalize a wire-shaped salt to raw bytes.
///
/// Salts arrive either as a base64 string or, from older response shapes,
/// as a JSON array of byte values. Callers that already hold raw bytes
/// don't need this.
pub fn normalize_salt(value: &serde_json::Value) -> Result<Vec<u8>> {
    match value {
        serde_json::Value::String(s) => B64::try_from(s.as_str())
            .map(B64::into_bytes)
            .map_err(|_| CryptoError::InvalidSalt("not valid base64")),
        serde_json::Value::Array(numbers) => numbers
            .iter()
            .map(|n| {
                n.as_u64()
                    .and_then(|n| u8::try_from(n).ok())
                    .ok_or(CryptoError::InvalidSalt("array element out of byte range"))
            })
            .collect(),
        _ => Err(CryptoError::InvalidSalt("expected string or byte array")),
    }
}

/// Derive the passphrase key for an account.
///
/// The result width depends on the KDF: bcrypt accounts get a 128-bit key,
/// Argon2id accounts a 256-bit key. Both hash the passphrase itself through
/// SHA-256 first, matching what every official client sends.
pub fn derive_passphrase_key(
    passphrase: &str,
    salt: &[u8],
    kdf: KdfVersion,
) -> Result<SymmetricKey> {
    match kdf {
        KdfVersion::Bcrypt => {
            let salt: [u8; 16] = salt
                .try_into()
                .map_err(|_| CryptoError::InvalidSalt("bcrypt salt must be 16 bytes"))?;
            let mut hashed_passphrase = Sha256::digest(passphrase.as_bytes());
            let mut raw = bcrypt::bcrypt(BCRYPT_COST, salt, hashed_passphrase.as_slice());
            let key = SymmetricKey::try_from(&raw[..16]);
            raw.zeroize();
            hashed_passphrase.as_mut_slice().zeroize();
            key
        }
        KdfVersion::Argon2id => {
            use argon2::{Algorithm, Argon2, Params, Version};

            let params = Params::new(
                ARGON2_MEMORY_KIB,
                ARGON2_ITERATIONS,
                ARGON2_PARALLELISM,
                Some(ARGON2_OUTPUT_LEN),
            )?;
            let argon = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

            let mut hash = [0u8; ARGON2_OUTPUT_LEN];
            argon.hash_password_into(passphrase.as_bytes(), salt, &mut hash)?;
            let key = SymmetricKey::try_from(hash.as_slice());
            hash.zeroize();
            key
        }
    }
}

/// Build the authentication verifier sent at session creation: the unpadded
/// base64url form of SHA-256 over the raw passphrase-key bytes. Proves
/// knowledge of the passphrase without transmitting the key.
pub fn build_auth_verifier(passphrase_key: &SymmetricKey) -> String {
    let digest = Sha256::digest(passphrase_key.as_bytes());
    B64Url::from(digest.as_slice()).encode()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn version_zero_selects_bcrypt() {
        assert_eq!(KdfVersion::from_wire("0"), KdfVersion::Bcrypt);
        assert_eq!(KdfVersion::from_wire("1"), KdfVersion::Argon2id);
        assert_eq!(KdfVersion::from_wire("2"), KdfVersion::Argon2id);
    }

    #[test]
    fn bcrypt_key_is_deterministic_and_128_bit() {
        let salt = [7u8; 16];
        let a = derive_passphrase_key("hunter2", &salt, KdfVersion::Bcrypt).unwrap();
        let b = derive_passphrase_key("hunter2", &salt, KdfVersion::Bcrypt).unwrap();
        assert_eq!(a.len(), 16);
        assert_eq!(a, b);

        let other = derive_passphrase_key("hunter3", &salt, KdfVersion::Bcrypt).unwrap();
        assert_ne!(a, other);
    }

    #[test]
    fn bcrypt_rejects_short_salt() {
        assert!(derive_passphrase_key("pw", &[0u8; 8], KdfVersion::Bcrypt).is_err());
    }

    #[test]
    fn argon2_key_is_deterministic_and_256_bit() {
        let salt = [9u8; 16];
        let a = derive_passphrase_key("hunter2", &salt, KdfVersion::Argon2id).unwrap();
        let b = derive_passphrase_key("hunter2", &salt, KdfVersion::Argon2id).unwrap();
        assert_eq!(a.len(), 32);
        assert_eq!(a, b);
    }

    #[test]
    fn salts_normalize_from_both_wire_shapes() {
        let from_b64 = normalize_salt(&json!("AAECAw==")).unwrap();
        assert_eq!(from_b64, vec![0, 1, 2, 3]);

        let from_array = normalize_salt(&json!([0, 1, 2, 3])).unwrap();
        assert_eq!(from_array, vec![0, 1, 2, 3]);

        assert!(normalize_salt(&json!(42)).is_err());
        assert!(normalize_salt(&json!([300])).is_err());
    }

    #[test]
    fn verifier_is_unpadded_base64url() {
        let key = SymmetricKey::try_from([1u8; 16].as_slice()).unwrap();
        let verifier = build_auth_verifier(&key);
        assert_eq!(verifier, build_auth_verifier(&key));
        // SHA-256 digest encodes to 43 base64 characters without padding.
        assert_eq!(verifier.len(), 43);
        assert!(!verifier.contains(['+', '/', '=']));
    }
}
