use subtle::{Choice, ConstantTimeEq};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{CryptoError, Result, aes};

/// A symmetric AES key in one of the two widths the service produced over
/// its lifetime.
///
/// Keys are kept boxed so the secret bytes live at a stable heap location
/// and are wiped on drop. The stored bytes are never altered after
/// construction; the 128-bit companion of a 256-bit key is derived on
/// demand by [`SymmetricKey::companion_128`], not cached.
#[derive(Clone)]
pub enum SymmetricKey {
    /// 128-bit key, legacy bcrypt era.
    Aes128(Box<[u8; 16]>),
    /// 256-bit key, Argon2id era.
    Aes256(Box<[u8; 32]>),
}

impl Zeroize for SymmetricKey {
    fn zeroize(&mut self) {
        match self {
            SymmetricKey::Aes128(k) => k.as_mut_slice().zeroize(),
            SymmetricKey::Aes256(k) => k.as_mut_slice().zeroize(),
        }
    }
}

impl Drop for SymmetricKey {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl ZeroizeOnDrop for SymmetricKey {}

impl SymmetricKey {
    /// Raw key length in bytes: 16 or 32.
    pub fn len(&self) -> usize {
        match self {
            SymmetricKey::Aes128(_) => 16,
            SymmetricKey::Aes256(_) => 32,
        }
    }

    /// True for the zero-length case, which cannot exist.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            SymmetricKey::Aes128(k) => k.as_slice(),
            SymmetricKey::Aes256(k) => k.as_slice(),
        }
    }

    /// The 128-bit companion: the first sixteen bytes of a 256-bit key,
    /// or the key itself when already 128-bit.
    ///
    /// Entities written while an account still had a 128-bit key can only
    /// be opened with this truncation, so decryption attempts keep both
    /// variants at hand.
    pub fn companion_128(&self) -> SymmetricKey {
        match self {
            SymmetricKey::Aes128(_) => self.clone(),
            SymmetricKey::Aes256(k) => {
                let mut truncated = [0u8; 16];
                truncated.copy_from_slice(&k[..16]);
                let key = SymmetricKey::Aes128(Box::new(truncated));
                truncated.zeroize();
                key
            }
        }
    }
}

impl TryFrom<&[u8]> for SymmetricKey {
    type Error = CryptoError;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        match bytes.len() {
            16 => {
                let mut key = [0u8; 16];
                key.copy_from_slice(bytes);
                Ok(SymmetricKey::Aes128(Box::new(key)))
            }
            32 => {
                let mut key = [0u8; 32];
                key.copy_from_slice(bytes);
                Ok(SymmetricKey::Aes256(Box::new(key)))
            }
            n => Err(CryptoError::InvalidKeyLength(n)),
        }
    }
}

impl ConstantTimeEq for SymmetricKey {
    fn ct_eq(&self, other: &Self) -> Choice {
        match (self, other) {
            (SymmetricKey::Aes128(a), SymmetricKey::Aes128(b)) => {
                a.as_slice().ct_eq(b.as_slice())
            }
            (SymmetricKey::Aes256(a), SymmetricKey::Aes256(b)) => {
                a.as_slice().ct_eq(b.as_slice())
            }
            _ => Choice::from(0),
        }
    }
}

impl PartialEq for SymmetricKey {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq(other).into()
    }
}

impl Eq for SymmetricKey {}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key bytes.
        match self {
            SymmetricKey::Aes128(_) => f.write_str("SymmetricKey::Aes128(..)"),
            SymmetricKey::Aes256(_) => f.write_str("SymmetricKey::Aes256(..)"),
        }
    }
}

/// Unwrap a key that was encrypted under another key.
///
/// The wrapping method is implied by the wrapping key's width and the
/// ciphertext length: 128-bit keys always wrap with the plain zero-IV mode,
/// 256-bit keys wrap with the legacy unauthenticated mode when the
/// ciphertext is a bare one- or two-block payload and with the
/// authenticated mode otherwise.
pub fn decrypt_key(wrapping: &SymmetricKey, wrapped: &[u8]) -> Result<SymmetricKey> {
    let mut plain = match wrapping {
        SymmetricKey::Aes128(k) => aes::aes_128_decrypt_key(k, wrapped)?,
        SymmetricKey::Aes256(k) => {
            if wrapped.len() == 16 || wrapped.len() == 32 {
                aes::aes_256_decrypt_key_legacy(k, wrapped)?
            } else {
                aes::aes_256_decrypt_key(k, wrapped)?
            }
        }
    };
    let key = SymmetricKey::try_from(plain.as_slice());
    plain.zeroize();
    key
}
