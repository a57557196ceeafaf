//! Raw AES-CBC cipher compositions.
//!
//! Any modifications to this module need to be most thoroughly reviewed.
//! Everything else in the workspace should go through [`crate::SymmetricKey`]
//! and [`crate::decrypt_key`] instead of calling these directly.
//!
//! Two framings exist on the wire:
//!
//! * **Key wrap** — no IV in the payload (a fixed zero IV is used), no
//!   padding. The 256-bit authenticated variant prepends a `0x01` marker and
//!   appends an HMAC-SHA-256 over the ciphertext.
//! * **Attribute data** — IV-prefixed, PKCS7-padded. When authenticated the
//!   payload is `0x01 || iv || ciphertext || mac` with the MAC computed over
//!   `iv || ciphertext`; an authenticated payload is always odd-length,
//!   which is how the 128-bit decrypt path detects it.
//!
//! MAC subkeys are derived by hashing the key: SHA-256 split 16/16 for
//! 128-bit keys, SHA-512 split 32/32 for 256-bit keys. The bare key is only
//! used directly in the unauthenticated framings.

use aes::cipher::{
    BlockDecryptMut, BlockEncryptMut, KeyIvInit,
    block_padding::{NoPadding, Pkcs7},
};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha512};
use zeroize::Zeroizing;

use crate::{CryptoError, Result, SymmetricKey};

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// IV length for AES-CBC.
pub const IV_LEN: usize = 16;
const MAC_LEN: usize = 32;
const MAC_MARKER: u8 = 0x01;
const ZERO_IV: [u8; IV_LEN] = [0u8; IV_LEN];

fn subkeys_128(key: &[u8; 16]) -> (Zeroizing<[u8; 16]>, Zeroizing<[u8; 16]>) {
    let digest = Sha256::digest(key);
    let digest = digest.as_slice();
    let mut enc = Zeroizing::new([0u8; 16]);
    let mut mac = Zeroizing::new([0u8; 16]);
    enc.copy_from_slice(&digest[..16]);
    mac.copy_from_slice(&digest[16..]);
    (enc, mac)
}

fn subkeys_256(key: &[u8; 32]) -> (Zeroizing<[u8; 32]>, Zeroizing<[u8; 32]>) {
    let digest = Sha512::digest(key);
    let digest = digest.as_slice();
    let mut enc = Zeroizing::new([0u8; 32]);
    let mut mac = Zeroizing::new([0u8; 32]);
    enc.copy_from_slice(&digest[..32]);
    mac.copy_from_slice(&digest[32..]);
    (enc, mac)
}

fn verify_mac(mac_key: &[u8], payload: &[u8], tag: &[u8]) -> Result<()> {
    let mut mac = HmacSha256::new_from_slice(mac_key).expect("HMAC accepts any key length");
    mac.update(payload);
    mac.verify_slice(tag).map_err(|_| CryptoError::InvalidMac)
}

fn compute_mac(mac_key: &[u8], payload: &[u8]) -> [u8; MAC_LEN] {
    let mut mac = HmacSha256::new_from_slice(mac_key).expect("HMAC accepts any key length");
    mac.update(payload);
    mac.finalize().into_bytes().into()
}

fn check_key_block(data: &[u8]) -> Result<()> {
    if data.len() != 16 && data.len() != 32 {
        return Err(CryptoError::InvalidFraming("wrapped key must be one or two blocks"));
    }
    Ok(())
}

/// Unwrap a key under a 128-bit key. Zero IV, no padding, unauthenticated.
pub fn aes_128_decrypt_key(key: &[u8; 16], data: &[u8]) -> Result<Vec<u8>> {
    check_key_block(data)?;
    Aes128CbcDec::new_from_slices(key, &ZERO_IV)
        .expect("fixed-size key and IV")
        .decrypt_padded_vec_mut::<NoPadding>(data)
        .map_err(|_| CryptoError::InvalidPadding)
}

/// Wrap a key under a 128-bit key. Inverse of [`aes_128_decrypt_key`].
pub fn aes_128_encrypt_key(key: &[u8; 16], plain: &[u8]) -> Vec<u8> {
    Aes128CbcEnc::new_from_slices(key, &ZERO_IV)
        .expect("fixed-size key and IV")
        .encrypt_padded_vec_mut::<NoPadding>(plain)
}

/// Unwrap a key under a 256-bit key without authentication. Zero IV, no
/// padding. Kept for payloads written before MACs became mandatory.
pub fn aes_256_decrypt_key_legacy(key: &[u8; 32], data: &[u8]) -> Result<Vec<u8>> {
    check_key_block(data)?;
    Aes256CbcDec::new_from_slices(key, &ZERO_IV)
        .expect("fixed-size key and IV")
        .decrypt_padded_vec_mut::<NoPadding>(data)
        .map_err(|_| CryptoError::InvalidPadding)
}

/// Wrap a key under a 256-bit key without authentication.
pub fn aes_256_encrypt_key_legacy(key: &[u8; 32], plain: &[u8]) -> Vec<u8> {
    Aes256CbcEnc::new_from_slices(key, &ZERO_IV)
        .expect("fixed-size key and IV")
        .encrypt_padded_vec_mut::<NoPadding>(plain)
}

/// Unwrap a key under a 256-bit key with authentication: `0x01 ||
/// ciphertext || mac`, MAC over the ciphertext, zero IV, no padding.
pub fn aes_256_decrypt_key(key: &[u8; 32], data: &[u8]) -> Result<Vec<u8>> {
    if data.len() < 1 + 16 + MAC_LEN {
        return Err(CryptoError::InvalidFraming("authenticated wrap too short"));
    }
    if data[0] != MAC_MARKER {
        return Err(CryptoError::InvalidFraming("missing MAC marker"));
    }
    let (ciphertext, tag) = data[1..].split_at(data.len() - 1 - MAC_LEN);
    let (enc_key, mac_key) = subkeys_256(key);
    verify_mac(mac_key.as_slice(), ciphertext, tag)?;
    check_key_block(ciphertext)?;
    Aes256CbcDec::new_from_slices(enc_key.as_slice(), &ZERO_IV)
        .expect("fixed-size key and IV")
        .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
        .map_err(|_| CryptoError::InvalidPadding)
}

/// Wrap a key under a 256-bit key with authentication. Inverse of
/// [`aes_256_decrypt_key`].
pub fn aes_256_encrypt_key(key: &[u8; 32], plain: &[u8]) -> Vec<u8> {
    let (enc_key, mac_key) = subkeys_256(key);
    let ciphertext = Aes256CbcEnc::new_from_slices(enc_key.as_slice(), &ZERO_IV)
        .expect("fixed-size key and IV")
        .encrypt_padded_vec_mut::<NoPadding>(plain);
    let tag = compute_mac(mac_key.as_slice(), &ciphertext);
    let mut out = Vec::with_capacity(1 + ciphertext.len() + MAC_LEN);
    out.push(MAC_MARKER);
    out.extend_from_slice(&ciphertext);
    out.extend_from_slice(&tag);
    out
}

/// Decrypt an attribute payload.
///
/// 256-bit keys require the authenticated framing. 128-bit keys accept both:
/// an odd payload length signals the marker byte and therefore the MAC.
pub fn aes_decrypt_data(key: &SymmetricKey, data: &[u8]) -> Result<Vec<u8>> {
    match key {
        SymmetricKey::Aes128(k) => {
            if data.len() % 2 == 1 {
                let (iv, ciphertext, tag) = split_authenticated(data)?;
                let (enc_key, mac_key) = subkeys_128(k);
                verify_mac(mac_key.as_slice(), &data[1..data.len() - MAC_LEN], tag)?;
                Aes128CbcDec::new_from_slices(enc_key.as_slice(), iv)
                    .expect("fixed-size key and IV")
                    .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
                    .map_err(|_| CryptoError::InvalidPadding)
            } else {
                if data.len() < IV_LEN + 16 {
                    return Err(CryptoError::InvalidFraming("payload too short"));
                }
                let (iv, ciphertext) = data.split_at(IV_LEN);
                Aes128CbcDec::new_from_slices(k.as_slice(), iv)
                    .expect("fixed-size key and IV")
                    .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
                    .map_err(|_| CryptoError::InvalidPadding)
            }
        }
        SymmetricKey::Aes256(k) => {
            let (iv, ciphertext, tag) = split_authenticated(data)?;
            let (enc_key, mac_key) = subkeys_256(k);
            verify_mac(mac_key.as_slice(), &data[1..data.len() - MAC_LEN], tag)?;
            Aes256CbcDec::new_from_slices(enc_key.as_slice(), iv)
                .expect("fixed-size key and IV")
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
                .map_err(|_| CryptoError::InvalidPadding)
        }
    }
}

/// Encrypt an attribute payload with the authenticated framing.
///
/// The IV is a caller concern so the operation stays deterministic for
/// tests; production callers must pass fresh random bytes.
pub fn aes_encrypt_data(key: &SymmetricKey, plain: &[u8], iv: &[u8; IV_LEN]) -> Vec<u8> {
    let (ciphertext, mac_key): (Vec<u8>, Vec<u8>) = match key {
        SymmetricKey::Aes128(k) => {
            let (enc_key, mac_key) = subkeys_128(k);
            let ct = Aes128CbcEnc::new_from_slices(enc_key.as_slice(), iv)
                .expect("fixed-size key and IV")
                .encrypt_padded_vec_mut::<Pkcs7>(plain);
            (ct, mac_key.to_vec())
        }
        SymmetricKey::Aes256(k) => {
            let (enc_key, mac_key) = subkeys_256(k);
            let ct = Aes256CbcEnc::new_from_slices(enc_key.as_slice(), iv)
                .expect("fixed-size key and IV")
                .encrypt_padded_vec_mut::<Pkcs7>(plain);
            (ct, mac_key.to_vec())
        }
    };
    let mut out = Vec::with_capacity(1 + IV_LEN + ciphertext.len() + MAC_LEN);
    out.push(MAC_MARKER);
    out.extend_from_slice(iv);
    out.extend_from_slice(&ciphertext);
    let tag = compute_mac(&mac_key, &out[1..]);
    out.extend_from_slice(&tag);
    out
}

/// Encrypt an attribute payload without a MAC. Only valid for 128-bit keys;
/// exists because pre-MAC payloads still occur in old accounts and the
/// decrypt path for them needs test coverage.
pub fn aes_128_encrypt_data_no_mac(key: &[u8; 16], plain: &[u8], iv: &[u8; IV_LEN]) -> Vec<u8> {
    let ciphertext = Aes128CbcEnc::new_from_slices(key, iv)
        .expect("fixed-size key and IV")
        .encrypt_padded_vec_mut::<Pkcs7>(plain);
    let mut out = Vec::with_capacity(IV_LEN + ciphertext.len());
    out.extend_from_slice(iv);
    out.extend_from_slice(&ciphertext);
    out
}

fn split_authenticated(data: &[u8]) -> Result<(&[u8; IV_LEN], &[u8], &[u8])> {
    if data.len() < 1 + IV_LEN + 16 + MAC_LEN {
        return Err(CryptoError::InvalidFraming("authenticated payload too short"));
    }
    if data[0] != MAC_MARKER {
        return Err(CryptoError::InvalidFraming("missing MAC marker"));
    }
    let iv: &[u8; IV_LEN] = data[1..1 + IV_LEN].try_into().expect("sliced to IV_LEN");
    let ciphertext = &data[1 + IV_LEN..data.len() - MAC_LEN];
    let tag = &data[data.len() - MAC_LEN..];
    Ok((iv, ciphertext, tag))
}

#[cfg(test)]
mod tests {
    use super::*;

    const IV: [u8; 16] = [9u8; 16];

    fn key128() -> SymmetricKey {
        SymmetricKey::try_from([1u8; 16].as_slice()).unwrap()
    }

    fn key256() -> SymmetricKey {
        SymmetricKey::try_from([2u8; 32].as_slice()).unwrap()
    }

    #[test]
    fn data_round_trip_128() {
        let key = key128();
        let encrypted = aes_encrypt_data(&key, b"subject line", &IV);
        // Marker byte makes the authenticated framing odd-length.
        assert_eq!(encrypted.len() % 2, 1);
        assert_eq!(aes_decrypt_data(&key, &encrypted).unwrap(), b"subject line");
    }

    #[test]
    fn data_round_trip_128_without_mac() {
        let encrypted = aes_128_encrypt_data_no_mac(&[1u8; 16], b"old payload", &IV);
        assert_eq!(encrypted.len() % 2, 0);
        assert_eq!(
            aes_decrypt_data(&key128(), &encrypted).unwrap(),
            b"old payload"
        );
    }

    #[test]
    fn data_round_trip_256() {
        let key = key256();
        let encrypted = aes_encrypt_data(&key, b"subject line", &IV);
        assert_eq!(aes_decrypt_data(&key, &encrypted).unwrap(), b"subject line");
    }

    #[test]
    fn tampered_mac_is_rejected() {
        let key = key256();
        let mut encrypted = aes_encrypt_data(&key, b"payload", &IV);
        let last = encrypted.len() - 1;
        encrypted[last] ^= 0xff;
        assert!(matches!(
            aes_decrypt_data(&key, &encrypted),
            Err(CryptoError::InvalidMac)
        ));
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let key = key256();
        let mut encrypted = aes_encrypt_data(&key, b"payload", &IV);
        encrypted[20] ^= 0xff;
        assert!(aes_decrypt_data(&key, &encrypted).is_err());
    }

    #[test]
    fn wrong_key_fails_key_unwrap() {
        let wrapped = aes_128_encrypt_key(&[1u8; 16], &[7u8; 16]);
        // Unwrapping under the wrong key yields garbage, which the caller
        // detects by the resulting key failing to decrypt anything; here the
        // bytes simply differ.
        let unwrapped = aes_128_decrypt_key(&[3u8; 16], &wrapped).unwrap();
        assert_ne!(unwrapped, vec![7u8; 16]);
    }

    #[test]
    fn authenticated_key_wrap_rejects_bad_marker() {
        let mut wrapped = aes_256_encrypt_key(&[2u8; 32], &[7u8; 32]);
        wrapped[0] = 0x02;
        assert!(matches!(
            aes_256_decrypt_key(&[2u8; 32], &wrapped),
            Err(CryptoError::InvalidFraming(_))
        ));
    }

    #[test]
    fn key_wrap_rejects_odd_block_counts() {
        assert!(aes_128_decrypt_key(&[1u8; 16], &[0u8; 24]).is_err());
        assert!(aes_256_decrypt_key_legacy(&[2u8; 32], &[0u8; 48]).is_err());
    }
}
