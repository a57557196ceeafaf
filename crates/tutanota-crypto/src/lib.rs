//! Cryptographic primitives for the Tutanota client.
//!
//! The service wraps every key under another key and every encrypted
//! attribute under a per-instance session key, all with AES-CBC. Two key
//! widths coexist: 128-bit keys from the legacy bcrypt KDF era and 256-bit
//! keys from Argon2id accounts. The [`aes`] module holds the raw cipher
//! compositions; everything else in the workspace goes through
//! [`SymmetricKey`] and the key-unwrap helpers here.

pub mod aes;
mod error;
mod kdf;
mod keys;

pub use error::CryptoError;
pub use kdf::{KdfVersion, build_auth_verifier, derive_passphrase_key, normalize_salt};
pub use keys::{SymmetricKey, decrypt_key};

pub(crate) type Result<T, E = CryptoError> = std::result::Result<T, E>;
