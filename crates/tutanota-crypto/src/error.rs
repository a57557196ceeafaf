use thiserror::Error;

/// Errors produced by the cryptographic primitives.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The ciphertext is too short or its framing bytes are inconsistent.
    #[error("Invalid ciphertext framing: {0}")]
    InvalidFraming(&'static str),

    /// The MAC over the ciphertext did not verify.
    #[error("MAC verification failed")]
    InvalidMac,

    /// CBC padding was invalid after decryption.
    #[error("Invalid padding")]
    InvalidPadding,

    /// A key had an unsupported length. Only 16 and 32 byte keys exist.
    #[error("Invalid key length: {0}")]
    InvalidKeyLength(usize),

    /// The KDF rejected its parameters or inputs.
    #[error("Key derivation failed: {0}")]
    KdfFailed(String),

    /// A salt value could not be normalized to bytes.
    #[error("Invalid salt: {0}")]
    InvalidSalt(&'static str),
}

impl From<argon2::Error> for CryptoError {
    fn from(e: argon2::Error) -> Self {
        CryptoError::KdfFailed(e.to_string())
    }
}
