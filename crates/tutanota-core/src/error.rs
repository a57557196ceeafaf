use reqwest::StatusCode;
use thiserror::Error;

/// Errors surfaced by the client core.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The session response contained second-factor challenges. This client
    /// cannot answer them.
    #[error("Account requires a second factor, which this client does not support")]
    TwoFactorRequired,

    /// A `401` on any authenticated request. The orchestrator may recover
    /// once by discarding the persisted session and logging in again.
    #[error("Authentication failed")]
    AuthFailed,

    /// The server could not be reached at all: DNS, connect, timeout, reset.
    #[error("Network unavailable: {0}")]
    NetworkUnavailable(String),

    /// The server answered with a non-2xx status other than 401.
    #[error("Server error {status}: {content}")]
    Api {
        /// HTTP status code.
        status: StatusCode,
        /// Raw response body.
        content: String,
    },

    /// A required attribute is missing or has an unexpected shape.
    #[error("Protocol mismatch: {0}")]
    ProtocolMismatch(String),

    /// The key chain cannot supply a key for the requested group/version.
    /// Not fatal at the attribute level: the decryptor reports it through
    /// the diagnostics sink, substitutes zero values and keeps going.
    #[error("No key for group {group} at version {version}")]
    KeyUnavailable {
        /// Group id the key was requested for.
        group: String,
        /// Requested key version.
        version: String,
    },

    /// An attribute failed to decrypt after both width fallbacks. Same
    /// handling as [`ClientError::KeyUnavailable`]: reported through the
    /// diagnostics sink while the attribute materializes as its zero
    /// value.
    #[error("Could not decrypt {type_name} attribute {attribute_id}")]
    DecryptFailure {
        /// Entity type the attribute belongs to.
        type_name: &'static str,
        /// Numeric wire id of the attribute.
        attribute_id: u32,
    },

    /// A cryptographic primitive failed.
    #[error(transparent)]
    Crypto(#[from] tutanota_crypto::CryptoError),

    /// The type-model layer rejected a shape.
    #[error(transparent)]
    Model(#[from] tutanota_model::ModelError),

    /// Anything else: serialization, IO and the like.
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            if status == StatusCode::UNAUTHORIZED {
                return ClientError::AuthFailed;
            }
            return ClientError::Api {
                status,
                content: String::new(),
            };
        }

        // Connection errors, timeouts, and failures sending the request all
        // mean we never spoke to the server. Only that class may justify
        // keeping a persisted session around.
        if e.is_connect() || e.is_timeout() || e.is_request() {
            return ClientError::NetworkUnavailable(e.to_string());
        }

        ClientError::Other(e.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Other(e.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        ClientError::Other(e.to_string())
    }
}

/// Require that an optional wire attribute is present, or return a
/// [`ClientError::ProtocolMismatch`] naming it.
#[macro_export]
macro_rules! require_attr {
    ($val:expr, $what:expr) => {
        match $val {
            Some(val) => val,
            None => {
                return Err($crate::ClientError::ProtocolMismatch(format!(
                    "missing {}",
                    $what
                )))
            }
        }
    };
}
