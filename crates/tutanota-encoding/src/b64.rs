use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

/// The provided string is not valid standard base64.
#[derive(Debug, thiserror::Error)]
#[error("Invalid base64 encoding")]
pub struct NotB64EncodedError;

/// A byte buffer that crosses the wire as a standard (padded) base64 string.
///
/// Owning the bytes rather than the string lets call sites hand the decoded
/// payload straight to the crypto layer without re-decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct B64(Vec<u8>);

impl B64 {
    /// The decoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume the wrapper and return the decoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Encode back to the padded base64 wire form.
    pub fn encode(&self) -> String {
        STANDARD.encode(&self.0)
    }
}

impl From<Vec<u8>> for B64 {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for B64 {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl AsRef<[u8]> for B64 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&str> for B64 {
    type Error = NotB64EncodedError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        STANDARD
            .decode(value)
            .map(Self)
            .map_err(|_| NotB64EncodedError)
    }
}

impl std::fmt::Display for B64 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encode())
    }
}

impl Serialize for B64 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for B64 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        B64::try_from(s.as_str()).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trip() {
        let b64 = B64::from(b"hello world".as_slice());
        assert_eq!(b64.encode(), "aGVsbG8gd29ybGQ=");
        assert_eq!(
            B64::try_from("aGVsbG8gd29ybGQ=").unwrap().as_bytes(),
            b"hello world"
        );
    }

    #[test]
    fn rejects_invalid_input() {
        assert!(B64::try_from("not base64 !!!").is_err());
    }

    #[test]
    fn serde_as_string() {
        let b64 = B64::from(b"abc".as_slice());
        assert_eq!(serde_json::to_string(&b64).unwrap(), "\"YWJj\"");
        let back: B64 = serde_json::from_str("\"YWJj\"").unwrap();
        assert_eq!(back, b64);
    }
}
