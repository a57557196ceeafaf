use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

/// The provided string is not valid base64url.
#[derive(Debug, thiserror::Error)]
#[error("Invalid base64url encoding")]
pub struct NotB64UrlEncodedError;

/// A byte buffer that crosses the wire as an unpadded base64url string.
///
/// Access tokens and auth verifiers use this dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct B64Url(Vec<u8>);

impl B64Url {
    /// The decoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Encode back to the unpadded base64url wire form.
    pub fn encode(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.0)
    }
}

impl From<Vec<u8>> for B64Url {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for B64Url {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl AsRef<[u8]> for B64Url {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&str> for B64Url {
    type Error = NotB64UrlEncodedError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        // Tokens occasionally arrive padded; tolerate that on input.
        let trimmed = value.trim_end_matches('=');
        URL_SAFE_NO_PAD
            .decode(trimmed)
            .map(Self)
            .map_err(|_| NotB64UrlEncodedError)
    }
}

impl std::fmt::Display for B64Url {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encode())
    }
}

impl Serialize for B64Url {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for B64Url {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        B64Url::try_from(s.as_str()).map_err(de::Error::custom)
    }
}

/// Translate a standard base64 string to base64url without re-decoding:
/// `+` becomes `-`, `/` becomes `_`, padding is dropped.
pub fn base64_to_base64url(base64: &str) -> String {
    base64
        .chars()
        .filter_map(|c| match c {
            '+' => Some('-'),
            '/' => Some('_'),
            '=' => None,
            c => Some(c),
        })
        .collect()
}

/// Encode a text value as a custom element id.
///
/// Custom ids are the base64url form of the UTF-8 bytes of the text. The
/// former-key list uses the decimal key version as the element id, so range
/// queries into that list start at `string_to_custom_id(version)`.
pub fn string_to_custom_id(text: &str) -> String {
    use base64::engine::general_purpose::STANDARD;
    base64_to_base64url(&STANDARD.encode(text.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_alphabet_and_strips_padding() {
        assert_eq!(base64_to_base64url("a+b/c="), "a-b_c");
        assert_eq!(base64_to_base64url("YWJj"), "YWJj");
    }

    #[test]
    fn custom_id_of_version_text() {
        // "3" -> base64 "Mw==" -> base64url "Mw"
        assert_eq!(string_to_custom_id("3"), "Mw");
        assert_eq!(string_to_custom_id("10"), "MTA");
    }

    #[test]
    fn tolerates_padded_tokens() {
        let b = B64Url::try_from("YWJj").unwrap();
        assert_eq!(b.as_bytes(), b"abc");
        let padded = B64Url::try_from("YWJj=").unwrap();
        assert_eq!(padded.as_bytes(), b"abc");
    }
}
