/// Base64 alphabet sorted by ASCII value. Generated ids encoded with it sort
/// lexicographically in creation order, which is what the range-query
/// protocol relies on.
const BASE64_EXT_ALPHABET: &[u8; 64] =
    b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

const BASE64_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Smallest possible generated id, twelve characters.
pub const GENERATED_MIN_ID: &str = "------------";

/// Largest possible generated id, twelve characters.
pub const GENERATED_MAX_ID: &str = "zzzzzzzzzzzz";

/// Translate a standard base64 string into the base64ext alphabet, dropping
/// padding. Characters outside the base64 alphabet are passed through
/// unchanged.
pub fn base64_to_base64ext(base64: &str) -> String {
    base64
        .bytes()
        .filter(|&b| b != b'=')
        .map(|b| match BASE64_ALPHABET.iter().position(|&a| a == b) {
            Some(i) => BASE64_EXT_ALPHABET[i] as char,
            None => b as char,
        })
        .collect()
}

/// Translate a generated id (base64ext) back to standard base64 without
/// padding.
pub fn generated_id_to_b64(id: &str) -> String {
    id.bytes()
        .map(|b| match BASE64_EXT_ALPHABET.iter().position(|&a| a == b) {
            Some(i) => BASE64_ALPHABET[i] as char,
            None => b as char,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use base64::{Engine, engine::general_purpose::STANDARD};

    use super::*;

    #[test]
    fn sentinels_are_alphabet_extremes() {
        assert_eq!(GENERATED_MIN_ID.len(), 12);
        assert_eq!(GENERATED_MAX_ID.len(), 12);
        assert!(GENERATED_MIN_ID.bytes().all(|b| b == BASE64_EXT_ALPHABET[0]));
        assert!(GENERATED_MAX_ID.bytes().all(|b| b == BASE64_EXT_ALPHABET[63]));
    }

    #[test]
    fn nine_zero_bytes_encode_to_min_id() {
        let encoded = base64_to_base64ext(&STANDARD.encode([0u8; 9]));
        assert_eq!(encoded, "------------");
    }

    #[test]
    fn ext_round_trip() {
        let b64 = STANDARD.encode(b"123456789");
        let ext = base64_to_base64ext(&b64);
        assert_eq!(generated_id_to_b64(&ext), b64.trim_end_matches('='));
    }

    #[test]
    fn sorted_alphabet_preserves_byte_order() {
        let low = base64_to_base64ext(&STANDARD.encode([0u8, 0, 0, 0, 0, 0, 0, 0, 1]));
        let high = base64_to_base64ext(&STANDARD.encode([0u8, 0, 0, 0, 0, 0, 0, 1, 0]));
        assert!(low < high);
    }
}
