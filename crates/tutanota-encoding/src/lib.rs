//! Byte-level encodings for the Tutanota wire format.
//!
//! The service speaks three related base64 dialects: plain base64 for
//! encrypted payloads, base64url for access tokens and custom ids, and
//! "base64ext" — a base64 variant over an alphabet sorted by ASCII value so
//! that encoded generated ids sort in creation order. This crate owns the
//! conversions between them plus the id sentinels used by range queries.

mod b64;
mod b64ext;
mod b64url;

pub use b64::{B64, NotB64EncodedError};
pub use b64ext::{GENERATED_MAX_ID, GENERATED_MIN_ID, base64_to_base64ext, generated_id_to_b64};
pub use b64url::{B64Url, NotB64UrlEncodedError, base64_to_base64url, string_to_custom_id};
