//! Decryption diagnostics routed to the stderr log.

use tracing::debug;
use tutanota_core::ClientError;
use tutanota_core::decrypt::{DecryptDiagnostics, UnwrapMethod};

/// Logs every decryption event at debug level; visible with `--verbose`.
pub struct LogDiagnostics;

/// Shared instance to hand to readers.
pub static LOG_DIAGNOSTICS: LogDiagnostics = LogDiagnostics;

impl DecryptDiagnostics for LogDiagnostics {
    fn session_key_method(&self, method: Option<UnwrapMethod>) {
        match method {
            Some(method) => debug!(?method, "session key unwrapped"),
            None => debug!("session key could not be unwrapped"),
        }
    }

    fn unwrap_attempt(&self, method: UnwrapMethod, key_len: usize, success: bool) {
        debug!(?method, key_len, success, "session key unwrap attempt");
    }

    fn key_unavailable(&self, error: &ClientError) {
        debug!(%error, "group key missing, affected attributes become zero values");
    }

    fn attribute_failure(&self, error: &ClientError) {
        debug!(%error, "attribute decryption failed, using zero value");
    }

    fn attribute_fallback(&self, type_name: &'static str, attribute_id: u32) {
        debug!(type_name, attribute_id, "attribute decrypted with the 128-bit companion key");
    }
}
