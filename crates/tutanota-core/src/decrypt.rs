//! Session-key resolution and attribute decryption for wire instances.
//!
//! Per-attribute failures are deliberately non-fatal: a mailbox with one
//! undecryptable folder name is still a mailbox. Failed attributes
//! materialize as their scalar type's zero value and are reported through
//! [`DecryptDiagnostics`] so callers can surface them without aborting.

use std::cell::Cell;

use serde_json::Value;
use tutanota_crypto::{SymmetricKey, aes};
use tutanota_model::{
    TypeModel, ModelValue,
    wire::{self, Instance},
};
use zeroize::Zeroizing;

use crate::{ClientError, Result, keys::KeyChain, user::version_text};

/// The unwrap method that opened a session key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnwrapMethod {
    /// AES-128 key unwrap, possibly with a truncated wide key.
    Aes128,
    /// Unauthenticated AES-256 key unwrap.
    Aes256Legacy,
    /// Authenticated AES-256 key unwrap.
    Aes256Authenticated,
}

/// Sink for decryption diagnostics. All methods default to no-ops.
///
/// The two failure channels carry the error kind they report:
/// [`attribute_failure`](Self::attribute_failure) always receives a
/// [`ClientError::DecryptFailure`], [`key_unavailable`](Self::key_unavailable)
/// always a [`ClientError::KeyUnavailable`]. Both are non-fatal signals;
/// the affected attributes materialize as zero values.
pub trait DecryptDiagnostics {
    /// Reports the method that unwrapped a session key, or `None` when the
    /// whole ladder failed.
    fn session_key_method(&self, _method: Option<UnwrapMethod>) {}

    /// Reports every single unwrap attempt, successful or not.
    fn unwrap_attempt(&self, _method: UnwrapMethod, _key_len: usize, _success: bool) {}

    /// The key chain could not supply the group key an instance was
    /// wrapped under; every encrypted attribute of that instance will be
    /// its zero value unless another version works.
    fn key_unavailable(&self, _error: &ClientError) {}

    /// An attribute failed to decrypt after both width fallbacks and was
    /// replaced by its zero value.
    fn attribute_failure(&self, _error: &ClientError) {}

    /// An attribute only decrypted with the 128-bit companion key.
    fn attribute_fallback(&self, _type_name: &'static str, _attribute_id: u32) {}
}

/// The default sink: silence.
pub struct NoopDiagnostics;

impl DecryptDiagnostics for NoopDiagnostics {}

/// Resolve the session key for an encrypted instance.
///
/// Returns `Ok(None)` when no key is needed (unencrypted type), when the
/// owner attributes are absent, when the key chain has no key at the
/// relevant version, or when every unwrap attempt fails. The unwrap ladder
/// depends on the width of the group key:
///
/// | 128-bit group key            | 256-bit group key            |
/// |------------------------------|------------------------------|
/// | AES-128                      | AES-256 legacy (no MAC)      |
/// | AES-256 legacy (zero-padded) | AES-256 authenticated        |
/// | AES-256 authenticated        | AES-128 with the first half  |
///
/// Both orderings reproduce observed client behavior exactly and must not
/// be unified.
pub fn resolve_session_key(
    key_chain: &KeyChain,
    model: &'static TypeModel,
    instance: &Instance,
    version_override: Option<&str>,
    diagnostics: &dyn DecryptDiagnostics,
) -> Result<Option<SymmetricKey>> {
    if !model.encrypted {
        return Ok(None);
    }
    let (Some(owner_group_id), Some(owner_enc_key_id)) =
        (model.owner_group_id, model.owner_enc_session_key_id)
    else {
        return Ok(None);
    };
    let Some(owner_group) = wire::attr_str(instance, owner_group_id) else {
        return Ok(None);
    };
    let Some(enc_session_key) = wire::attr(instance, owner_enc_key_id) else {
        return Ok(None);
    };

    let version = match version_override {
        Some(version) => version.to_owned(),
        None => model
            .owner_key_version_id
            .and_then(|id| wire::attr(instance, id))
            .map(|v| version_text(Some(v)))
            .unwrap_or_default(),
    };

    let Some(group_key) = key_chain.get(owner_group, &version) else {
        diagnostics.key_unavailable(&ClientError::KeyUnavailable {
            group: owner_group.to_owned(),
            version: version.clone(),
        });
        return Ok(None);
    };

    let wrapped = wire::value_to_bytes(enc_session_key).ok_or_else(|| {
        ClientError::ProtocolMismatch(format!(
            "{}._ownerEncSessionKey is not byte-shaped",
            model.name
        ))
    })?;

    let ladder: [UnwrapMethod; 3] = if group_key.len() == 16 {
        [
            UnwrapMethod::Aes128,
            UnwrapMethod::Aes256Legacy,
            UnwrapMethod::Aes256Authenticated,
        ]
    } else {
        [
            UnwrapMethod::Aes256Legacy,
            UnwrapMethod::Aes256Authenticated,
            UnwrapMethod::Aes128,
        ]
    };

    for method in ladder {
        let unwrapped = try_unwrap(method, group_key, &wrapped);
        diagnostics.unwrap_attempt(method, group_key.len(), unwrapped.is_some());
        if let Some(session_key) = unwrapped {
            diagnostics.session_key_method(Some(method));
            return Ok(Some(session_key));
        }
    }

    diagnostics.session_key_method(None);
    Ok(None)
}

fn try_unwrap(method: UnwrapMethod, key: &SymmetricKey, wrapped: &[u8]) -> Option<SymmetricKey> {
    let plain = match method {
        UnwrapMethod::Aes128 => {
            let narrow = key.companion_128();
            let narrow_bytes: &[u8; 16] = narrow
                .as_bytes()
                .try_into()
                .expect("companion is 16 bytes");
            aes::aes_128_decrypt_key(narrow_bytes, wrapped)
        }
        UnwrapMethod::Aes256Legacy => aes::aes_256_decrypt_key_legacy(&widen_to_256(key), wrapped),
        UnwrapMethod::Aes256Authenticated => aes::aes_256_decrypt_key(&widen_to_256(key), wrapped),
    };
    plain
        .ok()
        .and_then(|bytes| SymmetricKey::try_from(bytes.as_slice()).ok())
}

/// View a key as 256-bit for the wide unwrap attempts: a 128-bit key is
/// zero-padded, a 256-bit key is used as-is.
fn widen_to_256(key: &SymmetricKey) -> Zeroizing<[u8; 32]> {
    let mut wide = Zeroizing::new([0u8; 32]);
    wide[..key.len()].copy_from_slice(key.as_bytes());
    wide
}

/// Decrypt every encrypted attribute of a parsed instance.
///
/// Unencrypted attributes and attribute ids outside the type's value table
/// (association ids) pass through unchanged. Encrypted attributes become
/// their coerced plaintext, or the type's zero value when the session key
/// is absent, the wire value is missing or empty, or decryption fails.
pub fn decrypt_instance(
    model: &'static TypeModel,
    instance: &Instance,
    session_key: Option<&SymmetricKey>,
    diagnostics: &dyn DecryptDiagnostics,
) -> Instance {
    let mut out = Instance::new();

    for value_model in model.values {
        let wire_value = wire::attr(instance, value_model.id);

        if !value_model.encrypted {
            if let Some(value) = wire_value {
                out.insert(value_model.id.to_string(), value.clone());
            }
            continue;
        }

        let decrypted = match (session_key, wire_value) {
            (Some(key), Some(value)) if !is_null_or_empty(value) => {
                decrypt_attribute(key, value, value_model, model, diagnostics)
            }
            _ => None,
        };
        out.insert(
            value_model.id.to_string(),
            decrypted.unwrap_or_else(|| value_model.value_type.zero_value()),
        );
    }

    for (key, value) in instance {
        let known_value = key
            .parse::<u32>()
            .ok()
            .and_then(|id| model.value(id))
            .is_some();
        if !known_value {
            out.insert(key.clone(), value.clone());
        }
    }

    out
}

fn is_null_or_empty(value: &Value) -> bool {
    match wire::unwrap_single_element_array(value) {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn decrypt_attribute(
    session_key: &SymmetricKey,
    value: &Value,
    value_model: &'static ModelValue,
    model: &'static TypeModel,
    diagnostics: &dyn DecryptDiagnostics,
) -> Option<Value> {
    let failure = ClientError::DecryptFailure {
        type_name: model.name,
        attribute_id: value_model.id,
    };

    let Some(ciphertext) = wire::value_to_bytes(value) else {
        diagnostics.attribute_failure(&failure);
        return None;
    };

    let plain = match aes::aes_decrypt_data(session_key, &ciphertext) {
        Ok(plain) => plain,
        Err(_) if session_key.len() == 32 => {
            // A wide session key over a payload written in the 128-bit era:
            // retry with the truncation.
            match aes::aes_decrypt_data(&session_key.companion_128(), &ciphertext) {
                Ok(plain) => {
                    diagnostics.attribute_fallback(model.name, value_model.id);
                    plain
                }
                Err(_) => {
                    diagnostics.attribute_failure(&failure);
                    return None;
                }
            }
        }
        Err(_) => {
            diagnostics.attribute_failure(&failure);
            return None;
        }
    };

    match value_model.value_type.coerce(&plain) {
        Ok(coerced) => Some(coerced),
        Err(_) => {
            diagnostics.attribute_failure(&failure);
            None
        }
    }
}

/// Decrypt an instance, retrying across cached key versions.
///
/// Versions are tried in the order "the version the instance claims, then
/// every other version the chain knows for the owner group". A version is
/// considered failed when any of `critical_attributes` reported a
/// decryption failure; the next version is then resolved and the whole
/// attribute set retried. When every version fails the instance is
/// decrypted with no session key at all, which zeroes every encrypted
/// attribute but preserves the association ids.
pub fn decrypt_with_version_retry(
    key_chain: &KeyChain,
    model: &'static TypeModel,
    instance: &Instance,
    critical_attributes: &[u32],
    diagnostics: &dyn DecryptDiagnostics,
) -> Result<Instance> {
    let owner_group = model
        .owner_group_id
        .and_then(|id| wire::attr_str(instance, id));

    let mut candidates: Vec<String> = Vec::new();
    if let Some(id) = model.owner_key_version_id {
        if let Some(value) = wire::attr(instance, id) {
            candidates.push(version_text(Some(value)));
        }
    }
    if let Some(group) = owner_group {
        for version in key_chain.versions(group) {
            if !candidates.contains(&version) {
                candidates.push(version);
            }
        }
    }

    for version in &candidates {
        let recorder = CriticalRecorder::new(critical_attributes, diagnostics);
        let Some(session_key) =
            resolve_session_key(key_chain, model, instance, Some(version), &recorder)?
        else {
            continue;
        };
        let decrypted = decrypt_instance(model, instance, Some(&session_key), &recorder);
        if !recorder.hit() {
            return Ok(decrypted);
        }
    }

    Ok(decrypt_instance(model, instance, None, diagnostics))
}

/// Forwards to an inner sink while remembering whether any critical
/// attribute failed.
struct CriticalRecorder<'a> {
    critical: &'a [u32],
    hit: Cell<bool>,
    inner: &'a dyn DecryptDiagnostics,
}

impl<'a> CriticalRecorder<'a> {
    fn new(critical: &'a [u32], inner: &'a dyn DecryptDiagnostics) -> Self {
        Self {
            critical,
            hit: Cell::new(false),
            inner,
        }
    }

    fn hit(&self) -> bool {
        self.hit.get()
    }
}

impl DecryptDiagnostics for CriticalRecorder<'_> {
    fn session_key_method(&self, method: Option<UnwrapMethod>) {
        self.inner.session_key_method(method);
    }

    fn unwrap_attempt(&self, method: UnwrapMethod, key_len: usize, success: bool) {
        self.inner.unwrap_attempt(method, key_len, success);
    }

    fn key_unavailable(&self, error: &ClientError) {
        self.inner.key_unavailable(error);
    }

    fn attribute_failure(&self, error: &ClientError) {
        if let ClientError::DecryptFailure { attribute_id, .. } = error {
            if self.critical.contains(attribute_id) {
                self.hit.set(true);
            }
        }
        self.inner.attribute_failure(error);
    }

    fn attribute_fallback(&self, type_name: &'static str, attribute_id: u32) {
        self.inner.attribute_fallback(type_name, attribute_id);
    }
}
