use std::collections::HashMap;

use tracing::debug;
use tutanota_crypto::{SymmetricKey, decrypt_key};

use crate::{Result, user::UserKeyMaterial};

struct GroupKeys {
    current_version: String,
    // Insertion order is part of the contract of `versions`, so this stays
    // a vector rather than a map.
    keys: Vec<(String, SymmetricKey)>,
}

/// Cache of `(group, version) → key`, seeded at unlock time and grown by
/// the former-key walker.
///
/// Lives from passphrase-key derivation until the process ends; never
/// persisted. Insertion-only: stored key bytes are never altered.
pub struct KeyChain {
    groups: HashMap<String, GroupKeys>,
}

impl KeyChain {
    /// Unlock the user group key with the passphrase key and, when the user
    /// has a mail membership, derive the mail group key from it.
    pub fn unlock(passphrase_key: &SymmetricKey, material: &UserKeyMaterial) -> Result<Self> {
        let mut chain = KeyChain {
            groups: HashMap::new(),
        };

        let user_group_key =
            unwrap_group_key(passphrase_key, &material.user_group.sym_enc_g_key)?;
        chain.plant(
            &material.user_group.group,
            &material.user_group.group_key_version,
            user_group_key.clone(),
        );

        if let Some(mail) = material.mail_membership() {
            let mail_group_key = unwrap_group_key(&user_group_key, &mail.sym_enc_g_key)?;
            chain.plant(&mail.group, &mail.group_key_version, mail_group_key);
            debug!(group = %mail.group, "mail group key unlocked");
        }

        Ok(chain)
    }

    /// Look up a group key at a specific version.
    pub fn get(&self, group: &str, version: &str) -> Option<&SymmetricKey> {
        self.groups
            .get(group)?
            .keys
            .iter()
            .find(|(v, _)| v == version)
            .map(|(_, k)| k)
    }

    /// Insert a key recovered by the former-key walker. Replacing an
    /// existing version is a no-op; planted keys are never overwritten.
    pub fn insert(&mut self, group: &str, version: &str, key: SymmetricKey) {
        let Some(entry) = self.groups.get_mut(group) else {
            return;
        };
        if entry.keys.iter().any(|(v, _)| v == version) {
            return;
        }
        entry.keys.push((version.to_owned(), key));
    }

    /// Every version currently known for a group, in insertion order.
    pub fn versions(&self, group: &str) -> Vec<String> {
        self.groups
            .get(group)
            .map(|e| e.keys.iter().map(|(v, _)| v.clone()).collect())
            .unwrap_or_default()
    }

    /// The current key version of a group, when the group is known.
    pub fn current_version(&self, group: &str) -> Option<&str> {
        self.groups
            .get(group)
            .map(|e| e.current_version.as_str())
    }

    fn plant(&mut self, group: &str, version: &str, key: SymmetricKey) {
        self.groups.insert(
            group.to_owned(),
            GroupKeys {
                current_version: version.to_owned(),
                keys: vec![(version.to_owned(), key)],
            },
        );
    }
}

/// Unwrap a wrapped group key, trying the 128-bit truncation of a wide
/// wrapping key before the full width.
///
/// Accounts that migrated from the bcrypt era still carry group keys
/// wrapped under their old 128-bit key, while this client derives a
/// 256-bit Argon2id key; the truncation is what matches those wrappings.
/// The mismatch in framing makes the wrong attempt fail rather than
/// produce garbage.
fn unwrap_group_key(wrapping: &SymmetricKey, wrapped: &[u8]) -> Result<SymmetricKey> {
    if wrapping.len() > 16 {
        if let Ok(key) = decrypt_key(&wrapping.companion_128(), wrapped) {
            return Ok(key);
        }
    }
    Ok(decrypt_key(wrapping, wrapped)?)
}
