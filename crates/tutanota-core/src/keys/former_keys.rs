use tracing::debug;
use tutanota_crypto::{SymmetricKey, decrypt_key};
use tutanota_encoding::string_to_custom_id;
use tutanota_model::{GROUP, GROUP_KEY, wire};

use crate::{ClientError, EntityId, RestClient, Result, keys::KeyChain, require_attr};

const GROUP_FORMER_KEYS: u32 = 2271;
const GROUP_KEYS_REF_LIST: u32 = 2269;
const GROUP_KEY_OWNER_ENC_G_KEY: u32 = 2258;

/// Recover a group key at an older version by walking the group's
/// former-key chain downward from the current version.
///
/// Each link in the list is that version's key wrapped under the next-newer
/// version's key, so the walk decrypts strictly from newer to older. Any
/// decryption failure along the way means the target version is
/// unreachable: the walk aborts and reports `None` rather than caching a
/// key it cannot vouch for. On success the recovered key is inserted into
/// the chain before being returned.
///
/// The current key for the group must already be cached.
pub async fn fetch_former_key(
    rest: &RestClient,
    key_chain: &mut KeyChain,
    group_id: &str,
    current_version: &str,
    target_version: &str,
) -> Result<Option<SymmetricKey>> {
    let current: u64 = parse_version(current_version)?;
    let target: u64 = parse_version(target_version)?;

    if current <= target {
        return Ok(key_chain.get(group_id, target_version).cloned());
    }

    let Some(mut key) = key_chain.get(group_id, current_version).cloned() else {
        debug!(group = group_id, version = current_version, "current key not cached");
        return Ok(None);
    };

    // The former-keys list id sits inside a single-element-array
    // aggregation on the Group entity.
    let group = rest.load_entity(&GROUP, &EntityId::from(group_id)).await?;
    let former_keys = wire::unwrap_single_element_array(require_attr!(
        wire::attr(&group, GROUP_FORMER_KEYS),
        "Group.formerGroupKeys"
    ));
    let former_keys = require_attr!(former_keys.as_object(), "Group.formerGroupKeys aggregation");
    let list_id = require_attr!(
        wire::attr_str(former_keys, GROUP_KEYS_REF_LIST),
        "GroupKeysRef.list"
    );

    let links = rest
        .load_range(
            &GROUP_KEY,
            list_id,
            &string_to_custom_id(current_version),
            current - target,
            true,
        )
        .await?;

    let mut version = current;
    for link in links.iter().take((current - target) as usize) {
        let wrapped_value = require_attr!(
            wire::attr(link, GROUP_KEY_OWNER_ENC_G_KEY),
            "GroupKey.ownerEncGKey"
        );
        let wrapped = require_attr!(
            wire::value_to_bytes(wrapped_value),
            "GroupKey.ownerEncGKey bytes"
        );
        key = match decrypt_key(&key, &wrapped) {
            Ok(key) => key,
            Err(e) => {
                debug!(group = group_id, version, error = %e, "former-key link failed to decrypt");
                return Ok(None);
            }
        };
        version -= 1;
    }

    if version != target {
        debug!(
            group = group_id,
            got = version,
            wanted = target,
            "former-key list ended early"
        );
        return Ok(None);
    }

    key_chain.insert(group_id, target_version, key.clone());
    Ok(Some(key))
}

fn parse_version(version: &str) -> Result<u64> {
    version.parse().map_err(|_| {
        ClientError::ProtocolMismatch(format!("key version is not a non-negative integer: {version:?}"))
    })
}
