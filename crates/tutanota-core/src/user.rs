//! Parsing of the user entity into the key material the key chain consumes.

use serde_json::Value;
use tutanota_model::wire::{self, Instance, unwrap_single_element_array};

use crate::{ClientError, Result, require_attr};

/// Group type code of the mail group in a membership.
pub const GROUP_TYPE_MAIL: &str = "5";

const MEMBERSHIP_SYM_ENC_G_KEY: u32 = 27;
const MEMBERSHIP_GROUP: u32 = 29;
const MEMBERSHIP_GROUP_TYPE: u32 = 1030;
const MEMBERSHIP_GROUP_KEY_VERSION: u32 = 2246;
const USER_USER_GROUP: u32 = 95;
const USER_MEMBERSHIPS: u32 = 96;
const USER_CUSTOMER: u32 = 99;

/// One membership: a group id plus that group's key wrapped under the
/// user's key material.
#[derive(Debug, Clone)]
pub struct Membership {
    /// The group this membership grants access to.
    pub group: String,
    /// The group key, wrapped.
    pub sym_enc_g_key: Vec<u8>,
    /// Version of the wrapped group key; this becomes the group's current
    /// version in the key chain.
    pub group_key_version: String,
    /// Group type code; `"5"` is Mail. Absent on the user-group aggregate.
    pub group_type: Option<String>,
}

/// The parts of the user entity the key chain needs.
#[derive(Debug, Clone)]
pub struct UserKeyMaterial {
    /// The user's root group membership.
    pub user_group: Membership,
    /// All other memberships.
    pub memberships: Vec<Membership>,
    /// The customer this user belongs to, when present.
    pub customer: Option<String>,
}

impl UserKeyMaterial {
    /// Extract key material from a `User` wire instance.
    pub fn from_wire(instance: &Instance) -> Result<Self> {
        let user_group_value = require_attr!(wire::attr(instance, USER_USER_GROUP), "User.userGroup");
        let user_group = parse_membership(unwrap_single_element_array(user_group_value))?;

        let memberships = match wire::attr(instance, USER_MEMBERSHIPS) {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| parse_membership(unwrap_single_element_array(item)))
                .collect::<Result<Vec<_>>>()?,
            _ => Vec::new(),
        };

        let customer = wire::attr_str(instance, USER_CUSTOMER).map(str::to_owned);

        Ok(Self {
            user_group,
            memberships,
            customer,
        })
    }

    /// The membership of the mail group, when the user has one.
    pub fn mail_membership(&self) -> Option<&Membership> {
        self.memberships
            .iter()
            .find(|m| m.group_type.as_deref() == Some(GROUP_TYPE_MAIL))
    }
}

fn parse_membership(value: &Value) -> Result<Membership> {
    let aggregate = value.as_object().ok_or_else(|| {
        ClientError::ProtocolMismatch("membership is not an aggregation".into())
    })?;

    let key_value = require_attr!(
        wire::attr(aggregate, MEMBERSHIP_SYM_ENC_G_KEY),
        "GroupMembership.symEncGKey"
    );
    let sym_enc_g_key = require_attr!(
        wire::value_to_bytes(key_value),
        "GroupMembership.symEncGKey bytes"
    );
    let group = require_attr!(
        wire::attr_str(aggregate, MEMBERSHIP_GROUP),
        "GroupMembership.group"
    );

    Ok(Membership {
        group: group.to_owned(),
        sym_enc_g_key,
        group_key_version: version_text(wire::attr(aggregate, MEMBERSHIP_GROUP_KEY_VERSION)),
        group_type: wire::attr(aggregate, MEMBERSHIP_GROUP_TYPE).map(|v| version_text(Some(v))),
    })
}

/// Versions and type codes are decimal text on the wire, but tolerate JSON
/// numbers too. Missing means version zero.
pub(crate) fn version_text(value: Option<&Value>) -> String {
    match value.map(unwrap_single_element_array) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => "0".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use base64::{Engine, engine::general_purpose::STANDARD};
    use serde_json::json;

    use super::*;

    fn user_instance() -> Instance {
        let key = STANDARD.encode([0u8; 16]);
        serde_json::from_value(json!({
            "95": {"27": key, "29": "ug", "2246": "1", "2247": "0"},
            "96": [
                {"27": key, "29": "mail-g", "1030": "5", "2246": "1", "2247": "0"},
                {"27": key, "29": "x", "1030": "4", "2246": "0", "2247": "0"},
            ],
            "99": "customer-1",
        }))
        .unwrap()
    }

    #[test]
    fn finds_the_mail_membership() {
        let material = UserKeyMaterial::from_wire(&user_instance()).unwrap();
        assert_eq!(material.mail_membership().unwrap().group, "mail-g");
        assert_eq!(material.user_group.group, "ug");
        assert_eq!(material.user_group.group_key_version, "1");
        assert_eq!(material.customer.as_deref(), Some("customer-1"));
    }

    #[test]
    fn no_mail_membership_is_not_an_error() {
        let mut instance = user_instance();
        instance.remove("96");
        let material = UserKeyMaterial::from_wire(&instance).unwrap();
        assert!(material.mail_membership().is_none());
    }

    #[test]
    fn missing_user_group_is_a_protocol_mismatch() {
        let mut instance = user_instance();
        instance.remove("95");
        assert!(matches!(
            UserKeyMaterial::from_wire(&instance),
            Err(ClientError::ProtocolMismatch(_))
        ));
    }

    #[test]
    fn membership_tolerates_single_element_wrappers() {
        let key = STANDARD.encode([0u8; 16]);
        let instance: Instance = serde_json::from_value(json!({
            "95": [{"27": [key], "29": ["ug"], "2246": 1}],
        }))
        .unwrap();
        let material = UserKeyMaterial::from_wire(&instance).unwrap();
        assert_eq!(material.user_group.group, "ug");
        assert_eq!(material.user_group.group_key_version, "1");
    }
}
