//! Static type models for every entity this client touches.
//!
//! Ids are wire constants; changing any of them breaks request encoding,
//! response mapping and decryption in one stroke.

use crate::type_model::{
    AssociationKind::{Aggregation, Element, List, ListElement},
    ModelAssociation, ModelValue, TypeModel,
    ValueType::{Boolean, Bytes, Date, Number, String as VString},
};

/// Current model version of the `sys` application, sent as the `v` header
/// on service calls that have no entity type of their own.
pub const SYS_VERSION: u32 = 143;
/// Current model version of the `tutanota` application.
pub const TUTANOTA_VERSION: u32 = 102;

const fn value(id: u32, name: &'static str, value_type: crate::ValueType) -> ModelValue {
    ModelValue {
        id,
        name,
        value_type,
        encrypted: false,
    }
}

const fn enc_value(id: u32, name: &'static str, value_type: crate::ValueType) -> ModelValue {
    ModelValue {
        id,
        name,
        value_type,
        encrypted: true,
    }
}

const fn assoc(
    id: u32,
    name: &'static str,
    kind: crate::AssociationKind,
) -> ModelAssociation {
    ModelAssociation { id, name, kind }
}

/// Request body of the salt service.
pub static SALT_DATA: TypeModel = TypeModel {
    app: "sys",
    name: "SaltData",
    version: SYS_VERSION,
    encrypted: false,
    values: &[
        value(418, "_format", Number),
        value(419, "mailAddress", VString),
    ],
    associations: &[],
    owner_group_id: None,
    owner_enc_session_key_id: None,
    owner_key_version_id: None,
};

/// Response of the salt service.
pub static SALT_RETURN: TypeModel = TypeModel {
    app: "sys",
    name: "SaltReturn",
    version: SYS_VERSION,
    encrypted: false,
    values: &[
        value(421, "_format", Number),
        value(422, "salt", Bytes),
        value(423, "kdfVersion", Number),
    ],
    associations: &[],
    owner_group_id: None,
    owner_enc_session_key_id: None,
    owner_key_version_id: None,
};

/// Request body of the session service.
pub static CREATE_SESSION_DATA: TypeModel = TypeModel {
    app: "sys",
    name: "CreateSessionData",
    version: SYS_VERSION,
    encrypted: false,
    values: &[
        value(1212, "_format", Number),
        value(1213, "accessKey", Bytes),
        value(1214, "authToken", VString),
        value(1215, "authVerifier", VString),
        value(1216, "clientIdentifier", VString),
        value(1217, "mailAddress", VString),
        value(1418, "recoverCodeVerifier", VString),
    ],
    associations: &[assoc(1218, "user", Element)],
    owner_group_id: None,
    owner_enc_session_key_id: None,
    owner_key_version_id: None,
};

/// Response of the session service.
pub static CREATE_SESSION_RETURN: TypeModel = TypeModel {
    app: "sys",
    name: "CreateSessionReturn",
    version: SYS_VERSION,
    encrypted: false,
    values: &[
        value(1220, "_format", Number),
        value(1221, "accessToken", VString),
    ],
    associations: &[
        assoc(1222, "challenges", Aggregation),
        assoc(1223, "user", Element),
    ],
    owner_group_id: None,
    owner_enc_session_key_id: None,
    owner_key_version_id: None,
};

/// The account root entity.
pub static USER: TypeModel = TypeModel {
    app: "sys",
    name: "User",
    version: SYS_VERSION,
    encrypted: false,
    values: &[
        value(85, "_id", VString),
        value(86, "_format", Number),
        value(89, "verifier", Bytes),
        value(92, "enabled", Boolean),
    ],
    associations: &[
        assoc(95, "userGroup", Aggregation),
        assoc(96, "memberships", Aggregation),
        assoc(99, "customer", Element),
    ],
    owner_group_id: None,
    owner_enc_session_key_id: None,
    owner_key_version_id: None,
};

/// Aggregate describing a user's relationship to one group, including the
/// group key wrapped under the user's key material.
pub static GROUP_MEMBERSHIP: TypeModel = TypeModel {
    app: "sys",
    name: "GroupMembership",
    version: SYS_VERSION,
    encrypted: false,
    values: &[
        value(26, "_id", VString),
        value(27, "symEncGKey", Bytes),
        value(28, "admin", Boolean),
        value(1030, "groupType", Number),
        value(2246, "groupKeyVersion", Number),
        value(2247, "symKeyVersion", Number),
    ],
    associations: &[
        assoc(29, "group", Element),
        assoc(30, "groupInfo", ListElement),
    ],
    owner_group_id: None,
    owner_enc_session_key_id: None,
    owner_key_version_id: None,
};

/// A unit of access control and key scope.
pub static GROUP: TypeModel = TypeModel {
    app: "sys",
    name: "Group",
    version: SYS_VERSION,
    encrypted: false,
    values: &[
        value(6, "_id", VString),
        value(7, "_format", Number),
        value(10, "type", Number),
        value(11, "adminGroupEncGKey", Bytes),
        value(12, "enabled", Boolean),
        value(2270, "groupKeyVersion", Number),
    ],
    associations: &[
        assoc(17, "admin", Element),
        assoc(18, "customer", Element),
        assoc(2271, "formerGroupKeys", Aggregation),
    ],
    owner_group_id: None,
    owner_enc_session_key_id: None,
    owner_key_version_id: None,
};

/// Aggregate on [`GROUP`] pointing at the former-keys list.
pub static GROUP_KEYS_REF: TypeModel = TypeModel {
    app: "sys",
    name: "GroupKeysRef",
    version: SYS_VERSION,
    encrypted: false,
    values: &[value(2268, "_id", VString)],
    associations: &[assoc(2269, "list", List)],
    owner_group_id: None,
    owner_enc_session_key_id: None,
    owner_key_version_id: None,
};

/// One link of a group's former-key chain. The element id is the key
/// version encoded as a custom id; `ownerEncGKey` is this version's key
/// wrapped under the next-newer one.
pub static GROUP_KEY: TypeModel = TypeModel {
    app: "sys",
    name: "GroupKey",
    version: SYS_VERSION,
    encrypted: false,
    values: &[
        value(2256, "_id", VString),
        value(2257, "_format", Number),
        value(2258, "ownerEncGKey", Bytes),
        value(2259, "ownerKeyVersion", Number),
        value(2260, "adminGroupEncGKey", Bytes),
    ],
    associations: &[],
    owner_group_id: None,
    owner_enc_session_key_id: None,
    owner_key_version_id: None,
};

/// Billing root of an account, read for the profile lookup.
pub static CUSTOMER: TypeModel = TypeModel {
    app: "sys",
    name: "Customer",
    version: SYS_VERSION,
    encrypted: false,
    values: &[
        value(32, "_id", VString),
        value(33, "_format", Number),
        value(34, "type", Number),
    ],
    associations: &[
        assoc(35, "adminGroup", Element),
        assoc(36, "customerGroup", Element),
    ],
    owner_group_id: None,
    owner_enc_session_key_id: None,
    owner_key_version_id: None,
};

/// Entry point from the mail group to its mailbox.
pub static MAILBOX_GROUP_ROOT: TypeModel = TypeModel {
    app: "tutanota",
    name: "MailboxGroupRoot",
    version: TUTANOTA_VERSION,
    encrypted: false,
    values: &[
        value(694, "_id", VString),
        value(695, "_permissions", VString),
        value(696, "_format", Number),
        value(697, "_ownerGroup", VString),
    ],
    associations: &[assoc(699, "mailbox", Element)],
    owner_group_id: None,
    owner_enc_session_key_id: None,
    owner_key_version_id: None,
};

/// The mailbox entity, owner of the mail-set list.
pub static MAIL_BOX: TypeModel = TypeModel {
    app: "tutanota",
    name: "MailBox",
    version: TUTANOTA_VERSION,
    encrypted: true,
    values: &[
        value(126, "_id", VString),
        value(127, "_permissions", VString),
        value(128, "_format", Number),
        value(569, "lastInfoDate", Date),
        value(590, "_ownerGroup", VString),
        value(591, "_ownerEncSessionKey", Bytes),
        value(1396, "_ownerKeyVersion", Number),
    ],
    associations: &[assoc(443, "folders", Aggregation)],
    owner_group_id: Some(590),
    owner_enc_session_key_id: Some(591),
    owner_key_version_id: Some(1396),
};

/// Aggregate on [`MAIL_BOX`] pointing at the mail-set list.
pub static MAIL_SET_REF: TypeModel = TypeModel {
    app: "tutanota",
    name: "MailSetRef",
    version: TUTANOTA_VERSION,
    encrypted: false,
    values: &[value(441, "_id", VString)],
    associations: &[assoc(442, "mailSets", List)],
    owner_group_id: None,
    owner_enc_session_key_id: None,
    owner_key_version_id: None,
};

/// A folder or label container.
pub static MAIL_SET: TypeModel = TypeModel {
    app: "tutanota",
    name: "MailSet",
    version: TUTANOTA_VERSION,
    encrypted: true,
    values: &[
        value(430, "_id", VString),
        value(431, "_permissions", VString),
        value(432, "_format", Number),
        value(434, "_ownerEncSessionKey", Bytes),
        enc_value(435, "name", VString),
        value(436, "folderType", Number),
        value(589, "_ownerGroup", VString),
        value(1399, "_ownerKeyVersion", Number),
        enc_value(1479, "color", VString),
    ],
    associations: &[
        assoc(437, "mails", List),
        assoc(438, "parentFolder", ListElement),
        assoc(1459, "entries", List),
    ],
    owner_group_id: Some(589),
    owner_enc_session_key_id: Some(434),
    owner_key_version_id: Some(1399),
};

/// One membership of a mail in a mail set; points at the mail itself.
pub static MAIL_SET_ENTRY: TypeModel = TypeModel {
    app: "tutanota",
    name: "MailSetEntry",
    version: TUTANOTA_VERSION,
    encrypted: false,
    values: &[
        value(1451, "_id", VString),
        value(1452, "_format", Number),
        value(1453, "_ownerGroup", VString),
    ],
    associations: &[assoc(1456, "mail", ListElement)],
    owner_group_id: None,
    owner_enc_session_key_id: None,
    owner_key_version_id: None,
};

/// A mail header entity. Bodies and attachments live elsewhere and are not
/// fetched by this client.
pub static MAIL: TypeModel = TypeModel {
    app: "tutanota",
    name: "Mail",
    version: TUTANOTA_VERSION,
    encrypted: true,
    values: &[
        value(98, "_id", VString),
        value(99, "_permissions", VString),
        value(100, "_format", Number),
        value(102, "_ownerEncSessionKey", Bytes),
        enc_value(105, "subject", VString),
        value(106, "sentDate", Date),
        value(107, "receivedDate", Date),
        value(108, "state", Number),
        value(109, "unread", Boolean),
        enc_value(426, "confidential", Boolean),
        enc_value(466, "replyType", Number),
        value(587, "_ownerGroup", VString),
        enc_value(617, "differentEnvelopeSender", VString),
        enc_value(866, "listUnsubscribe", Boolean),
        value(896, "movedTime", Date),
        value(1021, "phishingStatus", Number),
        enc_value(1120, "method", Number),
        value(1395, "_ownerKeyVersion", Number),
        enc_value(1346, "encryptionAuthStatus", Number),
        enc_value(1677, "previewText", VString),
    ],
    associations: &[
        assoc(111, "sender", Aggregation),
        assoc(115, "attachments", ListElement),
        assoc(117, "conversationEntry", ListElement),
        assoc(1306, "firstRecipient", Aggregation),
        assoc(1465, "sets", ListElement),
    ],
    owner_group_id: Some(587),
    owner_enc_session_key_id: Some(102),
    owner_key_version_id: Some(1395),
};

/// Resolve a type model by its type name.
pub fn type_model_by_name(name: &str) -> Option<&'static TypeModel> {
    ALL.iter().copied().find(|m| m.name == name)
}

static ALL: &[&TypeModel] = &[
    &SALT_DATA,
    &SALT_RETURN,
    &CREATE_SESSION_DATA,
    &CREATE_SESSION_RETURN,
    &USER,
    &GROUP_MEMBERSHIP,
    &GROUP,
    &GROUP_KEYS_REF,
    &GROUP_KEY,
    &CUSTOMER,
    &MAILBOX_GROUP_ROOT,
    &MAIL_BOX,
    &MAIL_SET_REF,
    &MAIL_SET,
    &MAIL_SET_ENTRY,
    &MAIL,
];
