use chrono::{DateTime, TimeZone, Utc};
use futures::{StreamExt, stream};
use serde_json::Value;
use tracing::debug;
use tutanota_model::{
    IdTuple, MAIL, MAIL_BOX, MAIL_SET, MAIL_SET_ENTRY, MAILBOX_GROUP_ROOT,
    wire::{self, Instance, unwrap_single_element_array},
};
use tutanota_encoding::{GENERATED_MAX_ID, GENERATED_MIN_ID};

use crate::{
    ClientError, EntityId, RestClient, Result,
    decrypt::{
        DecryptDiagnostics, NoopDiagnostics, decrypt_instance, decrypt_with_version_retry,
        resolve_session_key,
    },
    keys::{KeyChain, fetch_former_key},
    require_attr,
    user::version_text,
};

/// Upper bound on simultaneous in-flight requests in the list fan-outs.
const MAX_CONCURRENT_REQUESTS: usize = 5;

/// Soft cap on mail-set enumeration, inherited from the web client.
const MAIL_SET_PAGE_SIZE: u64 = 1000;

/// Newest-first page size for mail listing.
const MAIL_PAGE_SIZE: u64 = 10;

const GROUP_ROOT_MAILBOX: u32 = 699;
const MAIL_BOX_FOLDERS: u32 = 443;
const MAIL_SET_REF_LIST: u32 = 442;
const MAIL_SET_ID: u32 = 430;
const MAIL_SET_NAME: u32 = 435;
const MAIL_SET_FOLDER_TYPE: u32 = 436;
const MAIL_SET_OWNER_KEY_VERSION: u32 = 1399;
const MAIL_SET_ENTRIES: u32 = 1459;
const MAIL_SET_COLOR: u32 = 1479;
const MAIL_SET_ENTRY_MAIL: u32 = 1456;
const MAIL_ID: u32 = 98;
const MAIL_SUBJECT: u32 = 105;
const MAIL_RECEIVED_DATE: u32 = 107;
const MAIL_STATE: u32 = 108;
const MAIL_UNREAD: u32 = 109;

/// A decrypted mail set (folder or label).
#[derive(Debug, Clone)]
pub struct Folder {
    /// `[listId, elementId]` of the mail set.
    pub id: IdTuple,
    /// Decrypted name; may be empty for system folders.
    pub name: String,
    /// Folder type code; drives the display-name substitution.
    pub folder_type: i64,
    /// Decrypted label color; empty when unset.
    pub color: String,
    /// The entries list holding this folder's mail references.
    pub entries_list_id: Option<String>,
}

impl Folder {
    /// The name to show: the decrypted name, or the well-known name of the
    /// folder type when the stored name is blank.
    pub fn display_name(&self) -> &str {
        if !self.name.trim().is_empty() {
            return &self.name;
        }
        match self.folder_type {
            1 => "Inbox",
            2 => "Sent",
            3 => "Trash",
            4 => "Archive",
            5 => "Spam",
            6 => "Draft",
            10 => "Scheduled",
            8 => "Label (no name)",
            _ => "(no name)",
        }
    }
}

/// Decrypted header fields of one mail.
#[derive(Debug, Clone)]
pub struct MailHeader {
    /// `[listId, elementId]` of the mail.
    pub id: IdTuple,
    /// Decrypted subject; empty when decryption was impossible.
    pub subject: String,
    /// Server receive time.
    pub received_date: Option<DateTime<Utc>>,
    /// Unread flag.
    pub unread: bool,
    /// Mail state code (received, sent, draft ...).
    pub state: i64,
}

static NOOP: NoopDiagnostics = NoopDiagnostics;

/// Walks the mailbox entity tree and decrypts what it finds.
///
/// Former-key population always happens in a serial pre-pass before any
/// decryption fan-out, so the key chain is never appended to under
/// concurrent readers.
pub struct MailboxReader<'a> {
    rest: &'a RestClient,
    key_chain: &'a mut KeyChain,
    mail_group: String,
    diagnostics: &'a dyn DecryptDiagnostics,
}

impl<'a> MailboxReader<'a> {
    /// A reader for the given mail group.
    pub fn new(
        rest: &'a RestClient,
        key_chain: &'a mut KeyChain,
        mail_group: impl Into<String>,
    ) -> Self {
        Self {
            rest,
            key_chain,
            mail_group: mail_group.into(),
            diagnostics: &NOOP,
        }
    }

    /// Route decryption diagnostics somewhere.
    pub fn with_diagnostics(mut self, diagnostics: &'a dyn DecryptDiagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Enumerate the mailbox's folders and labels.
    pub async fn load_folders(&mut self) -> Result<Vec<Folder>> {
        let sets = self.load_mail_sets().await?;
        sets.iter().map(folder_from_instance).collect()
    }

    /// List the newest mails of one folder, newest first.
    pub async fn list_mails(&mut self, folder_id: &str) -> Result<Vec<MailHeader>> {
        let sets = self.load_mail_sets().await?;
        let folder = sets
            .iter()
            .find(|set| {
                wire::attr(set, MAIL_SET_ID)
                    .and_then(|v| IdTuple::from_wire(v).ok())
                    .is_some_and(|id| id.element_id == folder_id)
            })
            .ok_or_else(|| ClientError::Other(format!("no folder with id {folder_id}")))?;
        let entries_list = require_attr!(
            wire::attr_str(folder, MAIL_SET_ENTRIES),
            "MailSet.entries"
        );

        let entries = self
            .rest
            .load_range(
                &MAIL_SET_ENTRY,
                entries_list,
                GENERATED_MAX_ID,
                MAIL_PAGE_SIZE,
                true,
            )
            .await?;

        let rest = self.rest;
        let key_chain = &*self.key_chain;
        let diagnostics = self.diagnostics;
        let mails: Vec<Result<MailHeader>> = stream::iter(entries.iter().map(|entry| async move {
            let mail_ref = require_attr!(
                wire::attr(entry, MAIL_SET_ENTRY_MAIL),
                "MailSetEntry.mail"
            );
            let mail_id = IdTuple::from_wire(unwrap_single_element_array(mail_ref))?;
            let mail = rest.load_entity(&MAIL, &EntityId::Tuple(mail_id)).await?;
            let session_key = resolve_session_key(key_chain, &MAIL, &mail, None, diagnostics)?;
            let decrypted = decrypt_instance(&MAIL, &mail, session_key.as_ref(), diagnostics);
            mail_header_from_instance(&decrypted)
        }))
        .buffered(MAX_CONCURRENT_REQUESTS)
        .collect()
        .await;

        mails.into_iter().collect()
    }

    /// Load and decrypt every mail set of the mailbox, in list order.
    async fn load_mail_sets(&mut self) -> Result<Vec<Instance>> {
        let root = self
            .rest
            .load_entity(&MAILBOX_GROUP_ROOT, &EntityId::from(self.mail_group.as_str()))
            .await?;
        let mailbox_id = require_attr!(
            wire::attr_str(&root, GROUP_ROOT_MAILBOX),
            "MailboxGroupRoot.mailbox"
        );

        let mailbox = self
            .rest
            .load_entity(&MAIL_BOX, &EntityId::from(mailbox_id))
            .await?;
        let session_key =
            resolve_session_key(self.key_chain, &MAIL_BOX, &mailbox, None, self.diagnostics)?;
        let mailbox =
            decrypt_instance(&MAIL_BOX, &mailbox, session_key.as_ref(), self.diagnostics);

        let folders_ref = unwrap_single_element_array(require_attr!(
            wire::attr(&mailbox, MAIL_BOX_FOLDERS),
            "MailBox.folders"
        ));
        let folders_ref = require_attr!(folders_ref.as_object(), "MailBox.folders aggregation");
        let sets_list = require_attr!(
            wire::attr_str(folders_ref, MAIL_SET_REF_LIST),
            "MailSetRef.mailSets"
        );

        let sets = self
            .rest
            .load_range(&MAIL_SET, sets_list, GENERATED_MIN_ID, MAIL_SET_PAGE_SIZE, false)
            .await?;

        self.populate_former_keys(&sets).await?;

        let key_chain = &*self.key_chain;
        let diagnostics = self.diagnostics;
        let decrypted: Vec<Result<Instance>> = stream::iter(sets.iter().map(|set| async move {
            decrypt_with_version_retry(
                key_chain,
                &MAIL_SET,
                set,
                &[MAIL_SET_NAME, MAIL_SET_COLOR],
                diagnostics,
            )
        }))
        .buffered(MAX_CONCURRENT_REQUESTS)
        .collect()
        .await;

        decrypted.into_iter().collect()
    }

    /// Walk former keys once per distinct older key version referenced by
    /// the given instances. Must complete before any decryption fan-out.
    async fn populate_former_keys(&mut self, sets: &[Instance]) -> Result<()> {
        let Some(current) = self.key_chain.current_version(&self.mail_group) else {
            return Ok(());
        };
        let current = current.to_owned();

        let mut wanted: Vec<String> = Vec::new();
        for set in sets {
            let version = version_text(wire::attr(set, MAIL_SET_OWNER_KEY_VERSION));
            if version != current && !wanted.contains(&version) {
                wanted.push(version);
            }
        }

        for version in wanted {
            let found = fetch_former_key(
                self.rest,
                self.key_chain,
                &self.mail_group,
                &current,
                &version,
            )
            .await?;
            if found.is_none() {
                debug!(
                    group = %self.mail_group,
                    version = %version,
                    "former key unavailable, affected instances will decrypt to zero values"
                );
            }
        }
        Ok(())
    }
}

fn folder_from_instance(instance: &Instance) -> Result<Folder> {
    let id_value = require_attr!(wire::attr(instance, MAIL_SET_ID), "MailSet._id");
    Ok(Folder {
        id: IdTuple::from_wire(unwrap_single_element_array(id_value))?,
        name: wire::attr_str(instance, MAIL_SET_NAME).unwrap_or_default().to_owned(),
        folder_type: number_value(wire::attr(instance, MAIL_SET_FOLDER_TYPE)),
        color: wire::attr_str(instance, MAIL_SET_COLOR).unwrap_or_default().to_owned(),
        entries_list_id: wire::attr_str(instance, MAIL_SET_ENTRIES).map(str::to_owned),
    })
}

fn mail_header_from_instance(instance: &Instance) -> Result<MailHeader> {
    let id_value = require_attr!(wire::attr(instance, MAIL_ID), "Mail._id");
    let received_millis = number_value(wire::attr(instance, MAIL_RECEIVED_DATE));
    Ok(MailHeader {
        id: IdTuple::from_wire(unwrap_single_element_array(id_value))?,
        subject: wire::attr_str(instance, MAIL_SUBJECT).unwrap_or_default().to_owned(),
        received_date: Utc.timestamp_millis_opt(received_millis).single(),
        unread: bool_value(wire::attr(instance, MAIL_UNREAD)),
        state: number_value(wire::attr(instance, MAIL_STATE)),
    })
}

/// Numbers are textual on the wire but may already be JSON numbers after
/// decryption.
fn number_value(value: Option<&Value>) -> i64 {
    match value.map(unwrap_single_element_array) {
        Some(Value::String(s)) => s.parse().unwrap_or(0),
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
        _ => 0,
    }
}

fn bool_value(value: Option<&Value>) -> bool {
    match value.map(unwrap_single_element_array) {
        Some(Value::String(s)) => s != "0",
        Some(Value::Bool(b)) => *b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use base64::{Engine, engine::general_purpose::STANDARD};
    use serde_json::json;
    use tutanota_crypto::{SymmetricKey, aes};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::user::{Membership, UserKeyMaterial};

    const IV: [u8; 16] = [6u8; 16];

    fn key(byte: u8) -> SymmetricKey {
        SymmetricKey::try_from([byte; 32].as_slice()).unwrap()
    }

    fn chain(group: &str, version: &str, group_key: &SymmetricKey) -> KeyChain {
        let passphrase_key = key(9);
        let wrapped = aes::aes_256_encrypt_key(
            passphrase_key.as_bytes().try_into().unwrap(),
            group_key.as_bytes(),
        );
        KeyChain::unlock(
            &passphrase_key,
            &UserKeyMaterial {
                user_group: Membership {
                    group: "ug".into(),
                    sym_enc_g_key: aes::aes_256_encrypt_key(
                        passphrase_key.as_bytes().try_into().unwrap(),
                        key(8).as_bytes(),
                    ),
                    group_key_version: "0".into(),
                    group_type: None,
                },
                memberships: vec![Membership {
                    group: group.into(),
                    sym_enc_g_key: wrapped,
                    group_key_version: version.into(),
                    group_type: Some("5".into()),
                }],
                customer: None,
            },
        )
        .unwrap()
    }

    fn wrap(group_key: &SymmetricKey, session_key: &SymmetricKey) -> String {
        STANDARD.encode(aes::aes_256_encrypt_key(
            group_key.as_bytes().try_into().unwrap(),
            session_key.as_bytes(),
        ))
    }

    fn enc(session_key: &SymmetricKey, text: &str) -> String {
        STANDARD.encode(aes::aes_encrypt_data(session_key, text.as_bytes(), &IV))
    }

    async fn mount_tree(server: &MockServer, group_key: &SymmetricKey, sets: Vec<Value>) {
        let mailbox_session = key(20);
        Mock::given(method("GET"))
            .and(path("/rest/tutanota/mailboxgrouproot/mail-g"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "699": "mailbox-1",
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/tutanota/mailbox/mailbox-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "443": [{"441": "ref", "442": "sets-list"}],
                "590": "mail-g",
                "591": wrap(group_key, &mailbox_session),
                "1396": "1",
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/tutanota/mailset/sets-list"))
            .and(query_param("start", GENERATED_MIN_ID))
            .and(query_param("count", "1000"))
            .and(query_param("reverse", "false"))
            .respond_with(ResponseTemplate::new(200).set_body_json(Value::Array(sets)))
            .mount(server)
            .await;
    }

    fn mail_set(
        element_id: &str,
        group_key: &SymmetricKey,
        session_key: &SymmetricKey,
        name: &str,
        folder_type: &str,
        version: &str,
    ) -> Value {
        json!({
            "430": ["sets-list", element_id],
            "434": wrap(group_key, session_key),
            "435": enc(session_key, name),
            "436": folder_type,
            "589": "mail-g",
            "1399": version,
            "1459": format!("entries-{element_id}"),
        })
    }

    #[tokio::test]
    async fn loads_and_decrypts_folders() {
        let group_key = key(1);
        let session_key = key(2);

        let server = MockServer::start().await;
        mount_tree(
            &server,
            &group_key,
            vec![
                mail_set("f1", &group_key, &session_key, "", "1", "1"),
                mail_set("f2", &group_key, &session_key, "Projects", "0", "1"),
            ],
        )
        .await;

        let rest = RestClient::new(server.uri());
        let mut chain = chain("mail-g", "1", &group_key);
        let folders = MailboxReader::new(&rest, &mut chain, "mail-g")
            .load_folders()
            .await
            .unwrap();

        assert_eq!(folders.len(), 2);
        assert_eq!(folders[0].display_name(), "Inbox");
        assert_eq!(folders[1].display_name(), "Projects");
        assert_eq!(folders[0].id.element_id, "f1");
        assert_eq!(folders[1].entries_list_id.as_deref(), Some("entries-f2"));
    }

    #[tokio::test]
    async fn prewalks_former_keys_for_older_instances() {
        let current_key = key(1);
        let former_key = key(3);
        let session_key = key(2);

        let server = MockServer::start().await;
        mount_tree(
            &server,
            &current_key,
            // Wrapped at version 0, which only the former-key walk can open.
            vec![mail_set("f1", &former_key, &session_key, "Old folder", "0", "0")],
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/rest/sys/group/mail-g"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "2271": [{"2269": "former-list"}],
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/sys/groupkey/former-list"))
            .and(query_param("count", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"2258": wrap(&current_key, &former_key)},
            ])))
            .mount(&server)
            .await;

        let rest = RestClient::new(server.uri());
        let mut chain = chain("mail-g", "1", &current_key);
        let folders = MailboxReader::new(&rest, &mut chain, "mail-g")
            .load_folders()
            .await
            .unwrap();

        assert_eq!(folders[0].name, "Old folder");
        // The walked key is now cached at the older version.
        assert!(chain.get("mail-g", "0").is_some());
    }

    #[tokio::test]
    async fn unreachable_versions_decrypt_to_zero_values() {
        let current_key = key(1);
        let session_key = key(2);

        let server = MockServer::start().await;
        mount_tree(
            &server,
            &current_key,
            vec![mail_set("f1", &key(7), &session_key, "Lost", "2", "0")],
        )
        .await;
        // Former-key walk finds an empty chain.
        Mock::given(method("GET"))
            .and(path("/rest/sys/group/mail-g"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "2271": [{"2269": "former-list"}],
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/sys/groupkey/former-list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let rest = RestClient::new(server.uri());
        let mut chain = chain("mail-g", "1", &current_key);
        let folders = MailboxReader::new(&rest, &mut chain, "mail-g")
            .load_folders()
            .await
            .unwrap();

        // Name zeroed, so the folder-type substitution kicks in.
        assert_eq!(folders[0].name, "");
        assert_eq!(folders[0].display_name(), "Sent");
    }

    #[tokio::test]
    async fn lists_mails_newest_first() {
        let group_key = key(1);
        let session_key = key(2);

        let server = MockServer::start().await;
        mount_tree(
            &server,
            &group_key,
            vec![mail_set("f1", &group_key, &session_key, "Inbox", "1", "1")],
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/rest/tutanota/mailsetentry/entries-f1"))
            .and(query_param("start", GENERATED_MAX_ID))
            .and(query_param("count", "10"))
            .and(query_param("reverse", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"1456": ["mail-list", "m2"]},
                {"1456": ["mail-list", "m1"]},
            ])))
            .mount(&server)
            .await;
        for (id, subject, unread) in [("m1", "First", "0"), ("m2", "Second", "1")] {
            let mail_session = key(30);
            Mock::given(method("GET"))
                .and(path(format!("/rest/tutanota/mail/mail-list/{id}")))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "98": ["mail-list", id],
                    "102": wrap(&group_key, &mail_session),
                    "105": enc(&mail_session, subject),
                    "107": "1700000000000",
                    "108": "2",
                    "109": unread,
                    "587": "mail-g",
                    "1395": "1",
                })))
                .mount(&server)
                .await;
        }

        let rest = RestClient::new(server.uri());
        let mut chain = chain("mail-g", "1", &group_key);
        let mails = MailboxReader::new(&rest, &mut chain, "mail-g")
            .list_mails("f1")
            .await
            .unwrap();

        // Output order equals input (range) order.
        assert_eq!(mails.len(), 2);
        assert_eq!(mails[0].id.element_id, "m2");
        assert_eq!(mails[0].subject, "Second");
        assert!(mails[0].unread);
        assert_eq!(mails[1].subject, "First");
        assert!(!mails[1].unread);
        assert_eq!(
            mails[0].received_date.unwrap().timestamp_millis(),
            1_700_000_000_000
        );
    }

    #[test]
    fn blank_names_substitute_by_folder_type() {
        let folder = |name: &str, folder_type: i64| Folder {
            id: IdTuple {
                list_id: "l".into(),
                element_id: "e".into(),
            },
            name: name.into(),
            folder_type,
            color: String::new(),
            entries_list_id: None,
        };

        assert_eq!(folder("", 1).display_name(), "Inbox");
        assert_eq!(folder("", 2).display_name(), "Sent");
        assert_eq!(folder("", 3).display_name(), "Trash");
        assert_eq!(folder("", 4).display_name(), "Archive");
        assert_eq!(folder("", 5).display_name(), "Spam");
        assert_eq!(folder("", 6).display_name(), "Draft");
        assert_eq!(folder("", 10).display_name(), "Scheduled");
        assert_eq!(folder("", 8).display_name(), "Label (no name)");
        assert_eq!(folder("", 0).display_name(), "(no name)");
        assert_eq!(folder("  ", 2).display_name(), "Sent");
        assert_eq!(folder("Named", 2).display_name(), "Named");
    }

    #[tokio::test]
    async fn unknown_folder_is_an_error() {
        let group_key = key(1);
        let server = MockServer::start().await;
        mount_tree(&server, &group_key, vec![]).await;

        let rest = RestClient::new(server.uri());
        let mut chain = chain("mail-g", "1", &group_key);
        let err = MailboxReader::new(&rest, &mut chain, "mail-g")
            .list_mails("nope")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Other(_)));
    }
}
