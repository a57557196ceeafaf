use base64::{Engine, engine::general_purpose::STANDARD};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use tutanota_crypto::{
    KdfVersion, SymmetricKey, build_auth_verifier, derive_passphrase_key, normalize_salt,
};
use tutanota_encoding::{B64Url, base64_to_base64ext};
use tutanota_model::{
    CREATE_SESSION_DATA, CREATE_SESSION_RETURN, SALT_DATA, SALT_RETURN, SYS_VERSION,
    wire::{self, Instance, unwrap_single_element_array},
};

use crate::{ClientError, RestClient, Result, require_attr, user::version_text};

const CLIENT_IDENTIFIER: &str = "tutanota-cli";

/// Everything a successful login produces.
#[derive(Debug)]
pub struct LoginResult {
    /// Bearer token for subsequent requests.
    pub access_token: String,
    /// The user's element id.
    pub user_id: String,
    /// `(listId, elementId)` of the session entity, derived from the token.
    pub session_id: (String, String),
    /// The passphrase key the login derived; callers feed it straight into
    /// the key chain instead of re-running the KDF.
    pub passphrase_key: SymmetricKey,
}

/// Build the salt request body. The mail address is normalized by trimming
/// and lower-casing, matching what the account was registered under.
pub fn build_salt_body(email: &str) -> Result<Instance> {
    Ok(wire::encode_request(
        &SALT_DATA,
        &[
            ("_format", json!("0")),
            ("mailAddress", json!(normalize_mail_address(email))),
        ],
    )?)
}

/// Fetch the account's salt and KDF version, then derive the passphrase
/// key. Works unauthenticated; also used to rebuild the key chain for a
/// persisted session.
pub async fn fetch_salt_and_derive(
    rest: &RestClient,
    email: &str,
    password: &str,
) -> Result<SymmetricKey> {
    let body = build_salt_body(email)?;
    let response = rest
        .service_get("sys", "saltservice", SYS_VERSION, Some(&body))
        .await?;
    let response = wire::decode_response(&SALT_RETURN, &response);

    let salt_value = require_attr!(response.get("salt"), "SaltReturn.salt");
    let salt = normalize_salt(salt_value)?;
    let kdf = KdfVersion::from_wire(&version_text(response.get("kdfVersion")));

    Ok(derive_passphrase_key(password, &salt, kdf)?)
}

/// Run the two-step login: salt fetch, KDF, session creation.
///
/// Fails with [`ClientError::TwoFactorRequired`] when the account has
/// pending second-factor challenges; nothing key-related happens in that
/// case.
pub async fn login(rest: &RestClient, email: &str, password: &str) -> Result<LoginResult> {
    let passphrase_key = fetch_salt_and_derive(rest, email, password).await?;
    let verifier = build_auth_verifier(&passphrase_key);

    // Every session attribute must be present even when empty: the
    // optionals as explicit nulls, the user element association as an
    // empty list rather than null.
    let body = wire::encode_request(
        &CREATE_SESSION_DATA,
        &[
            ("_format", json!("0")),
            ("accessKey", Value::Null),
            ("authToken", Value::Null),
            ("authVerifier", json!(verifier)),
            ("clientIdentifier", json!(CLIENT_IDENTIFIER)),
            ("mailAddress", json!(normalize_mail_address(email))),
            ("recoverCodeVerifier", Value::Null),
            ("user", json!([])),
        ],
    )?;
    let response = rest
        .service_post("sys", "sessionservice", SYS_VERSION, &body)
        .await?;
    let response = wire::decode_response(&CREATE_SESSION_RETURN, &response);

    if let Some(Value::Array(challenges)) = response.get("challenges") {
        if !challenges.is_empty() {
            return Err(ClientError::TwoFactorRequired);
        }
    }

    let access_token = require_attr!(
        response
            .get("accessToken")
            .map(unwrap_single_element_array)
            .and_then(Value::as_str),
        "CreateSessionReturn.accessToken"
    )
    .to_owned();
    let user_id = require_attr!(
        response
            .get("user")
            .map(unwrap_single_element_array)
            .and_then(Value::as_str),
        "CreateSessionReturn.user"
    )
    .to_owned();
    let session_id = session_id_from_access_token(&access_token)?;

    Ok(LoginResult {
        access_token,
        user_id,
        session_id,
        passphrase_key,
    })
}

/// Derive the `(listId, elementId)` pair identifying the session entity.
///
/// The first nine token bytes are the list id, re-encoded through
/// base64ext; the remainder is hashed with SHA-256 and base64url-encoded
/// to form the element id. These hops are wire constants; resist the urge
/// to simplify them.
pub fn session_id_from_access_token(token: &str) -> Result<(String, String)> {
    let decoded = B64Url::try_from(token)
        .map_err(|_| ClientError::ProtocolMismatch("access token is not base64url".into()))?;
    let bytes = decoded.as_bytes();
    if bytes.len() < 9 {
        return Err(ClientError::ProtocolMismatch(
            "access token shorter than nine bytes".into(),
        ));
    }

    let list_id = base64_to_base64ext(&STANDARD.encode(&bytes[..9]));
    let element_id = B64Url::from(Sha256::digest(&bytes[9..]).as_slice()).encode();
    Ok((list_id, element_id))
}

fn normalize_mail_address(email: &str) -> String {
    email.trim().to_lowercase()
}
