use tracing::{debug, info, warn};
use tutanota_crypto::SymmetricKey;
use tutanota_model::{SYS_VERSION, USER};

use crate::{
    ClientError, EntityId, RestClient, Result, Session, SessionStore,
    auth::login::{fetch_salt_and_derive, login},
    keys::KeyChain,
    user::UserKeyMaterial,
};

/// Where credentials come from when a login is needed. The CLI implements
/// this with environment variables and interactive prompts.
pub trait CredentialSource {
    /// The account mail address.
    fn email(&self) -> Result<String>;
    /// The account passphrase. Implementations must not echo it.
    fn password(&self) -> Result<String>;
}

/// Produce a working authenticated client: validate a stored session if
/// there is one, otherwise log in with fresh credentials and persist the
/// result.
///
/// The returned key is `Some` only on the fresh-login path, where the KDF
/// already ran; callers needing decryption with a stored session derive it
/// later via [`unlock_key_chain`].
pub async fn get_or_create_session(
    base_url: &str,
    store: &dyn SessionStore,
    credentials: &dyn CredentialSource,
) -> Result<(RestClient, Session, Option<SymmetricKey>)> {
    if let Some(session) = store.load() {
        if session.base_url == base_url.trim_end_matches('/') {
            let mut rest = RestClient::new(&session.base_url);
            rest.set_access_token(&session.access_token);
            match probe(&rest).await {
                Ok(()) => {
                    debug!(user = %session.user_id, "stored session is valid");
                    return Ok((rest, session, None));
                }
                Err(ClientError::NetworkUnavailable(e)) => {
                    warn!(error = %e, "could not reach the server to validate the stored session");
                }
                Err(e) => {
                    info!(error = %e, "stored session rejected, logging in again");
                }
            }
        } else {
            info!("stored session belongs to a different server");
        }
        if let Err(e) = store.clear() {
            warn!(error = %e, "failed to discard the stored session");
        }
    }

    login_fresh(base_url, store, credentials).await
}

/// Log in with fresh credentials and persist the session.
pub async fn login_fresh(
    base_url: &str,
    store: &dyn SessionStore,
    credentials: &dyn CredentialSource,
) -> Result<(RestClient, Session, Option<SymmetricKey>)> {
    let email = credentials.email()?;
    let password = credentials.password()?;

    let mut rest = RestClient::new(base_url);
    let result = login(&rest, &email, &password).await?;
    rest.set_access_token(&result.access_token);

    let session = Session {
        base_url: rest.base_url().to_owned(),
        access_token: result.access_token,
        user_id: result.user_id,
        session_id: Some(result.session_id),
    };
    if let Err(e) = store.save(&session) {
        warn!(error = %e, "failed to persist the session");
    }

    Ok((rest, session, Some(result.passphrase_key)))
}

/// Load the user entity and unlock the key chain.
///
/// When no passphrase key is at hand (stored-session path), the KDF inputs
/// are re-fetched and the key re-derived from credentials; the key chain
/// itself is never persisted.
pub async fn unlock_key_chain(
    rest: &RestClient,
    session: &Session,
    passphrase_key: Option<SymmetricKey>,
    credentials: &dyn CredentialSource,
) -> Result<(KeyChain, UserKeyMaterial)> {
    let user = rest
        .load_entity(&USER, &EntityId::from(session.user_id.as_str()))
        .await?;
    let material = UserKeyMaterial::from_wire(&user)?;

    let passphrase_key = match passphrase_key {
        Some(key) => key,
        None => {
            let email = credentials.email()?;
            let password = credentials.password()?;
            fetch_salt_and_derive(rest, &email, &password).await?
        }
    };

    let chain = KeyChain::unlock(&passphrase_key, &material)?;
    Ok((chain, material))
}

/// An authenticated no-op request, adequate to tell a live session from a
/// dead one.
async fn probe(rest: &RestClient) -> Result<()> {
    rest.service_get("sys", "systemkeysservice", SYS_VERSION, None)
        .await
        .map(|_| ())
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    struct MemoryStore {
        session: RefCell<Option<Session>>,
        cleared: Cell<bool>,
    }

    impl MemoryStore {
        fn with(session: Option<Session>) -> Self {
            Self {
                session: RefCell::new(session),
                cleared: Cell::new(false),
            }
        }
    }

    impl SessionStore for MemoryStore {
        fn load(&self) -> Option<Session> {
            self.session.borrow().clone()
        }

        fn save(&self, session: &Session) -> std::io::Result<()> {
            *self.session.borrow_mut() = Some(session.clone());
            Ok(())
        }

        fn clear(&self) -> std::io::Result<()> {
            self.cleared.set(true);
            *self.session.borrow_mut() = None;
            Ok(())
        }
    }

    struct FixedCredentials;

    impl CredentialSource for FixedCredentials {
        fn email(&self) -> Result<String> {
            Ok("alice@example.com".into())
        }

        fn password(&self) -> Result<String> {
            Ok("password".into())
        }
    }

    struct NoCredentials;

    impl CredentialSource for NoCredentials {
        fn email(&self) -> Result<String> {
            panic!("credentials must not be requested");
        }

        fn password(&self) -> Result<String> {
            panic!("credentials must not be requested");
        }
    }

    fn stored_session(base_url: &str) -> Session {
        Session {
            base_url: base_url.trim_end_matches('/').to_owned(),
            access_token: "stored-token".into(),
            user_id: "user-1".into(),
            session_id: None,
        }
    }

    #[tokio::test]
    async fn valid_stored_session_is_reused_without_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/sys/systemkeysservice"))
            .and(header("accessToken", "stored-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let store = MemoryStore::with(Some(stored_session(&server.uri())));
        let (_rest, session, key) =
            get_or_create_session(&server.uri(), &store, &NoCredentials)
                .await
                .unwrap();
        assert_eq!(session.access_token, "stored-token");
        assert!(key.is_none());
        assert!(!store.cleared.get());
    }

    #[tokio::test]
    async fn rejected_stored_session_falls_back_to_login() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/sys/systemkeysservice"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/sys/saltservice"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "422": base64::Engine::encode(&base64::engine::general_purpose::STANDARD, [7u8; 16]),
                "423": "1",
            })))
            .mount(&server)
            .await;

        let token = tutanota_encoding::B64Url::from(vec![2u8; 24]).encode();
        Mock::given(method("POST"))
            .and(path("/rest/sys/sessionservice"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "1221": token,
                "1222": [],
                "1223": "user-2",
            })))
            .mount(&server)
            .await;

        let store = MemoryStore::with(Some(stored_session(&server.uri())));
        let (_rest, session, key) =
            get_or_create_session(&server.uri(), &store, &FixedCredentials)
                .await
                .unwrap();
        assert!(store.cleared.get());
        assert_eq!(session.user_id, "user-2");
        assert!(key.is_some());
        // The new session was persisted.
        assert_eq!(store.load().unwrap().user_id, "user-2");
    }
}
