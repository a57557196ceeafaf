pub mod auth;
pub mod folders;
pub mod mails;
pub mod profile;

use tracing::warn;
use tutanota_core::{
    ClientError, RestClient, Session, SessionStore,
    auth::{get_or_create_session, unlock_key_chain},
    keys::KeyChain,
};

use crate::credentials::EnvCredentials;

/// Everything a command needs.
pub struct Ctx {
    pub api_url: String,
    pub json: bool,
    pub store: Box<dyn SessionStore>,
    pub credentials: EnvCredentials,
}

impl Ctx {
    /// A valid session plus an authenticated client.
    pub async fn establish(&self) -> Result<(RestClient, Session, Option<tutanota_crypto::SymmetricKey>), ClientError> {
        get_or_create_session(&self.api_url, self.store.as_ref(), &self.credentials).await
    }

    /// A session with the key chain unlocked and the mail group resolved.
    pub async fn open_mailbox(&self) -> Result<(RestClient, KeyChain, String), ClientError> {
        let (rest, session, passphrase_key) = self.establish().await?;
        let (chain, material) =
            unlock_key_chain(&rest, &session, passphrase_key, &self.credentials).await?;
        let mail_group = material
            .mail_membership()
            .ok_or_else(|| ClientError::Other("this account has no mail group".into()))?
            .group
            .clone();
        Ok((rest, chain, mail_group))
    }

    /// On an authentication failure, discard the stored session so the
    /// retry logs in afresh. Any further 401 is fatal.
    pub fn discard_session_for_retry(&self) {
        warn!("authentication failed, discarding the stored session and retrying once");
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "failed to discard the stored session");
        }
    }
}
