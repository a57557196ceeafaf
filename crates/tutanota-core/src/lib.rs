//! Client core for the Tutanota mail service.
//!
//! Composes the crypto and model crates into the actual client flows:
//! logging in, unlocking the per-group key chain from a passphrase,
//! resolving per-instance session keys, and walking the mailbox entity tree
//! over the versioned REST API.

pub mod auth;
mod error;
pub mod keys;
mod mailbox;
mod rest;
mod session;
pub mod user;

pub mod decrypt;

pub use error::ClientError;
pub use mailbox::{Folder, MailHeader, MailboxReader};
pub use rest::{EntityId, RestClient};
pub use session::{NoopSessionStore, Session, SessionStore};

pub(crate) type Result<T, E = ClientError> = std::result::Result<T, E>;
