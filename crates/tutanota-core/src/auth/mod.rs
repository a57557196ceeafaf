//! Authentication: the two-step login protocol and the get-or-create
//! session orchestration on top of it.

mod login;
mod orchestrator;

pub use login::{LoginResult, build_salt_body, fetch_salt_and_derive, login, session_id_from_access_token};
pub use orchestrator::{CredentialSource, get_or_create_session, login_fresh, unlock_key_chain};
