//! The per-group key cache and everything that feeds it.

mod former_keys;
mod key_chain;

pub use former_keys::fetch_former_key;
pub use key_chain::KeyChain;
