//! docvault library crate: envelope encryption, the access guard, and the vault
//! service the CLI drives. Modules are public so `tests/` can exercise them directly.
pub mod config;
pub mod crypto;
pub mod error;
pub mod guard;
pub mod pin;
pub mod record;
pub mod store;
pub mod util;
pub mod vault;
