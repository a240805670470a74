pub mod history;
pub mod kv;
pub mod tokens;

pub use history::{TransferHistory, initialize};
pub use kv::{FileStore, KeyValueStore, MemoryStore};
pub use tokens::{StoredToken, TokenStore};
