//! 密钥存储模块：按身份读取本地持久化的共享密钥。
//!
//! # Secret Store
//!
//! Per-identity shared secrets live in durable local storage and never leave
//! the machine; they are only used to derive request signatures.
//!
//! Every operation is infallible from the caller's point of view: a storage
//! failure reads as "no secret", and writes report whether they persisted.

mod keychain;
mod memory;

pub use self::keychain::{KeyringSecretStore, DEFAULT_KEYRING_SERVICE};
pub use self::memory::MemorySecretStore;

use async_trait::async_trait;

#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Secret for `identity`, or `None` when absent or unreadable.
    async fn read_secret(&self, identity: &str) -> Option<String>;

    /// Persist a secret. Returns `false` if the backend refused it.
    async fn write_secret(&self, identity: &str, value: &str) -> bool;

    /// Remove a secret. Returns `true` if one was removed.
    async fn remove_secret(&self, identity: &str) -> bool;

    fn name(&self) -> &'static str;
}
