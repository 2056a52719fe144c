use super::SecretStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Process-local secret store, for tests and hosts without a keychain.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: RwLock<HashMap<String, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(self, identity: impl Into<String>, secret: impl Into<String>) -> Self {
        self.secrets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(identity.into(), secret.into());
        self
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn read_secret(&self, identity: &str) -> Option<String> {
        self.secrets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(identity)
            .cloned()
    }

    async fn write_secret(&self, identity: &str, value: &str) -> bool {
        self.secrets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(identity.to_string(), value.to_string());
        true
    }

    async fn remove_secret(&self, identity: &str) -> bool {
        self.secrets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(identity)
            .is_some()
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_read_remove() {
        let store = MemorySecretStore::new();
        assert_eq!(store.read_secret("c1").await, None);
        assert!(store.write_secret("c1", "s3cret").await);
        assert_eq!(store.read_secret("c1").await.as_deref(), Some("s3cret"));
        assert!(store.remove_secret("c1").await);
        assert!(!store.remove_secret("c1").await);
        assert_eq!(store.read_secret("c1").await, None);
    }

    #[tokio::test]
    async fn seeded_secrets_are_readable() {
        let store = MemorySecretStore::new().with_secret("c2", "k");
        assert_eq!(store.read_secret("c2").await.as_deref(), Some("k"));
    }
}
