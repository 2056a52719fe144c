use super::SecretStore;
use async_trait::async_trait;
use keyring::Entry;
use tracing::{debug, warn};

pub const DEFAULT_KEYRING_SERVICE: &str = "backend-gateway";

/// Secrets kept in the platform keychain, one entry per identity.
#[derive(Debug, Clone)]
pub struct KeyringSecretStore {
    service: String,
}

impl KeyringSecretStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }
}

impl Default for KeyringSecretStore {
    fn default() -> Self {
        Self::new(DEFAULT_KEYRING_SERVICE)
    }
}

// Keychain calls block, so each one runs on the blocking pool.
async fn with_entry<R, F>(service: &str, identity: &str, f: F) -> Option<R>
where
    F: FnOnce(Entry) -> Option<R> + Send + 'static,
    R: Send + 'static,
{
    let service = service.to_string();
    let identity = identity.to_string();
    tokio::task::spawn_blocking(move || {
        let entry = Entry::new(&service, &identity).ok()?;
        f(entry)
    })
    .await
    .ok()
    .flatten()
}

#[async_trait]
impl SecretStore for KeyringSecretStore {
    async fn read_secret(&self, identity: &str) -> Option<String> {
        let secret = with_entry(&self.service, identity, |entry| entry.get_password().ok()).await;
        if secret.is_none() {
            debug!(identity, service = %self.service, "no secret in keychain");
        }
        secret
    }

    async fn write_secret(&self, identity: &str, value: &str) -> bool {
        let value = value.to_string();
        let written = with_entry(&self.service, identity, move |entry| {
            entry.set_password(&value).ok()
        })
        .await
        .is_some();
        if !written {
            warn!(identity, service = %self.service, "failed to store secret in keychain");
        }
        written
    }

    async fn remove_secret(&self, identity: &str) -> bool {
        with_entry(&self.service, identity, |entry| entry.delete_password().ok())
            .await
            .is_some()
    }

    fn name(&self) -> &'static str {
        "keyring"
    }
}
