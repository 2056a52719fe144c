use crate::cache::{CacheConfig, CacheStore};
use crate::client::core::Gateway;
use crate::coalesce::Coalescer;
use crate::config::GatewayConfig;
use crate::secrets::{KeyringSecretStore, SecretStore};
use crate::signer::RequestSigner;
use crate::transport::{HttpTransport, Transport};
use crate::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Builder for [`Gateway`].
///
/// Starts from [`GatewayConfig::from_env`]; explicit setters win over both the
/// environment and a loaded config file, whichever order they are called in.
pub struct GatewayBuilder {
    config: GatewayConfig,
    overrides: Overrides,
    transport: Option<Arc<dyn Transport>>,
    secrets: Option<Arc<dyn SecretStore>>,
}

/// Values set through builder methods, applied on top of the config in `build`.
#[derive(Debug, Clone, Default)]
struct Overrides {
    endpoint: Option<String>,
    timeout_secs: Option<u64>,
    proxy_url: Option<String>,
    freshness_window_ms: Option<u64>,
    cache_enabled: Option<bool>,
    keyring_service: Option<String>,
    registration_operation: Option<String>,
}

impl Overrides {
    fn apply(self, config: &mut GatewayConfig) {
        if let Some(v) = self.endpoint {
            config.endpoint = Some(v);
        }
        if let Some(v) = self.timeout_secs {
            config.timeout_secs = v;
        }
        if let Some(v) = self.proxy_url {
            config.proxy_url = Some(v);
        }
        if let Some(v) = self.freshness_window_ms {
            config.freshness_window_ms = v;
        }
        if let Some(v) = self.cache_enabled {
            config.cache_enabled = v;
        }
        if let Some(v) = self.keyring_service {
            config.keyring_service = v;
        }
        if let Some(v) = self.registration_operation {
            config.registration_operation = v;
        }
    }
}

impl GatewayBuilder {
    pub fn new() -> Self {
        Self {
            config: GatewayConfig::from_env(),
            overrides: Overrides::default(),
            transport: None,
            secrets: None,
        }
    }

    /// Replace the base configuration. Setter values still apply on top.
    pub fn config(mut self, config: GatewayConfig) -> Self {
        self.config = config;
        self
    }

    /// Load a YAML config file as the base, then re-apply environment overrides.
    pub fn config_file(mut self, path: impl AsRef<Path>) -> Result<Self> {
        let mut config = GatewayConfig::from_yaml_file(path)?;
        config.apply_env();
        self.config = config;
        Ok(self)
    }

    /// Backend URL for the default HTTP transport.
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.overrides.endpoint = Some(url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.overrides.timeout_secs = Some(timeout.as_secs().max(1));
        self
    }

    pub fn proxy_url(mut self, url: impl Into<String>) -> Self {
        self.overrides.proxy_url = Some(url.into());
        self
    }

    pub fn freshness_window(mut self, window: Duration) -> Self {
        self.overrides.freshness_window_ms = Some(window.as_millis() as u64);
        self
    }

    pub fn cache_enabled(mut self, enabled: bool) -> Self {
        self.overrides.cache_enabled = Some(enabled);
        self
    }

    pub fn keyring_service(mut self, service: impl Into<String>) -> Self {
        self.overrides.keyring_service = Some(service.into());
        self
    }

    /// Name of the identity-registration operation, which is never signed.
    pub fn registration_operation(mut self, name: impl Into<String>) -> Self {
        self.overrides.registration_operation = Some(name.into());
        self
    }

    /// Use a custom transport instead of HTTP (the endpoint is then unused).
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use a custom secret store instead of the platform keychain.
    pub fn secret_store(mut self, secrets: Arc<dyn SecretStore>) -> Self {
        self.secrets = Some(secrets);
        self
    }

    /// The configuration `build` will use, with setter values applied.
    pub fn resolved_config(&self) -> GatewayConfig {
        let mut config = self.config.clone();
        self.overrides.clone().apply(&mut config);
        config
    }

    pub fn build(self) -> Result<Gateway> {
        let mut config = self.config;
        self.overrides.apply(&mut config);

        let transport: Arc<dyn Transport> = match self.transport {
            Some(t) => t,
            None => Arc::new(HttpTransport::new(&config)?),
        };
        let secrets: Arc<dyn SecretStore> = match self.secrets {
            Some(s) => s,
            None => Arc::new(KeyringSecretStore::new(config.keyring_service.clone())),
        };

        let cache = CacheStore::new(
            CacheConfig::new()
                .with_enabled(config.cache_enabled)
                .with_freshness_window(config.freshness_window()),
        );
        let signer = RequestSigner::new(Arc::clone(&secrets))
            .with_registration_operation(config.registration_operation.clone());

        debug!(
            transport = transport.name(),
            secrets = secrets.name(),
            cache_enabled = config.cache_enabled,
            freshness_ms = config.freshness_window_ms,
            "gateway built"
        );

        Ok(Gateway {
            transport,
            cache: Arc::new(cache),
            coalescer: Coalescer::new(),
            signer: Arc::new(signer),
            secrets,
        })
    }
}

impl Default for GatewayBuilder {
    fn default() -> Self {
        Self::new()
    }
}
