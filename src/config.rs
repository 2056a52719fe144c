//! Gateway configuration: defaults, optional YAML file, then environment overrides.

use crate::cache::DEFAULT_FRESHNESS_WINDOW;
use crate::secrets::DEFAULT_KEYRING_SERVICE;
use crate::signer::DEFAULT_REGISTRATION_OPERATION;
use crate::{Error, ErrorContext, Result};
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Backend URL every envelope is POSTed to.
    pub endpoint: Option<String>,
    pub timeout_secs: u64,
    pub proxy_url: Option<String>,
    /// Idle connections kept per host by the HTTP transport.
    pub pool_max_idle_per_host: usize,
    pub freshness_window_ms: u64,
    pub cache_enabled: bool,
    pub keyring_service: String,
    pub registration_operation: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: 30,
            proxy_url: None,
            pool_max_idle_per_host: 8,
            freshness_window_ms: DEFAULT_FRESHNESS_WINDOW.as_millis() as u64,
            cache_enabled: true,
            keyring_service: DEFAULT_KEYRING_SERVICE.to_string(),
            registration_operation: DEFAULT_REGISTRATION_OPERATION.to_string(),
        }
    }
}

impl GatewayConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_env();
        cfg
    }

    /// Load a YAML file; fields it omits keep their defaults.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text).map_err(|e| match e {
            Error::Configuration { message, context } => Error::Configuration {
                message,
                context: context.with_field_path(path.display().to_string()),
            },
            other => other,
        })
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid gateway config: {e}"),
                ErrorContext::new().with_source("gateway_config"),
            )
        })
    }

    /// Override fields from `GATEWAY_*` environment variables.
    ///
    /// Unparseable values are ignored rather than rejected.
    pub fn apply_env(&mut self) {
        self.apply_vars(|name| env::var(name).ok());
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("GATEWAY_ENDPOINT").filter(|s| !s.trim().is_empty()) {
            self.endpoint = Some(v);
        }
        if let Some(v) = var("GATEWAY_HTTP_TIMEOUT_SECS").and_then(|s| s.parse::<u64>().ok()) {
            self.timeout_secs = v;
        }
        if let Some(v) = var("GATEWAY_PROXY_URL").filter(|s| !s.trim().is_empty()) {
            self.proxy_url = Some(v);
        }
        if let Some(v) = var("GATEWAY_HTTP_POOL_MAX_IDLE_PER_HOST")
            .and_then(|s| s.parse::<usize>().ok())
        {
            self.pool_max_idle_per_host = v;
        }
        if let Some(v) = var("GATEWAY_FRESHNESS_MS").and_then(|s| s.parse::<u64>().ok()) {
            self.freshness_window_ms = v;
        }
        if let Some(v) = var("GATEWAY_CACHE_ENABLED").and_then(|s| parse_bool(&s)) {
            self.cache_enabled = v;
        }
        if let Some(v) = var("GATEWAY_KEYRING_SERVICE").filter(|s| !s.trim().is_empty()) {
            self.keyring_service = v;
        }
    }

    pub fn freshness_window(&self) -> Duration {
        Duration::from_millis(self.freshness_window_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// The endpoint, parsed. Missing or non-http(s) endpoints are configuration errors.
    pub fn endpoint_url(&self) -> Result<url::Url> {
        let raw = self.endpoint.as_deref().ok_or_else(|| {
            Error::configuration_with_context(
                "no backend endpoint configured",
                ErrorContext::new()
                    .with_field_path("endpoint")
                    .with_details("set GATEWAY_ENDPOINT or GatewayBuilder::endpoint")
                    .with_source("gateway_config"),
            )
        })?;
        let url = url::Url::parse(raw).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid endpoint: {e}"),
                ErrorContext::new()
                    .with_field_path("endpoint")
                    .with_details(raw.to_string())
                    .with_source("gateway_config"),
            )
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(Error::configuration_with_context(
                format!("unsupported endpoint scheme: {}", url.scheme()),
                ErrorContext::new()
                    .with_field_path("endpoint")
                    .with_source("gateway_config"),
            ));
        }
        Ok(url)
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
