use super::Transport;
use crate::config::GatewayConfig;
use crate::types::Envelope;
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use reqwest::Proxy;
use std::sync::Arc;
use std::time::Duration;

/// Header carrying the per-call correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: url::Url,
}

impl HttpTransport {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let endpoint = config.endpoint_url()?;

        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout())
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(Some(Duration::from_secs(90)));

        if let Some(proxy_url) = &config.proxy_url {
            let proxy = Proxy::all(proxy_url).map_err(|e| {
                Error::configuration_with_context(
                    format!("invalid proxy url: {e}"),
                    ErrorContext::new()
                        .with_field_path("proxy_url")
                        .with_source("http_transport"),
                )
            })?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &url::Url {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, envelope: &Envelope, request_id: &str) -> Result<serde_json::Value> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(REQUEST_ID_HEADER, request_id)
            .json(envelope)
            .send()
            .await
            .map_err(TransportError::from)?;

        let status = response.status();
        let body = response.text().await.map_err(TransportError::from)?;

        match serde_json::from_str::<serde_json::Value>(&body) {
            // A JSON body is the backend's envelope even on an error status.
            Ok(json) => Ok(json),
            Err(_) if !status.is_success() => Err(Error::Remote {
                status: status.as_u16(),
                body: body.chars().take(512).collect(),
            }),
            Err(e) => Err(Error::decode_with_context(
                format!("backend body is not JSON: {e}"),
                ErrorContext::new()
                    .with_field_path("response.body")
                    .with_details(body.chars().take(200).collect::<String>())
                    .with_source("http_transport"),
            )),
        }
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(Arc<reqwest::Error>),

    #[error("Transport error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        TransportError::Http(Arc::new(e))
    }
}
