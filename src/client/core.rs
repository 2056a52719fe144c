use crate::cache::{CacheKey, CacheStore};
use crate::coalesce::Coalescer;
use crate::secrets::SecretStore;
use crate::signer::RequestSigner;
use crate::transport::Transport;
use crate::types::{Envelope, GatewayResponse, Identity, Operation};
use crate::{Error, ErrorContext, Result};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::call::CallBuilder;
use super::signals::SignalsSnapshot;

/// The single chokepoint for outbound backend calls.
///
/// Owns its response cache and in-flight table; build one per process and
/// share it by reference (or `Arc`).
pub struct Gateway {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) cache: Arc<CacheStore>,
    pub(crate) coalescer: Coalescer<GatewayResponse>,
    pub(crate) signer: Arc<RequestSigner>,
    pub(crate) secrets: Arc<dyn SecretStore>,
}

impl Gateway {
    pub fn builder() -> super::GatewayBuilder {
        super::GatewayBuilder::new()
    }

    /// Start a call with the builder API.
    pub fn request(&self, operation: Operation) -> CallBuilder<'_> {
        CallBuilder::new(self, operation)
    }

    /// Dispatch one call.
    ///
    /// Order of checks: a call already in flight for the same key is joined;
    /// otherwise a read-only call with a fresh cached result returns it;
    /// otherwise the call is registered, signed and sent.
    pub async fn call(
        &self,
        operation: &Operation,
        payload: Value,
        identity: &Identity,
    ) -> Result<GatewayResponse> {
        let payload = normalize_payload(payload)?;
        let key = CacheKey::for_call(operation.name(), &payload);

        if let Some(pending) = self.coalescer.pending(key.as_str()) {
            debug!(operation = %operation, "coalesced onto in-flight call");
            return pending.await;
        }

        if operation.is_read_only() {
            if let Some(entry) = self.cache.get(&key) {
                debug!(operation = %operation, "served from cache");
                return Ok(entry.result);
            }
        }

        let transport = Arc::clone(&self.transport);
        let cache = Arc::clone(&self.cache);
        let signer = Arc::clone(&self.signer);
        let operation = operation.clone();
        let identity = identity.clone();
        let slot = key.hash.clone();
        let call = self.coalescer.begin(&slot, move || {
            dispatch(transport, cache, signer, key, operation, payload, identity)
        });
        call.await
    }

    /// Persist the secret issued to `identity`, e.g. after registration.
    pub async fn store_secret(&self, identity: &Identity, secret: &str) -> Result<()> {
        let Identity::Client(id) = identity else {
            return Err(Error::validation_with_context(
                "reserved identities have no secret",
                ErrorContext::new()
                    .with_field_path("identity")
                    .with_details(identity.to_string()),
            ));
        };
        if self.secrets.write_secret(id, secret).await {
            Ok(())
        } else {
            Err(Error::runtime_with_context(
                "secret store refused the secret",
                ErrorContext::new().with_source(self.secrets.name()),
            ))
        }
    }

    /// Forget the secret for `identity`. Returns whether one was stored.
    pub async fn forget_secret(&self, identity: &Identity) -> bool {
        self.secrets.remove_secret(identity.as_str()).await
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Snapshot current runtime signals (facts only).
    pub fn signals(&self) -> SignalsSnapshot {
        SignalsSnapshot {
            inflight: self.coalescer.inflight(),
            cache: self.cache.stats(),
            cached_entries: self.cache.len(),
        }
    }
}

/// Steps run once per registered call: sign, send, normalize, cache.
async fn dispatch(
    transport: Arc<dyn Transport>,
    cache: Arc<CacheStore>,
    signer: Arc<RequestSigner>,
    key: CacheKey,
    operation: Operation,
    payload: Value,
    identity: Identity,
) -> Result<GatewayResponse> {
    let timestamp = now_millis();
    let signature = signer.sign(&operation, &identity, timestamp).await;
    if let crate::signer::Signature::Unsigned(reason) = &signature {
        debug!(operation = %operation, identity = %identity, %reason, "unsigned call");
    }

    let envelope = Envelope {
        operation: operation.name().to_string(),
        payload,
        timestamp,
        signature: signature.as_wire().to_string(),
    };
    let request_id = Uuid::new_v4().to_string();
    let start = Instant::now();

    let body = match transport.send(&envelope, &request_id).await {
        Ok(body) => body,
        Err(e) => {
            warn!(operation = %operation, request_id = %request_id, error = %e, "backend call failed");
            return Err(e);
        }
    };
    let response = GatewayResponse::from_json(body).map_err(|e| {
        warn!(operation = %operation, request_id = %request_id, error = %e, "undecodable backend response");
        e
    })?;

    info!(
        operation = %operation,
        request_id = %request_id,
        status = %response.status,
        signed = signature.is_signed(),
        transport = transport.name(),
        latency_ms = start.elapsed().as_millis() as u64,
        "backend call completed"
    );

    if operation.is_read_only() && response.is_success() {
        cache.put(&key, response.clone());
    }
    Ok(response)
}

fn normalize_payload(payload: Value) -> Result<Value> {
    match payload {
        Value::Null => Ok(Value::Object(Default::default())),
        Value::Object(_) => Ok(payload),
        other => Err(Error::validation_with_context(
            "payload must be a JSON object",
            ErrorContext::new()
                .with_field_path("payload")
                .with_details(other.to_string()),
        )),
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
