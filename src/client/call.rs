use crate::types::{GatewayResponse, Identity, Operation};
use crate::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::core::Gateway;

/// Builder for a single gateway call.
pub struct CallBuilder<'a> {
    pub(crate) gateway: &'a Gateway,
    pub(crate) operation: Operation,
    pub(crate) payload: Value,
    pub(crate) identity: Identity,
}

impl<'a> CallBuilder<'a> {
    pub(crate) fn new(gateway: &'a Gateway, operation: Operation) -> Self {
        Self {
            gateway,
            operation,
            payload: Value::Null,
            identity: Identity::Anonymous,
        }
    }

    /// Set the payload object.
    pub fn payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// Serialize a typed payload.
    pub fn payload_from<T: Serialize>(mut self, payload: &T) -> Result<Self> {
        self.payload = serde_json::to_value(payload)?;
        Ok(self)
    }

    /// Call on behalf of `identity`. Defaults to the anonymous identity.
    pub fn identity(mut self, identity: impl Into<Identity>) -> Self {
        self.identity = identity.into();
        self
    }

    /// Execute and return the normalized response, whatever its status.
    pub async fn send(self) -> Result<GatewayResponse> {
        self.gateway
            .call(&self.operation, self.payload, &self.identity)
            .await
    }

    /// Execute and decode `data`; a non-success status becomes an error.
    pub async fn fetch<T: DeserializeOwned>(self) -> Result<T> {
        self.send().await?.into_data()
    }
}
