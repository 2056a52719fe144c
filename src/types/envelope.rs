//! Wire envelope and normalized response.

use crate::{Error, ErrorContext, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Status value the backend uses for a successful call.
pub const STATUS_SUCCESS: &str = "success";

/// Body of every outbound call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub operation: String,
    pub payload: Value,
    /// Dispatch time, milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// Base64 HMAC tag, or empty when the call is unsigned.
    pub signature: String,
}

/// Backend response normalized into a reusable value.
///
/// Cache hits and coalesced callers receive clones of the same value, so
/// decoding `data` more than once is always safe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
    /// Any other top-level fields the backend returned.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GatewayResponse {
    /// Normalize a decoded backend body.
    ///
    /// The body must be an object carrying a string `status`; anything else is
    /// reported as [`Error::Decode`].
    pub fn from_json(body: Value) -> Result<Self> {
        if !body.is_object() {
            return Err(Error::decode_with_context(
                "backend response is not a JSON object",
                ErrorContext::new()
                    .with_field_path("response")
                    .with_details(truncate(&body.to_string(), 200)),
            ));
        }
        serde_json::from_value(body).map_err(|e| {
            Error::decode_with_context(
                "backend response is not a gateway envelope",
                ErrorContext::new()
                    .with_field_path("response.status")
                    .with_details(e.to_string()),
            )
        })
    }

    pub fn success(data: Value) -> Self {
        Self {
            status: STATUS_SUCCESS.to_string(),
            data: Some(data),
            message: None,
            count: None,
            extra: Map::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }

    /// Decode `data` into a caller type. Missing data decodes from `null`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        let data = self.data.clone().unwrap_or(Value::Null);
        serde_json::from_value(data).map_err(|e| {
            Error::decode_with_context(
                format!("cannot decode response data: {e}"),
                ErrorContext::new().with_field_path("response.data"),
            )
        })
    }

    /// Like [`decode`](Self::decode) but turns a non-success status into a
    /// [`Error::Runtime`] carrying the backend message.
    pub fn into_data<T: DeserializeOwned>(self) -> Result<T> {
        if !self.is_success() {
            return Err(Error::runtime_with_context(
                self.message
                    .clone()
                    .unwrap_or_else(|| format!("backend returned status {}", self.status)),
                ErrorContext::new()
                    .with_field_path("response.status")
                    .with_details(self.status.clone())
                    .with_source("backend"),
            ));
        }
        self.decode()
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}
