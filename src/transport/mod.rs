//! 传输层：把信封发送到后端并取回 JSON。
//!
//! The dispatcher only needs one capability from the network: send an
//! [`Envelope`] and get back a decoded JSON body. [`HttpTransport`] does that
//! over reqwest; tests substitute in-process implementations.

mod http;

pub use http::{HttpTransport, TransportError};

use crate::types::Envelope;
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Transport: Send + Sync {
    /// One round trip. `request_id` is a per-call correlation id.
    async fn send(&self, envelope: &Envelope, request_id: &str) -> Result<serde_json::Value>;

    fn name(&self) -> &'static str;
}
