//! # backend-gateway
//!
//! 客户端请求网关：所有发往后端的调用都经过这里。
//!
//! Client-side request gateway. Every outbound call to the remote backend passes
//! through a single [`Gateway`], which decides per call whether to skip the
//! network, whether to join an identical call already in flight, how to sign
//! it, and how to normalize the reply.
//!
//! ## Overview
//!
//! - **Coalescing**: concurrent calls with the same operation and payload share
//!   one network round trip and resolve to the same outcome
//! - **Short-lived caching**: successful read-only results are reused for a
//!   5 second freshness window
//! - **Request signing**: HMAC-SHA256 over `"<identity>:<timestamp>"` with the
//!   identity's local secret, falling back to unsigned calls when signing is
//!   not possible
//! - **Normalized responses**: every reply becomes a [`GatewayResponse`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use backend_gateway::{Gateway, Identity, Operation};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> backend_gateway::Result<()> {
//!     let gateway = Gateway::builder()
//!         .endpoint("https://backend.example.com/exec")
//!         .build()?;
//!
//!     let queue = gateway
//!         .call(
//!             &Operation::read("GET_QUEUE"),
//!             json!({ "id": "abc" }),
//!             &Identity::client("client-1"),
//!         )
//!         .await?;
//!     println!("{:?}", queue.data);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | The [`Gateway`] dispatcher and its builders |
//! | [`cache`] | Response cache with lazy expiry |
//! | [`coalesce`] | In-flight call coalescing |
//! | [`signer`] | HMAC request signing |
//! | [`secrets`] | Per-identity secret storage |
//! | [`transport`] | Network transport |
//! | [`types`] | Operations, identities, envelopes, responses |
//! | [`config`] | Configuration loading |

pub mod cache;
pub mod client;
pub mod coalesce;
pub mod config;
pub mod secrets;
pub mod signer;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use client::{CallBuilder, Gateway, GatewayBuilder, SignalsSnapshot};
pub use config::GatewayConfig;
pub use signer::{Signature, UnsignedReason};
pub use types::{Envelope, GatewayResponse, Identity, Operation, OperationKind};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
