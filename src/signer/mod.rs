//! 请求签名模块：用身份密钥对 "<identity>:<timestamp>" 计算 HMAC-SHA256。
//!
//! # Request Signer
//!
//! Signing is fail-open: when a call cannot be signed the signer says why and
//! the call goes out with an empty signature. The backend decides whether an
//! unsigned call is acceptable.

use crate::secrets::SecretStore;
use crate::types::{Identity, Operation};
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

type HmacSha256 = Hmac<Sha256>;

/// Operation that registers a new identity and therefore has no secret yet.
pub const DEFAULT_REGISTRATION_OPERATION: &str = "REGISTER_CLIENT";

/// Outcome of a signing attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signature {
    Signed(String),
    Unsigned(UnsignedReason),
}

impl Signature {
    /// Value placed in the envelope's `signature` field.
    pub fn as_wire(&self) -> &str {
        match self {
            Signature::Signed(tag) => tag,
            Signature::Unsigned(_) => "",
        }
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, Signature::Signed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsignedReason {
    RegistrationOperation,
    AdminIdentity,
    AnonymousIdentity,
    NoSecret,
    /// The MAC could not be keyed with the stored secret.
    MacUnavailable(String),
}

impl fmt::Display for UnsignedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnsignedReason::RegistrationOperation => f.write_str("registration operation"),
            UnsignedReason::AdminIdentity => f.write_str("admin identity"),
            UnsignedReason::AnonymousIdentity => f.write_str("anonymous identity"),
            UnsignedReason::NoSecret => f.write_str("no secret for identity"),
            UnsignedReason::MacUnavailable(e) => write!(f, "mac unavailable: {e}"),
        }
    }
}

/// Base64 HMAC-SHA256 tag over `"<identity>:<timestamp_ms>"`.
pub fn compute_tag(
    secret: &str,
    identity: &str,
    timestamp_ms: u64,
) -> std::result::Result<String, hmac::digest::InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())?;
    mac.update(format!("{identity}:{timestamp_ms}").as_bytes());
    Ok(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

pub struct RequestSigner {
    secrets: Arc<dyn SecretStore>,
    registration_operation: String,
}

impl RequestSigner {
    pub fn new(secrets: Arc<dyn SecretStore>) -> Self {
        Self {
            secrets,
            registration_operation: DEFAULT_REGISTRATION_OPERATION.to_string(),
        }
    }

    pub fn with_registration_operation(mut self, name: impl Into<String>) -> Self {
        self.registration_operation = name.into();
        self
    }

    pub fn registration_operation(&self) -> &str {
        &self.registration_operation
    }

    /// Sign a call. Never fails; see [`UnsignedReason`] for the degraded cases.
    pub async fn sign(
        &self,
        operation: &Operation,
        identity: &Identity,
        timestamp_ms: u64,
    ) -> Signature {
        if operation.name() == self.registration_operation {
            return Signature::Unsigned(UnsignedReason::RegistrationOperation);
        }
        let id = match identity {
            Identity::Admin => return Signature::Unsigned(UnsignedReason::AdminIdentity),
            Identity::Anonymous => return Signature::Unsigned(UnsignedReason::AnonymousIdentity),
            Identity::Client(id) => id,
        };

        let Some(secret) = self.secrets.read_secret(id).await else {
            debug!(identity = %id, store = self.secrets.name(), "sending unsigned: no secret");
            return Signature::Unsigned(UnsignedReason::NoSecret);
        };

        match compute_tag(&secret, id, timestamp_ms) {
            Ok(tag) => Signature::Signed(tag),
            Err(e) => {
                warn!(identity = %id, error = %e, "sending unsigned: mac unavailable");
                Signature::Unsigned(UnsignedReason::MacUnavailable(e.to_string()))
            }
        }
    }
}
