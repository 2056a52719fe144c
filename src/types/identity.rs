//! Caller identities.

use std::fmt;

/// Wire name of the public identity used by anonymous submission flows.
pub const PUBLIC_IDENTITY: &str = "public";

/// Wire name of the administrative identity.
pub const ADMIN_IDENTITY: &str = "admin";

/// Who is making a call. Only [`Identity::Client`] calls are ever signed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    Anonymous,
    Admin,
    Client(String),
}

impl Identity {
    pub fn client(id: impl Into<String>) -> Self {
        Identity::from(id.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Identity::Anonymous => PUBLIC_IDENTITY,
            Identity::Admin => ADMIN_IDENTITY,
            Identity::Client(id) => id,
        }
    }

    pub fn is_reserved(&self) -> bool {
        !matches!(self, Identity::Client(_))
    }
}

impl From<String> for Identity {
    fn from(s: String) -> Self {
        match s.as_str() {
            "" | PUBLIC_IDENTITY | "anonymous" => Identity::Anonymous,
            ADMIN_IDENTITY => Identity::Admin,
            _ => Identity::Client(s),
        }
    }
}

impl From<&str> for Identity {
    fn from(s: &str) -> Self {
        Identity::from(s.to_string())
    }
}

impl From<Identity> for String {
    fn from(id: Identity) -> Self {
        id.as_str().to_string()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
