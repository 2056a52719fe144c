//! Operation naming and classification.

use std::fmt;

/// Prefix marking a query in the backend's naming convention.
const READ_PREFIX: &str = "GET_";

/// Substrings marking a state-changing operation.
const MUTATION_MARKERS: &[&str] = &["ADD", "MARK"];

/// Whether an operation may be served from and stored into the response cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    ReadOnly,
    Mutating,
}

impl OperationKind {
    /// Infer the kind from the backend naming convention.
    ///
    /// A `GET_` prefix means read-only unless a mutation marker also appears.
    /// Anything unrecognized is treated as mutating so it always reaches the backend.
    pub fn classify(name: &str) -> Self {
        let upper = name.to_ascii_uppercase();
        let mutating = MUTATION_MARKERS.iter().any(|m| upper.contains(m));
        if upper.starts_with(READ_PREFIX) && !mutating {
            OperationKind::ReadOnly
        } else {
            OperationKind::Mutating
        }
    }
}

/// A named remote action.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Operation {
    name: String,
    kind: OperationKind,
}

impl Operation {
    pub fn new(name: impl Into<String>, kind: OperationKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// A cacheable query.
    pub fn read(name: impl Into<String>) -> Self {
        Self::new(name, OperationKind::ReadOnly)
    }

    /// A state-changing call that always hits the network.
    pub fn mutating(name: impl Into<String>) -> Self {
        Self::new(name, OperationKind::Mutating)
    }

    /// Build an operation whose kind is inferred from its name.
    pub fn classify(name: impl Into<String>) -> Self {
        let name = name.into();
        let kind = OperationKind::classify(&name);
        Self { name, kind }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn is_read_only(&self) -> bool {
        self.kind == OperationKind::ReadOnly
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
