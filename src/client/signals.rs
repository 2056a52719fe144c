use crate::cache::CacheStats;

/// A lightweight snapshot of gateway runtime state.
///
/// Facts only; applications decide what to do with them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalsSnapshot {
    /// Keys with a backend call in flight.
    pub inflight: usize,
    pub cache: CacheStats,
    /// Cache entries still inside the freshness window.
    pub cached_entries: usize,
}
