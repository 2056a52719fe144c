//! 响应缓存模块：短时缓存只读调用的成功结果。
//!
//! # Response Cache
//!
//! Successful results of read-style operations are kept for a short freshness
//! window (5 seconds by default) so that bursts of identical queries, such as a
//! screen refreshing the same queue several times, resolve locally.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`CacheStore`] | Keyed table with lazy expiry and counters |
//! | [`CacheConfig`] | Enable flag and freshness window |
//! | [`CacheKey`] | Deterministic key derived from operation and payload |
//! | [`CacheStats`] | Hit / miss / store / invalidation counters |
//!
//! Mutating operations never read from or write to the store; the dispatcher
//! enforces that, not the store.

mod key;
mod stats;
mod store;

pub use key::CacheKey;
pub use stats::CacheStats;
pub use store::{CacheConfig, CacheEntry, CacheStore, DEFAULT_FRESHNESS_WINDOW};
