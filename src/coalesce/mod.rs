//! 并发合并模块：同一键的并发调用共享一次网络请求。
//!
//! # In-Flight Coalescer
//!
//! Collapses concurrent calls with the same key into one underlying operation.
//! Every caller that joins receives a clone of the same outcome, success or
//! failure. The entry is removed as soon as the operation settles, so the next
//! call for that key always starts fresh.

use crate::Result;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Handle to an in-flight call. Cloning it is cheap; every clone resolves to the same value.
pub type SharedCall<T> = Shared<BoxFuture<'static, Result<T>>>;

type Table<T> = Arc<Mutex<HashMap<String, Pending<T>>>>;

struct Pending<T: Clone> {
    generation: u64,
    call: SharedCall<T>,
}

/// Keyed table of outstanding operations.
pub struct Coalescer<T: Clone> {
    table: Table<T>,
    next_generation: AtomicU64,
}

impl<T> Coalescer<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            table: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
        }
    }

    /// The call currently in flight for `key`, if any.
    pub fn pending(&self, key: &str) -> Option<SharedCall<T>> {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map(|p| p.call.clone())
    }

    /// Join the call in flight for `key`, or start `operation` and register it.
    ///
    /// `operation` is only invoked when nothing is registered for `key`. The
    /// entry is inserted after the future has been built, so a panic while
    /// building it leaves the table untouched.
    pub fn begin<F, Fut>(&self, key: &str, operation: F) -> SharedCall<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = table.get(key) {
            debug!(key, "joining in-flight call");
            return existing.call.clone();
        }

        let fut = operation();
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let guard = SettleGuard {
            table: Arc::clone(&self.table),
            key: key.to_string(),
            generation,
        };
        let call = async move {
            let _guard = guard;
            fut.await
        }
        .boxed()
        .shared();

        table.insert(
            key.to_string(),
            Pending {
                generation,
                call: call.clone(),
            },
        );
        call
    }

    /// Number of keys with a call in flight.
    pub fn inflight(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl<T> Default for Coalescer<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Removes the pending entry when the wrapped operation settles or is dropped.
struct SettleGuard<T: Clone> {
    table: Table<T>,
    key: String,
    generation: u64,
}

impl<T: Clone> Drop for SettleGuard<T> {
    fn drop(&mut self) {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        if table
            .get(&self.key)
            .is_some_and(|p| p.generation == self.generation)
        {
            table.remove(&self.key);
        }
    }
}
