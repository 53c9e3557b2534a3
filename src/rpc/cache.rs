//! Collapses concurrent identical cacheable calls into one shared pending
//! result. Entries outlive their resolution and leave only under LRU pressure.

use crate::rpc::error::ProviderError;
use futures::future::{BoxFuture, Shared};
use lru::LruCache;
use serde_json::Value;
use std::num::NonZeroUsize;
use std::sync::Mutex;

pub const DEFAULT_CACHE_CAPACITY: usize = 64;

/// A call result that any number of callers can await.
pub type PendingCall = Shared<BoxFuture<'static, Result<Value, ProviderError>>>;

pub struct CallCache {
    entries: Mutex<LruCache<String, PendingCall>>,
}

impl CallCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Returns the pending call for `key`, promoting it to most recently used.
    pub fn get(&self, key: &str) -> Option<PendingCall> {
        self.entries
            .lock()
            .expect("call cache mutex poisoned")
            .get(key)
            .cloned()
    }

    pub fn set(&self, key: String, call: PendingCall) {
        self.entries
            .lock()
            .expect("call cache mutex poisoned")
            .put(key, call);
    }

    /// Looks up `key` and, on a miss, inserts the call produced by `make`
    /// under the same lock. The flag reports whether the entry already existed.
    pub fn get_or_insert_with<F>(&self, key: &str, make: F) -> (PendingCall, bool)
    where
        F: FnOnce() -> PendingCall,
    {
        let mut entries = self.entries.lock().expect("call cache mutex poisoned");
        if let Some(existing) = entries.get(key) {
            return (existing.clone(), true);
        }
        let call = make();
        entries.put(key.to_owned(), call.clone());
        (call, false)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("call cache mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CallCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
