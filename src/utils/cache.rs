//! Caching of extracted player functions

use crate::error::SigError;
use crate::platform::cipher::FunctionPair;
use moka::future::Cache;
use std::future::Future;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Extracted functions keyed by player script identifier.
///
/// Entries never expire: a player script URL names immutable content for the
/// lifetime of the process. Concurrent lookups of a missing key share a single
/// extraction; a failed extraction is handed to every waiter and is not stored.
#[derive(Clone)]
pub struct FunctionCache {
    entries: Cache<String, Arc<FunctionPair>>,
}

impl FunctionCache {
    /// Create an unbounded cache
    pub fn new() -> Self {
        Self {
            entries: Cache::builder().build(),
        }
    }

    /// Process-wide shared cache
    pub fn global() -> &'static FunctionCache {
        static GLOBAL: OnceLock<FunctionCache> = OnceLock::new();
        GLOBAL.get_or_init(FunctionCache::new)
    }

    /// Return the stored functions for `key`, running `extract` only on a miss.
    pub async fn get_or_extract<F, Fut>(
        &self,
        key: &str,
        extract: F,
    ) -> Result<Arc<FunctionPair>, SigError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<FunctionPair, SigError>>,
    {
        self.entries
            .try_get_with(key.to_string(), async move {
                debug!("Function cache miss for {}", key);
                extract().await.map(Arc::new)
            })
            .await
            .map_err(SigError::from_shared)
    }

    /// Get stored functions without extracting
    pub async fn get(&self, key: &str) -> Option<Arc<FunctionPair>> {
        self.entries.get(key).await
    }

    /// Store or overwrite functions for `key`
    pub async fn insert(&self, key: &str, functions: FunctionPair) {
        self.entries
            .insert(key.to_string(), Arc::new(functions))
            .await;
    }

    /// Drop the entry for `key`
    pub async fn invalidate(&self, key: &str) {
        self.entries.invalidate(key).await;
    }

    /// Drop every entry
    pub fn invalidate_all(&self) {
        self.entries.invalidate_all();
    }

    /// Number of stored scripts (after pending maintenance has run)
    pub async fn entry_count(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }
}

impl Default for FunctionCache {
    fn default() -> Self {
        Self::new()
    }
}
