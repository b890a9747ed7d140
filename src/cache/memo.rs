//! Process-wide memo cache backed by a [`JsonFileStore`]
//!
//! The cache starts uninitialized and hydrates itself from the store on first
//! use. Every miss inserts one entry and rewrites the whole document.
//!
//! A single mutex guards hydration, lookups, inserts and saves. The compute
//! closure for a miss runs outside the lock, so a slow call never blocks other
//! lookups. Two callers racing on the same missing key both compute; the last
//! one to persist wins.
//!
//! Saves happen under the lock and block the calling thread, async callers
//! included.

use std::future::Future;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use super::store::{Entries, JsonFileStore};
use super::{CacheError, CacheKey};

/// What to do when the cache document exists but cannot be parsed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StorePolicy {
    /// Log a warning and start from an empty cache; the next miss overwrites the document
    #[default]
    Lenient,
    /// Surface `CacheError::MalformedStore` to the caller
    Strict,
}

/// In-memory view of the cache document
///
/// Share it between operations with an `Arc`. `None` inside the mutex means the
/// document has not been loaded yet.
#[derive(Debug)]
pub struct MemoCache {
    store: JsonFileStore,
    policy: StorePolicy,
    entries: Mutex<Option<Entries>>,
}

impl MemoCache {
    /// Creates an unloaded cache over `store`
    pub fn new(store: JsonFileStore) -> Self {
        Self {
            store,
            policy: StorePolicy::default(),
            entries: Mutex::new(None),
        }
    }

    /// Creates an unloaded cache over the document at `path`
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self::new(JsonFileStore::new(path.as_ref()))
    }

    /// Sets the malformed-document policy
    pub fn with_policy(mut self, policy: StorePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the backing store
    pub fn store(&self) -> &JsonFileStore {
        &self.store
    }

    /// Looks up a key, hydrating from the store on first use
    pub fn get(&self, key: &CacheKey) -> Result<Option<Value>, CacheError> {
        let mut guard = self.lock();
        let entries = self.loaded(&mut guard)?;
        Ok(entries.get(key.as_str()).cloned())
    }

    /// Returns whether a key is cached
    pub fn contains(&self, key: &CacheKey) -> Result<bool, CacheError> {
        let mut guard = self.lock();
        Ok(self.loaded(&mut guard)?.contains_key(key.as_str()))
    }

    /// Number of cached entries
    pub fn len(&self) -> Result<usize, CacheError> {
        let mut guard = self.lock();
        Ok(self.loaded(&mut guard)?.len())
    }

    /// Returns whether the cache holds no entries
    pub fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len()? == 0)
    }

    /// Stores `value` under `key` and persists the whole mapping
    ///
    /// If the write fails the in-memory mapping is restored, so the cache
    /// never reports an entry the document does not hold.
    pub fn insert(&self, key: CacheKey, value: Value) -> Result<(), CacheError> {
        let mut guard = self.lock();
        let entries = self.loaded(&mut guard)?;

        let raw_key = key.as_str().to_string();
        let previous = entries.insert(raw_key.clone(), value);

        if let Err(e) = self.store.save(entries) {
            match previous {
                Some(old) => entries.insert(raw_key, old),
                None => entries.remove(&raw_key),
            };
            return Err(e);
        }

        tracing::info!(
            key = %key,
            entries = entries.len(),
            path = %self.store.path().display(),
            "Cache document written"
        );
        Ok(())
    }

    /// Returns the cached result for `key`, or computes, stores and returns it
    ///
    /// `compute` is not called on a hit. When it fails, nothing is stored and
    /// its error is returned unchanged. Cache failures are converted into the
    /// caller's error type.
    pub fn get_or_compute<T, E, F>(&self, key: &CacheKey, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(value) = self.get(key)? {
            tracing::debug!(key = %key, "Cache hit");
            return Ok(decode(key, value)?);
        }

        tracing::debug!(key = %key, "Cache miss");
        let result = compute()?;
        self.insert(key.clone(), encode(key, &result)?)?;
        Ok(result)
    }

    /// Async counterpart of [`get_or_compute`](Self::get_or_compute)
    ///
    /// The lock is never held across the `.await` on `compute`.
    pub async fn get_or_compute_async<T, E, F, Fut>(
        &self,
        key: &CacheKey,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.get(key)? {
            tracing::debug!(key = %key, "Cache hit");
            return Ok(decode(key, value)?);
        }

        tracing::debug!(key = %key, "Cache miss");
        let result = compute().await?;
        self.insert(key.clone(), encode(key, &result)?)?;
        Ok(result)
    }

    fn lock(&self) -> MutexGuard<'_, Option<Entries>> {
        // Entries are only mutated under the lock and never left half-updated
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hydrates the mapping on first use and returns it
    fn loaded<'g>(&self, slot: &'g mut Option<Entries>) -> Result<&'g mut Entries, CacheError> {
        if slot.is_none() {
            *slot = Some(self.hydrate()?);
        }
        Ok(slot.get_or_insert_with(Entries::new))
    }

    fn hydrate(&self) -> Result<Entries, CacheError> {
        match self.store.load() {
            Ok(entries) => {
                tracing::debug!(
                    entries = entries.len(),
                    path = %self.store.path().display(),
                    "Cache loaded"
                );
                Ok(entries)
            }
            Err(CacheError::MalformedStore { path, source })
                if self.policy == StorePolicy::Lenient =>
            {
                tracing::warn!(
                    path = %path.display(),
                    error = %source,
                    "Ignoring malformed cache document, starting with an empty cache"
                );
                Ok(Entries::new())
            }
            Err(e) => Err(e),
        }
    }
}

fn encode<T: Serialize>(key: &CacheKey, result: &T) -> Result<Value, CacheError> {
    serde_json::to_value(result).map_err(|source| CacheError::EntryType {
        key: key.to_string(),
        source,
    })
}

fn decode<T: DeserializeOwned>(key: &CacheKey, value: Value) -> Result<T, CacheError> {
    serde_json::from_value(value).map_err(|source| CacheError::EntryType {
        key: key.to_string(),
        source,
    })
}
