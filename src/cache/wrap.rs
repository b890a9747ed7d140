//! Memoizing wrapper for operations
//!
//! [`wrap`] turns any deterministic operation into one that consults a shared
//! [`MemoCache`] first. The wrapper knows nothing about what the operation
//! does; it only derives a key from the operation identifier and arguments.

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};

use super::{CacheError, CacheKey, KeyArgs, MemoCache};

/// An operation whose results are memoized in a [`MemoCache`]
///
/// Arguments are passed as a single [`KeyArgs`] value, usually a tuple.
#[derive(Debug, Clone)]
pub struct Memoized<F> {
    operation: Cow<'static, str>,
    cache: Arc<MemoCache>,
    op: F,
}

/// Wraps `op` so that each distinct argument list is computed at most once
/// for the lifetime of the cache document
///
/// `operation` names the operation in cache keys and must stay stable across
/// releases, otherwise previously cached results are no longer found.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use usaspend::cache::{wrap, CacheError, MemoCache};
///
/// let cache = Arc::new(MemoCache::open("cache.json"));
/// let square = wrap("square", &cache, |(n,): (u64,)| Ok::<_, CacheError>(n * n));
/// assert_eq!(square.call((12,))?, 144);
/// # Ok::<(), CacheError>(())
/// ```
pub fn wrap<F>(operation: impl Into<Cow<'static, str>>, cache: &Arc<MemoCache>, op: F) -> Memoized<F> {
    Memoized {
        operation: operation.into(),
        cache: Arc::clone(cache),
        op,
    }
}

impl<F> Memoized<F> {
    /// Identifier used in cache keys
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Calls a synchronous operation through the cache
    pub fn call<A, T, E>(&self, args: A) -> Result<T, E>
    where
        F: Fn(A) -> Result<T, E>,
        A: KeyArgs,
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
    {
        let key = CacheKey::for_args(&self.operation, &args)?;
        self.cache.get_or_compute(&key, || (self.op)(args))
    }

    /// Turns a synchronous wrapper into a plain closure
    ///
    /// The closure can be passed anywhere the unwrapped operation was accepted.
    pub fn into_fn<A, T, E>(self) -> impl Fn(A) -> Result<T, E>
    where
        F: Fn(A) -> Result<T, E>,
        A: KeyArgs,
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
    {
        move |args| self.call(args)
    }

    /// Calls an asynchronous operation through the cache
    pub async fn call_async<A, T, E, Fut>(&self, args: A) -> Result<T, E>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        A: KeyArgs,
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
    {
        let key = CacheKey::for_args(&self.operation, &args)?;
        self.cache
            .get_or_compute_async(&key, || (self.op)(args))
            .await
    }
}
