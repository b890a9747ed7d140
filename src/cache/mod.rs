//! Memoizing cache with a durable JSON document behind it
//!
//! Expensive, idempotent calls are wrapped with [`wrap`]. Each call derives a
//! [`CacheKey`] from the operation name and its arguments, consults the shared
//! [`MemoCache`], and only runs the operation on a miss. New results are
//! written back to a single JSON document by [`JsonFileStore`], so they survive
//! process restarts.
//!
//! There is no expiry: an entry stays valid until the document is cleared.
//! Several processes may share one document. Writes are atomic, but a process
//! holding a stale view will drop entries another process added in between.

mod error;
mod key;
mod memo;
mod store;
mod wrap;

pub use error::CacheError;
pub use key::{CacheKey, KeyArg, KeyArgs};
pub use memo::{MemoCache, StorePolicy};
pub use store::{Entries, JsonFileStore};
pub use wrap::{wrap, Memoized};
