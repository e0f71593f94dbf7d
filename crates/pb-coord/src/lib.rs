//! In-process coordination primitives for the puppet bridge.
//!
//! Everything here is single-process and in-memory. There is no
//! cross-instance coordination.
//!
//! - [`KeyedLock`] -- per-key exclusion with broadcast wake-up and a self-release timeout
//! - [`TtlCache`] / [`TtlSet`] -- caches with per-entry expiry and a lazily armed sweep
//! - [`MessageDeduplicator`] -- recognises echoes of the bridge's own sends

pub mod cache;
pub mod config;
pub mod dedupe;
pub mod lock;

pub use cache::{CacheKey, TtlCache, TtlSet};
pub use config::CoordConfig;
pub use dedupe::MessageDeduplicator;
pub use lock::{KeyedLock, KeyedLockGuard, LockKey};
