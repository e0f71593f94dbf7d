use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::trace;

/// Bounds required of cache keys.
pub trait CacheKey: Clone + Eq + Hash + Send + 'static {}

impl<T: Clone + Eq + Hash + Send + 'static> CacheKey for T {}

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
    seq: u64,
}

struct Sweeper {
    at: Instant,
    task: JoinHandle<()>,
}

struct CacheState<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    /// Expiry index: `(expires_at, seq)` is unique per write.
    expiries: BTreeMap<(Instant, u64), K>,
    next_seq: u64,
    sweeper: Option<Sweeper>,
}

impl<K: CacheKey, V: Clone + Send + 'static> CacheState<K, V> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            expiries: BTreeMap::new(),
            next_seq: 0,
            sweeper: None,
        }
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        let entry = self.entries.remove(key)?;
        self.expiries.remove(&(entry.expires_at, entry.seq));
        Some(entry.value)
    }

    fn sweep(&mut self, now: Instant) -> usize {
        let mut removed = 0;
        while let Some((&(at, seq), _)) = self.expiries.first_key_value() {
            if at > now {
                break;
            }
            if let Some(key) = self.expiries.remove(&(at, seq)) {
                self.entries.remove(&key);
                removed += 1;
            }
        }
        removed
    }
}

/// Arm the sweep timer for the earliest pending expiry, unless a timer at or
/// before that instant is already armed.
fn schedule<K: CacheKey, V: Clone + Send + 'static>(
    weak: Weak<Mutex<CacheState<K, V>>>,
    state: &mut CacheState<K, V>,
) {
    let Some(&(earliest, _)) = state.expiries.keys().next() else {
        if let Some(sweeper) = state.sweeper.take() {
            sweeper.task.abort();
        }
        return;
    };
    if state.sweeper.as_ref().is_some_and(|s| s.at <= earliest) {
        return;
    }
    let Ok(handle) = Handle::try_current() else {
        return;
    };
    if let Some(old) = state.sweeper.take() {
        old.task.abort();
    }
    let task = handle.spawn(async move {
        tokio::time::sleep_until(earliest).await;
        let Some(inner) = weak.upgrade() else {
            return;
        };
        let mut state = inner.lock().expect("cache lock poisoned");
        state.sweeper = None;
        let removed = state.sweep(Instant::now());
        trace!(removed, "cache sweep");
        schedule(Arc::downgrade(&inner), &mut state);
    });
    state.sweeper = Some(Sweeper { at: earliest, task });
}

/// In-memory key/value cache with a fixed per-entry time to live.
///
/// Reads never scan: expired entries are hidden on read and removed by a
/// background sweep armed for the earliest pending expiry. The sweep needs a
/// tokio runtime; without one, expiry is still enforced on read.
pub struct TtlCache<K: CacheKey, V: Clone + Send + 'static> {
    inner: Arc<Mutex<CacheState<K, V>>>,
    ttl: Duration,
}

impl<K: CacheKey, V: Clone + Send + 'static> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CacheState::new())),
            ttl,
        }
    }

    /// The cached value, if present and not expired.
    pub fn get(&self, key: &K) -> Option<V> {
        let state = self.inner.lock().expect("cache lock poisoned");
        state
            .entries
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.value.clone())
    }

    pub fn contains(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Store `value`, expiring `ttl` from now. Re-setting refreshes the expiry.
    pub fn set(&self, key: K, value: V) {
        let mut state = self.inner.lock().expect("cache lock poisoned");
        state.remove(&key);
        let expires_at = Instant::now() + self.ttl;
        let seq = state.next_seq;
        state.next_seq += 1;
        state.expiries.insert((expires_at, seq), key.clone());
        state.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at,
                seq,
            },
        );
        schedule(Arc::downgrade(&self.inner), &mut state);
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        let mut state = self.inner.lock().expect("cache lock poisoned");
        let removed = state.remove(key);
        schedule(Arc::downgrade(&self.inner), &mut state);
        removed
    }

    /// Remove every entry matching `predicate`. Returns how many were removed.
    pub fn remove_where(&self, mut predicate: impl FnMut(&K, &V) -> bool) -> usize {
        let mut state = self.inner.lock().expect("cache lock poisoned");
        let doomed: Vec<K> = state
            .entries
            .iter()
            .filter(|(k, entry)| predicate(k, &entry.value))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &doomed {
            state.remove(key);
        }
        schedule(Arc::downgrade(&self.inner), &mut state);
        doomed.len()
    }

    pub fn clear(&self) {
        let mut state = self.inner.lock().expect("cache lock poisoned");
        state.entries.clear();
        state.expiries.clear();
        schedule(Arc::downgrade(&self.inner), &mut state);
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        let state = self.inner.lock().expect("cache lock poisoned");
        state.entries.values().filter(|e| e.expires_at > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of stored entries, including expired ones awaiting the sweep.
    pub fn stored_len(&self) -> usize {
        self.inner.lock().expect("cache lock poisoned").entries.len()
    }
}

impl<K: CacheKey, V: Clone + Send + 'static> Clone for TtlCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            ttl: self.ttl,
        }
    }
}

impl<K: CacheKey, V: Clone + Send + 'static> fmt::Debug for TtlCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtlCache")
            .field("ttl", &self.ttl)
            .field("stored", &self.stored_len())
            .finish()
    }
}

/// Membership-only TTL cache. Re-adding a member slides its expiry forward.
#[derive(Clone, Debug)]
pub struct TtlSet<K: CacheKey> {
    cache: TtlCache<K, ()>,
}

impl<K: CacheKey> TtlSet<K> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: TtlCache::new(ttl),
        }
    }

    pub fn add(&self, key: K) {
        self.cache.set(key, ());
    }

    pub fn has(&self, key: &K) -> bool {
        self.cache.contains(key)
    }

    /// Returns `true` if `key` was a live member.
    pub fn remove(&self, key: &K) -> bool {
        let live = self.cache.contains(key);
        self.cache.remove(key);
        live
    }

    pub fn clear(&self) {
        self.cache.clear();
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
