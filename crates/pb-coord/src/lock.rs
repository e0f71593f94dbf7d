use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Bounds required of lock keys.
pub trait LockKey: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static> LockKey for T {}

struct LockEntry {
    generation: u64,
    /// Dropping the sender wakes every subscribed waiter at once.
    release: watch::Sender<()>,
    timeout: Option<JoinHandle<()>>,
}

impl LockEntry {
    fn subscribe(&self) -> watch::Receiver<()> {
        self.release.subscribe()
    }
}

struct LockState<K> {
    entries: HashMap<K, LockEntry>,
    next_generation: u64,
}

/// Exclusive, timeout-bounded, per-key coordination primitive.
///
/// Releasing a key wakes all of its waiters simultaneously; this is a
/// broadcast, not a fair queue. Callers that use the split
/// [`wait`](Self::wait) / [`set`](Self::set) / [`release`](Self::release)
/// protocol must re-read the protected state after `set` before acting on it.
/// [`acquire`](Self::acquire) claims a key atomically and releases it when
/// the returned guard drops.
///
/// A held key releases itself after the configured timeout. The timeout is
/// armed only when a tokio runtime is running.
pub struct KeyedLock<K: LockKey> {
    inner: Arc<Mutex<LockState<K>>>,
    timeout: Duration,
}

impl<K: LockKey> KeyedLock<K> {
    pub fn new(timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(LockState {
                entries: HashMap::new(),
                next_generation: 0,
            })),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Suspend until `key` is not held. Returns immediately if it is free.
    pub async fn wait(&self, key: &K) {
        loop {
            let mut released = {
                let state = self.inner.lock().expect("lock poisoned");
                match state.entries.get(key) {
                    Some(entry) => entry.subscribe(),
                    None => return,
                }
            };
            // Only ever resolves with an error, once the entry is dropped.
            let _ = released.changed().await;
        }
    }

    /// Mark `key` as held. A no-op if it already is.
    pub fn set(&self, key: K) {
        let mut state = self.inner.lock().expect("lock poisoned");
        if !state.entries.contains_key(&key) {
            self.claim(&mut state, key);
        }
    }

    /// Release `key`, waking all of its waiters.
    pub fn release(&self, key: &K) {
        let mut state = self.inner.lock().expect("lock poisoned");
        if let Some(entry) = state.entries.remove(key) {
            if let Some(timeout) = entry.timeout {
                timeout.abort();
            }
            debug!(?key, "keyed lock released");
        }
    }

    /// Claim `key`, waiting for any current holder first.
    ///
    /// Checking and claiming happen in one critical section, so of several
    /// callers woken by the same release exactly one obtains the guard.
    pub async fn acquire(&self, key: K) -> KeyedLockGuard<K> {
        loop {
            let mut released = {
                let mut state = self.inner.lock().expect("lock poisoned");
                match state.entries.get(&key) {
                    Some(entry) => entry.subscribe(),
                    None => {
                        let generation = self.claim(&mut state, key.clone());
                        return KeyedLockGuard {
                            inner: Arc::clone(&self.inner),
                            key,
                            generation,
                        };
                    }
                }
            };
            let _ = released.changed().await;
        }
    }

    pub fn is_locked(&self, key: &K) -> bool {
        self.inner
            .lock()
            .expect("lock poisoned")
            .entries
            .contains_key(key)
    }

    /// Number of keys currently held.
    pub fn held_count(&self) -> usize {
        self.inner.lock().expect("lock poisoned").entries.len()
    }

    fn claim(&self, state: &mut LockState<K>, key: K) -> u64 {
        let generation = state.next_generation;
        state.next_generation += 1;
        let (release, _) = watch::channel(());
        let timeout = Handle::try_current().ok().map(|handle| {
            let inner = Arc::downgrade(&self.inner);
            let key = key.clone();
            let after = self.timeout;
            handle.spawn(async move {
                tokio::time::sleep(after).await;
                if release_generation(&inner, &key, generation) {
                    warn!(?key, ?after, "keyed lock timed out, releasing");
                }
            })
        });
        debug!(?key, generation, "keyed lock set");
        state.entries.insert(
            key,
            LockEntry {
                generation,
                release,
                timeout,
            },
        );
        generation
    }
}

impl<K: LockKey> Clone for KeyedLock<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            timeout: self.timeout,
        }
    }
}

impl<K: LockKey> fmt::Debug for KeyedLock<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedLock")
            .field("timeout", &self.timeout)
            .field("held", &self.held_count())
            .finish()
    }
}

/// Remove `key` only if it is still held under `generation`.
fn release_generation<K: LockKey>(
    inner: &Weak<Mutex<LockState<K>>>,
    key: &K,
    generation: u64,
) -> bool {
    let Some(inner) = inner.upgrade() else {
        return false;
    };
    let mut state = inner.lock().expect("lock poisoned");
    match state.entries.get(key) {
        Some(entry) if entry.generation == generation => {
            // Called from the timeout task itself: dropping its own handle detaches it.
            state.entries.remove(key);
            true
        }
        _ => false,
    }
}

/// Holds a key claimed through [`KeyedLock::acquire`]; releases it on drop.
///
/// If the lock already timed out and the key was claimed again by someone
/// else, dropping a stale guard leaves the newer claim untouched.
#[must_use = "the key is released as soon as the guard is dropped"]
pub struct KeyedLockGuard<K: LockKey> {
    inner: Arc<Mutex<LockState<K>>>,
    key: K,
    generation: u64,
}

impl<K: LockKey> KeyedLockGuard<K> {
    pub fn key(&self) -> &K {
        &self.key
    }
}

impl<K: LockKey> Drop for KeyedLockGuard<K> {
    fn drop(&mut self) {
        let mut state = match self.inner.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        let current = state
            .entries
            .get(&self.key)
            .is_some_and(|entry| entry.generation == self.generation);
        if current {
            if let Some(entry) = state.entries.remove(&self.key) {
                if let Some(timeout) = entry.timeout {
                    timeout.abort();
                }
            }
            debug!(key = ?self.key, "keyed lock guard released");
        }
    }
}

impl<K: LockKey> fmt::Debug for KeyedLockGuard<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedLockGuard")
            .field("key", &self.key)
            .field("generation", &self.generation)
            .finish()
    }
}
