use std::time::Duration;

use tracing::debug;

use crate::cache::TtlSet;
use crate::lock::KeyedLock;

/// Suppresses the echo of messages the bridge sent itself.
///
/// Before sending into a conversation, the bridge [`lock`](Self::lock)s it
/// and remembers the message body. Once the send completes, it
/// [`unlock`](Self::unlock)s and remembers the resulting event id. Inbound
/// events are passed through [`dedupe`](Self::dedupe), which waits for any
/// pending send in the conversation and reports whether the event is one of
/// ours. A fingerprint matches at most once.
#[derive(Clone, Debug)]
pub struct MessageDeduplicator {
    locks: KeyedLock<String>,
    fingerprints: TtlSet<String>,
}

impl MessageDeduplicator {
    pub fn new(lock_timeout: Duration, ttl: Duration) -> Self {
        Self {
            locks: KeyedLock::new(lock_timeout),
            fingerprints: TtlSet::new(ttl),
        }
    }

    /// Mark an outbound send to `room` as in flight.
    pub fn lock(&self, room: &str, author: &str, message: Option<&str>) {
        self.locks.set(room.to_string());
        if let Some(message) = message {
            self.fingerprints
                .add(fingerprint(room, author, &format!("m:{message}")));
        }
    }

    /// Mark the send as done, remembering the event id it produced.
    pub fn unlock(&self, room: &str, author: Option<&str>, event_id: Option<&str>) {
        if let (Some(author), Some(event_id)) = (author, event_id) {
            self.fingerprints
                .add(fingerprint(room, author, &format!("e:{event_id}")));
        }
        self.locks.release(&room.to_string());
    }

    /// Whether an inbound event is the echo of our own send. A match is
    /// consumed.
    pub async fn dedupe(
        &self,
        room: &str,
        author: &str,
        event_id: Option<&str>,
        message: Option<&str>,
    ) -> bool {
        self.check(room, author, event_id, message, true).await
    }

    /// Like [`dedupe`](Self::dedupe), but leaves a matching fingerprint in place.
    pub async fn dedupe_keep(
        &self,
        room: &str,
        author: &str,
        event_id: Option<&str>,
        message: Option<&str>,
    ) -> bool {
        self.check(room, author, event_id, message, false).await
    }

    async fn check(
        &self,
        room: &str,
        author: &str,
        event_id: Option<&str>,
        message: Option<&str>,
        clear: bool,
    ) -> bool {
        self.locks.wait(&room.to_string()).await;
        let candidates = event_id
            .map(|id| fingerprint(room, author, &format!("e:{id}")))
            .into_iter()
            .chain(message.map(|m| fingerprint(room, author, &format!("m:{m}"))));
        for key in candidates {
            if self.fingerprints.has(&key) {
                if clear {
                    self.fingerprints.remove(&key);
                }
                debug!(room, author, "suppressed echoed event");
                return true;
            }
        }
        false
    }
}

fn fingerprint(room: &str, author: &str, part: &str) -> String {
    format!("{room};{author};{part}")
}
