//! In-process revocation list for JWTs, keyed by `jti`.
//!
//! Entries only need to live until the token's own `exp`; after that the
//! signature check rejects the token anyway and the entry is dropped.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use once_cell::sync::Lazy;
use tracing::{debug, warn};

const DEFAULT_CAPACITY: usize = 10_000;
const PURGE_EVERY: Duration = Duration::from_secs(15 * 60);

static REVOKED: Lazy<RevocationList> = Lazy::new(|| RevocationList::with_capacity(DEFAULT_CAPACITY));

/// Revoked token ids mapped to the unix time (seconds) they expire at
pub struct RevocationList {
    entries: Mutex<HashMap<String, i64>>,
    capacity: usize,
}

impl RevocationList {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, i64>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record `jti` as revoked until `expires_at`.
    ///
    /// At capacity, expired ids are purged first. Unexpired ids are never dropped,
    /// so `capacity` is a soft limit that only triggers the purge and a warning.
    pub fn revoke(&self, jti: &str, expires_at: i64) {
        let mut entries = self.entries();

        if entries.len() >= self.capacity && !entries.contains_key(jti) {
            let purged = purge(&mut entries, Utc::now().timestamp());
            if entries.len() >= self.capacity {
                warn!(
                    "Revocation list holds {} unexpired ids (soft capacity {}, purged {})",
                    entries.len(),
                    self.capacity,
                    purged
                );
            }
        }

        entries.insert(jti.to_string(), expires_at);
    }

    pub fn is_revoked(&self, jti: &str) -> bool {
        self.entries().contains_key(jti)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Drop every id whose token has expired by `now` (unix seconds)
    pub fn purge_expired(&self, now: i64) -> usize {
        purge(&mut self.entries(), now)
    }
}

fn purge(entries: &mut HashMap<String, i64>, now: i64) -> usize {
    let before = entries.len();
    entries.retain(|_, expires_at| *expires_at > now);
    before - entries.len()
}

/// The process-wide list consulted by token validation
pub fn blacklist() -> &'static RevocationList {
    &REVOKED
}

/// Periodically purge expired ids from the process-wide list
pub fn start_cleanup_task() -> tokio::task::JoinHandle<()> {
    tokio::spawn(async {
        let mut ticker = tokio::time::interval(PURGE_EVERY);
        loop {
            ticker.tick().await;
            let purged = blacklist().purge_expired(Utc::now().timestamp());
            debug!(purged, remaining = blacklist().len(), "Purged revoked token ids");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revoked_ids_are_reported() {
        let list = RevocationList::with_capacity(8);
        list.revoke("a", Utc::now().timestamp() + 60);

        assert!(list.is_revoked("a"));
        assert!(!list.is_revoked("b"));
    }

    #[test]
    fn purge_drops_only_expired_ids() {
        let list = RevocationList::with_capacity(8);
        list.revoke("old", 100);
        list.revoke("fresh", 300);

        assert_eq!(list.purge_expired(200), 1);
        assert!(!list.is_revoked("old"));
        assert!(list.is_revoked("fresh"));
    }

    #[test]
    fn full_list_prefers_purging_expired() {
        let now = Utc::now().timestamp();
        let list = RevocationList::with_capacity(3);
        list.revoke("expired", now - 10);
        list.revoke("x", now + 100);
        list.revoke("y", now + 200);

        list.revoke("z", now + 300);

        assert_eq!(list.len(), 3);
        assert!(!list.is_revoked("expired"));
        assert!(list.is_revoked("x"));
        assert!(list.is_revoked("z"));
    }

    #[test]
    fn full_list_never_forgets_unexpired_ids() {
        let now = Utc::now().timestamp();
        let list = RevocationList::with_capacity(3);
        list.revoke("soon", now + 10);
        list.revoke("later", now + 100);
        list.revoke("latest", now + 200);

        list.revoke("new", now + 300);

        assert_eq!(list.len(), 4);
        for jti in ["soon", "later", "latest", "new"] {
            assert!(list.is_revoked(jti), "{} should stay revoked", jti);
        }
    }
}
