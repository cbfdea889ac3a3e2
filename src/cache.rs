//! Identifier-keyed cache for continuable generation results.
//!
//! Used for chat sessions (continued in place) and generated videos (consumed
//! when extended). Identifiers are random v4 UUIDs handed to the client.
//!
//! Entries that sit idle longer than the TTL read as missing and are removed by
//! [`ObjectCache::sweep`].
//!
//! A request that continues an entry first [`ObjectCache::claim`]s it. While
//! claimed, other claims get [`CacheError::Busy`], so a backend call is never
//! started twice from the same state. The claim ends by committing a new
//! payload, replacing the identifier, or releasing it; dropping an unsettled
//! [`Claim`] releases it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::auth::Clock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("Artifact not found, it may have already been extended or expired")]
    NotFound,
    #[error("Artifact is in use by another request, retry shortly")]
    Busy,
}

struct Entry<T> {
    payload: T,
    touched_at: Duration,
    claimed: bool,
}

pub struct ObjectCache<T> {
    ttl: Option<Duration>,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<Uuid, Entry<T>>>,
}

impl<T: Clone> ObjectCache<T> {
    /// `ttl` of `None` keeps entries until they are consumed or the process exits.
    pub fn new(ttl: Option<Duration>, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Store `payload` under a freshly generated identifier.
    pub async fn insert(&self, payload: T) -> Uuid {
        let id = Uuid::new_v4();
        self.put(id, payload).await;
        id
    }

    pub async fn put(&self, id: Uuid, payload: T) {
        let touched_at = self.clock.now();
        let mut entries = self.entries.lock().await;
        entries.insert(
            id,
            Entry {
                payload,
                touched_at,
                claimed: false,
            },
        );
    }

    /// Returns a copy of the payload and refreshes its idle timer.
    ///
    /// # Errors
    /// Returns `CacheError::NotFound` for unknown, consumed or expired identifiers.
    pub async fn get(&self, id: &Uuid) -> Result<T, CacheError> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;
        let expired = entries
            .get(id)
            .ok_or(CacheError::NotFound)
            .map(|entry| self.is_expired(entry, now))?;
        if expired {
            entries.remove(id);
            return Err(CacheError::NotFound);
        }
        let entry = entries.get_mut(id).ok_or(CacheError::NotFound)?;
        entry.touched_at = now;
        Ok(entry.payload.clone())
    }

    /// Atomically retires `old` and stores `payload` under `new`.
    ///
    /// # Errors
    /// Returns `CacheError::NotFound` if `old` is no longer live, in which case
    /// nothing is inserted. Two racing extensions of the same identifier
    /// therefore produce exactly one successor.
    pub async fn replace(&self, old: &Uuid, new: Uuid, payload: T) -> Result<(), CacheError> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;
        let previous = entries.remove(old).ok_or(CacheError::NotFound)?;
        if self.is_expired(&previous, now) {
            return Err(CacheError::NotFound);
        }
        entries.insert(
            new,
            Entry {
                payload,
                touched_at: now,
                claimed: false,
            },
        );
        Ok(())
    }

    /// Ends a claim without changing the payload. Unknown identifiers are ignored.
    pub async fn release(&self, id: &Uuid) {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries.get_mut(id) {
            entry.claimed = false;
            entry.touched_at = now;
        }
    }

    /// Drops idle entries and returns how many were removed.
    pub async fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| !self.is_expired(entry, now));
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Claimed entries never expire; the claim holder settles them.
    fn is_expired(&self, entry: &Entry<T>, now: Duration) -> bool {
        !entry.claimed
            && self
                .ttl
                .is_some_and(|ttl| now.saturating_sub(entry.touched_at) >= ttl)
    }
}

impl<T: Clone + Send + 'static> ObjectCache<T> {
    /// Takes exclusive use of `id` for a follow-on operation.
    ///
    /// `allowed` sees the payload first; a `false` answer reads as
    /// `CacheError::NotFound` so other owners' entries look absent.
    ///
    /// # Errors
    /// Returns `CacheError::NotFound` for unknown, expired or disallowed
    /// identifiers and `CacheError::Busy` while another claim is held.
    pub async fn claim(
        self: &Arc<Self>,
        id: &Uuid,
        allowed: impl FnOnce(&T) -> bool,
    ) -> Result<Claim<T>, CacheError> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;
        let expired = entries
            .get(id)
            .ok_or(CacheError::NotFound)
            .map(|entry| self.is_expired(entry, now))?;
        if expired {
            entries.remove(id);
            return Err(CacheError::NotFound);
        }
        let entry = entries.get_mut(id).ok_or(CacheError::NotFound)?;
        if !allowed(&entry.payload) {
            return Err(CacheError::NotFound);
        }
        if entry.claimed {
            return Err(CacheError::Busy);
        }
        entry.claimed = true;
        entry.touched_at = now;
        Ok(Claim {
            cache: Arc::clone(self),
            id: *id,
            payload: entry.payload.clone(),
            settled: false,
        })
    }
}

/// Exclusive hold on one cache entry, see [`ObjectCache::claim`].
pub struct Claim<T: Clone + Send + 'static> {
    cache: Arc<ObjectCache<T>>,
    id: Uuid,
    payload: T,
    settled: bool,
}

impl<T: Clone + Send + 'static> Claim<T> {
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The payload as it was when the claim was taken.
    #[must_use]
    pub fn payload(&self) -> &T {
        &self.payload
    }

    /// Stores `payload` under the claimed identifier and ends the claim.
    pub async fn commit(mut self, payload: T) {
        self.cache.put(self.id, payload).await;
        self.settled = true;
    }

    /// Retires the claimed identifier in favour of `new`.
    ///
    /// # Errors
    /// Returns `CacheError::NotFound` if the entry vanished meanwhile.
    pub async fn replace(mut self, new: Uuid, payload: T) -> Result<(), CacheError> {
        let result = self.cache.replace(&self.id, new, payload).await;
        self.settled = true;
        result
    }

    /// Ends the claim and leaves the payload as it was.
    pub async fn release(mut self) {
        self.cache.release(&self.id).await;
        self.settled = true;
    }
}

impl<T: Clone + Send + 'static> Drop for Claim<T> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        if let Ok(mut entries) = self.cache.entries.try_lock() {
            if let Some(entry) = entries.get_mut(&self.id) {
                entry.claimed = false;
            }
            return;
        }
        // Contended: finish the release on the runtime.
        let cache = Arc::clone(&self.cache);
        let id = self.id;
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move { cache.release(&id).await });
        }
    }
}

/// Parse a client-supplied identifier; anything malformed is simply unknown.
///
/// # Errors
/// Returns `CacheError::NotFound` if `raw` is not a UUID.
pub fn parse_id(raw: &str) -> Result<Uuid, CacheError> {
    Uuid::parse_str(raw.trim()).map_err(|_| CacheError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::ManualClock;

    fn cache(ttl: Option<u64>) -> (Arc<ManualClock>, ObjectCache<String>) {
        let clock = Arc::new(ManualClock::new(Duration::ZERO));
        let cache = ObjectCache::new(ttl.map(Duration::from_secs), clock.clone());
        (clock, cache)
    }

    #[tokio::test]
    async fn get_returns_stored_payload() {
        let (_clock, cache) = cache(None);
        let id = cache.insert("video-1".to_string()).await;
        assert_eq!(cache.get(&id).await, Ok("video-1".to_string()));
        assert_eq!(cache.get(&Uuid::new_v4()).await, Err(CacheError::NotFound));
    }

    #[tokio::test]
    async fn replace_consumes_the_old_identifier() {
        let (_clock, cache) = cache(None);
        let old = cache.insert("video-1".to_string()).await;
        let new = Uuid::new_v4();

        assert_eq!(cache.replace(&old, new, "video-2".to_string()).await, Ok(()));
        assert_eq!(cache.get(&old).await, Err(CacheError::NotFound));
        assert_eq!(cache.get(&new).await, Ok("video-2".to_string()));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn replace_of_consumed_identifier_inserts_nothing() {
        let (_clock, cache) = cache(None);
        let old = cache.insert("video-1".to_string()).await;
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        assert!(cache.replace(&old, first, "a".to_string()).await.is_ok());
        assert_eq!(
            cache.replace(&old, second, "b".to_string()).await,
            Err(CacheError::NotFound)
        );
        assert_eq!(cache.get(&second).await, Err(CacheError::NotFound));
    }

    #[tokio::test]
    async fn put_overwrites_in_place() {
        let (_clock, cache) = cache(None);
        let id = cache.insert("turn-1".to_string()).await;
        cache.put(id, "turn-2".to_string()).await;
        assert_eq!(cache.get(&id).await, Ok("turn-2".to_string()));
    }

    #[tokio::test]
    async fn idle_entries_expire() {
        let (clock, cache) = cache(Some(60));
        let id = cache.insert("video-1".to_string()).await;

        clock.set(Duration::from_secs(59));
        assert!(cache.get(&id).await.is_ok());

        // The read above refreshed the idle timer.
        clock.set(Duration::from_secs(118));
        assert!(cache.get(&id).await.is_ok());

        clock.set(Duration::from_secs(178));
        assert_eq!(cache.get(&id).await, Err(CacheError::NotFound));
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn expired_entry_cannot_be_extended() {
        let (clock, cache) = cache(Some(60));
        let old = cache.insert("video-1".to_string()).await;
        clock.set(Duration::from_secs(60));
        assert_eq!(
            cache.replace(&old, Uuid::new_v4(), "video-2".to_string()).await,
            Err(CacheError::NotFound)
        );
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn sweep_drops_only_idle_entries() {
        let (clock, cache) = cache(Some(60));
        let _stale = cache.insert("old".to_string()).await;
        clock.set(Duration::from_secs(30));
        let fresh = cache.insert("new".to_string()).await;

        clock.set(Duration::from_secs(70));
        assert_eq!(cache.sweep().await, 1);
        assert_eq!(cache.get(&fresh).await, Ok("new".to_string()));
    }

    #[tokio::test]
    async fn second_claim_is_busy_until_released() {
        let (_clock, cache) = cache(None);
        let cache = Arc::new(cache);
        let id = cache.insert("turn-1".to_string()).await;

        let claim = cache.claim(&id, |_| true).await;
        let Ok(claim) = claim else {
            panic!("first claim should succeed");
        };
        assert_eq!(claim.payload(), "turn-1");
        assert!(matches!(
            cache.claim(&id, |_| true).await,
            Err(CacheError::Busy)
        ));

        claim.release().await;
        assert!(cache.claim(&id, |_| true).await.is_ok());
    }

    #[tokio::test]
    async fn commit_stores_new_payload_and_frees_entry() {
        let (_clock, cache) = cache(None);
        let cache = Arc::new(cache);
        let id = cache.insert("turn-1".to_string()).await;

        let Ok(claim) = cache.claim(&id, |_| true).await else {
            panic!("claim should succeed");
        };
        claim.commit("turn-2".to_string()).await;
        assert_eq!(cache.get(&id).await, Ok("turn-2".to_string()));
        assert!(cache.claim(&id, |_| true).await.is_ok());
    }

    #[tokio::test]
    async fn claim_replace_consumes_identifier() {
        let (_clock, cache) = cache(None);
        let cache = Arc::new(cache);
        let old = cache.insert("video-1".to_string()).await;
        let new = Uuid::new_v4();

        let Ok(claim) = cache.claim(&old, |_| true).await else {
            panic!("claim should succeed");
        };
        assert_eq!(claim.replace(new, "video-2".to_string()).await, Ok(()));
        assert!(matches!(
            cache.claim(&old, |_| true).await,
            Err(CacheError::NotFound)
        ));
        assert_eq!(cache.get(&new).await, Ok("video-2".to_string()));
    }

    #[tokio::test]
    async fn dropped_claim_is_released() {
        let (_clock, cache) = cache(None);
        let cache = Arc::new(cache);
        let id = cache.insert("video-1".to_string()).await;

        let claim = cache.claim(&id, |_| true).await;
        assert!(claim.is_ok());
        drop(claim);
        assert!(cache.claim(&id, |_| true).await.is_ok());
    }

    #[tokio::test]
    async fn disallowed_claim_reads_as_missing() {
        let (_clock, cache) = cache(None);
        let cache = Arc::new(cache);
        let id = cache.insert("someone else".to_string()).await;

        assert!(matches!(
            cache.claim(&id, |owner| owner == "me").await,
            Err(CacheError::NotFound)
        ));
        // a rejected claim holds nothing
        assert!(cache.claim(&id, |_| true).await.is_ok());
    }

    #[tokio::test]
    async fn claimed_entry_outlives_idle_ttl() {
        let (clock, cache) = cache(Some(60));
        let cache = Arc::new(cache);
        let id = cache.insert("video-1".to_string()).await;

        let Ok(claim) = cache.claim(&id, |_| true).await else {
            panic!("claim should succeed");
        };
        clock.set(Duration::from_secs(120));
        assert_eq!(cache.sweep().await, 0);
        assert_eq!(claim.replace(Uuid::new_v4(), "video-2".to_string()).await, Ok(()));
    }

    #[test]
    fn parse_id_rejects_garbage() {
        assert_eq!(parse_id("not-a-uuid"), Err(CacheError::NotFound));
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&format!(" {id} ")), Ok(id));
    }
}
