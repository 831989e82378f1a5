// src/query/client.rs
//! Key-based cache of in-flight and completed asynchronous fetches.
//!
//! Every key is in one of three observable states: pending, resolved or
//! failed. Concurrent readers of the same key share a single in-flight
//! fetch. Entries marked stale by [`QueryClient::invalidate`] keep their
//! last value until the next read, which refetches.

use super::key::QueryKey;
use crate::constants::{DEFAULT_CACHE_CAPACITY, QUERY_EVENT_BUFFER};
use crate::error::AppError;
use futures::future::{BoxFuture, FutureExt, Shared};
use lru::LruCache;
use parking_lot::Mutex;
use std::any::Any;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;

type AnyValue = Arc<dyn Any + Send + Sync>;
type Settled = Result<AnyValue, Arc<AppError>>;
type InFlight = Shared<BoxFuture<'static, Settled>>;

/// Observable state of one query.
#[derive(Debug)]
pub enum QueryState<T> {
    /// No value yet, a fetch is in flight.
    Pending,
    Resolved(Arc<T>),
    /// The last fetch failed.
    Failed(Arc<AppError>),
}

impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        match self {
            QueryState::Pending => QueryState::Pending,
            QueryState::Resolved(value) => QueryState::Resolved(Arc::clone(value)),
            QueryState::Failed(error) => QueryState::Failed(Arc::clone(error)),
        }
    }
}

impl<T> QueryState<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, QueryState::Pending)
    }

    pub fn data(&self) -> Option<&Arc<T>> {
        match self {
            QueryState::Resolved(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&Arc<AppError>> {
        match self {
            QueryState::Failed(error) => Some(error),
            _ => None,
        }
    }
}

/// Notifications for cache observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryEvent {
    /// A fetch started for the key.
    Fetching(QueryKey),
    /// A fetch finished; `ok` is false when it failed.
    Settled { key: QueryKey, ok: bool },
    /// The key was marked stale; observers should read it again.
    Invalidated(QueryKey),
}

enum Slot {
    Pending(InFlight),
    Resolved(AnyValue),
    Failed(Arc<AppError>),
}

struct Entry {
    slot: Slot,
    stale: bool,
    /// Identifies the fetch that owns a pending slot.
    generation: u64,
}

struct Inner {
    entries: Mutex<LruCache<QueryKey, Entry>>,
    /// The configured bound; `entries` only grows past it while every
    /// entry is pending.
    capacity: NonZeroUsize,
    next_generation: AtomicU64,
    events: broadcast::Sender<QueryEvent>,
}

impl Inner {
    /// Stores the outcome of the fetch identified by `generation`.
    ///
    /// The outcome is dropped when the cache was cleared or a newer fetch
    /// took the entry over in the meantime.
    fn settle(&self, key: &QueryKey, generation: u64, result: &Settled) {
        {
            let mut entries = self.entries.lock();
            let Some(entry) = entries.peek_mut(key) else {
                log::debug!("Discarding result for cleared query {}", key);
                return;
            };
            if entry.generation != generation {
                log::debug!("Discarding superseded result for query {}", key);
                return;
            }
            entry.slot = match result {
                Ok(value) => Slot::Resolved(Arc::clone(value)),
                Err(error) => Slot::Failed(Arc::clone(error)),
            };
            shrink_to(&mut entries, self.capacity);
        }

        match result {
            Ok(_) => log::debug!("Query {} resolved", key),
            Err(error) => log::warn!("Query {} failed: {}", key, error),
        }
        let _ = self.events.send(QueryEvent::Settled {
            key: key.clone(),
            ok: result.is_ok(),
        });
    }
}

/// Handle to the shared query cache.
///
/// Create one per process and pass clones to whoever needs it; all clones
/// see the same entries.
#[derive(Clone)]
pub struct QueryClient {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryClient")
            .field("entries", &self.len())
            .finish()
    }
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

/// What a read decided to do while holding the lock.
enum Plan {
    Ready(Settled),
    Await(InFlight),
    Start(InFlight),
}

impl QueryClient {
    /// Creates a cache holding at most `capacity` entries (minimum one).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        let (events, _) = broadcast::channel(QUERY_EVENT_BUFFER);
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(LruCache::new(capacity)),
                capacity,
                next_generation: AtomicU64::new(0),
                events,
            }),
        }
    }

    /// Reads `key`, starting `fetch` in the background when there is no
    /// fresh value.
    ///
    /// Returns immediately: `Resolved` for a fresh cached value, `Failed`
    /// when the last fetch failed and nothing invalidated it since,
    /// `Pending` otherwise. Fetches are driven on the current Tokio
    /// runtime.
    pub fn query<T, F, Fut>(&self, key: QueryKey, fetch: F) -> QueryState<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, AppError>> + Send + 'static,
    {
        match self.plan(&key, fetch) {
            Plan::Ready(settled) => into_state(&key, settled),
            Plan::Await(_) | Plan::Start(_) => QueryState::Pending,
        }
    }

    /// Reads `key` and waits for the value, fetching it when there is no
    /// fresh one. Shares any fetch already in flight for the same key.
    pub async fn fetch<T, F, Fut>(&self, key: QueryKey, fetch: F) -> Result<Arc<T>, Arc<AppError>>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, AppError>> + Send + 'static,
    {
        let settled = match self.plan(&key, fetch) {
            Plan::Ready(settled) => settled,
            Plan::Await(in_flight) | Plan::Start(in_flight) => in_flight.await,
        };
        downcast(&key, settled?)
    }

    /// Current state of `key` without starting anything. Stale values are
    /// still reported as resolved.
    pub fn peek<T>(&self, key: &QueryKey) -> Option<QueryState<T>>
    where
        T: Send + Sync + 'static,
    {
        let entries = self.inner.entries.lock();
        let entry = entries.peek(key)?;
        Some(match &entry.slot {
            Slot::Pending(_) => QueryState::Pending,
            Slot::Resolved(value) => into_state(key, Ok(Arc::clone(value))),
            Slot::Failed(error) => QueryState::Failed(Arc::clone(error)),
        })
    }

    /// Whether `key` has a value or failure that the next read will reuse.
    pub fn is_fresh(&self, key: &QueryKey) -> bool {
        let entries = self.inner.entries.lock();
        entries
            .peek(key)
            .map(|entry| !entry.stale && !matches!(entry.slot, Slot::Pending(_)))
            .unwrap_or(false)
    }

    /// Marks every entry whose key starts with `prefix` as stale and
    /// returns how many were marked.
    ///
    /// A fetch in flight for a matching key is not joined again: the next
    /// read starts a new one and the old result is discarded.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let invalidated: Vec<QueryKey> = {
            let mut entries = self.inner.entries.lock();
            entries
                .iter_mut()
                .filter(|(key, _)| key.starts_with(prefix))
                .map(|(key, entry)| {
                    entry.stale = true;
                    key.clone()
                })
                .collect()
        };

        log::debug!(
            "Invalidated {} quer{} under {}",
            invalidated.len(),
            if invalidated.len() == 1 { "y" } else { "ies" },
            prefix
        );
        for key in &invalidated {
            let _ = self.inner.events.send(QueryEvent::Invalidated(key.clone()));
        }
        invalidated.len()
    }

    /// Drops every entry. Fetches in flight finish without being stored.
    pub fn clear(&self) {
        self.inner.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Subscribes to fetch, settle and invalidation events.
    pub fn subscribe(&self) -> broadcast::Receiver<QueryEvent> {
        self.inner.events.subscribe()
    }

    /// Decides, under the lock, whether `key` can be served, joined or has
    /// to be fetched. Never runs caller code while locked: `fetch` is only
    /// invoked when the returned future is first polled.
    fn plan<T, F, Fut>(&self, key: &QueryKey, fetch: F) -> Plan
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, AppError>> + Send + 'static,
    {
        let in_flight = {
            let mut entries = self.inner.entries.lock();

            if let Some(entry) = entries.get(key) {
                match &entry.slot {
                    // A fetch invalidated mid-flight may predate the change
                    Slot::Pending(in_flight) if !entry.stale => {
                        return Plan::Await(in_flight.clone())
                    }
                    Slot::Resolved(value) if !entry.stale => {
                        return Plan::Ready(Ok(Arc::clone(value)))
                    }
                    Slot::Failed(error) if !entry.stale => {
                        return Plan::Ready(Err(Arc::clone(error)))
                    }
                    _ => {}
                }
            }

            let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
            let in_flight = self.start(key.clone(), generation, fetch);
            let entry = Entry {
                slot: Slot::Pending(in_flight.clone()),
                stale: false,
                generation,
            };
            make_room(&mut entries, key);
            entries.put(key.clone(), entry);
            in_flight
        };

        log::debug!("Fetching query {}", key);
        let _ = self.inner.events.send(QueryEvent::Fetching(key.clone()));

        // Drive the fetch even if every reader goes away.
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(in_flight.clone());
            }
            Err(_) => log::warn!(
                "No async runtime; query {} only progresses when awaited",
                key
            ),
        }
        Plan::Start(in_flight)
    }

    fn start<T, F, Fut>(&self, key: QueryKey, generation: u64, fetch: F) -> InFlight
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, AppError>> + Send + 'static,
    {
        let cache: Weak<Inner> = Arc::downgrade(&self.inner);
        async move {
            let result: Settled = match fetch().await {
                Ok(value) => Ok(Arc::new(value) as AnyValue),
                Err(error) => Err(Arc::new(error)),
            };
            if let Some(cache) = cache.upgrade() {
                cache.settle(&key, generation, &result);
            }
            result
        }
        .boxed()
        .shared()
    }
}

/// Frees a slot for `key` by evicting the least recently used entry that
/// is not pending. When every entry is pending the cache grows instead.
fn make_room(entries: &mut LruCache<QueryKey, Entry>, key: &QueryKey) {
    if entries.contains(key) || entries.len() < entries.cap().get() {
        return;
    }
    let victim = entries
        .iter()
        .rev()
        .find(|(_, entry)| !matches!(entry.slot, Slot::Pending(_)))
        .map(|(victim, _)| victim.clone());
    match victim {
        Some(victim) => {
            entries.pop(&victim);
            log::debug!("Evicted query {} to make room for {}", victim, key);
        }
        None => {
            let grown = entries.cap().saturating_add(1);
            log::debug!("All queries in flight, growing cache to {}", grown);
            entries.resize(grown);
        }
    }
}

/// Evicts settled entries until the cache is back within `capacity`.
fn shrink_to(entries: &mut LruCache<QueryKey, Entry>, capacity: NonZeroUsize) {
    if entries.cap() <= capacity {
        return;
    }
    while entries.len() > capacity.get() {
        let victim = entries
            .iter()
            .rev()
            .find(|(_, entry)| !matches!(entry.slot, Slot::Pending(_)))
            .map(|(victim, _)| victim.clone());
        let Some(victim) = victim else { break };
        entries.pop(&victim);
    }
    let target = NonZeroUsize::new(entries.len()).map_or(capacity, |len| len.max(capacity));
    entries.resize(target);
}

fn downcast<T>(key: &QueryKey, value: AnyValue) -> Result<Arc<T>, Arc<AppError>>
where
    T: Send + Sync + 'static,
{
    value.downcast::<T>().map_err(|_| {
        Arc::new(AppError::QueryTypeMismatch {
            key: key.to_string(),
        })
    })
}

fn into_state<T>(key: &QueryKey, settled: Settled) -> QueryState<T>
where
    T: Send + Sync + 'static,
{
    match settled.and_then(|value| downcast(key, value)) {
        Ok(value) => QueryState::Resolved(value),
        Err(error) => QueryState::Failed(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BlockId;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::oneshot;

    fn key(id: &str) -> QueryKey {
        QueryKey::displayed_block(&BlockId::parse(id).unwrap())
    }

    fn counted(
        calls: &Arc<AtomicUsize>,
        value: &'static str,
    ) -> impl FnOnce() -> futures::future::Ready<Result<String, AppError>> + Send + 'static {
        let calls = Arc::clone(calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            futures::future::ready(Ok(value.to_string()))
        }
    }

    #[tokio::test]
    async fn resolved_values_are_served_from_cache() {
        let client = QueryClient::default();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = client.fetch(key("A"), counted(&calls, "a")).await.unwrap();
        let second = client.fetch(key("A"), counted(&calls, "a")).await.unwrap();

        assert_eq!(*first, "a");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(client.is_fresh(&key("A")));
    }

    #[tokio::test]
    async fn concurrent_readers_share_one_fetch() {
        let client = QueryClient::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let (release, gate) = oneshot::channel::<()>();

        let gated = {
            let calls = Arc::clone(&calls);
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                gate.await.ok();
                Ok::<_, AppError>("shared".to_string())
            }
        };

        let first = client.query::<String, _, _>(key("A"), gated);
        let second = client.query(key("A"), counted(&calls, "never"));
        assert!(first.is_pending());
        assert!(second.is_pending());

        let waiter = tokio::spawn({
            let client = client.clone();
            let calls = Arc::clone(&calls);
            async move { client.fetch(key("A"), counted(&calls, "never")).await }
        });

        release.send(()).unwrap();
        let value = waiter.await.unwrap().unwrap();

        assert_eq!(*value, "shared");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failures_are_shared_and_kept_until_invalidated() {
        let client = QueryClient::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let failing = {
            let calls = Arc::clone(&calls);
            move || {
                calls.fetch_add(1, Ordering::SeqCst);
                futures::future::ready(Err::<String, _>(AppError::gateway(
                    "get_block_command",
                    "not found",
                )))
            }
        };

        let err = client.fetch(key("Z"), failing).await.unwrap_err();
        assert_eq!(err.to_string(), "not found");

        let again = client.query(key("Z"), counted(&calls, "z"));
        assert_eq!(again.error().unwrap().to_string(), "not found");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        client.invalidate(&key("Z"));
        let value = client.fetch(key("Z"), counted(&calls, "z")).await.unwrap();
        assert_eq!(*value, "z");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidation_matches_by_prefix_only() {
        let client = QueryClient::default();
        let calls = Arc::new(AtomicUsize::new(0));
        client.fetch(key("A"), counted(&calls, "a")).await.unwrap();
        client.fetch(key("B"), counted(&calls, "b")).await.unwrap();
        client
            .fetch(QueryKey::load_configuration(), counted(&calls, "c"))
            .await
            .unwrap();

        let marked = client.invalidate(&QueryKey::displayed_block_family());

        assert_eq!(marked, 2);
        assert!(!client.is_fresh(&key("A")));
        assert!(!client.is_fresh(&key("B")));
        assert!(client.is_fresh(&QueryKey::load_configuration()));
        // Stale values stay visible until refetched
        let stale = client.peek::<String>(&key("A")).unwrap();
        assert_eq!(**stale.data().unwrap(), "a");
    }

    #[tokio::test]
    async fn the_first_read_after_invalidating_a_pending_fetch_refetches() {
        let client = QueryClient::default();
        let (release, gate) = oneshot::channel::<()>();
        let state = client.query::<String, _, _>(key("A"), move || async move {
            gate.await.ok();
            Ok("old".to_string())
        });
        assert!(state.is_pending());

        assert_eq!(client.invalidate(&QueryKey::displayed_block_family()), 1);

        let calls = Arc::new(AtomicUsize::new(0));
        let fresh = client.fetch(key("A"), counted(&calls, "new")).await.unwrap();
        assert_eq!(*fresh, "new");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // The superseded fetch lands late and is dropped
        let mut events = client.subscribe();
        release.send(()).unwrap();
        tokio::task::yield_now().await;
        tokio::time::timeout(std::time::Duration::from_millis(50), events.recv())
            .await
            .ok();

        let cached = client.fetch(key("A"), counted(&calls, "again")).await.unwrap();
        assert_eq!(*cached, "new");
        assert!(client.is_fresh(&key("A")));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn pending_entries_are_never_evicted() {
        let client = QueryClient::new(1);
        let calls = Arc::new(AtomicUsize::new(0));
        let (release, gate) = oneshot::channel::<()>();
        let gated = {
            let calls = Arc::clone(&calls);
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                gate.await.ok();
                Ok::<_, AppError>("a".to_string())
            }
        };

        assert!(client.query::<String, _, _>(key("A"), gated).is_pending());
        client.fetch(key("B"), counted(&Arc::new(AtomicUsize::new(0)), "b")).await.unwrap();
        assert!(client.query(key("A"), counted(&calls, "twice")).is_pending());

        release.send(()).unwrap();
        let value = client.fetch(key("A"), counted(&calls, "twice")).await.unwrap();
        assert_eq!(*value, "a");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Back within the bound once nothing is in flight
        client.fetch(key("C"), counted(&Arc::new(AtomicUsize::new(0)), "c")).await.unwrap();
        assert_eq!(client.len(), 1);
    }

    #[tokio::test]
    async fn query_resolves_in_the_background() {
        let client = QueryClient::default();
        let mut events = client.subscribe();
        let calls = Arc::new(AtomicUsize::new(0));

        assert!(client.query(key("A"), counted(&calls, "a")).is_pending());
        assert_eq!(events.recv().await.unwrap(), QueryEvent::Fetching(key("A")));
        assert_eq!(
            events.recv().await.unwrap(),
            QueryEvent::Settled {
                key: key("A"),
                ok: true
            }
        );

        let state = client.query(key("A"), counted(&calls, "a"));
        assert_eq!(**state.data().unwrap(), "a");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn least_recently_used_entries_are_evicted() {
        let client = QueryClient::new(2);
        let calls = Arc::new(AtomicUsize::new(0));
        client.fetch(key("A"), counted(&calls, "a")).await.unwrap();
        client.fetch(key("B"), counted(&calls, "b")).await.unwrap();
        client.fetch(key("A"), counted(&calls, "a")).await.unwrap();
        client.fetch(key("C"), counted(&calls, "c")).await.unwrap();

        assert_eq!(client.len(), 2);
        assert!(client.peek::<String>(&key("B")).is_none());
        assert!(client.is_fresh(&key("A")));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn reading_with_the_wrong_type_is_an_error() {
        let client = QueryClient::default();
        let calls = Arc::new(AtomicUsize::new(0));
        client.fetch(key("A"), counted(&calls, "a")).await.unwrap();

        let err = client
            .fetch(key("A"), || futures::future::ready(Ok::<u32, AppError>(1)))
            .await
            .unwrap_err();
        assert!(matches!(*err, AppError::QueryTypeMismatch { .. }));
    }
}
