//! The query cache.
//!
//! One [`QueryCache`] is created at startup and shared by every view. Each
//! [`QueryKey`] owns a slot holding the latest entry (broadcast through a
//! `watch` channel), the most recently registered fetcher, and the in-flight
//! bookkeeping that keeps at most one fetch per key running.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::future::Future;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use metrics::counter;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use super::config::{QueryPolicy, RetryPolicy};
use super::entry::{AnyData, QueryEntry, QueryError, QueryStatus, RawEntry};
use super::keys::QueryKey;
use super::lock::mutex_lock;

const SOURCE: &str = "cache::client";

type ErasedFetcher =
    Arc<dyn Fn() -> BoxFuture<'static, Result<AnyData, QueryError>> + Send + Sync>;

#[derive(Debug, Error)]
#[error("query fetcher for `{0}` panicked")]
struct FetcherPanicked(QueryKey);

struct Slot {
    state: watch::Sender<RawEntry>,
    fetcher: Option<ErasedFetcher>,
    in_flight: bool,
    refetch_queued: bool,
    issued: u64,
    applied: u64,
}

struct PendingFetch {
    key: QueryKey,
    seq: u64,
    fetcher: ErasedFetcher,
}

impl Slot {
    fn new(key: QueryKey, stale_after: Duration) -> Self {
        let (state, _) = watch::channel(RawEntry::new(key, stale_after));
        Self {
            state,
            fetcher: None,
            in_flight: false,
            refetch_queued: false,
            issued: 0,
            applied: 0,
        }
    }

    /// Marks the slot in flight and returns the work to spawn. Callers hold
    /// the cache lock and have checked `in_flight` is false.
    fn begin_fetch(&mut self, key: &QueryKey) -> Option<PendingFetch> {
        let fetcher = self.fetcher.clone()?;
        self.in_flight = true;
        self.issued += 1;
        // A failed entry keeps `Error` while it refetches.
        self.state.send_modify(|entry| {
            entry.is_fetching = true;
            if entry.status == QueryStatus::Idle {
                entry.status = QueryStatus::Loading;
            }
        });
        Some(PendingFetch {
            key: key.clone(),
            seq: self.issued,
            fetcher,
        })
    }
}

struct Inner {
    slots: Mutex<HashMap<QueryKey, Slot>>,
    policy: QueryPolicy,
}

/// Process-wide read cache with request coalescing and stale-while-revalidate.
///
/// Cloning is cheap and every clone shares the same entries. Methods that may
/// start a fetch spawn it on the current Tokio runtime.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<Inner>,
}

impl QueryCache {
    pub fn new(policy: QueryPolicy) -> Self {
        Self {
            inner: Arc::new(Inner {
                slots: Mutex::new(HashMap::new()),
                policy,
            }),
        }
    }

    pub fn policy(&self) -> QueryPolicy {
        self.inner.policy
    }

    /// Subscribe to `key`, fetching it in the background when the entry is
    /// missing, stale, invalidated, or has never loaded successfully.
    ///
    /// A query issued while a fetch for the same key is in flight joins that
    /// fetch instead of starting another one.
    pub fn query<T, F, Fut, E>(&self, key: impl Into<QueryKey>, fetcher: F) -> Subscription<T>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: StdError + Send + Sync + 'static,
    {
        let key = key.into();
        let fetcher = erase(fetcher);
        let now = Instant::now();

        let (receiver, pending) = {
            let mut slots = mutex_lock(&self.inner.slots, SOURCE, "query");
            let slot = slots
                .entry(key.clone())
                .or_insert_with(|| Slot::new(key.clone(), self.inner.policy.stale_after));
            slot.fetcher = Some(fetcher);
            let receiver = slot.state.subscribe();

            let pending = if slot.in_flight {
                counter!("crudboard_query_coalesced_total", "key" => key.to_string())
                    .increment(1);
                debug!(key = %key, "Joining in-flight query");
                None
            } else if slot.state.borrow().is_stale(now) {
                counter!("crudboard_query_miss_total", "key" => key.to_string()).increment(1);
                slot.begin_fetch(&key)
            } else {
                counter!("crudboard_query_hit_total", "key" => key.to_string()).increment(1);
                None
            };
            (receiver, pending)
        };

        if let Some(pending) = pending {
            Inner::spawn_fetch(Arc::clone(&self.inner), pending);
        }
        Subscription::new(receiver)
    }

    /// [`query`](Self::query), then wait until no fetch is in flight for the key.
    pub async fn fetch<T, F, Fut, E>(&self, key: impl Into<QueryKey>, fetcher: F) -> QueryEntry<T>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: StdError + Send + Sync + 'static,
    {
        let mut subscription = self.query(key, fetcher);
        subscription.settled().await
    }

    /// Mark `key` stale and refetch it now. When a fetch is already in flight,
    /// one follow-up fetch is queued behind it.
    ///
    /// Returns false when the key has never been queried.
    pub fn invalidate(&self, key: &str) -> bool {
        let pending = {
            let key = QueryKey::from(key);
            let mut slots = mutex_lock(&self.inner.slots, SOURCE, "invalidate");
            let Some(slot) = slots.get_mut(&key) else {
                return false;
            };

            slot.state.send_modify(|entry| entry.invalidated = true);
            if slot.in_flight {
                debug!(key = %key, "Queued refetch behind in-flight query");
                slot.refetch_queued = true;
                None
            } else {
                slot.begin_fetch(&key)
            }
        };

        if let Some(pending) = pending {
            Inner::spawn_fetch(Arc::clone(&self.inner), pending);
        }
        true
    }

    /// Current entry for `key` without triggering a fetch.
    pub fn peek<T: Send + Sync + 'static>(&self, key: &str) -> Option<QueryEntry<T>> {
        let slots = mutex_lock(&self.inner.slots, SOURCE, "peek");
        slots.get(key).map(|slot| slot.state.borrow().typed())
    }

    /// Observe `key` without registering a fetcher or triggering a fetch.
    pub fn subscribe<T: Send + Sync + 'static>(&self, key: &str) -> Option<Subscription<T>> {
        let slots = mutex_lock(&self.inner.slots, SOURCE, "subscribe");
        slots
            .get(key)
            .map(|slot| Subscription::new(slot.state.subscribe()))
    }
}

impl Inner {
    fn spawn_fetch(inner: Arc<Self>, pending: PendingFetch) {
        tokio::spawn(async move {
            let PendingFetch { key, seq, fetcher } = pending;
            let result = run_with_retry(&key, &fetcher, inner.policy.retry).await;
            Inner::settle(&inner, key, seq, result);
        });
    }

    fn settle(inner: &Arc<Self>, key: QueryKey, seq: u64, result: Result<AnyData, QueryError>) {
        let follow_up = {
            let mut slots = mutex_lock(&inner.slots, SOURCE, "settle");
            let Some(slot) = slots.get_mut(&key) else {
                return;
            };

            slot.in_flight = false;
            let refetch = std::mem::take(&mut slot.refetch_queued) && slot.fetcher.is_some();
            let newer = seq > slot.applied;
            if newer {
                slot.applied = seq;
            } else {
                debug!(key = %key, seq, applied = slot.applied, "Discarding superseded fetch result");
            }

            let now = Instant::now();
            slot.state.send_modify(|entry| {
                entry.is_fetching = refetch;
                if !newer {
                    return;
                }
                match result {
                    Ok(data) => {
                        entry.data = Some(data);
                        entry.status = QueryStatus::Success;
                        entry.error = None;
                        entry.last_fetched_at = Some(now);
                        entry.invalidated = refetch;
                    }
                    Err(error) => {
                        entry.status = QueryStatus::Error;
                        entry.error = Some(error);
                    }
                }
            });

            if refetch {
                // The entry already reports `is_fetching`; start the follow-up
                // without a second broadcast.
                slot.in_flight = true;
                slot.issued += 1;
                slot.fetcher.clone().map(|fetcher| PendingFetch {
                    key: key.clone(),
                    seq: slot.issued,
                    fetcher,
                })
            } else {
                None
            }
        };

        if let Some(pending) = follow_up {
            Inner::spawn_fetch(Arc::clone(inner), pending);
        }
    }
}

async fn run_with_retry(
    key: &QueryKey,
    fetcher: &ErasedFetcher,
    retry: RetryPolicy,
) -> Result<AnyData, QueryError> {
    let mut attempt = 0;
    loop {
        counter!("crudboard_query_fetch_total", "key" => key.to_string()).increment(1);
        // The fetcher itself may panic before handing back a future.
        let outcome = AssertUnwindSafe(async { fetcher().await })
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(QueryError::new(FetcherPanicked(key.clone()))));

        match outcome {
            Ok(data) => return Ok(data),
            Err(error) if attempt < retry.retries => {
                let delay = retry.delay_for(attempt);
                attempt += 1;
                warn!(
                    key = %key,
                    attempt,
                    retries = retry.retries,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %error,
                    "Query fetch failed; retrying"
                );
                sleep(delay).await;
            }
            Err(error) => {
                counter!("crudboard_query_fetch_error_total", "key" => key.to_string())
                    .increment(1);
                warn!(key = %key, attempts = attempt + 1, error = %error, "Query fetch failed");
                return Err(error);
            }
        }
    }
}

fn erase<T, F, Fut, E>(fetcher: F) -> ErasedFetcher
where
    T: Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    E: StdError + Send + Sync + 'static,
{
    Arc::new(move || {
        let future = fetcher();
        async move {
            future
                .await
                .map(|value| Arc::new(value) as AnyData)
                .map_err(QueryError::new)
        }
        .boxed()
    })
}

/// A live view of one key. Re-reads the shared entry on every call.
pub struct Subscription<T> {
    receiver: watch::Receiver<RawEntry>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Subscription<T> {
    fn clone(&self) -> Self {
        Self {
            receiver: self.receiver.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Send + Sync + 'static> Subscription<T> {
    fn new(receiver: watch::Receiver<RawEntry>) -> Self {
        Self {
            receiver,
            _marker: PhantomData,
        }
    }

    pub fn current(&self) -> QueryEntry<T> {
        self.receiver.borrow().typed()
    }

    /// Wait for the next change to the entry. Returns `None` once the cache
    /// has been dropped.
    pub async fn changed(&mut self) -> Option<QueryEntry<T>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().typed())
    }

    /// Wait until no fetch is in flight and return the resolved entry.
    pub async fn settled(&mut self) -> QueryEntry<T> {
        let settled = match self.receiver.wait_for(|entry| !entry.is_fetching).await {
            Ok(entry) => Some(entry.typed::<T>()),
            Err(_) => None,
        };
        settled.unwrap_or_else(|| self.current())
    }
}
