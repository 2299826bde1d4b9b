//! Query entries as seen by subscribers.

use std::any::Any;
use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tracing::warn;

use super::keys::QueryKey;

pub(crate) type AnyData = Arc<dyn Any + Send + Sync>;

/// Lifecycle of a cached dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// Created but no fetch has been started.
    Idle,
    /// First fetch in flight; no data yet.
    Loading,
    Success,
    Error,
}

impl QueryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            QueryStatus::Idle => "idle",
            QueryStatus::Loading => "loading",
            QueryStatus::Success => "success",
            QueryStatus::Error => "error",
        }
    }
}

/// Failure recorded on an entry. Cheap to clone; keeps the fetcher's error
/// as its source so callers can downcast to the concrete type.
#[derive(Debug, Clone, Error)]
#[error(transparent)]
pub struct QueryError(Arc<dyn StdError + Send + Sync>);

impl QueryError {
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self(Arc::new(error))
    }

    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.0.downcast_ref::<E>()
    }
}

/// Type-erased entry state broadcast to subscribers.
#[derive(Clone)]
pub(crate) struct RawEntry {
    pub(crate) key: QueryKey,
    pub(crate) data: Option<AnyData>,
    pub(crate) status: QueryStatus,
    pub(crate) error: Option<QueryError>,
    pub(crate) is_fetching: bool,
    pub(crate) last_fetched_at: Option<Instant>,
    pub(crate) stale_after: Duration,
    pub(crate) invalidated: bool,
}

impl RawEntry {
    pub(crate) fn new(key: QueryKey, stale_after: Duration) -> Self {
        Self {
            key,
            data: None,
            status: QueryStatus::Idle,
            error: None,
            is_fetching: false,
            last_fetched_at: None,
            stale_after,
            invalidated: false,
        }
    }

    /// Whether the next query should revalidate this entry.
    pub(crate) fn is_stale(&self, now: Instant) -> bool {
        match self.last_fetched_at {
            _ if self.invalidated => true,
            None => true,
            Some(fetched_at) => now.saturating_duration_since(fetched_at) > self.stale_after,
        }
    }

    pub(crate) fn typed<T: Send + Sync + 'static>(&self) -> QueryEntry<T> {
        let data = self.data.clone().and_then(|data| match data.downcast::<T>() {
            Ok(typed) => Some(typed),
            Err(_) => {
                warn!(
                    key = %self.key,
                    expected = std::any::type_name::<T>(),
                    "Cached data has a different type than requested"
                );
                None
            }
        });

        QueryEntry {
            key: self.key.clone(),
            data,
            status: self.status,
            error: self.error.clone(),
            is_fetching: self.is_fetching,
            last_fetched_at: self.last_fetched_at,
            stale_after: self.stale_after,
            invalidated: self.invalidated,
        }
    }
}

/// A point-in-time view of one cached dataset.
#[derive(Debug, Clone)]
pub struct QueryEntry<T> {
    pub key: QueryKey,
    pub data: Option<Arc<T>>,
    pub status: QueryStatus,
    pub error: Option<QueryError>,
    /// A fetch for this key is in flight (first load or revalidation).
    pub is_fetching: bool,
    /// When the data was last replaced by a successful fetch.
    pub last_fetched_at: Option<Instant>,
    pub stale_after: Duration,
    pub invalidated: bool,
}

impl<T> QueryEntry<T> {
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn fresh_entry_is_stale_until_fetched() {
        let now = Instant::now();
        let mut entry = RawEntry::new(QueryKey::from("users"), Duration::from_secs(60));
        assert!(entry.is_stale(now));

        entry.last_fetched_at = Some(now);
        assert!(!entry.is_stale(now));
        assert!(entry.is_stale(now + Duration::from_secs(61)));

        entry.invalidated = true;
        assert!(entry.is_stale(now));
    }

    #[test]
    fn typed_view_downcasts_data() {
        let mut entry = RawEntry::new(QueryKey::from("numbers"), Duration::from_secs(60));
        entry.data = Some(Arc::new(vec![1_u32, 2, 3]));
        entry.status = QueryStatus::Success;

        let typed = entry.typed::<Vec<u32>>();
        assert_eq!(typed.data.as_deref(), Some(&vec![1, 2, 3]));
        assert!(typed.is_success());

        let mismatched = entry.typed::<String>();
        assert!(mismatched.data.is_none());
    }

    #[test]
    fn query_error_keeps_source_type() {
        let error = QueryError::new(io::Error::new(io::ErrorKind::TimedOut, "slow"));
        let cloned = error.clone();
        assert_eq!(cloned.to_string(), "slow");
        assert!(cloned.downcast_ref::<io::Error>().is_some());
    }
}
