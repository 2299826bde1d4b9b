//! Query cache for remote collections.
//!
//! Reads go through [`QueryCache::query`], which serves the cached entry
//! immediately and revalidates it in the background when it is stale:
//!
//! - at most one fetch per key is in flight; concurrent queries join it
//! - failed reads are retried per [`RetryPolicy`] before the entry settles in
//!   `Error`, and a failure never clears previously loaded data
//! - [`QueryCache::invalidate`] forces a refetch after a related write
//!
//! ## Configuration
//!
//! ```toml
//! [query]
//! stale_after_seconds = 300
//! retries = 2
//! retry_base_delay_ms = 1000
//! retry_max_delay_ms = 30000
//! ```

mod client;
mod config;
mod entry;
mod keys;
mod lock;

pub use client::{QueryCache, Subscription};
pub use config::{QueryPolicy, RetryPolicy};
pub use entry::{QueryEntry, QueryError, QueryStatus};
pub use keys::QueryKey;

pub(crate) use lock::mutex_lock;
