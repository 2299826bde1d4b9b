//! Query cache policy.
//!
//! Controls staleness and read retries; populated from the `[query]` section
//! of `crudboard.toml`.

use std::time::Duration;

const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(5 * 60);
const DEFAULT_RETRIES: u32 = 2;
const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_millis(1000);
const DEFAULT_RETRY_MAX_DELAY: Duration = Duration::from_millis(30_000);

/// How often a failed read is retried and how long to wait between attempts.
///
/// The delay before retry `n` (zero-based) is `base_delay * 2^n`, capped at
/// `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            base_delay: DEFAULT_RETRY_BASE_DELAY,
            max_delay: DEFAULT_RETRY_MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Never retry; the first failure settles the entry.
    pub fn none() -> Self {
        Self {
            retries: 0,
            ..Self::default()
        }
    }

    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1_u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

/// Cache-wide policy applied to every key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryPolicy {
    /// Age after which a settled entry is revalidated on the next query.
    pub stale_after: Duration,
    pub retry: RetryPolicy,
}

impl Default for QueryPolicy {
    fn default() -> Self {
        Self {
            stale_after: DEFAULT_STALE_AFTER,
            retry: RetryPolicy::default(),
        }
    }
}

impl From<&crate::config::QuerySettings> for QueryPolicy {
    fn from(settings: &crate::config::QuerySettings) -> Self {
        Self {
            stale_after: settings.stale_after,
            retry: RetryPolicy {
                retries: settings.retries,
                base_delay: settings.retry_base_delay,
                max_delay: settings.retry_max_delay,
            },
        }
    }
}
