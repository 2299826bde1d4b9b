use std::sync::{Mutex, MutexGuard};

use tracing::warn;

/// Lock a mutex, recovering the guard if a previous holder panicked.
///
/// State transitions under these locks are small and self-contained, so a
/// poisoned lock still holds usable state; for the cache the worst case is an
/// entry stuck in `fetching` until the next invalidation.
pub(crate) fn mutex_lock<'a, T>(
    lock: &'a Mutex<T>,
    target: &'static str,
    op: &'static str,
) -> MutexGuard<'a, T> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!(
                op,
                target_module = target,
                lock_kind = "mutex.lock",
                result = "poisoned_recovered",
                "Recovered from poisoned lock"
            );
            poisoned.into_inner()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;

    #[test]
    fn poisoned_mutex_is_recovered() {
        let lock = Mutex::new(5_u32);
        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = lock.lock().expect("fresh lock");
            panic!("poison the lock");
        }));
        assert!(lock.is_poisoned());

        let guard = mutex_lock(&lock, "cache::lock::tests", "recover");
        assert_eq!(*guard, 5);
    }
}
