//! A generic TTL-memoized value with coalesced concurrent refresh.

use std::future::Future;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use voltra_cluster::ClusterError;

/// A value read from [`TtlCache::get`], annotated with whether it came from
/// a fresh fetch or is being served stale after a failed refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cached<T> {
    pub value: T,
    pub is_stale: bool,
}

struct Entry<T> {
    value: T,
    fetched_at: Instant,
}

/// Memoizes the result of an async fetch for `ttl`, coalescing concurrent
/// refreshes behind one mutex so a TTL expiry under concurrent load produces
/// exactly one underlying request (§4.E, §8 "Caching bound").
///
/// The mutex is held across the fetch itself rather than storing a separate
/// in-flight-future handle: a caller that arrives while a refresh is already
/// running simply waits for the lock, and by the time it acquires the lock
/// the entry is already fresh again, so it never triggers a second fetch.
/// Externally this is indistinguishable from sharing the in-flight future.
pub struct TtlCache<T> {
    ttl: Duration,
    state: Mutex<Option<Entry<T>>>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            state: Mutex::new(None),
        }
    }

    /// Returns the cached value if fresh; otherwise awaits `fetch` to
    /// refresh it. On fetch failure, falls back to the last successful
    /// value marked `is_stale`; if there has never been one, propagates the
    /// error.
    pub async fn get<F, Fut>(&self, fetch: F) -> Result<Cached<T>, ClusterError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ClusterError>>,
    {
        let mut state = self.state.lock().await;
        if let Some(entry) = state.as_ref() {
            if entry.fetched_at.elapsed() < self.ttl {
                return Ok(Cached {
                    value: entry.value.clone(),
                    is_stale: false,
                });
            }
        }

        match fetch().await {
            Ok(value) => {
                *state = Some(Entry {
                    value: value.clone(),
                    fetched_at: Instant::now(),
                });
                Ok(Cached {
                    value,
                    is_stale: false,
                })
            }
            Err(err) => match state.as_ref() {
                Some(entry) => Ok(Cached {
                    value: entry.value.clone(),
                    is_stale: true,
                }),
                None => Err(err),
            },
        }
    }

    /// Forces the next [`Self::get`] to refresh regardless of TTL.
    pub async fn invalidate(&self) {
        *self.state.lock().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn fresh_entry_is_returned_without_refetching() {
        let cache = TtlCache::new(Duration::from_secs(60));
        let calls = Arc::new(AtomicUsize::new(0));

        let fetch = || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ClusterError>(42)
            }
        };
        cache.get(fetch).await.unwrap();
        cache.get(fetch).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entry_triggers_exactly_one_refetch() {
        let cache = TtlCache::new(Duration::from_millis(10));
        let calls = Arc::new(AtomicUsize::new(0));
        let fetch = || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ClusterError>(7)
            }
        };
        cache.get(fetch).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let result = cache.get(fetch).await.unwrap();
        assert_eq!(result.value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_refresh_serves_stale_value() {
        let cache = TtlCache::new(Duration::from_millis(1));
        cache
            .get(|| async { Ok::<_, ClusterError>(1) })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let result = cache
            .get(|| async { Err::<i32, _>(ClusterError::NoMaster) })
            .await
            .unwrap();
        assert_eq!(result.value, 1);
        assert!(result.is_stale);
    }

    #[tokio::test]
    async fn failure_with_no_prior_success_propagates() {
        let cache: TtlCache<i32> = TtlCache::new(Duration::from_secs(1));
        let err = cache
            .get(|| async { Err::<i32, _>(ClusterError::NoMaster) })
            .await
            .unwrap_err();
        assert!(matches!(err, ClusterError::NoMaster));
    }

    #[tokio::test]
    async fn concurrent_expired_access_produces_one_refetch() {
        // TTL is generous relative to the fetch delay below so that, once the
        // first waiter's refresh lands, every other waiter's freshness check
        // is unambiguously inside the window rather than racing it.
        let cache = Arc::new(TtlCache::new(Duration::from_millis(500)));
        cache
            .get(|| async { Ok::<_, ClusterError>(0) })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(520)).await;

        let calls = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .get(|| {
                        let calls = Arc::clone(&calls);
                        async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            Ok::<_, ClusterError>(1)
                        }
                    })
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
