// Holiday lookup used by the HTTP layer: cache first, refresh from the source on a miss
use crate::cache::{CacheStatsReport, Snapshot, SnapshotCache};
use crate::source::{HolidaySource, RowFetcher, SourceError};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

// One upstream refresh, shared by every caller that missed while it was running
type Flight = Shared<BoxFuture<'static, Result<Snapshot, SourceError>>>;

pub struct HolidayService<C: SnapshotCache, F: RowFetcher> {
    cache: Arc<C>,
    source: Arc<HolidaySource<F>>,
    // Cleared by the flight itself once its outcome is known
    in_flight: Arc<Mutex<Option<Flight>>>,
}

impl<C: SnapshotCache, F: RowFetcher> HolidayService<C, F> {
    pub fn new(cache: Arc<C>, source: HolidaySource<F>) -> Self {
        Self {
            cache,
            source: Arc::new(source),
            in_flight: Arc::new(Mutex::new(None)),
        }
    }

    /// Returns the cached holidays, refreshing them from the source on a miss.
    ///
    /// Callers that miss while a refresh is running join it and receive its
    /// outcome, success or error, so one upstream fetch answers all of them. A
    /// failed refresh stores nothing and is not retried; the next miss starts a
    /// new one.
    pub async fn get_holidays(&self) -> Result<Snapshot, SourceError> {
        let (snapshot, found) = self.cache.get();
        if found {
            debug!("cache hit, serving {} holidays", snapshot.len());
            return Ok(snapshot);
        }

        let flight = {
            let mut in_flight = self.in_flight.lock();

            // A flight may have finished between the first lookup and taking the lock
            let (snapshot, found) = self.cache.get();
            if found {
                debug!("refreshed by a concurrent request, serving {} holidays", snapshot.len());
                return Ok(snapshot);
            }

            match in_flight.as_ref() {
                Some(flight) => {
                    debug!("joining holiday refresh already in flight");
                    flight.clone()
                }
                None => {
                    let flight = self.start_refresh();
                    *in_flight = Some(flight.clone());
                    flight
                }
            }
        };

        flight.await
    }

    fn start_refresh(&self) -> Flight {
        let cache = Arc::clone(&self.cache);
        let source = Arc::clone(&self.source);
        let in_flight = Arc::clone(&self.in_flight);

        async move {
            info!("no cached holidays, fetching from source");
            let result = source.fetch_holidays().await.map(Arc::new);
            match &result {
                Ok(snapshot) => {
                    cache.set(Arc::clone(snapshot));
                    info!("holidays fetched and stored in cache: {} holidays", snapshot.len());
                }
                Err(err) => warn!("error fetching holidays: {}", err),
            }
            *in_flight.lock() = None;
            result
        }
        .boxed()
        .shared()
    }

    pub fn invalidate(&self) {
        self.cache.invalidate();
    }

    pub fn cache_stats(&self) -> CacheStatsReport {
        self.cache.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheConfig, HolidayCache, ManualClock};
    use crate::holiday::RawRow;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    // Replays scripted fetch outcomes and counts calls
    struct ScriptedFetcher {
        outcomes: parking_lot::Mutex<VecDeque<Result<Vec<RawRow>, SourceError>>>,
        calls: Arc<AtomicUsize>,
        delay: Duration,
    }

    impl ScriptedFetcher {
        fn new(outcomes: Vec<Result<Vec<RawRow>, SourceError>>) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let fetcher = Self {
                outcomes: parking_lot::Mutex::new(outcomes.into()),
                calls: Arc::clone(&calls),
                delay: Duration::ZERO,
            };
            (fetcher, calls)
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    #[async_trait]
    impl RowFetcher for ScriptedFetcher {
        async fn fetch_rows(&self) -> Result<Vec<RawRow>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.outcomes
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(SourceError::Fetch("no more scripted responses".into())))
        }
    }

    fn navidad() -> Vec<RawRow> {
        vec![
            RawRow::from(("25 de diciembre", "Navidad")),
            RawRow::from(("bad text", "???")),
        ]
    }

    fn service_with(
        fetcher: ScriptedFetcher,
        ttl_seconds: u64,
    ) -> (
        HolidayService<HolidayCache<Arc<ManualClock>>, ScriptedFetcher>,
        Arc<ManualClock>,
    ) {
        let clock = Arc::new(ManualClock::new());
        let cache = Arc::new(HolidayCache::with_clock(
            CacheConfig { ttl_seconds },
            Arc::clone(&clock),
        ));
        (HolidayService::new(cache, HolidaySource::new(fetcher)), clock)
    }

    #[tokio::test]
    async fn test_miss_fetches_then_hit_serves_cache() {
        let (fetcher, calls) = ScriptedFetcher::new(vec![Ok(navidad())]);
        let (service, _clock) = service_with(fetcher, 3600);

        let first = service.get_holidays().await.unwrap();
        let second = service.get_holidays().await.unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(first[0].description, "Navidad");
        assert_eq!(*first, *second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let stats = service.cache_stats();
        assert_eq!(stats.set_count, 1);
        assert_eq!(stats.hit_count, 1);
    }

    #[tokio::test]
    async fn test_refetches_after_ttl() {
        let (fetcher, calls) = ScriptedFetcher::new(vec![Ok(navidad()), Ok(navidad())]);
        let (service, clock) = service_with(fetcher, 60);

        service.get_holidays().await.unwrap();
        clock.advance(Duration::from_secs(61));
        service.get_holidays().await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let (fetcher, calls) = ScriptedFetcher::new(vec![Ok(navidad()), Ok(navidad())]);
        let (service, _clock) = service_with(fetcher, 3600);

        service.get_holidays().await.unwrap();
        service.invalidate();
        service.get_holidays().await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_propagates_and_is_not_cached() {
        let (fetcher, calls) = ScriptedFetcher::new(vec![
            Err(SourceError::ParseDocument("truncated body".into())),
            Ok(navidad()),
        ]);
        let (service, _clock) = service_with(fetcher, 3600);

        let err = service.get_holidays().await.unwrap_err();
        assert!(matches!(err, SourceError::ParseDocument(_)));
        assert_eq!(service.cache_stats().set_count, 0);

        // The service stays usable and the next request refreshes again
        let holidays = service.get_holidays().await.unwrap();
        assert_eq!(holidays.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_result_is_stored_but_never_hits() {
        let (fetcher, calls) = ScriptedFetcher::new(vec![Ok(vec![]), Ok(navidad())]);
        let (service, _clock) = service_with(fetcher, 3600);

        assert!(service.get_holidays().await.unwrap().is_empty());
        assert_eq!(service.get_holidays().await.unwrap().len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_served_snapshot_is_the_cached_one() {
        let (fetcher, _calls) = ScriptedFetcher::new(vec![Ok(navidad())]);
        let (service, _clock) = service_with(fetcher, 3600);

        let fetched = service.get_holidays().await.unwrap();
        let cached = service.get_holidays().await.unwrap();

        assert!(Arc::ptr_eq(&fetched, &cached));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_misses_share_one_failed_fetch() {
        let (fetcher, calls) = ScriptedFetcher::new(vec![
            Err(SourceError::Fetch("operation timed out".into())),
            Ok(navidad()),
        ]);
        let (service, _clock) =
            service_with(fetcher.with_delay(Duration::from_millis(200)), 3600);
        let service = Arc::new(service);

        let started = std::time::Instant::now();
        let requests = (0..8).map(|_| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.get_holidays().await })
        });
        let results = futures::future::join_all(requests).await;
        let elapsed = started.elapsed();

        for result in results {
            let err = result.unwrap().unwrap_err();
            assert!(matches!(err, SourceError::Fetch(_)));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        // Every caller waited for the same fetch, not for one fetch each
        assert!(elapsed < Duration::from_millis(800), "took {:?}", elapsed);

        // The failed flight is gone, so the next miss refreshes again
        assert_eq!(service.get_holidays().await.unwrap().len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_misses_fetch_once() {
        let (fetcher, calls) = ScriptedFetcher::new(vec![Ok(navidad())]);
        let (service, _clock) = service_with(fetcher.with_delay(Duration::from_millis(50)), 3600);
        let service = Arc::new(service);

        let requests = (0..16).map(|_| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.get_holidays().await })
        });
        let results = futures::future::join_all(requests).await;

        for result in results {
            let holidays = result.unwrap().unwrap();
            assert_eq!(holidays.len(), 1);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
