// TTL-bounded holiday snapshot cache
// Holds the last successful holiday list and reports a miss once it is older than the TTL

use crate::holiday::Holiday;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// The complete holiday list as of the last successful refresh.
pub type Snapshot = Arc<Vec<Holiday>>;

// Source of the current instant, so staleness can be tested without sleeping
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.offset.lock()
    }
}

impl<C: Clock> Clock for Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub ttl_seconds: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 24 * 60 * 60,
        }
    }
}

#[derive(Debug, Default)]
pub struct CacheStats {
    pub hit_count: AtomicUsize,
    pub miss_count: AtomicUsize,
    pub expired_count: AtomicUsize,
    pub set_count: AtomicUsize,
    pub invalidation_count: AtomicUsize,
    pub items_count: AtomicUsize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStatsReport {
    pub hit_count: usize,
    pub miss_count: usize,
    pub expired_count: usize,
    pub set_count: usize,
    pub invalidation_count: usize,
    pub items_count: usize,
}

// Cache seam used by the service
pub trait SnapshotCache: Send + Sync + 'static {
    // Returns the snapshot and true while it is non-empty and younger than the TTL,
    // otherwise an empty snapshot and false
    fn get(&self) -> (Snapshot, bool);

    // Replaces the whole snapshot and restarts its freshness window
    fn set(&self, holidays: Snapshot);

    // Drops the snapshot so the next get misses regardless of age
    fn invalidate(&self);

    // Age of the stored snapshot, None if it was never populated or was invalidated
    fn age(&self) -> Option<Duration>;

    fn stats(&self) -> CacheStatsReport;
}

struct CacheEntry {
    holidays: Snapshot,
    last_update: Option<Instant>,
}

impl CacheEntry {
    fn empty() -> Self {
        Self {
            holidays: Arc::new(Vec::new()),
            last_update: None,
        }
    }
}

pub struct HolidayCache<C: Clock = SystemClock> {
    entry: RwLock<CacheEntry>,
    ttl: Duration,
    clock: C,
    stats: CacheStats,
}

impl HolidayCache<SystemClock> {
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> HolidayCache<C> {
    pub fn with_clock(config: CacheConfig, clock: C) -> Self {
        Self {
            entry: RwLock::new(CacheEntry::empty()),
            ttl: config.ttl(),
            clock,
            stats: CacheStats::default(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl<C: Clock> SnapshotCache for HolidayCache<C> {
    fn get(&self) -> (Snapshot, bool) {
        let now = self.clock.now();
        let entry = self.entry.read();

        let fresh = entry
            .last_update
            .map(|updated| now.saturating_duration_since(updated) < self.ttl);

        match fresh {
            Some(true) if !entry.holidays.is_empty() => {
                self.stats.hit_count.fetch_add(1, Ordering::Relaxed);
                (Arc::clone(&entry.holidays), true)
            }
            _ => {
                if fresh == Some(false) {
                    debug!("holiday snapshot older than {:?}, reporting miss", self.ttl);
                    self.stats.expired_count.fetch_add(1, Ordering::Relaxed);
                }
                self.stats.miss_count.fetch_add(1, Ordering::Relaxed);
                (Arc::new(Vec::new()), false)
            }
        }
    }

    fn set(&self, holidays: Snapshot) {
        let now = self.clock.now();

        // items_count is updated under the write lock so it always matches the entry
        let mut entry = self.entry.write();
        self.stats.items_count.store(holidays.len(), Ordering::Relaxed);
        entry.holidays = holidays;
        entry.last_update = Some(now);
        drop(entry);

        self.stats.set_count.fetch_add(1, Ordering::Relaxed);
    }

    fn invalidate(&self) {
        let mut entry = self.entry.write();
        *entry = CacheEntry::empty();
        self.stats.items_count.store(0, Ordering::Relaxed);
        drop(entry);

        self.stats.invalidation_count.fetch_add(1, Ordering::Relaxed);
    }

    fn age(&self) -> Option<Duration> {
        let now = self.clock.now();
        self.entry
            .read()
            .last_update
            .map(|updated| now.saturating_duration_since(updated))
    }

    fn stats(&self) -> CacheStatsReport {
        CacheStatsReport {
            hit_count: self.stats.hit_count.load(Ordering::Relaxed),
            miss_count: self.stats.miss_count.load(Ordering::Relaxed),
            expired_count: self.stats.expired_count.load(Ordering::Relaxed),
            set_count: self.stats.set_count.load(Ordering::Relaxed),
            invalidation_count: self.stats.invalidation_count.load(Ordering::Relaxed),
            items_count: self.stats.items_count.load(Ordering::Relaxed),
        }
    }
}
