//! Time-bounded memoisation of the merged snapshot.
//!
//! The cache holds one slot. Readers get an `Arc` to the current snapshot;
//! refreshes build a whole new snapshot and swap it in, so a reader never
//! sees a half-built one.

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::fetch::FeedSource;
use crate::snapshot::{Snapshot, build_snapshot};

pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

/// Source of "now" for cache ageing.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock(Arc<StdMutex<DateTime<Utc>>>);

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self(Arc::new(StdMutex::new(start)))
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.0.lock().unwrap_or_else(|e| e.into_inner());
        *now += TimeDelta::from_std(by).unwrap_or(TimeDelta::MAX);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap_or_else(|e| e.into_inner())
    }
}

pub struct SnapshotCache {
    source: Box<dyn FeedSource>,
    clock: Box<dyn Clock>,
    ttl: TimeDelta,
    slot: RwLock<Option<Arc<Snapshot>>>,
    refresh_lock: Mutex<()>,
}

impl SnapshotCache {
    pub fn new(source: impl FeedSource + 'static, ttl: Duration) -> Self {
        Self::with_clock(source, ttl, SystemClock)
    }

    pub fn with_clock(
        source: impl FeedSource + 'static,
        ttl: Duration,
        clock: impl Clock + 'static,
    ) -> Self {
        Self {
            source: Box::new(source),
            clock: Box::new(clock),
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
            slot: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Current snapshot, refreshing it first when missing or older than the TTL.
    ///
    /// Refreshes are serialised, and a caller that waited on another caller's
    /// refresh reuses its result instead of fetching again.
    pub async fn get(&self) -> Arc<Snapshot> {
        if let Some(snapshot) = self.fresh().await {
            debug!("Snapshot cache hit");
            return snapshot;
        }

        let _guard = self.refresh_lock.lock().await;
        if let Some(snapshot) = self.fresh().await {
            return snapshot;
        }
        self.refresh_locked().await
    }

    /// Runs a fetch cycle unconditionally and stores the result.
    pub async fn refresh(&self) -> Arc<Snapshot> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    async fn refresh_locked(&self) -> Arc<Snapshot> {
        debug!("Refreshing snapshot cache");
        let snapshot = Arc::new(build_snapshot(self.source.as_ref(), self.clock.as_ref()).await);
        *self.slot.write().await = Some(snapshot.clone());
        snapshot
    }

    async fn fresh(&self) -> Option<Arc<Snapshot>> {
        let slot = self.slot.read().await;
        let snapshot = slot.as_ref()?;
        let age = self.clock.now() - snapshot.fetched_at;
        (age >= TimeDelta::zero() && age < self.ttl).then(|| snapshot.clone())
    }
}
