//! Scheduler: runs collection cycles on a runtime-adjustable interval and
//! publishes each snapshot to every subscriber.
//!
//! Invariants:
//! - at most one collection in flight; a tick that lands mid-cycle is
//!   dropped, not queued
//! - `current` is replaced atomically with a fully-formed snapshot;
//!   readers only ever hold `Arc` clones
//! - a cycle started against a broker target that was swapped mid-flight
//!   is discarded unpublished (epoch tag)
//! - a failed cycle keeps the previous topics/groups, stamped with the
//!   error and a fresh timestamp

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::{broadcast, Notify};
use tracing::{debug, info, warn};

use crate::error::MonitorError;
use crate::kafka::{AdminFactory, ClusterAdmin};
use crate::snapshot::builder::CollectorConfig;
use crate::snapshot::{ClusterSnapshot, SnapshotBuilder};

/// Upper bound for the client-adjustable refresh interval (one day).
pub const MAX_REFRESH_SECS: u64 = 86_400;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub refresh_interval_ms: u64,
    pub cycle_timeout_ms: u64,
    pub collector: CollectorConfig,
}

/// Fan-out events for the realtime channel.
#[derive(Clone, Debug)]
pub enum StatusEvent {
    Status(Arc<ClusterSnapshot>),
    /// New process-wide refresh interval, in seconds.
    RefreshRateChanged(u64),
}

pub struct Scheduler {
    factory: AdminFactory,
    admin: RwLock<Arc<dyn ClusterAdmin>>,
    brokers: RwLock<String>,
    config: SchedulerConfig,
    interval_ms: AtomicU64,
    in_flight: AtomicBool,
    /// Bumped on every target swap; cycles carry the epoch they started
    /// under and results from an older epoch are discarded.
    epoch: AtomicU64,
    current: RwLock<Arc<ClusterSnapshot>>,
    has_snapshot: AtomicBool,
    events: broadcast::Sender<StatusEvent>,
    rearm: Notify,
}

impl Scheduler {
    pub fn new(factory: AdminFactory, brokers: impl Into<String>, config: SchedulerConfig) -> Self {
        let brokers = brokers.into();
        let admin = factory(&brokers);
        let (events, _) = broadcast::channel(32);
        let interval_ms = config.refresh_interval_ms;
        Self {
            factory,
            admin: RwLock::new(admin),
            brokers: RwLock::new(brokers),
            config,
            interval_ms: AtomicU64::new(interval_ms),
            in_flight: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
            current: RwLock::new(Arc::new(ClusterSnapshot::empty())),
            has_snapshot: AtomicBool::new(false),
            events,
            rearm: Notify::new(),
        }
    }

    /// Arm the repeating timer. Interval changes and target swaps re-arm it
    /// from zero.
    pub fn start(self: &Arc<Self>) {
        let scheduler = self.clone();
        tokio::spawn(async move {
            info!(
                interval_ms = scheduler.interval_ms.load(Ordering::Relaxed),
                "periodic collection started"
            );
            loop {
                let interval =
                    Duration::from_millis(scheduler.interval_ms.load(Ordering::Relaxed));
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {
                        scheduler.tick().await;
                    }
                    _ = scheduler.rearm.notified() => {
                        // Timer restarted with the new interval/target.
                    }
                }
            }
        });
    }

    /// Run one collection cycle. Returns false when the tick was dropped
    /// (a cycle was already in flight) or its result was discarded as
    /// stale.
    pub async fn tick(&self) -> bool {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("previous collection still in progress, skipping tick");
            return false;
        }

        let epoch = self.epoch.load(Ordering::Acquire);
        let (admin, brokers) = {
            (self.admin.read().clone(), self.brokers.read().clone())
        };

        let builder = SnapshotBuilder::new(admin, &brokers, self.config.collector.clone());
        let deadline = Duration::from_millis(self.config.cycle_timeout_ms);
        let outcome = match tokio::time::timeout(deadline, builder.collect()).await {
            Ok(result) => result,
            Err(_) => Err(MonitorError::connectivity(
                "collection cycle",
                format!("cycle exceeded {:?} deadline", deadline),
            )),
        };

        if epoch != self.epoch.load(Ordering::Acquire) {
            debug!("discarding cycle result for superseded broker target");
            self.in_flight.store(false, Ordering::Release);
            return false;
        }

        match outcome {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                *self.current.write() = snapshot.clone();
                self.has_snapshot.store(true, Ordering::Release);
                let _ = self.events.send(StatusEvent::Status(snapshot));
            }
            Err(e) => {
                warn!(error = %e, "collection cycle failed");
                let degraded = {
                    let previous = self.current.read().clone();
                    Arc::new(ClusterSnapshot::degraded(&previous, e.to_string()))
                };
                *self.current.write() = degraded.clone();
                let _ = self.events.send(StatusEvent::Status(degraded));
            }
        }
        // Released only after the publish: a tick admitted earlier must
        // never observe a newer snapshot in `current` and overwrite it
        // with an older one.
        self.in_flight.store(false, Ordering::Release);
        true
    }

    /// Latest published snapshot (possibly the empty startup state).
    pub fn current_snapshot(&self) -> Arc<ClusterSnapshot> {
        self.current.read().clone()
    }

    /// Snapshot for a newly-connected subscriber: triggers one on-demand
    /// cycle only if none has ever succeeded.
    pub async fn ensure_snapshot(&self) -> Arc<ClusterSnapshot> {
        if !self.has_snapshot.load(Ordering::Acquire) {
            self.tick().await;
        }
        self.current_snapshot()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.events.subscribe()
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_ms.load(Ordering::Relaxed) / 1000
    }

    /// Change the process-wide refresh interval. Takes effect on the next
    /// tick boundary; the change is broadcast so every subscriber can
    /// reflect the new cadence. The value arrives from any authenticated
    /// realtime client, so it is range-checked here.
    pub fn set_interval_secs(&self, secs: u64) -> Result<(), MonitorError> {
        if secs == 0 || secs > MAX_REFRESH_SECS {
            return Err(MonitorError::validation(format!(
                "refresh interval must be between 1 and {} seconds",
                MAX_REFRESH_SECS
            )));
        }
        let interval_ms = secs * 1000;
        if self.interval_ms.swap(interval_ms, Ordering::Relaxed) != interval_ms {
            info!(interval_secs = secs, "refresh interval changed");
            self.rearm.notify_waiters();
            let _ = self.events.send(StatusEvent::RefreshRateChanged(secs));
        }
        Ok(())
    }

    pub fn current_brokers(&self) -> String {
        self.brokers.read().clone()
    }

    /// Swap the active broker target. The new target is test-connected
    /// first; on failure the old target stays active. On success the cached
    /// snapshot is invalidated and the timer restarts from zero.
    pub async fn change_target(&self, new_brokers: &str) -> Result<(), MonitorError> {
        let new_brokers = new_brokers.trim();
        if new_brokers.is_empty() {
            return Err(MonitorError::validation("broker list must not be empty"));
        }

        let candidate = (self.factory)(new_brokers);
        candidate.describe_cluster().await?;

        {
            *self.admin.write() = candidate;
            *self.brokers.write() = new_brokers.to_string();
        }
        self.epoch.fetch_add(1, Ordering::AcqRel);
        *self.current.write() = Arc::new(ClusterSnapshot::empty());
        self.has_snapshot.store(false, Ordering::Release);
        self.rearm.notify_waiters();
        info!(brokers = %new_brokers, "active broker target changed");
        Ok(())
    }

    /// Read access for on-demand paths (topic detail, message probe) that
    /// must hit the currently-active target.
    pub fn active_admin(&self) -> Arc<dyn ClusterAdmin> {
        self.admin.read().clone()
    }
}
