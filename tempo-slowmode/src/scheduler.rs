use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use tempo_database::{ActivityStore, ConfigStore};

use crate::clock::Clock;
use crate::reconcile::Reconciler;
use crate::remote::ChannelRemote;

/// Owns the background reconcile and prune tasks and their shutdown signal.
pub struct SlowmodeScheduler {
    shutdown: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    drain_timeout: Duration,
}

impl SlowmodeScheduler {
    pub fn new(drain_timeout: Duration) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            shutdown,
            tasks: Mutex::new(Vec::new()),
            drain_timeout,
        }
    }

    pub fn is_stopping(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Spawn the reconcile loop and the prune loop. Cycles never overlap: the
    /// next tick is only awaited once the previous cycle returned.
    pub fn start<S, R, K>(&self, reconciler: Reconciler<S, R, K>)
    where
        S: ConfigStore + ActivityStore + 'static,
        R: ChannelRemote + 'static,
        K: Clock + 'static,
    {
        if self.is_stopping() {
            warn!("slowmode scheduler is stopping, not starting loops");
            return;
        }

        let reconciler = Arc::new(reconciler);
        let interval = reconciler.settings().interval;
        let prune_interval = reconciler.settings().prune_interval;
        info!(
            interval_secs = interval.as_secs(),
            prune_interval_secs = prune_interval.as_secs(),
            "starting auto-slowmode loops"
        );

        let reconcile_task = {
            let reconciler = Arc::clone(&reconciler);
            let mut shutdown = self.shutdown.subscribe();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

                loop {
                    tokio::select! {
                        _ = ticker.tick() => {}
                        _ = shutdown.changed() => break,
                    }
                    if *shutdown.borrow() {
                        break;
                    }

                    let report = reconciler.run_cycle(&shutdown).await;
                    debug!(?report, "auto-slowmode cycle finished");
                    if report.interrupted {
                        break;
                    }
                }

                debug!("auto-slowmode loop stopped");
            })
        };

        let prune_task = {
            let mut shutdown = self.shutdown.subscribe();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(prune_interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

                loop {
                    tokio::select! {
                        _ = ticker.tick() => {}
                        _ = shutdown.changed() => break,
                    }
                    if *shutdown.borrow() {
                        break;
                    }

                    if let Err(source) = reconciler.prune_activity().await {
                        error!(?source, "failed to prune channel activity");
                    }
                }

                debug!("activity prune loop stopped");
            })
        };

        self.tasks.lock().extend([reconcile_task, prune_task]);
    }

    /// Signal both loops, then wait up to the drain timeout for the in-flight
    /// cycle to finish. Stragglers are aborted.
    pub async fn shutdown(&self) {
        self.shutdown.send_replace(true);

        let tasks = std::mem::take(&mut *self.tasks.lock());
        if tasks.is_empty() {
            return;
        }

        let aborts: Vec<_> = tasks.iter().map(JoinHandle::abort_handle).collect();
        let drain = async {
            for task in tasks {
                match task.await {
                    Err(source) if source.is_panic() => {
                        error!(?source, "auto-slowmode task panicked");
                    }
                    _ => {}
                }
            }
        };

        if tokio::time::timeout(self.drain_timeout, drain).await.is_err() {
            warn!(
                timeout_secs = self.drain_timeout.as_secs(),
                "auto-slowmode loops did not drain in time, aborting"
            );
            for abort in aborts {
                abort.abort();
            }
        } else {
            info!("auto-slowmode loops stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tempo_database::{ConfigStore, MemoryStore};

    use super::SlowmodeScheduler;
    use crate::reconcile::Reconciler;
    use crate::settings::SlowmodeSettings;
    use crate::testing::{FakeRemote, ManualClock, test_settings};
    use crate::tracker::RateTracker;

    fn fast_settings() -> SlowmodeSettings {
        SlowmodeSettings {
            interval: Duration::from_millis(20),
            prune_interval: Duration::from_millis(20),
            ..test_settings()
        }
    }

    #[tokio::test]
    async fn loop_applies_slowmode_and_stops_on_shutdown() {
        let store = MemoryStore::new();
        let tracker = RateTracker::new();
        let clock = ManualClock::new();
        let remote = FakeRemote::new().with_text_channel(1, 0);
        store.channel_config(1, 9).await.unwrap();
        for _ in 0..25 {
            tracker.record(1, clock.instant);
        }

        let scheduler = SlowmodeScheduler::new(Duration::from_secs(1));
        scheduler.start(Reconciler::new(
            store,
            remote.clone(),
            tracker,
            clock,
            fast_settings(),
        ));

        let mut waited = Duration::ZERO;
        while remote.slowmode_of(1) != Some(15) && waited < Duration::from_secs(2) {
            tokio::time::sleep(Duration::from_millis(10)).await;
            waited += Duration::from_millis(10);
        }
        assert_eq!(remote.slowmode_of(1), Some(15));

        scheduler.shutdown().await;
        assert!(scheduler.is_stopping());

        let fetches = remote.fetches().len();
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(remote.fetches().len(), fetches);
    }

    #[tokio::test]
    async fn hung_cycle_is_aborted_after_drain_timeout() {
        let store = MemoryStore::new();
        let tracker = RateTracker::new();
        let clock = ManualClock::new();
        let remote = FakeRemote::new().hanging_fetch(1);
        store.channel_config(1, 9).await.unwrap();
        tracker.record(1, clock.instant);

        let mut settings = fast_settings();
        settings.call_timeout = Duration::from_secs(60);

        let scheduler = SlowmodeScheduler::new(Duration::from_millis(50));
        scheduler.start(Reconciler::new(store, remote.clone(), tracker, clock, settings));

        while remote.fetches().is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let started = tokio::time::Instant::now();
        scheduler.shutdown().await;
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn start_after_shutdown_is_ignored() {
        let scheduler = SlowmodeScheduler::new(Duration::from_millis(50));
        scheduler.shutdown().await;

        let remote = FakeRemote::new();
        scheduler.start(Reconciler::new(
            MemoryStore::new(),
            remote.clone(),
            RateTracker::new(),
            ManualClock::new(),
            fast_settings(),
        ));

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(remote.fetches().is_empty());
    }
}
