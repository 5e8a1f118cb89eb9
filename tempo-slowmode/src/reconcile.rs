use std::future::Future;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use tempo_database::model::slowmode::{ChannelConfig, ChannelConfigPatch, GuildConfig};
use tempo_database::{ActivityStore, ConfigStore};

use crate::clock::{Clock, SystemClock};
use crate::decider::decide_slowmode;
use crate::notice::{SlowmodeNotice, SlowmodeTransition};
use crate::remote::{ChannelRemote, RemoteError};
use crate::settings::SlowmodeSettings;
use crate::tracker::RateTracker;

/// Why the loop switched a channel off on its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisableReason {
    /// The channel cannot be read.
    MissingAccess,
    /// The channel can be read but its slowmode cannot be edited.
    MissingManage,
    /// The channel was deleted.
    Deleted,
}

/// Result of reconciling one channel during a cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelOutcome {
    /// No tracked or durable activity; the remote was not contacted.
    Idle,
    /// Not a plain text channel.
    NotText,
    Unchanged { slowmode: u16 },
    Updated { from: u16, to: u16 },
    Disabled(DisableReason),
    /// Contained failure; retried next cycle.
    Failed,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub guilds: usize,
    pub channels: usize,
    pub idle: usize,
    pub not_text: usize,
    pub unchanged: usize,
    pub updated: usize,
    pub disabled: usize,
    pub failed: usize,
    /// Shutdown was requested before every channel was visited.
    pub interrupted: bool,
}

impl CycleReport {
    fn record(&mut self, outcome: ChannelOutcome) {
        self.channels += 1;
        match outcome {
            ChannelOutcome::Idle => self.idle += 1,
            ChannelOutcome::NotText => self.not_text += 1,
            ChannelOutcome::Unchanged { .. } => self.unchanged += 1,
            ChannelOutcome::Updated { .. } => self.updated += 1,
            ChannelOutcome::Disabled(_) => self.disabled += 1,
            ChannelOutcome::Failed => self.failed += 1,
        }
    }
}

/// One reconciliation pass over every enabled channel: desired slowmode from
/// observed rate vs. the remote's actual value, corrected where they differ.
pub struct Reconciler<S, R, K = SystemClock> {
    store: S,
    remote: R,
    tracker: RateTracker,
    clock: K,
    settings: SlowmodeSettings,
}

impl<S, R, K> Reconciler<S, R, K>
where
    S: ConfigStore + ActivityStore,
    R: ChannelRemote,
    K: Clock,
{
    pub fn new(
        store: S,
        remote: R,
        tracker: RateTracker,
        clock: K,
        settings: SlowmodeSettings,
    ) -> Self {
        Self {
            store,
            remote,
            tracker,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &SlowmodeSettings {
        &self.settings
    }

    /// Visit every enabled channel of every participating guild. Failures are
    /// contained per channel. A shutdown signal stops the pass between
    /// channels, never in the middle of one.
    pub async fn run_cycle(&self, shutdown: &watch::Receiver<bool>) -> CycleReport {
        let mut report = CycleReport::default();

        let guilds = match self.store.list_enabled_guilds().await {
            Ok(guilds) => guilds,
            Err(source) => {
                error!(?source, "failed to list auto-slowmode guilds");
                return report;
            }
        };

        for guild in guilds {
            report.guilds += 1;

            let channels = match self.store.list_enabled_channels(guild.guild_id).await {
                Ok(channels) => channels,
                Err(source) => {
                    error!(
                        ?source,
                        guild_id = guild.guild_id,
                        "failed to list auto-slowmode channels"
                    );
                    continue;
                }
            };
            debug!(guild_id = guild.guild_id, channels = channels.len(), "processing guild");

            for channel in channels {
                if *shutdown.borrow() {
                    report.interrupted = true;
                    return report;
                }

                let outcome = self.reconcile_channel(&guild, &channel).await;
                report.record(outcome);
            }
        }

        report
    }

    pub async fn reconcile_channel(
        &self,
        guild: &GuildConfig,
        channel: &ChannelConfig,
    ) -> ChannelOutcome {
        let channel_id = channel.channel_id;
        let rate = self.tracker.rate(
            channel_id,
            self.settings.rate_window,
            self.clock.instant_now(),
        );

        let recent = match self
            .store
            .windowed_count(
                channel_id,
                self.settings.idle_window.as_secs(),
                self.clock.unix_now(),
            )
            .await
        {
            Ok(count) => count,
            Err(source) => {
                error!(?source, channel_id, "failed to read channel activity");
                return ChannelOutcome::Failed;
            }
        };

        if rate == 0.0 && recent == 0 {
            debug!(channel_id, "skipping channel with no recent activity");
            return ChannelOutcome::Idle;
        }

        let remote = match self.bounded(self.remote.fetch_channel(channel_id)).await {
            Ok(remote) => remote,
            Err(RemoteError::Forbidden) => {
                warn!(channel_id, "no access to channel, disabling auto-slowmode for it");
                return self.disable(channel_id, DisableReason::MissingAccess).await;
            }
            Err(RemoteError::NotFound) => {
                warn!(channel_id, "channel not found (deleted?), disabling auto-slowmode for it");
                return self.disable(channel_id, DisableReason::Deleted).await;
            }
            Err(source) => {
                error!(%source, channel_id, "failed to fetch channel");
                return ChannelOutcome::Failed;
            }
        };

        if !remote.is_text {
            debug!(channel_id, "not a text channel, skipping");
            return ChannelOutcome::NotText;
        }

        let threshold = channel.effective_threshold(guild);
        let current = remote.slowmode_seconds;
        let target = decide_slowmode(rate, threshold);
        debug!(channel_id, rate, threshold, current, target, "slowmode decision");

        let Some(transition) = SlowmodeTransition::between(current, target) else {
            return ChannelOutcome::Unchanged { slowmode: current };
        };

        let jitter = self.settings.jitter();
        if !jitter.is_zero() {
            tokio::time::sleep(jitter).await;
        }

        match self.bounded(self.remote.edit_slowmode(channel_id, target)).await {
            Ok(()) => {}
            Err(RemoteError::Forbidden) => {
                warn!(channel_id, "no permission to update slowmode, disabling auto-slowmode for it");
                return self.disable(channel_id, DisableReason::MissingManage).await;
            }
            Err(RemoteError::NotFound) => {
                warn!(channel_id, "channel vanished before slowmode update, disabling auto-slowmode for it");
                return self.disable(channel_id, DisableReason::Deleted).await;
            }
            Err(source) => {
                error!(%source, channel_id, "failed to update slowmode");
                return ChannelOutcome::Failed;
            }
        }

        info!(
            channel_id,
            guild_id = guild.guild_id,
            from = current,
            to = target,
            rate,
            threshold,
            "updated slowmode"
        );

        if self.settings.notify {
            self.announce(channel_id, transition).await;
        }

        ChannelOutcome::Updated {
            from: current,
            to: target,
        }
    }

    /// Drop durable buckets past the retention horizon and forget tracker
    /// channels that went quiet.
    pub async fn prune_activity(&self) -> anyhow::Result<u64> {
        let removed = self
            .store
            .prune(self.settings.retention.as_secs(), self.clock.unix_now())
            .await?;
        let forgotten = self
            .tracker
            .sweep(self.settings.rate_window, self.clock.instant_now());

        debug!(removed, forgotten, "pruned channel activity");
        Ok(removed)
    }

    async fn disable(&self, channel_id: u64, reason: DisableReason) -> ChannelOutcome {
        if let Err(source) = self
            .store
            .update_channel_config(channel_id, &ChannelConfigPatch::enabled(false))
            .await
        {
            error!(?source, channel_id, ?reason, "failed to disable channel");
            return ChannelOutcome::Failed;
        }

        ChannelOutcome::Disabled(reason)
    }

    async fn announce(&self, channel_id: u64, transition: SlowmodeTransition) {
        let notice = SlowmodeNotice::from(transition);
        match self.bounded(self.remote.post_notice(channel_id, &notice)).await {
            Ok(()) => {}
            Err(RemoteError::Forbidden) => {
                warn!(channel_id, "no permission to send messages in channel");
            }
            Err(source) => {
                error!(%source, channel_id, "failed to send slowmode notice");
            }
        }
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, RemoteError>>,
    ) -> Result<T, RemoteError> {
        tokio::time::timeout(self.settings.call_timeout, call)
            .await
            .unwrap_or_else(|_| {
                Err(RemoteError::transient(format!(
                    "no response within {:?}",
                    self.settings.call_timeout
                )))
            })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::watch;

    use tempo_database::model::slowmode::{ChannelConfigPatch, GuildConfigPatch};
    use tempo_database::{ActivityStore, ConfigStore, MemoryStore};

    use super::{ChannelOutcome, DisableReason, Reconciler};
    use crate::remote::RemoteError;
    use crate::testing::{FakeRemote, ManualClock, NOW_UNIX, test_settings};
    use crate::tracker::RateTracker;

    const GUILD: u64 = 100;

    async fn enabled_channel(store: &MemoryStore, channel_id: u64) {
        store.channel_config(channel_id, GUILD).await.unwrap();
    }

    fn burst(tracker: &RateTracker, clock: &ManualClock, channel_id: u64, count: u32) {
        for _ in 0..count {
            tracker.record(channel_id, clock.instant);
        }
    }

    fn reconciler(
        store: &MemoryStore,
        remote: &FakeRemote,
        tracker: &RateTracker,
        clock: ManualClock,
    ) -> Reconciler<MemoryStore, FakeRemote, ManualClock> {
        Reconciler::new(
            store.clone(),
            remote.clone(),
            tracker.clone(),
            clock,
            test_settings(),
        )
    }

    fn running() -> watch::Receiver<bool> {
        watch::channel(false).1
    }

    #[tokio::test]
    async fn surge_enables_slowmode_from_zero() {
        let store = MemoryStore::new();
        let tracker = RateTracker::new();
        let clock = ManualClock::new();
        let remote = FakeRemote::new().with_text_channel(1, 0);
        enabled_channel(&store, 1).await;
        burst(&tracker, &clock, 1, 25);

        let report = reconciler(&store, &remote, &tracker, clock)
            .run_cycle(&running())
            .await;

        // 25 msg/min against a threshold of 10 sits on the 3x rung.
        assert_eq!(remote.edits(), vec![(1, 15)]);
        assert_eq!(report.updated, 1);
        let notices = remote.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(
            notices[0].1.description,
            "Slowmode has been enabled (15 seconds) due to high message volume."
        );
    }

    #[tokio::test]
    async fn quiet_channel_returns_to_normal() {
        let store = MemoryStore::new();
        let tracker = RateTracker::new();
        let clock = ManualClock::new();
        let remote = FakeRemote::new().with_text_channel(1, 60);
        enabled_channel(&store, 1).await;
        store.record_message(1, NOW_UNIX - 120).await.unwrap();

        let outcome = reconciler(&store, &remote, &tracker, clock)
            .reconcile_channel(
                &store.guild_config(GUILD).await.unwrap(),
                &store.channel_config(1, GUILD).await.unwrap(),
            )
            .await;

        assert_eq!(outcome, ChannelOutcome::Updated { from: 60, to: 0 });
        assert_eq!(remote.edits(), vec![(1, 0)]);
        let description = &remote.notices()[0].1.description;
        assert!(description.contains("disabled"));
        assert!(description.contains("returned to normal"));
    }

    #[tokio::test]
    async fn idle_channel_is_never_fetched() {
        let store = MemoryStore::new();
        let tracker = RateTracker::new();
        let clock = ManualClock::new();
        let remote = FakeRemote::new().with_text_channel(1, 30);
        enabled_channel(&store, 1).await;
        // Older than the idle window, so it does not count.
        store.record_message(1, NOW_UNIX - 3_600).await.unwrap();

        let report = reconciler(&store, &remote, &tracker, clock)
            .run_cycle(&running())
            .await;

        assert_eq!(report.idle, 1);
        assert!(remote.fetches().is_empty());
        assert!(remote.edits().is_empty());
    }

    #[tokio::test]
    async fn forbidden_fetch_disables_channel_for_later_cycles() {
        let store = MemoryStore::new();
        let tracker = RateTracker::new();
        let clock = ManualClock::new();
        let remote = FakeRemote::new()
            .with_text_channel(1, 0)
            .failing_fetch(1, RemoteError::Forbidden);
        enabled_channel(&store, 1).await;
        burst(&tracker, &clock, 1, 40);

        let reconciler = reconciler(&store, &remote, &tracker, clock);
        let first = reconciler.run_cycle(&running()).await;
        assert_eq!(first.disabled, 1);
        assert!(!store.channel_config(1, GUILD).await.unwrap().enabled);
        assert!(remote.edits().is_empty());

        let second = reconciler.run_cycle(&running()).await;
        assert_eq!(second.channels, 0);
        assert_eq!(remote.fetches(), vec![1]);
    }

    #[tokio::test]
    async fn deleted_channel_is_disabled() {
        let store = MemoryStore::new();
        let tracker = RateTracker::new();
        let clock = ManualClock::new();
        let remote = FakeRemote::new();
        enabled_channel(&store, 8).await;
        burst(&tracker, &clock, 8, 3);

        let outcome = reconciler(&store, &remote, &tracker, clock)
            .reconcile_channel(
                &store.guild_config(GUILD).await.unwrap(),
                &store.channel_config(8, GUILD).await.unwrap(),
            )
            .await;

        assert_eq!(outcome, ChannelOutcome::Disabled(DisableReason::Deleted));
        assert!(!store.channel_config(8, GUILD).await.unwrap().enabled);
    }

    #[tokio::test]
    async fn transient_failure_does_not_block_siblings() {
        let store = MemoryStore::new();
        let tracker = RateTracker::new();
        let clock = ManualClock::new();
        let remote = FakeRemote::new()
            .with_text_channel(1, 0)
            .with_text_channel(2, 0)
            .failing_fetch(1, RemoteError::transient("502 bad gateway"));
        enabled_channel(&store, 1).await;
        enabled_channel(&store, 2).await;
        burst(&tracker, &clock, 1, 30);
        burst(&tracker, &clock, 2, 30);

        let report = reconciler(&store, &remote, &tracker, clock)
            .run_cycle(&running())
            .await;

        assert_eq!(report.failed, 1);
        assert_eq!(report.updated, 1);
        assert_eq!(remote.edits(), vec![(2, 15)]);
        assert!(store.channel_config(1, GUILD).await.unwrap().enabled);
    }

    #[tokio::test]
    async fn hanging_fetch_times_out_and_siblings_proceed() {
        let store = MemoryStore::new();
        let tracker = RateTracker::new();
        let clock = ManualClock::new();
        let remote = FakeRemote::new()
            .hanging_fetch(1)
            .with_text_channel(2, 0);
        enabled_channel(&store, 1).await;
        enabled_channel(&store, 2).await;
        burst(&tracker, &clock, 1, 12);
        burst(&tracker, &clock, 2, 12);

        let report = reconciler(&store, &remote, &tracker, clock)
            .run_cycle(&running())
            .await;

        assert_eq!(report.failed, 1);
        assert_eq!(remote.edits(), vec![(2, 5)]);
    }

    #[tokio::test]
    async fn forbidden_edit_disables_channel() {
        let store = MemoryStore::new();
        let tracker = RateTracker::new();
        let clock = ManualClock::new();
        let remote = FakeRemote::new()
            .with_text_channel(1, 0)
            .failing_edit(1, RemoteError::Forbidden);
        enabled_channel(&store, 1).await;
        burst(&tracker, &clock, 1, 50);

        let report = reconciler(&store, &remote, &tracker, clock)
            .run_cycle(&running())
            .await;

        assert_eq!(report.disabled, 1);
        assert!(!store.channel_config(1, GUILD).await.unwrap().enabled);
        assert!(remote.notices().is_empty());
    }

    #[tokio::test]
    async fn transient_edit_failure_keeps_channel_enabled() {
        let store = MemoryStore::new();
        let tracker = RateTracker::new();
        let clock = ManualClock::new();
        let remote = FakeRemote::new()
            .with_text_channel(1, 0)
            .failing_edit(1, RemoteError::transient("429"));
        enabled_channel(&store, 1).await;
        burst(&tracker, &clock, 1, 50);

        let report = reconciler(&store, &remote, &tracker, clock)
            .run_cycle(&running())
            .await;

        assert_eq!(report.failed, 1);
        assert!(store.channel_config(1, GUILD).await.unwrap().enabled);
    }

    #[tokio::test]
    async fn notice_failure_is_swallowed() {
        let store = MemoryStore::new();
        let tracker = RateTracker::new();
        let clock = ManualClock::new();
        let remote = FakeRemote::new()
            .with_text_channel(1, 0)
            .failing_notices(RemoteError::Forbidden);
        enabled_channel(&store, 1).await;
        burst(&tracker, &clock, 1, 11);

        let report = reconciler(&store, &remote, &tracker, clock)
            .run_cycle(&running())
            .await;

        assert_eq!(report.updated, 1);
        assert_eq!(remote.slowmode_of(1), Some(5));
        assert!(store.channel_config(1, GUILD).await.unwrap().enabled);
    }

    #[tokio::test]
    async fn matching_remote_state_is_left_alone() {
        let store = MemoryStore::new();
        let tracker = RateTracker::new();
        let clock = ManualClock::new();
        let remote = FakeRemote::new().with_text_channel(1, 10);
        enabled_channel(&store, 1).await;
        burst(&tracker, &clock, 1, 18);

        let report = reconciler(&store, &remote, &tracker, clock)
            .run_cycle(&running())
            .await;

        assert_eq!(report.unchanged, 1);
        assert_eq!(remote.fetches(), vec![1]);
        assert!(remote.edits().is_empty());
    }

    #[tokio::test]
    async fn channel_override_beats_guild_default() {
        let store = MemoryStore::new();
        let tracker = RateTracker::new();
        let clock = ManualClock::new();
        let remote = FakeRemote::new().with_text_channel(1, 0);
        enabled_channel(&store, 1).await;
        store
            .update_guild_config(GUILD, &GuildConfigPatch::default_threshold(100))
            .await
            .unwrap();
        store
            .update_channel_config(1, &ChannelConfigPatch::threshold_override(Some(4)))
            .await
            .unwrap();
        burst(&tracker, &clock, 1, 20);

        reconciler(&store, &remote, &tracker, clock)
            .run_cycle(&running())
            .await;

        // 20 msg/min against 4 is the 5x rung.
        assert_eq!(remote.edits(), vec![(1, 60)]);
    }

    #[tokio::test]
    async fn disabled_guild_with_enabled_channel_is_still_processed() {
        let store = MemoryStore::new();
        let tracker = RateTracker::new();
        let clock = ManualClock::new();
        let remote = FakeRemote::new().with_text_channel(1, 0);
        enabled_channel(&store, 1).await;
        store
            .update_guild_config(GUILD, &GuildConfigPatch::enabled(false))
            .await
            .unwrap();
        burst(&tracker, &clock, 1, 16);

        let report = reconciler(&store, &remote, &tracker, clock)
            .run_cycle(&running())
            .await;

        assert_eq!(report.guilds, 1);
        assert_eq!(remote.edits(), vec![(1, 10)]);
    }

    #[tokio::test]
    async fn non_text_channels_are_skipped() {
        let store = MemoryStore::new();
        let tracker = RateTracker::new();
        let clock = ManualClock::new();
        let remote = FakeRemote::new().with_other_channel(1);
        enabled_channel(&store, 1).await;
        burst(&tracker, &clock, 1, 90);

        let report = reconciler(&store, &remote, &tracker, clock)
            .run_cycle(&running())
            .await;

        assert_eq!(report.not_text, 1);
        assert!(remote.edits().is_empty());
        assert!(store.channel_config(1, GUILD).await.unwrap().enabled);
    }

    #[tokio::test]
    async fn shutdown_stops_between_channels() {
        let store = MemoryStore::new();
        let tracker = RateTracker::new();
        let clock = ManualClock::new();
        let remote = FakeRemote::new().with_text_channel(1, 0);
        enabled_channel(&store, 1).await;
        burst(&tracker, &clock, 1, 90);

        let (tx, rx) = watch::channel(false);
        tx.send_replace(true);

        let report = reconciler(&store, &remote, &tracker, clock)
            .run_cycle(&rx)
            .await;

        assert!(report.interrupted);
        assert_eq!(report.channels, 0);
        assert!(remote.fetches().is_empty());
    }

    #[tokio::test]
    async fn notices_can_be_turned_off() {
        let store = MemoryStore::new();
        let tracker = RateTracker::new();
        let clock = ManualClock::new();
        let remote = FakeRemote::new().with_text_channel(1, 0);
        enabled_channel(&store, 1).await;
        burst(&tracker, &clock, 1, 25);

        let mut settings = test_settings();
        settings.notify = false;
        Reconciler::new(store.clone(), remote.clone(), tracker.clone(), clock, settings)
            .run_cycle(&running())
            .await;

        assert_eq!(remote.edits().len(), 1);
        assert!(remote.notices().is_empty());
    }

    #[tokio::test]
    async fn prune_drops_expired_buckets_and_idle_tracker_channels() {
        let store = MemoryStore::new();
        let tracker = RateTracker::new();
        let mut clock = ManualClock::new();
        let remote = FakeRemote::new();
        store.record_message(1, NOW_UNIX - 90_000).await.unwrap();
        store.record_message(1, NOW_UNIX - 30).await.unwrap();
        tracker.record(1, clock.instant);
        clock.instant += Duration::from_secs(120);

        let removed = reconciler(&store, &remote, &tracker, clock)
            .prune_activity()
            .await
            .unwrap();

        assert_eq!(removed, 1);
        assert_eq!(store.buckets().await.len(), 1);
        assert_eq!(tracker.tracked_channels(), 0);
    }
}
