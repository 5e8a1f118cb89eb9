//! Fakes shared by the unit tests in this crate.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::clock::Clock;
use crate::notice::SlowmodeNotice;
use crate::remote::{ChannelRemote, RemoteChannel, RemoteError};
use crate::settings::SlowmodeSettings;

pub(crate) const NOW_UNIX: u64 = 1_700_000_000;

/// Clock pinned to one wall-clock second and one instant.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ManualClock {
    pub unix: u64,
    pub instant: Instant,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            unix: NOW_UNIX,
            instant: Instant::now(),
        }
    }
}

impl Clock for ManualClock {
    fn unix_now(&self) -> u64 {
        self.unix
    }

    fn instant_now(&self) -> Instant {
        self.instant
    }
}

/// Settings with no jitter and a short call timeout.
pub(crate) fn test_settings() -> SlowmodeSettings {
    SlowmodeSettings {
        jitter_min: Duration::ZERO,
        jitter_max: Duration::ZERO,
        call_timeout: Duration::from_millis(200),
        ..SlowmodeSettings::default()
    }
}

#[derive(Debug, Default)]
struct FakeRemoteState {
    channels: HashMap<u64, RemoteChannel>,
    fetch_failures: HashMap<u64, RemoteError>,
    edit_failures: HashMap<u64, RemoteError>,
    notice_failure: Option<RemoteError>,
    hanging: HashSet<u64>,
    fetches: Vec<u64>,
    edits: Vec<(u64, u16)>,
    notices: Vec<(u64, SlowmodeNotice)>,
}

/// Scripted remote that records every call it receives.
#[derive(Clone, Debug, Default)]
pub(crate) struct FakeRemote {
    state: Arc<Mutex<FakeRemoteState>>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text_channel(self, channel_id: u64, slowmode_seconds: u16) -> Self {
        self.state.lock().channels.insert(
            channel_id,
            RemoteChannel {
                slowmode_seconds,
                is_text: true,
            },
        );
        self
    }

    pub fn with_other_channel(self, channel_id: u64) -> Self {
        self.state.lock().channels.insert(
            channel_id,
            RemoteChannel {
                slowmode_seconds: 0,
                is_text: false,
            },
        );
        self
    }

    pub fn failing_fetch(self, channel_id: u64, error: RemoteError) -> Self {
        self.state.lock().fetch_failures.insert(channel_id, error);
        self
    }

    pub fn failing_edit(self, channel_id: u64, error: RemoteError) -> Self {
        self.state.lock().edit_failures.insert(channel_id, error);
        self
    }

    pub fn failing_notices(self, error: RemoteError) -> Self {
        self.state.lock().notice_failure = Some(error);
        self
    }

    pub fn hanging_fetch(self, channel_id: u64) -> Self {
        self.state.lock().hanging.insert(channel_id);
        self
    }

    pub fn fetches(&self) -> Vec<u64> {
        self.state.lock().fetches.clone()
    }

    pub fn edits(&self) -> Vec<(u64, u16)> {
        self.state.lock().edits.clone()
    }

    pub fn notices(&self) -> Vec<(u64, SlowmodeNotice)> {
        self.state.lock().notices.clone()
    }

    pub fn slowmode_of(&self, channel_id: u64) -> Option<u16> {
        self.state
            .lock()
            .channels
            .get(&channel_id)
            .map(|channel| channel.slowmode_seconds)
    }
}

impl ChannelRemote for FakeRemote {
    async fn fetch_channel(&self, channel_id: u64) -> Result<RemoteChannel, RemoteError> {
        let hanging = {
            let mut state = self.state.lock();
            state.fetches.push(channel_id);
            state.hanging.contains(&channel_id)
        };

        if hanging {
            std::future::pending::<()>().await;
        }

        let state = self.state.lock();
        if let Some(error) = state.fetch_failures.get(&channel_id) {
            return Err(error.clone());
        }

        state
            .channels
            .get(&channel_id)
            .copied()
            .ok_or(RemoteError::NotFound)
    }

    async fn edit_slowmode(&self, channel_id: u64, seconds: u16) -> Result<(), RemoteError> {
        let mut state = self.state.lock();
        state.edits.push((channel_id, seconds));

        if let Some(error) = state.edit_failures.get(&channel_id) {
            return Err(error.clone());
        }

        match state.channels.get_mut(&channel_id) {
            Some(channel) => {
                channel.slowmode_seconds = seconds;
                Ok(())
            }
            None => Err(RemoteError::NotFound),
        }
    }

    async fn post_notice(&self, channel_id: u64, notice: &SlowmodeNotice) -> Result<(), RemoteError> {
        let mut state = self.state.lock();
        if let Some(error) = &state.notice_failure {
            return Err(error.clone());
        }

        state.notices.push((channel_id, notice.clone()));
        Ok(())
    }
}
