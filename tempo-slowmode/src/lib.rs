//! Automatic slowmode: activity tracking, level decisions, and the periodic
//! reconciliation of desired vs. actual channel rate limits.

pub mod clock;
pub mod decider;
pub mod ingest;
pub mod notice;
pub mod reconcile;
pub mod remote;
pub mod scheduler;
pub mod settings;
pub mod tracker;

#[cfg(test)]
pub(crate) mod testing;

pub use clock::{Clock, SystemClock};
pub use decider::decide_slowmode;
pub use ingest::{InboundMessage, Ingestor};
pub use notice::{SlowmodeNotice, SlowmodeTransition};
pub use reconcile::{ChannelOutcome, CycleReport, DisableReason, Reconciler};
pub use remote::{ChannelRemote, RemoteChannel, RemoteError, SerenityRemote};
pub use scheduler::SlowmodeScheduler;
pub use settings::SlowmodeSettings;
pub use tracker::RateTracker;
