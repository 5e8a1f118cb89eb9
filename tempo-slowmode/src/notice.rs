use tempo_utils::embed::{POSITIVE_COLOR, RELAXED_COLOR, RESTRICTIVE_COLOR, WARNING_COLOR};

pub const NOTICE_TITLE: &str = "Auto Slowmode Update";

/// Direction of an applied slowmode change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlowmodeTransition {
    Enabled { to: u16 },
    Disabled { from: u16 },
    Increased { from: u16, to: u16 },
    Decreased { from: u16, to: u16 },
}

impl SlowmodeTransition {
    /// `None` when nothing changes.
    pub fn between(from: u16, to: u16) -> Option<Self> {
        match (from, to) {
            _ if from == to => None,
            (0, to) => Some(Self::Enabled { to }),
            (from, 0) => Some(Self::Disabled { from }),
            (from, to) if to > from => Some(Self::Increased { from, to }),
            (from, to) => Some(Self::Decreased { from, to }),
        }
    }

    pub fn description(&self) -> String {
        match *self {
            Self::Enabled { to } => format!(
                "Slowmode has been enabled ({to} seconds) due to high message volume."
            ),
            Self::Disabled { .. } => {
                "Slowmode has been disabled as message volume has returned to normal.".to_owned()
            }
            Self::Increased { from, to } => format!(
                "Slowmode increased from {from}s to {to}s due to continued high message volume."
            ),
            Self::Decreased { from, to } => {
                format!("Slowmode reduced from {from}s to {to}s as message volume decreased.")
            }
        }
    }

    pub fn color(&self) -> u32 {
        match self {
            Self::Enabled { .. } => WARNING_COLOR,
            Self::Disabled { .. } => POSITIVE_COLOR,
            Self::Increased { .. } => RESTRICTIVE_COLOR,
            Self::Decreased { .. } => RELAXED_COLOR,
        }
    }
}

/// Human-readable message posted in a channel after its slowmode changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlowmodeNotice {
    pub title: &'static str,
    pub description: String,
    pub color: u32,
}

impl From<SlowmodeTransition> for SlowmodeNotice {
    fn from(transition: SlowmodeTransition) -> Self {
        Self {
            title: NOTICE_TITLE,
            description: transition.description(),
            color: transition.color(),
        }
    }
}
