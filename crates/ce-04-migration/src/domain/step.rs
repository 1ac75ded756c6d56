//! Migration protocol states.
//!
//! ```text
//! Idle ──→ Paused ──→ Snapshotted ──→ Deployed ──→ Replicated ──→ CutOver
//!   │         │            │              │             │
//!   └─────────┴────────────┴──────────────┴─────────────┴──→ Failed
//! ```

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum MigrationStep {
    #[default]
    Idle,
    Paused,
    Snapshotted,
    Deployed,
    Replicated,
    CutOver,
    Failed,
}

impl MigrationStep {
    /// The state a successful transition from `self` lands in.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Idle => Some(Self::Paused),
            Self::Paused => Some(Self::Snapshotted),
            Self::Snapshotted => Some(Self::Deployed),
            Self::Deployed => Some(Self::Replicated),
            Self::Replicated => Some(Self::CutOver),
            Self::CutOver | Self::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::CutOver | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Paused => "paused",
            Self::Snapshotted => "snapshotted",
            Self::Deployed => "deployed",
            Self::Replicated => "replicated",
            Self::CutOver => "cut_over",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for MigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
