use std::fmt;

use serde::{Deserialize, Serialize};

/// Which direction(s) a run is allowed to write in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// Most recent edit wins
    #[default]
    Bidirectional,
    /// Google → Notion regardless of timestamps; events are never written
    ForcePull,
    /// Notion → Google regardless of timestamps; task content is never written
    ForcePush,
    /// Only process tasks flagged for deletion
    DeleteOnly,
}

impl SyncMode {
    /// Whether events nobody references become new tasks.
    pub fn creates_tasks(self) -> bool {
        matches!(self, SyncMode::Bidirectional | SyncMode::ForcePull)
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::Bidirectional => write!(f, "bidirectional"),
            SyncMode::ForcePull => write!(f, "force-pull"),
            SyncMode::ForcePush => write!(f, "force-push"),
            SyncMode::DeleteOnly => write!(f, "delete-only"),
        }
    }
}
