//! Sync state machine states

use std::fmt;

/// Where a sync run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    #[default]
    Idle,
    FetchingManifest,
    FetchingMetadata,
    Finalizing,
    Done,
    Failed,
}

impl SyncState {
    pub fn is_final(&self) -> bool {
        matches!(self, SyncState::Done | SyncState::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncState::Idle => "idle",
            SyncState::FetchingManifest => "fetching manifest",
            SyncState::FetchingMetadata => "fetching metadata",
            SyncState::Finalizing => "finalizing",
            SyncState::Done => "done",
            SyncState::Failed => "failed",
        }
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
