//! Divergence classification

use super::{DivergenceInfo, ProbeError, SyncState};

/// Map measured divergence to a sync state.
///
/// `Ahead` usually means the remote was force-pushed. This engine mirrors
/// the remote and never publishes, so both `Ahead` and `Diverged` lead to a
/// reset onto the remote tip.
pub fn classify(info: &DivergenceInfo) -> SyncState {
    match (info.behind, info.ahead) {
        (0, 0) => SyncState::UpToDate,
        (_, 0) => SyncState::Behind,
        (0, _) => SyncState::Ahead,
        _ => SyncState::Diverged,
    }
}

impl From<&ProbeError> for SyncState {
    fn from(error: &ProbeError) -> Self {
        match error {
            ProbeError::MissingLocalCopy(_) => SyncState::Missing,
            ProbeError::NotAVersionControlledCopy(_) => SyncState::NotARepository,
            // Both mean the remote could not be measured this pass
            ProbeError::FetchFailed(_) | ProbeError::RevisionResolutionFailed(_) => {
                SyncState::FetchFailed
            }
        }
    }
}
